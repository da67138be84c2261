//! Logging utilities.
//!
//! Logger initialization lives here so binaries and tests configure the `log`
//! facade the same way.

mod init;

pub use init::{init_logging, LoggingConfig};
