//! Zeus engine crate.
//!
//! This crate owns the GPU device abstraction, the scene renderer and the
//! platform runtime used by the demo binary.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod scene;
