//! Time subsystem.
//!
//! Two independent notions of time:
//! - `FrameClock` measures wall-clock frame deltas for the runtime and diagnostics
//! - `AnimationState` is a fixed-step accumulator owned by each animated primitive
//!
//! Scene animation never reads the wall clock, so a given frame count always
//! produces the same transforms.

mod animation;
mod frame_clock;

pub use animation::{AnimationState, DEFAULT_TIME_STEP};
pub use frame_clock::{FrameClock, FrameTime};
