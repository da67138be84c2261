use anyhow::Result;
use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::device::Gpu;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
pub trait App {
    /// Called once after the GPU is ready, before the first frame.
    ///
    /// An error aborts the runtime; no frame is rendered.
    fn on_init(&mut self, gpu: &mut Gpu<'_>) -> Result<()>;

    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called exactly once, while the GPU is still alive, when the runtime shuts
    /// down after a successful `on_init`.
    fn on_exit(&mut self, gpu: &mut Gpu<'_>) {
        let _ = gpu;
    }
}
