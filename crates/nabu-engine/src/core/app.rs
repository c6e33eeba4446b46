use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by renderer hosts.
///
/// The app owns its renderers. The runtime only owns windows and their GPU
/// contexts and hands them out through [`FrameCtx`].
pub trait App {
    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per redraw per window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called after a window and its GPU context have been destroyed.
    ///
    /// Renderers bound to that window should be shut down here.
    fn on_window_closed(&mut self, window_id: WindowId) {
        let _ = window_id;
    }
}
