use winit::window::WindowId;

use super::RuntimeConfig;

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    pub(super) commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn create_window(&mut self, config: RuntimeConfig) {
        self.commands.push(Command::CreateWindow(config));
    }

    pub fn close_window(&mut self, id: WindowId) {
        self.commands.push(Command::CloseWindow(id));
    }

    /// Schedules another frame for `id`. Only needed in
    /// [`RedrawMode::OnRequest`](super::RedrawMode::OnRequest).
    pub fn request_redraw(&mut self, id: WindowId) {
        self.commands.push(Command::Redraw(id));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

pub(super) enum Command {
    CreateWindow(RuntimeConfig),
    CloseWindow(WindowId),
    Redraw(WindowId),
    Exit,
}
