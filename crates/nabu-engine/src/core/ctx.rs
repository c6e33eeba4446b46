use winit::window::{Window, WindowId};

use crate::backend::WgpuBackend;
use crate::device::{Gpu, SurfaceErrorAction};
use crate::error::RenderError;
use crate::renderer::Renderer;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Returns the physical window size as `(width, height)` in pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Creates a renderer sized to the current surface.
    pub fn create_renderer(
        &self,
        config: crate::config::RendererConfig,
    ) -> Result<Renderer<WgpuBackend>, RenderError> {
        let size = self.gpu.size();
        Renderer::new(
            self.gpu.create_backend(),
            config,
            size.width.max(1),
            size.height.max(1),
        )
    }

    /// Acquires the surface, runs one renderer frame and presents it.
    ///
    /// Surface errors are handled here and only decide between continuing and
    /// exiting. Renderer errors are returned; the surface texture is then
    /// dropped without being presented.
    pub fn present<F>(
        &mut self,
        renderer: &mut Renderer<WgpuBackend>,
        frame: F,
    ) -> Result<AppControl, RenderError>
    where
        F: FnOnce(&mut Renderer<WgpuBackend>) -> Result<(), RenderError>,
    {
        if !self.gpu.is_drawable() {
            return Ok(AppControl::Continue);
        }
        let size = self.gpu.size();

        let surface = match self.gpu.acquire() {
            Ok(f) => f,
            Err(err) => {
                return Ok(match self.gpu.recover(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        AppControl::Continue
                    }
                });
            }
        };

        if renderer.surface_size() != (size.width, size.height) {
            renderer.resize(size.width, size.height)?;
        }

        renderer
            .backend_mut()
            .set_surface(Some((surface.view.clone(), self.gpu.surface_format())));
        let result = renderer.render(frame);
        renderer.backend_mut().set_surface(None);
        result?;

        self.window.window.pre_present_notify();
        self.gpu.present(surface);

        Ok(AppControl::Continue)
    }
}
