//! Offscreen render targets (texture + framebuffer pairs).

use crate::backend::{
    DrawTarget, FramebufferHandle, GpuBackend, TargetBinding, TextureDesc, TextureHandle,
};
use crate::error::{RenderError, ResourceKind};

/// A GPU texture attached as the color target of a framebuffer.
///
/// Not `Clone`: ownership is the guarantee that [`RenderTarget::destroy`]
/// runs at most once. Both handles are always released together.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderTarget {
    texture: TextureHandle,
    framebuffer: FramebufferHandle,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Allocates an RGBA texture of `width x height` (linear filtering,
    /// clamp-to-edge), attaches it to a new framebuffer and verifies
    /// completeness.
    ///
    /// On any failure everything allocated so far is released before the
    /// error is returned; a half-initialized target is never handed out.
    pub fn create<B: GpuBackend + ?Sized>(
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize { width, height });
        }

        let texture = backend
            .create_texture(&TextureDesc::render_target(width, height), None)
            .ok_or(RenderError::ResourceCreation {
                kind: ResourceKind::Texture,
                width,
                height,
            })?;

        let Some(framebuffer) = backend.create_framebuffer() else {
            backend.destroy_texture(texture);
            return Err(RenderError::ResourceCreation {
                kind: ResourceKind::Framebuffer,
                width,
                height,
            });
        };

        backend.attach_color(framebuffer, texture);
        if !backend.is_framebuffer_complete(framebuffer) {
            backend.destroy_framebuffer(framebuffer);
            backend.destroy_texture(texture);
            return Err(RenderError::FramebufferIncomplete { width, height });
        }

        Ok(Self {
            texture,
            framebuffer,
            width,
            height,
        })
    }

    #[inline]
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    #[inline]
    pub fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The value to pass to [`GpuBackend::bind_target`]; its size is the
    /// resolution used for pixel-to-clip mapping while bound.
    #[inline]
    pub fn binding(&self) -> TargetBinding {
        TargetBinding {
            target: DrawTarget::Framebuffer(self.framebuffer),
            width: self.width,
            height: self.height,
        }
    }

    /// Frees the framebuffer and its texture.
    pub fn destroy<B: GpuBackend + ?Sized>(self, backend: &mut B) {
        backend.destroy_framebuffer(self.framebuffer);
        backend.destroy_texture(self.texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;

    #[test]
    fn create_attaches_texture_and_binds_full_size() {
        let mut gpu = RecordingBackend::new();
        let target = RenderTarget::create(&mut gpu, 64, 32).unwrap();

        let desc = gpu.texture_desc(target.texture()).unwrap();
        assert!(desc.render_target);
        assert_eq!((desc.width, desc.height), (64, 32));
        assert_eq!(target.binding().target, DrawTarget::Framebuffer(target.framebuffer()));
        assert_eq!((target.binding().width, target.binding().height), (64, 32));
    }

    #[test]
    fn destroy_frees_both_handles() {
        let mut gpu = RecordingBackend::new();
        let target = RenderTarget::create(&mut gpu, 8, 8).unwrap();
        target.destroy(&mut gpu);
        assert!(gpu.live_textures().is_empty());
        assert!(gpu.live_framebuffers().is_empty());
        assert_eq!(gpu.double_frees(), 0);
    }

    #[test]
    fn incomplete_framebuffer_is_fatal_and_leaves_nothing_behind() {
        let mut gpu = RecordingBackend::new();
        gpu.fail_framebuffer_completeness(true);
        let err = RenderTarget::create(&mut gpu, 8, 8).unwrap_err();
        assert!(matches!(err, RenderError::FramebufferIncomplete { width: 8, height: 8 }));
        assert!(gpu.live_textures().is_empty());
        assert!(gpu.live_framebuffers().is_empty());
    }

    #[test]
    fn texture_failure_is_resource_creation_error() {
        let mut gpu = RecordingBackend::new();
        gpu.fail_texture_creation(true);
        let err = RenderTarget::create(&mut gpu, 8, 8).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ResourceCreation { kind: ResourceKind::Texture, .. }
        ));
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut gpu = RecordingBackend::new();
        assert!(matches!(
            RenderTarget::create(&mut gpu, 0, 16),
            Err(RenderError::InvalidTargetSize { .. })
        ));
        assert!(gpu.calls().is_empty());
    }
}
