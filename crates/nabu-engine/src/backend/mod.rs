//! GPU backend seam.
//!
//! The renderer core never touches a graphics API directly. Everything it
//! needs from the GPU is expressed by [`GpuBackend`]; the bound draw target
//! and texture source are passed in as explicit values so batching and
//! segment replay can be exercised against [`recording::RecordingBackend`].
//!
//! Convention:
//! - geometry is two flat `f32` streams (positions in target pixels, uvs)
//! - every program shares one vertex layout and one bind layout
//!   (uniform block, texture, sampler)

use std::ops::Range;

use crate::shader::ShaderError;

pub mod recording;
mod wgpu_backend;

pub use wgpu_backend::WgpuBackend;

/// Floats in a program's uniform block (`[resolution.xy, flip_v, frame]` + params).
pub const UNIFORM_FLOATS: usize = 64;

/// Floats at the head of the uniform block reserved for per-draw state.
pub const UNIFORM_HEADER_FLOATS: usize = 4;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// Opaque texture handle issued by a backend.
    TextureHandle
);
handle!(
    /// Opaque framebuffer handle issued by a backend.
    FramebufferHandle
);
handle!(
    /// Opaque linked shader program handle issued by a backend.
    ProgramHandle
);

/// Texture sampling filter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFilter {
    Linear,
    Nearest,
}

/// Description of an RGBA8 texture. Wrapping is always clamp-to-edge.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub filter: TextureFilter,
    /// Whether the texture can be attached to a framebuffer.
    pub render_target: bool,
}

impl TextureDesc {
    /// Linear-filtered, framebuffer-attachable texture.
    pub const fn render_target(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: TextureFilter::Linear,
            render_target: true,
        }
    }

    /// Sample-only texture (sprite sheets).
    pub const fn sampled(width: u32, height: u32, filter: TextureFilter) -> Self {
        Self {
            width,
            height,
            filter,
            render_target: false,
        }
    }

    /// Size in bytes of tightly packed RGBA8 data for this texture.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Where draws land.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawTarget {
    /// The visible surface of the current frame.
    Surface,
    /// An offscreen framebuffer.
    Framebuffer(FramebufferHandle),
}

/// A draw target together with its pixel size.
///
/// The size doubles as the resolution uniform used to map target pixels to
/// clip space.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TargetBinding {
    pub target: DrawTarget,
    pub width: u32,
    pub height: u32,
}

impl TargetBinding {
    #[inline]
    pub const fn surface(width: u32, height: u32) -> Self {
        Self {
            target: DrawTarget::Surface,
            width,
            height,
        }
    }
}

/// Fixed-function blending for a program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// `src + dst * (1 - src.a)`, used for sprite and cache playback draws.
    PremultipliedAlpha,
    /// Overwrites the target, used for presentation and effects.
    Replace,
}

/// A complete WGSL program (`vs_main` + `fs_main`) ready for compilation.
#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub label: String,
    pub source: String,
    pub blend: BlendMode,
}

/// Capabilities the renderer consumes from a graphics API.
///
/// Creation failures are reported as `None`; the renderer turns them into
/// fatal [`RenderError`](crate::RenderError)s. Destruction of an unknown
/// handle is a backend bug and may be ignored.
pub trait GpuBackend {
    fn create_texture(&mut self, desc: &TextureDesc, rgba: Option<&[u8]>) -> Option<TextureHandle>;
    fn destroy_texture(&mut self, texture: TextureHandle);

    fn create_framebuffer(&mut self) -> Option<FramebufferHandle>;
    fn attach_color(&mut self, framebuffer: FramebufferHandle, texture: TextureHandle);
    fn is_framebuffer_complete(&self, framebuffer: FramebufferHandle) -> bool;
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle);

    /// Binds `binding` for subsequent clears and draws and sets the viewport
    /// to its full size.
    fn bind_target(&mut self, binding: TargetBinding);
    fn clear(&mut self, rgba: [f32; 4]);

    /// Uploads the vertex streams used by subsequent draws.
    fn upload_geometry(&mut self, positions: &[f32], uvs: &[f32]);

    fn compile_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle, ShaderError>;
    fn destroy_program(&mut self, program: ProgramHandle);
    fn write_uniforms(&mut self, program: ProgramHandle, data: &[f32; UNIFORM_FLOATS]);

    /// Issues one draw call over `vertices` of the uploaded geometry.
    fn draw(&mut self, program: ProgramHandle, texture: TextureHandle, vertices: Range<u32>);

    /// Blocks until all submitted GPU work has completed.
    fn finish(&mut self);

    /// Whether render-target textures are stored bottom-up, so sampling them
    /// back needs a vertical uv flip.
    fn flips_render_targets(&self) -> bool;
}
