//! Renderer error taxonomy.
//!
//! Resource and state-machine errors are fatal for the current renderer;
//! shader and uniform-mapping errors on optional effects are recoverable.

use crate::cache::CacheId;
use crate::shader::ShaderError;
use crate::present::UniformMappingError;

/// GPU resource kinds whose creation can fail.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Texture,
    Framebuffer,
    Program,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Texture => "texture",
            ResourceKind::Framebuffer => "framebuffer",
            ResourceKind::Program => "program",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("GPU backend failed to create a {kind} ({width}x{height})")]
    ResourceCreation {
        kind: ResourceKind,
        width: u32,
        height: u32,
    },

    #[error("framebuffer for a {width}x{height} render target is incomplete")]
    FramebufferIncomplete { width: u32, height: u32 },

    #[error("render target size {width}x{height} is invalid")]
    InvalidTargetSize { width: u32, height: u32 },

    #[error("cache group `{requested}` started while `{active}` is being captured")]
    NestedCapture { requested: CacheId, active: CacheId },

    #[error("end_group called with no open group")]
    NoGroupToEnd,

    #[error("cache entry `{id}` is {cached_width}x{cached_height}, requested {width}x{height}")]
    CacheSizeMismatch {
        id: CacheId,
        cached_width: u32,
        cached_height: u32,
        width: u32,
        height: u32,
    },

    #[error("cached content `{0}` cannot be drawn inside a capture")]
    CacheRefInCapture(CacheId),

    #[error("cache entry `{0}` is being captured")]
    CaptureInProgress(CacheId),

    #[error("draw issued outside of Renderer::render")]
    OutsideFrame,

    #[error("Renderer::render called while a frame is in progress")]
    FrameInProgress,

    #[error("geometry batch cannot hold a single quad")]
    BatchOverflow,

    #[error("sprite frame `{0}` is not defined")]
    UnknownFrame(String),

    #[error("region for `{name}` lies outside the {width}x{height} sprite sheet")]
    RegionOutOfBounds { name: String, width: u32, height: u32 },

    #[error("renderer has been shut down")]
    ShutDown,

    #[error("texture data is {actual} bytes, expected {expected}")]
    InvalidTextureData { expected: usize, actual: usize },

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    UniformMapping(#[from] UniformMappingError),
}

impl RenderError {
    /// Returns `true` for errors the caller can recover from by fixing its
    /// own configuration (optional effects, uniform slots).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenderError::Shader(_) | RenderError::UniformMapping(_))
    }
}
