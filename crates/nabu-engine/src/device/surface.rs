//! Surface format and alpha-mode selection.
//!
//! Kept free of live wgpu objects so the choices can be tested directly.

use wgpu::{CompositeAlphaMode, TextureFormat};

/// How presented texels are encoded on the surface.
///
/// Sprite sheets and cached targets hold sRGB-encoded bytes in
/// `Rgba8Unorm` textures and are blended in that space. A `Unorm` surface
/// keeps those bytes as they are; an sRGB surface encodes them a second
/// time on write.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SurfaceEncoding {
    #[default]
    PassThrough,
    Srgb,
}

impl SurfaceEncoding {
    fn accepts(self, format: TextureFormat) -> bool {
        match self {
            SurfaceEncoding::PassThrough => !format.is_srgb(),
            SurfaceEncoding::Srgb => format.is_srgb(),
        }
    }
}

/// Picks the first 8-bit RGBA/BGRA format matching `encoding`, then any
/// format matching `encoding`, then whatever the surface lists first.
pub fn choose_surface_format(formats: &[TextureFormat], encoding: SurfaceEncoding) -> Option<TextureFormat> {
    const EIGHT_BIT: [TextureFormat; 4] = [
        TextureFormat::Bgra8Unorm,
        TextureFormat::Rgba8Unorm,
        TextureFormat::Bgra8UnormSrgb,
        TextureFormat::Rgba8UnormSrgb,
    ];

    EIGHT_BIT
        .iter()
        .copied()
        .find(|f| encoding.accepts(*f) && formats.contains(f))
        .or_else(|| formats.iter().copied().find(|f| encoding.accepts(*f)))
        .or_else(|| formats.first().copied())
}

/// Honours `requested` if supported, else opaque, else premultiplied (the
/// renderer's own blending), else the first supported mode.
pub fn choose_alpha_mode(
    supported: &[CompositeAlphaMode],
    requested: Option<CompositeAlphaMode>,
) -> CompositeAlphaMode {
    requested
        .into_iter()
        .chain([CompositeAlphaMode::Opaque, CompositeAlphaMode::PreMultiplied])
        .find(|m| supported.contains(m))
        .or_else(|| supported.first().copied())
        .unwrap_or(CompositeAlphaMode::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── format ────────────────────────────────────────────────────────────

    #[test]
    fn pass_through_prefers_unorm() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(
            choose_surface_format(&formats, SurfaceEncoding::PassThrough),
            Some(TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            choose_surface_format(&formats, SurfaceEncoding::Srgb),
            Some(TextureFormat::Bgra8UnormSrgb)
        );
    }

    #[test]
    fn falls_back_to_any_matching_then_first() {
        let formats = [TextureFormat::Rgba16Float, TextureFormat::Rgb10a2Unorm];
        assert_eq!(
            choose_surface_format(&formats, SurfaceEncoding::PassThrough),
            Some(TextureFormat::Rgba16Float)
        );
        assert_eq!(
            choose_surface_format(&formats, SurfaceEncoding::Srgb),
            Some(TextureFormat::Rgba16Float)
        );
        assert_eq!(choose_surface_format(&[], SurfaceEncoding::Srgb), None);
    }

    // ── alpha ─────────────────────────────────────────────────────────────

    #[test]
    fn alpha_mode_honours_supported_request() {
        let supported = [CompositeAlphaMode::Opaque, CompositeAlphaMode::PostMultiplied];
        assert_eq!(
            choose_alpha_mode(&supported, Some(CompositeAlphaMode::PostMultiplied)),
            CompositeAlphaMode::PostMultiplied
        );
        assert_eq!(
            choose_alpha_mode(&supported, Some(CompositeAlphaMode::Inherit)),
            CompositeAlphaMode::Opaque
        );
        assert_eq!(choose_alpha_mode(&[], None), CompositeAlphaMode::Auto);
    }
}
