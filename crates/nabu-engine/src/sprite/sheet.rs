use std::collections::HashMap;

use crate::backend::TextureHandle;
use crate::coords::Rect;
use crate::error::RenderError;

/// The single source texture for ordinary sprite, line and text draws.
///
/// Frames are named texel regions. `line_region` must point at solid
/// texels; lines sample it stretched over their quad.
#[derive(Debug)]
pub struct SpriteSheet {
    texture: TextureHandle,
    width: u32,
    height: u32,
    frames: HashMap<String, Rect>,
    line_region: Rect,
}

impl SpriteSheet {
    pub(crate) fn new(texture: TextureHandle, width: u32, height: u32) -> Self {
        Self {
            texture,
            width,
            height,
            frames: HashMap::new(),
            line_region: Rect::new(0.0, 0.0, 1.0, 1.0),
        }
    }

    #[inline]
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Fails with [`RenderError::RegionOutOfBounds`] when the region reaches
    /// past the sheet; the previous definition of `name` is then kept.
    pub fn define_frame(&mut self, name: impl Into<String>, region: Rect) -> Result<(), RenderError> {
        let name = name.into();
        self.check_bounds(&name, region)?;
        self.frames.insert(name, region.normalized());
        Ok(())
    }

    #[inline]
    pub fn frame(&self, name: &str) -> Option<Rect> {
        self.frames.get(name).copied()
    }

    pub fn set_line_region(&mut self, region: Rect) -> Result<(), RenderError> {
        self.check_bounds("line region", region)?;
        self.line_region = region.normalized();
        Ok(())
    }

    #[inline]
    pub fn line_region(&self) -> Rect {
        self.line_region
    }

    fn check_bounds(&self, name: &str, region: Rect) -> Result<(), RenderError> {
        if region.fits_within(self.width as f32, self.height as f32) {
            Ok(())
        } else {
            Err(RenderError::RegionOutOfBounds {
                name: name.to_owned(),
                width: self.width,
                height: self.height,
            })
        }
    }

    /// `[u0, v0, u1, v1]` of a texel region.
    #[inline]
    pub fn uv(&self, region: Rect) -> [f32; 4] {
        region.to_uv(self.width as f32, self.height as f32)
    }

    /// Uvs of the line region, inset to texel centers so linear filtering
    /// never reaches neighbouring texels.
    pub fn line_uv(&self) -> [f32; 4] {
        let r = self.line_region;
        let cx = r.origin.x + r.size.x * 0.5;
        let cy = r.origin.y + r.size.y * 0.5;
        self.uv(Rect::new(cx, cy, 0.0, 0.0))
    }
}
