//! Draw entry points.
//!
//! Every primitive resolves to one or more quads and goes through
//! [`Renderer::push_quad`], which routes to the scratch batch while a capture
//! is in flight and to the segmented main batch otherwise. The current
//! offset is applied here, at call time.

use super::Renderer;
use crate::backend::{GpuBackend, TextureHandle};
use crate::batch::{line_quad, quad_positions, quad_uvs, FLOATS_PER_QUAD};
use crate::coords::{Rect, Vec2};
use crate::error::RenderError;
use crate::segment::TextureSource;
use crate::sprite::BitmapFont;

impl<B: GpuBackend> Renderer<B> {
    // ── transform groups ──────────────────────────────────────────────────

    /// Adds `(dx, dy)` to the offset of every following draw until the
    /// matching [`end_group`](Self::end_group).
    pub fn start_group(&mut self, dx: f32, dy: f32) {
        self.offsets.push(dx, dy);
    }

    pub fn end_group(&mut self) -> Result<(), RenderError> {
        self.offsets.pop()
    }

    /// Current accumulated offset.
    pub fn offset(&self) -> Vec2 {
        self.offsets.offset()
    }

    // ── primitives ────────────────────────────────────────────────────────

    /// Draws the named sheet frame at its natural size with its top-left
    /// corner at `(x, y)`.
    pub fn draw_sprite(&mut self, name: &str, x: f32, y: f32) -> Result<(), RenderError> {
        let src = self.frame_region(name)?;
        self.draw_region(src, Rect::new(x, y, src.size.x, src.size.y))
    }

    /// Draws the named sheet frame stretched to `w x h`.
    pub fn draw_sprite_scaled(
        &mut self,
        name: &str,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    ) -> Result<(), RenderError> {
        let src = self.frame_region(name)?;
        self.draw_region(src, Rect::new(x, y, w, h))
    }

    /// Draws texel region `src` of the sheet into `dst`.
    pub fn draw_region(&mut self, src: Rect, dst: Rect) -> Result<(), RenderError> {
        let uv = self.sheet.uv(src.normalized());
        let positions = quad_positions(dst.normalized().translated(self.offsets.offset()));
        let texture = self.sheet.texture();
        self.push_quad(TextureSource::SpriteSheet, texture, positions, quad_uvs(uv))
    }

    /// Draws a `thickness`-wide line sampling the sheet's line region.
    pub fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32) -> Result<(), RenderError> {
        let offset = self.offsets.offset();
        let positions = line_quad(Vec2::new(x1, y1) + offset, Vec2::new(x2, y2) + offset, thickness);
        let uvs = quad_uvs(self.sheet.line_uv());
        let texture = self.sheet.texture();
        self.push_quad(TextureSource::SpriteSheet, texture, positions, uvs)
    }

    /// Draws `text` with `font`, pen starting at `(x, y)`.
    pub fn draw_text(&mut self, font: &BitmapFont, text: &str, x: f32, y: f32) -> Result<(), RenderError> {
        for (dst, src) in font.layout(text, x, y) {
            self.draw_region(src, dst)?;
        }
        Ok(())
    }

    // ── routing ───────────────────────────────────────────────────────────

    fn frame_region(&self, name: &str) -> Result<Rect, RenderError> {
        self.sheet
            .frame(name)
            .ok_or_else(|| RenderError::UnknownFrame(name.to_string()))
    }

    /// Appends one quad to the active batch.
    ///
    /// Inside a capture only the sprite sheet is a legal source and the
    /// scratch batch is flushed into the capture target when full. Outside,
    /// the main batch is flushed when full and the segment list records the
    /// source before the append.
    pub(super) fn push_quad(
        &mut self,
        source: TextureSource,
        texture: TextureHandle,
        positions: [f32; FLOATS_PER_QUAD],
        uvs: [f32; FLOATS_PER_QUAD],
    ) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::OutsideFrame);
        }

        if self.capture.is_some() {
            if let TextureSource::Cache(id) = source {
                return Err(RenderError::CacheRefInCapture(id));
            }
            if !self.scratch_batch.fits_quad() {
                self.flush_scratch()?;
            }
            return self
                .scratch_batch
                .try_append_quad(&positions, &uvs)
                .map_err(|_| RenderError::BatchOverflow);
        }

        if !self.main_batch.fits_quad() {
            self.flush_main()?;
        }
        self.segments
            .transition(&source, texture, self.main_batch.vertex_count());
        self.main_batch
            .try_append_quad(&positions, &uvs)
            .map_err(|_| RenderError::BatchOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{main_draws, renderer, renderer_with, with_sheet};
    use crate::config::RendererConfig;
    use crate::coords::Rect;
    use crate::error::RenderError;
    use crate::sprite::BitmapFont;

    // ── offsets ───────────────────────────────────────────────────────────

    #[test]
    fn draws_apply_offset_at_call_time() {
        let mut r = renderer();
        with_sheet(&mut r);
        r.render(|r| {
            r.start_group(10.0, 20.0);
            r.draw_sprite("dot", 1.0, 1.0)?;
            r.start_group(5.0, 5.0);
            r.draw_sprite("dot", 0.0, 0.0)?;
            r.end_group()?;
            r.end_group()?;
            r.draw_sprite("dot", 0.0, 0.0)
        })
        .unwrap();

        let draw = &main_draws(&r)[0];
        assert_eq!(&draw.positions[0..2], &[11.0, 21.0]);
        assert_eq!(&draw.positions[12..14], &[15.0, 25.0]);
        assert_eq!(&draw.positions[24..26], &[0.0, 0.0]);
    }

    #[test]
    fn unbalanced_end_group_fails() {
        let mut r = renderer();
        assert!(matches!(r.end_group(), Err(RenderError::NoGroupToEnd)));
        r.start_group(1.0, 2.0);
        r.end_group().unwrap();
        assert!(matches!(r.end_group(), Err(RenderError::NoGroupToEnd)));
        assert_eq!(r.offset(), crate::coords::Vec2::zero());
    }

    // ── primitives ────────────────────────────────────────────────────────

    #[test]
    fn sprite_uses_frame_uvs() {
        let mut r = renderer();
        with_sheet(&mut r);
        r.render(|r| r.draw_sprite("dot", 0.0, 0.0)).unwrap();

        let draw = &main_draws(&r)[0];
        assert_eq!(draw.texture, r.sheet().texture());
        // frame (0,0,2,2) on a 4x4 sheet
        assert_eq!(&draw.uvs[..6], &[0.0, 0.0, 0.5, 0.0, 0.0, 0.5]);
        assert_eq!(&draw.positions[..6], &[0.0, 0.0, 2.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn scaled_sprite_stretches_destination() {
        let mut r = renderer();
        with_sheet(&mut r);
        r.render(|r| r.draw_sprite_scaled("dot", 4.0, 4.0, 10.0, 20.0)).unwrap();
        let draw = &main_draws(&r)[0];
        assert_eq!(&draw.positions[10..12], &[14.0, 24.0]);
    }

    #[test]
    fn unknown_frame_is_reported() {
        let mut r = renderer();
        let err = r.render(|r| r.draw_sprite("ghost", 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, RenderError::UnknownFrame(name) if name == "ghost"));
    }

    #[test]
    fn lines_work_without_a_loaded_sheet() {
        let mut r = renderer();
        r.render(|r| r.draw_line(0.0, 0.0, 10.0, 0.0, 2.0)).unwrap();
        let draw = &main_draws(&r)[0];
        assert_eq!(draw.vertices, 0..6);
        assert!(draw.uvs.iter().all(|uv| *uv == 0.5));
    }

    #[test]
    fn text_draws_one_quad_per_glyph() {
        let mut r = renderer();
        r.load_sprite_sheet(64, 64, &[255; 64 * 64 * 4]).unwrap();
        let font = BitmapFont::grid((0.0, 0.0), (8.0, 8.0), 8, 'A', 26);
        r.render(|r| r.draw_text(&font, "AB C\nD", 0.0, 0.0)).unwrap();

        let draw = &main_draws(&r)[0];
        assert_eq!(draw.vertices, 0..24);
        // `D` starts a new line
        assert_eq!(&draw.positions[18 * 2..18 * 2 + 2], &[0.0, 8.0]);
    }

    #[test]
    fn region_draw_uses_explicit_texels() {
        let mut r = renderer();
        with_sheet(&mut r);
        r.render(|r| r.draw_region(Rect::new(2.0, 2.0, 2.0, 2.0), Rect::new(0.0, 0.0, 8.0, 8.0)))
            .unwrap();
        assert_eq!(&main_draws(&r)[0].uvs[..2], &[0.5, 0.5]);
    }

    // ── batching ──────────────────────────────────────────────────────────

    #[test]
    fn full_batch_flushes_before_append() {
        let mut r = renderer_with(RendererConfig {
            batch_capacity_quads: 2,
            ..Default::default()
        });
        with_sheet(&mut r);
        r.render(|r| {
            for i in 0..5 {
                r.draw_sprite("dot", i as f32, 0.0)?;
            }
            Ok(())
        })
        .unwrap();

        let draws = main_draws(&r);
        let counts: Vec<_> = draws.iter().map(|d| d.vertices.clone()).collect();
        assert_eq!(counts, vec![0..12, 0..12, 0..6]);
        // submission order survives the intermediate flushes
        let xs: Vec<f32> = draws
            .iter()
            .flat_map(|d| d.positions.chunks(12).map(|q| q[0]).collect::<Vec<_>>())
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let total: u32 = r.frame_segments().iter().map(|s| s.vertex_count()).sum();
        assert_eq!(total, 30);
    }
}
