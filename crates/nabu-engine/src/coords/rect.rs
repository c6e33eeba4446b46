use super::Vec2;

/// Axis-aligned rectangle in pixels (top-left origin).
///
/// Used both for destination quads (target pixels) and for source regions
/// inside the sprite sheet (texels).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        Vec2::new(self.origin.x + self.size.x, self.origin.y + self.size.y)
    }

    /// Returns the rectangle moved by `offset`.
    #[inline]
    pub fn translated(self, offset: Vec2) -> Self {
        Self {
            origin: self.origin + offset,
            size: self.size,
        }
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let mut x = self.origin.x;
        let mut y = self.origin.y;
        let mut w = self.size.x;
        let mut h = self.size.y;

        if w < 0.0 {
            x += w;
            w = -w;
        }
        if h < 0.0 {
            y += h;
            h = -h;
        }

        Rect::new(x, y, w, h)
    }

    /// Returns `true` when the normalized rectangle lies inside `[0, w] x [0, h]`.
    #[inline]
    pub fn fits_within(self, width: f32, height: f32) -> bool {
        let r = self.normalized();
        r.origin.x >= 0.0
            && r.origin.y >= 0.0
            && r.origin.x + r.size.x <= width
            && r.origin.y + r.size.y <= height
    }

    /// Maps a texel region to normalized `[u0, v0, u1, v1]` coordinates of a
    /// `width x height` texture.
    ///
    /// Degenerate texture sizes are clamped to one texel.
    #[inline]
    pub fn to_uv(self, width: f32, height: f32) -> [f32; 4] {
        let w = width.max(1.0);
        let h = height.max(1.0);
        let max = self.max();
        [self.origin.x / w, self.origin.y / h, max.x / w, max.y / h]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    // ── normalized ────────────────────────────────────────────────────────

    #[test]
    fn normalized_positive_is_identity() {
        let rect = r(1.0, 2.0, 10.0, 20.0);
        assert_eq!(rect.normalized(), rect);
    }

    #[test]
    fn normalized_negative_extent() {
        let n = r(10.0, 10.0, -4.0, -3.0).normalized();
        assert_eq!(n, r(6.0, 7.0, 4.0, 3.0));
    }

    // ── uv mapping ────────────────────────────────────────────────────────

    #[test]
    fn to_uv_maps_texels_to_unit_square() {
        assert_eq!(r(0.0, 0.0, 64.0, 32.0).to_uv(64.0, 32.0), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(r(16.0, 8.0, 16.0, 8.0).to_uv(64.0, 32.0), [0.25, 0.25, 0.5, 0.5]);
    }

    #[test]
    fn to_uv_clamps_zero_sized_texture() {
        let uv = r(0.0, 0.0, 1.0, 1.0).to_uv(0.0, 0.0);
        assert!(uv.iter().all(|v| v.is_finite()));
    }

    // ── bounds ────────────────────────────────────────────────────────────

    #[test]
    fn fits_within_edges_inclusive() {
        assert!(r(0.0, 0.0, 8.0, 8.0).fits_within(8.0, 8.0));
        assert!(!r(1.0, 0.0, 8.0, 8.0).fits_within(8.0, 8.0));
        assert!(!r(-1.0, 0.0, 2.0, 2.0).fits_within(8.0, 8.0));
    }

    #[test]
    fn translated_moves_origin_only() {
        let t = r(1.0, 2.0, 3.0, 4.0).translated(Vec2::new(10.0, 20.0));
        assert_eq!(t, r(11.0, 22.0, 3.0, 4.0));
    }
}
