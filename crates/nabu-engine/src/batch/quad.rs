use crate::coords::{Rect, Vec2};

pub const FLOATS_PER_VERTEX: usize = 2;
pub const VERTICES_PER_QUAD: usize = 6;
pub const FLOATS_PER_QUAD: usize = FLOATS_PER_VERTEX * VERTICES_PER_QUAD;

/// Emits the two triangles of a quad from its four corners
/// (top-left, top-right, bottom-left, bottom-right).
#[inline]
fn triangles(tl: Vec2, tr: Vec2, bl: Vec2, br: Vec2) -> [f32; FLOATS_PER_QUAD] {
    [
        tl.x, tl.y, tr.x, tr.y, bl.x, bl.y, //
        bl.x, bl.y, tr.x, tr.y, br.x, br.y,
    ]
}

/// Positions for an axis-aligned destination rectangle.
pub fn quad_positions(dst: Rect) -> [f32; FLOATS_PER_QUAD] {
    let min = dst.min();
    let max = dst.max();
    triangles(
        Vec2::new(min.x, min.y),
        Vec2::new(max.x, min.y),
        Vec2::new(min.x, max.y),
        Vec2::new(max.x, max.y),
    )
}

/// Uvs for a `[u0, v0, u1, v1]` region, in the same corner order as
/// [`quad_positions`].
pub fn quad_uvs(uv: [f32; 4]) -> [f32; FLOATS_PER_QUAD] {
    let [u0, v0, u1, v1] = uv;
    triangles(
        Vec2::new(u0, v0),
        Vec2::new(u1, v0),
        Vec2::new(u0, v1),
        Vec2::new(u1, v1),
    )
}

/// Expands a thick line into a quad.
///
/// The quad extends `thickness / 2` to each side of the segment along the
/// perpendicular of its direction angle. A zero-length segment has no
/// direction; `atan2(0, 0)` is `0`, so the result is a finite degenerate
/// quad rather than a division by zero. Non-finite or negative thickness is
/// clamped to zero.
pub fn line_quad(from: Vec2, to: Vec2, thickness: f32) -> [f32; FLOATS_PER_QUAD] {
    let half = if thickness.is_finite() { thickness.max(0.0) * 0.5 } else { 0.0 };
    let angle = (to.y - from.y).atan2(to.x - from.x);
    let (sin, cos) = angle.sin_cos();
    let perp = Vec2::new(-sin * half, cos * half);

    triangles(from - perp, to - perp, from + perp, to + perp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn quad_positions_cover_rect() {
        let p = quad_positions(Rect::new(10.0, 20.0, 30.0, 40.0));
        let xs: Vec<f32> = p.iter().step_by(2).copied().collect();
        let ys: Vec<f32> = p.iter().skip(1).step_by(2).copied().collect();
        assert_eq!(xs.iter().copied().fold(f32::MAX, f32::min), 10.0);
        assert_eq!(xs.iter().copied().fold(f32::MIN, f32::max), 40.0);
        assert_eq!(ys.iter().copied().fold(f32::MAX, f32::min), 20.0);
        assert_eq!(ys.iter().copied().fold(f32::MIN, f32::max), 60.0);
    }

    #[test]
    fn horizontal_line_extends_vertically() {
        let q = line_quad(Vec2::new(0.0, 10.0), Vec2::new(100.0, 10.0), 4.0);
        // top-left corner
        assert!(approx(q[0], 0.0) && approx(q[1], 8.0));
        // bottom-right corner
        assert!(approx(q[10], 100.0) && approx(q[11], 12.0));
    }

    #[test]
    fn zero_length_line_is_finite() {
        let p = Vec2::new(5.0, 5.0);
        let q = line_quad(p, p, 3.0);
        assert!(q.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn bad_thickness_collapses_to_segment() {
        let q = line_quad(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), f32::NAN);
        assert!(q.iter().all(|v| v.is_finite()));
        let q = line_quad(Vec2::new(0.0, 0.0), Vec2::new(0.0, 9.0), -2.0);
        assert!(q.iter().step_by(2).all(|x| approx(*x, 0.0)));
    }
}
