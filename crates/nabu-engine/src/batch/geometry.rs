use super::quad::{FLOATS_PER_QUAD, FLOATS_PER_VERTEX};

/// Returned when an append would exceed the batch capacity.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BatchFull;

/// Growable CPU buffers of vertex positions and texture coordinates.
///
/// Invariant: `used <= capacity` at every observable point. Storage is
/// allocated once per capacity and reused across flushes.
#[derive(Debug)]
pub struct GeometryBatch {
    positions: Vec<f32>,
    uvs: Vec<f32>,
    used: usize,
}

impl GeometryBatch {
    /// Creates a batch with room for `quads` quads.
    pub fn with_quad_capacity(quads: usize) -> Self {
        let capacity = quads.max(1) * FLOATS_PER_QUAD;
        Self {
            positions: vec![0.0; capacity],
            uvs: vec![0.0; capacity],
            used: 0,
        }
    }

    /// Capacity in floats per stream.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    /// Write cursor in floats.
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        (self.used / FLOATS_PER_VERTEX) as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Whether one more quad fits without a flush.
    #[inline]
    pub fn fits_quad(&self) -> bool {
        self.used + FLOATS_PER_QUAD <= self.capacity()
    }

    /// Appends one quad, or reports [`BatchFull`] without touching the batch.
    pub fn try_append_quad(
        &mut self,
        positions: &[f32; FLOATS_PER_QUAD],
        uvs: &[f32; FLOATS_PER_QUAD],
    ) -> Result<(), BatchFull> {
        if !self.fits_quad() {
            return Err(BatchFull);
        }
        let range = self.used..self.used + FLOATS_PER_QUAD;
        self.positions[range.clone()].copy_from_slice(positions);
        self.uvs[range].copy_from_slice(uvs);
        self.used += FLOATS_PER_QUAD;
        Ok(())
    }

    /// Filled part of the position stream.
    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions[..self.used]
    }

    /// Filled part of the uv stream.
    #[inline]
    pub fn uvs(&self) -> &[f32] {
        &self.uvs[..self.used]
    }

    /// Rewinds the cursor; storage is kept.
    #[inline]
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Reallocates for `quads` quads. Unflushed content is discarded, so
    /// callers flush first when growing mid-frame.
    pub fn grow(&mut self, quads: usize) {
        if self.used > 0 {
            log::debug!("GeometryBatch::grow discards {} unflushed vertices", self.vertex_count());
        }
        *self = Self::with_quad_capacity(quads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(v: f32) -> [f32; FLOATS_PER_QUAD] {
        [v; FLOATS_PER_QUAD]
    }

    #[test]
    fn append_advances_cursor_by_one_quad() {
        let mut b = GeometryBatch::with_quad_capacity(4);
        b.try_append_quad(&quad(1.0), &quad(0.5)).unwrap();
        assert_eq!(b.used(), FLOATS_PER_QUAD);
        assert_eq!(b.vertex_count(), 6);
        assert_eq!(b.positions(), &quad(1.0));
        assert_eq!(b.uvs(), &quad(0.5));
    }

    #[test]
    fn used_never_exceeds_capacity() {
        let mut b = GeometryBatch::with_quad_capacity(3);
        let mut rejected = 0;
        for i in 0..10 {
            if b.try_append_quad(&quad(i as f32), &quad(0.0)).is_err() {
                rejected += 1;
                assert!(!b.fits_quad());
            }
            assert!(b.used() <= b.capacity());
        }
        assert_eq!(rejected, 7);
        assert_eq!(b.vertex_count(), 18);
    }

    #[test]
    fn reset_keeps_storage() {
        let mut b = GeometryBatch::with_quad_capacity(2);
        b.try_append_quad(&quad(1.0), &quad(1.0)).unwrap();
        let cap = b.capacity();
        b.reset();
        assert!(b.is_empty());
        assert_eq!(b.capacity(), cap);
        assert!(b.positions().is_empty());
    }

    #[test]
    fn grow_discards_unflushed_content() {
        let mut b = GeometryBatch::with_quad_capacity(1);
        b.try_append_quad(&quad(1.0), &quad(1.0)).unwrap();
        b.grow(8);
        assert!(b.is_empty());
        assert_eq!(b.capacity(), 8 * FLOATS_PER_QUAD);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one_quad() {
        let b = GeometryBatch::with_quad_capacity(0);
        assert!(b.fits_quad());
    }
}
