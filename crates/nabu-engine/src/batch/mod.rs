//! CPU-side geometry batching.
//!
//! Quads are stored as two triangles in two parallel flat streams
//! (positions, uvs), two floats per vertex. A batch never grows past its
//! capacity on its own: the owner checks [`GeometryBatch::fits_quad`] and
//! flushes before appending.

mod geometry;
mod quad;

pub use geometry::{BatchFull, GeometryBatch};
pub use quad::{line_quad, quad_positions, quad_uvs, FLOATS_PER_QUAD, FLOATS_PER_VERTEX, VERTICES_PER_QUAD};
