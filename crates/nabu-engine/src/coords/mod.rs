//! Coordinate and geometry types shared by the batcher, the cache layer and
//! the presentation pass.
//!
//! Canonical CPU space:
//! - Target pixels (the pixel grid of whichever render target is bound)
//! - Origin top-left
//! - +X right, +Y down
//!
//! The sprite shader converts to NDC using the resolution uniform.

mod color;
mod rect;
mod vec2;

pub use color::Color;
pub use rect::Rect;
pub use vec2::Vec2;
