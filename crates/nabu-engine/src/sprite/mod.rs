//! The shared sprite-sheet texture and the glyph layout drawn from it.

mod font;
mod sheet;

pub use font::BitmapFont;
pub use sheet::SpriteSheet;
