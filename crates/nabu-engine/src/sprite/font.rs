use crate::coords::Rect;

/// Monospace glyph grid stored inside the sprite sheet.
///
/// Glyph `i` (counting from `first_char`) occupies cell
/// `(i % columns, i / columns)` of the grid whose top-left texel is `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapFont {
    pub origin: (f32, f32),
    pub cell: (f32, f32),
    pub columns: u32,
    pub first_char: char,
    pub glyph_count: u32,
    /// Horizontal pen advance per character, in target pixels.
    pub advance: f32,
    pub line_height: f32,
}

impl BitmapFont {
    /// A grid whose glyphs are drawn at cell size.
    pub fn grid(origin: (f32, f32), cell: (f32, f32), columns: u32, first_char: char, glyph_count: u32) -> Self {
        Self {
            origin,
            cell,
            columns: columns.max(1),
            first_char,
            glyph_count,
            advance: cell.0,
            line_height: cell.1,
        }
    }

    /// Texel region of `ch`, or `None` if the font has no glyph for it.
    pub fn glyph(&self, ch: char) -> Option<Rect> {
        let index = (ch as u32).checked_sub(self.first_char as u32)?;
        if index >= self.glyph_count {
            return None;
        }
        let columns = self.columns.max(1);
        let col = (index % columns) as f32;
        let row = (index / columns) as f32;
        Some(Rect::new(
            self.origin.0 + col * self.cell.0,
            self.origin.1 + row * self.cell.1,
            self.cell.0,
            self.cell.1,
        ))
    }

    /// Lays out `text` starting at `(x, y)`, yielding destination and source
    /// rectangles for every drawable glyph.
    ///
    /// `\n` returns the pen to `x` one line down; characters without a glyph
    /// (including spaces) only advance the pen.
    pub fn layout<'a>(&'a self, text: &'a str, x: f32, y: f32) -> impl Iterator<Item = (Rect, Rect)> + 'a {
        let mut pen = (x, y);
        text.chars().filter_map(move |ch| {
            if ch == '\n' {
                pen = (x, pen.1 + self.line_height);
                return None;
            }
            let at = pen;
            pen.0 += self.advance;
            self.glyph(ch)
                .map(|src| (Rect::new(at.0, at.1, self.cell.0, self.cell.1), src))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> BitmapFont {
        // 16 columns of 8x8 glyphs starting at '!' below a 32px header.
        BitmapFont::grid((0.0, 32.0), (8.0, 8.0), 16, '!', 94)
    }

    #[test]
    fn glyph_wraps_rows() {
        let f = font();
        assert_eq!(f.glyph('!'), Some(Rect::new(0.0, 32.0, 8.0, 8.0)));
        // '1' is index 16 -> second row, first column
        assert_eq!(f.glyph('1'), Some(Rect::new(0.0, 40.0, 8.0, 8.0)));
        assert_eq!(f.glyph(' '), None);
        assert_eq!(f.glyph('\u{7f}'), None);
    }

    #[test]
    fn layout_advances_over_missing_glyphs() {
        let f = font();
        let quads: Vec<_> = f.layout("A B", 10.0, 20.0).collect();
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].0.origin.x, 10.0);
        assert_eq!(quads[1].0.origin.x, 26.0);
    }

    #[test]
    fn newline_resets_pen() {
        let f = font();
        let quads: Vec<_> = f.layout("AB\nC", 0.0, 0.0).collect();
        assert_eq!(quads[2].0.origin.x, 0.0);
        assert_eq!(quads[2].0.origin.y, 8.0);
    }
}
