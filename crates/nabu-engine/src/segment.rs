//! Draw-order segmentation.
//!
//! One frame's geometry lives in a single shared batch, but a GPU draw call
//! binds exactly one texture. The segment list records every change of
//! texture source as the batch fills, so the frame can be replayed as one
//! draw call per contiguous same-source run. That is exactly
//! `transitions + 1` draw calls, in submission order.

use std::ops::Range;

use crate::backend::TextureHandle;
use crate::cache::CacheId;

/// Where a quad's texels come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureSource {
    SpriteSheet,
    Cache(CacheId),
}

/// A contiguous run of batched vertices sharing one texture source.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub source: TextureSource,
    /// Texture resolved when the segment was opened.
    pub texture: TextureHandle,
    pub start: u32,
    /// `None` while the segment is still open.
    pub end: Option<u32>,
}

impl Segment {
    /// Vertex range; an open segment is treated as empty.
    #[inline]
    pub fn vertices(&self) -> Range<u32> {
        self.start..self.end.unwrap_or(self.start)
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        let r = self.vertices();
        r.end - r.start
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Ordered, contiguous, non-overlapping segments over one batch.
#[derive(Debug, Default)]
pub struct SegmentList {
    segments: Vec<Segment>,
}

impl SegmentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the next quad, starting at vertex `cursor`, samples
    /// `source`. Opens a new segment if the source differs from the open one.
    ///
    /// Returns `true` when a new segment was opened.
    pub fn transition(&mut self, source: &TextureSource, texture: TextureHandle, cursor: u32) -> bool {
        if let Some(open) = self.segments.last()
            && open.is_open()
            && open.source == *source
            && open.texture == texture
        {
            return false;
        }

        self.close(cursor);
        self.segments.push(Segment {
            source: source.clone(),
            texture,
            start: cursor,
            end: None,
        });
        true
    }

    /// Closes the open segment at `cursor`, if any.
    pub fn close(&mut self, cursor: u32) {
        if let Some(open) = self.segments.last_mut()
            && open.is_open()
        {
            open.end = Some(cursor.max(open.start));
        }
    }

    /// Closes the open segment at `cursor` and hands over every segment,
    /// leaving the list empty for the next batch.
    pub fn take(&mut self, cursor: u32) -> Vec<Segment> {
        self.close(cursor);
        std::mem::take(&mut self.segments)
    }

    /// Whether any pending segment samples `texture`.
    pub fn references(&self, texture: TextureHandle) -> bool {
        self.segments.iter().any(|s| s.texture == texture)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }
}
