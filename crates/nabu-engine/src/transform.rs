//! Nested additive coordinate offset.

use crate::coords::Vec2;
use crate::error::RenderError;

/// Offset applied to every draw at call time.
///
/// `push`/`pop` adjust the scalar offset by the pushed delta. Capture saves
/// and zeroes the scalar offset only ([`OffsetStack::take_offset`]); the
/// pushed entries stay untouched and must be balanced by the caller.
#[derive(Debug, Default)]
pub struct OffsetStack {
    offset: Vec2,
    pushed: Vec<Vec2>,
}

impl OffsetStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.pushed.len()
    }

    pub fn push(&mut self, dx: f32, dy: f32) {
        let delta = Vec2::new(dx, dy);
        self.offset += delta;
        self.pushed.push(delta);
    }

    pub fn pop(&mut self) -> Result<(), RenderError> {
        let delta = self.pushed.pop().ok_or(RenderError::NoGroupToEnd)?;
        self.offset -= delta;
        Ok(())
    }

    /// Returns the current scalar offset and resets it to zero.
    #[inline]
    pub fn take_offset(&mut self) -> Vec2 {
        std::mem::take(&mut self.offset)
    }

    /// Restores a scalar offset saved by [`take_offset`](Self::take_offset).
    #[inline]
    pub fn restore_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// Drops all pushed entries and zeroes the offset.
    pub fn reset(&mut self) {
        self.offset = Vec2::zero();
        self.pushed.clear();
    }
}
