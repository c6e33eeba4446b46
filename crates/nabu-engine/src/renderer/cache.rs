//! Cache groups: capture into per-id render targets, playback, eviction.

use super::{ActiveCapture, Renderer};
use crate::backend::{GpuBackend, TextureHandle};
use crate::batch::{quad_positions, quad_uvs};
use crate::cache::{CacheId, CacheStats};
use crate::coords::Rect;
use crate::error::RenderError;
use crate::segment::TextureSource;
use crate::target::RenderTarget;

impl<B: GpuBackend> Renderer<B> {
    /// Draws the content cached under `id`, capturing it first if needed.
    ///
    /// If `id` is cached, one quad sampling its target is drawn at the
    /// current offset, `draw` is not called, and `false` is returned.
    /// Otherwise a `width x height` target is allocated, `draw` runs with
    /// its output redirected into it (in the target's local space, the
    /// current offset temporarily zeroed) and `true` is returned. The new
    /// entry is not drawn to the frame by this call: on `true` the caller
    /// draws it with [`draw_cached_content`](Self::draw_cached_content),
    /// otherwise the capturing frame shows nothing in its place.
    ///
    /// If `draw` fails, the partial entry is removed, every piece of
    /// capture state is restored and the error propagates.
    pub fn cache_group<F>(
        &mut self,
        id: impl Into<CacheId>,
        width: u32,
        height: u32,
        draw: F,
    ) -> Result<bool, RenderError>
    where
        F: FnOnce(&mut Self) -> Result<(), RenderError>,
    {
        let id = id.into();
        if !self.in_frame {
            return Err(RenderError::OutsideFrame);
        }

        if let Some(active) = &self.capture {
            if self.cache.contains(id.as_str()) {
                return Err(RenderError::CacheRefInCapture(id));
            }
            return Err(RenderError::NestedCapture {
                requested: id,
                active: active.id.clone(),
            });
        }

        if let Some(entry) = self.cache.peek(id.as_str()) {
            let (cached_width, cached_height) = (entry.width(), entry.height());
            if (cached_width, cached_height) != (width, height) {
                return Err(RenderError::CacheSizeMismatch {
                    id,
                    cached_width,
                    cached_height,
                    width,
                    height,
                });
            }
            let texture = entry.texture();
            self.cache.touch(id.as_str());
            let origin = self.offsets.offset();
            self.play(id, texture, Rect::new(origin.x, origin.y, width as f32, height as f32))?;
            return Ok(false);
        }

        let target = RenderTarget::create(&mut self.backend, width, height)?;
        let binding = target.binding();
        log::debug!("cache: capturing `{id}` ({width}x{height})");
        for (evicted, target) in self.cache.insert(id.clone(), target) {
            log::debug!("cache: evicted `{evicted}`");
            self.retire(target);
        }

        let saved_offset = self.offsets.take_offset();
        let previous = self.bound;
        self.scratch_batch.reset();
        self.capture = Some(ActiveCapture {
            id: id.clone(),
            binding,
        });
        self.bind(binding);
        self.backend.clear([0.0; 4]);

        let result = draw(self).and_then(|()| self.flush_scratch());

        self.scratch_batch.reset();
        self.capture = None;
        self.bind(previous);
        self.offsets.restore_offset(saved_offset);

        if let Err(e) = result {
            if let Some(target) = self.cache.remove(id.as_str()) {
                target.destroy(&mut self.backend);
            }
            log::debug!("cache: capture of `{id}` failed, entry dropped");
            return Err(e);
        }
        Ok(true)
    }

    /// Draws the content cached under `id` with its top-left corner at
    /// `(x, y)` plus the current offset. Returns `false` if nothing is
    /// cached under `id`. Counts as an access for eviction order.
    pub fn draw_cached_content(&mut self, id: &str, x: f32, y: f32) -> Result<bool, RenderError> {
        if !self.in_frame {
            return Err(RenderError::OutsideFrame);
        }
        if self.capture.is_some() && self.cache.contains(id) {
            return Err(RenderError::CacheRefInCapture(CacheId::from(id)));
        }

        let Some(entry) = self.cache.touch(id) else {
            return Ok(false);
        };
        let texture = entry.texture();
        let (w, h) = (entry.width() as f32, entry.height() as f32);
        let origin = self.offsets.offset();
        self.play(CacheId::from(id), texture, Rect::new(x + origin.x, y + origin.y, w, h))?;
        Ok(true)
    }

    /// Whether `id` is cached. Does not count as an access.
    pub fn has_cached_content(&self, id: &str) -> bool {
        self.cache.contains(id)
    }

    /// Drops the entry under `id`. Returns whether one existed.
    pub fn clear_cache(&mut self, id: &str) -> Result<bool, RenderError> {
        if let Some(active) = &self.capture
            && active.id.as_str() == id
        {
            return Err(RenderError::CaptureInProgress(active.id.clone()));
        }
        match self.cache.remove(id) {
            Some(target) => {
                log::debug!("cache: cleared `{id}`");
                self.retire(target);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops every entry.
    pub fn clear_all_cache(&mut self) -> Result<(), RenderError> {
        if let Some(active) = &self.capture {
            return Err(RenderError::CaptureInProgress(active.id.clone()));
        }
        let entries = self.cache.drain();
        log::debug!("cache: cleared {} entries", entries.len());
        for (_, target) in entries {
            self.retire(target);
        }
        Ok(())
    }

    /// Updates the capacity (clamped to at least one) and evicts the
    /// oldest entries beyond it.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        for (evicted, target) in self.cache.set_max_entries(max_entries) {
            log::debug!("cache: evicted `{evicted}` (capacity {})", self.cache.max_entries());
            self.retire(target);
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Identifier being captured, if any.
    pub fn capturing(&self) -> Option<&CacheId> {
        self.capture.as_ref().map(|c| &c.id)
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// Appends one quad sampling a cached target, V-flipped when the backend
    /// stores render targets bottom-up.
    fn play(&mut self, id: CacheId, texture: TextureHandle, dst: Rect) -> Result<(), RenderError> {
        let uv = if self.backend.flips_render_targets() {
            [0.0, 1.0, 1.0, 0.0]
        } else {
            [0.0, 0.0, 1.0, 1.0]
        };
        self.push_quad(TextureSource::Cache(id), texture, quad_positions(dst), quad_uvs(uv))
    }

    /// Destroys a dropped entry's target, or defers it until the next main
    /// flush if pending segments still sample it.
    fn retire(&mut self, target: RenderTarget) {
        if self.segments.references(target.texture()) {
            self.retired.push(target);
        } else {
            target.destroy(&mut self.backend);
        }
    }
}
