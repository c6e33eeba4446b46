//! Render-target cache bookkeeping.
//!
//! The registry here is GPU-agnostic: it maps identifiers to entries and
//! keeps LRU order. The capture/playback protocol that fills and draws the
//! entries lives on [`Renderer`](crate::Renderer).

mod id;
mod registry;

pub use id::CacheId;
pub use registry::{CacheRegistry, CacheStats};
