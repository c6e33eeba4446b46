//! Nabu engine crate.
//!
//! A batched 2D sprite renderer with a render-target cache layer. Draw calls
//! accumulate into one geometry batch split into texture segments; groups of
//! draws can be captured once into an offscreen target and replayed as a
//! single textured quad on later frames. Every frame ends with a presentation
//! pass that runs an optional chain of fullscreen effects.
//!
//! The [`renderer::Renderer`] is generic over [`backend::GpuBackend`];
//! [`backend::WgpuBackend`] drives a real device and the `window`/`device`
//! layers host it in a winit event loop.

pub mod backend;
pub mod batch;
pub mod cache;
pub mod config;
pub mod coords;
pub mod core;
pub mod device;
pub mod error;
pub mod logging;
pub mod present;
pub mod renderer;
pub mod segment;
pub mod shader;
pub mod sprite;
pub mod target;
pub mod transform;
pub mod window;

pub use cache::{CacheId, CacheStats};
pub use config::RendererConfig;
pub use coords::{Color, Rect, Vec2};
pub use error::RenderError;
pub use present::EffectDesc;
pub use renderer::Renderer;
pub use sprite::BitmapFont;
