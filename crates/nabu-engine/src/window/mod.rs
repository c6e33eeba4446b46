//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to the GPU layer.

mod commands;
mod runtime;

pub use commands::RuntimeCtx;
pub use runtime::{RedrawMode, Runtime, RuntimeConfig};
