//! GPU device + surface management.
//!
//! Creates the wgpu device/queue per window, configures the surface, and
//! acquires surface textures for the presentation pass.

mod gpu;
mod surface;

pub use gpu::{Gpu, GpuInit, SurfaceErrorAction, SurfaceFrame};
pub use surface::{choose_alpha_mode, choose_surface_format, SurfaceEncoding};
