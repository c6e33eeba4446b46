use crate::coords::Color;

/// Renderer configuration.
///
/// Keep this structure small. Every field has a working default; hosts
/// normally override only `clear_color` and `max_cache_entries`.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Upper bound on live cache entries. Clamped to at least one.
    pub max_cache_entries: usize,

    /// Quads the main and scratch batches hold before an automatic flush.
    pub batch_capacity_quads: usize,

    /// Color the main target is cleared to at the start of every frame.
    pub clear_color: Color,

    /// Wait for GPU completion after every flush and trace its duration.
    ///
    /// Trades throughput for timing accuracy; leave off outside profiling.
    pub measure_performance: bool,

    /// Report and skip effects whose shader fails instead of failing
    /// `add_effect`.
    pub skip_failed_effects: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 32,
            batch_capacity_quads: 2048,
            clear_color: Color::black(),
            measure_performance: false,
            skip_failed_effects: true,
        }
    }
}
