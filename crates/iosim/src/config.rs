//! Pump configuration.

/// Steps a single [`flush`](crate::Pump::flush) may take before it gives up.
///
/// Real protocol exchanges settle in a handful of steps. Hitting this bound
/// means the endpoints keep regenerating output for each other.
pub const DEFAULT_MAX_FLUSH_ITERATIONS: usize = 1000;

/// Pump configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpConfig {
    /// Ceiling on steps per flush.
    pub max_flush_iterations: usize,
    /// Log traffic at `debug` level instead of `trace`.
    pub debug: bool,
}

impl PumpConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self { max_flush_iterations: DEFAULT_MAX_FLUSH_ITERATIONS, debug: false }
    }

    /// Override the flush ceiling.
    pub fn with_max_flush_iterations(mut self, iterations: usize) -> Self {
        self.max_flush_iterations = iterations;
        self
    }

    /// Enable or disable traffic logging at `debug` level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self::new()
    }
}
