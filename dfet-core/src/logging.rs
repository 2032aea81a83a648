//! Per-run logging configuration.
//!
//! The original source keeps a single mutable `verbose` flag read across translation units.
//! Here it is an explicit value handed to every solver entry point instead, so nothing in this
//! crate depends on process-wide mutable state.

/// Controls how much a solver run reports through `tracing`.
#[derive(Clone, Copy, Debug)]
pub struct LoggingConfig {
    /// Emit an `info`-level span per Picard iteration instead of only at start/end.
    pub verbose: bool,
    /// Emit a progress event every `iter_log_every` iterations when `verbose` is set.
    pub iter_log_every: usize,
}

impl LoggingConfig {
    /// A quiet configuration: only start/end and warnings are logged.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            verbose: false,
            iter_log_every: 0,
        }
    }

    /// A verbose configuration logging every iteration.
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            verbose: true,
            iter_log_every: 1,
        }
    }

    /// Returns true if iteration `iter` should be logged under this configuration.
    #[must_use]
    pub const fn should_log_iter(&self, iter: usize) -> bool {
        self.verbose && self.iter_log_every > 0 && iter % self.iter_log_every == 0
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::quiet()
    }
}
