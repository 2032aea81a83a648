//! Error kinds shared by every module in this crate.

use thiserror::Error;

/// Catch-all error for the dielectric-theory solver.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value violates a documented constraint.
    #[error("configuration error: {0}")]
    Config(String),
    /// Opening, reading, writing, or closing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A cache file's header or trailing-EOF probe did not match the current run.
    #[error("cache mismatch: {0}")]
    CacheMismatch(String),
    /// A quadrature returned a non-finite value, or a root-find failed to bracket, or a
    /// Picard loop could not be trusted to produce a usable result.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps this error to the process exit code documented for the CLI front-end.
    ///
    /// 1 = configuration/validation error, 2 = I/O or cache mismatch, 3 = numerical failure.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 1,
            Self::Io(_) | Self::CacheMismatch(_) => 2,
            Self::NumericalFailure(_) => 3,
        }
    }
}
