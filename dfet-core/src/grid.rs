//! Component A (part 1): uniform wave-vector, Matsubara, and real-frequency grids.

use crate::error::{Error, Result};

/// Where the first wave-vector sample sits.
///
/// spec.md §9 leaves this as an open question: some of the original source's integration paths
/// are cell-centred (`x_0 = dx/2`), others are node-centred (`x_0 = 0`). Both are implemented;
/// see `SPEC_FULL.md` §4.A for the chosen default and rationale.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum GridOrigin {
    /// `x_i = i * dx`, `x_0 = 0`.
    NodeCentered,
    /// `x_i = (i + 1/2) * dx`.
    CellCentered,
}

impl Default for GridOrigin {
    fn default() -> Self {
        Self::NodeCentered
    }
}

/// Configuration for the wave-vector grid `X` and, for dynamic runs, the real-frequency grid `W`.
#[derive(Clone, Copy, Debug)]
pub struct GridConfig {
    /// Wave-vector resolution `dx`.
    pub dx: f64,
    /// Wave-vector cutoff `x_max`.
    pub x_max: f64,
    /// Matsubara truncation `n_l`.
    pub n_l: usize,
    /// Real-frequency resolution `dW`, used only in dynamic mode.
    pub dw: f64,
    /// Real-frequency cutoff `W_max`, used only in dynamic mode.
    pub w_max: f64,
    /// Grid origin convention.
    pub origin: GridOrigin,
}

impl GridConfig {
    /// Validates grid resolution/cutoff constraints common to every run.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if any cutoff is not strictly larger than its resolution, or if
    /// a resolution is not strictly positive.
    pub fn validate(&self) -> Result<()> {
        if self.dx <= 0.0 {
            return Err(Error::Config("dx must be positive".into()));
        }
        if self.x_max <= self.dx {
            return Err(Error::Config(
                "xmax must be larger than the wave-vector resolution dx".into(),
            ));
        }
        if self.n_l == 0 {
            return Err(Error::Config("nl must be at least 1".into()));
        }
        Ok(())
    }

    /// Validates the additional constraints required for dynamic-mode grids.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `dw`/`w_max` violate the same shape as `dx`/`x_max`.
    pub fn validate_dynamic(&self) -> Result<()> {
        self.validate()?;
        if self.dw <= 0.0 {
            return Err(Error::Config("dyn-dw must be positive".into()));
        }
        if self.w_max <= self.dw {
            return Err(Error::Config(
                "dyn-wmax must be larger than the frequency resolution dyn-dw".into(),
            ));
        }
        Ok(())
    }
}

/// The uniform wave-vector grid `X`, built once at init and read-only afterwards.
#[derive(Clone, Debug)]
pub struct WaveVectorGrid {
    x: Vec<f64>,
    dx: f64,
    x_max: f64,
    origin: GridOrigin,
}

impl WaveVectorGrid {
    /// Builds `X` from a [`GridConfig`], with `n = floor(x_max / dx)` samples.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the grid configuration is invalid.
    pub fn build(cfg: &GridConfig) -> Result<Self> {
        cfg.validate()?;
        let n = (cfg.x_max / cfg.dx).floor() as usize;
        let n = n.max(1);
        let x = match cfg.origin {
            GridOrigin::NodeCentered => (0..n).map(|i| i as f64 * cfg.dx).collect(),
            GridOrigin::CellCentered => (0..n).map(|i| (i as f64 + 0.5) * cfg.dx).collect(),
        };
        Ok(Self {
            x,
            dx: cfg.dx,
            x_max: cfg.x_max,
            origin: cfg.origin,
        })
    }

    /// The wave-vector samples.
    #[must_use]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Number of wave-vector samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the grid has no samples (never true for a grid built via [`Self::build`]).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Wave-vector resolution used to build this grid.
    #[must_use]
    pub const fn dx(&self) -> f64 {
        self.dx
    }

    /// Wave-vector cutoff used to build this grid.
    #[must_use]
    pub const fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Grid origin convention used to build this grid.
    #[must_use]
    pub const fn origin(&self) -> GridOrigin {
        self.origin
    }
}

/// The uniform real-frequency grid `W`, with `W_0 = 0` always.
#[derive(Clone, Debug)]
pub struct FrequencyGrid {
    w: Vec<f64>,
    dw: f64,
    w_max: f64,
}

impl FrequencyGrid {
    /// Builds `W` from a [`GridConfig`]; `W_0 = 0` by construction.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the dynamic-grid configuration is invalid.
    pub fn build(cfg: &GridConfig) -> Result<Self> {
        cfg.validate_dynamic()?;
        let n = (cfg.w_max / cfg.dw).floor() as usize;
        let n = n.max(1);
        let w = (0..n).map(|j| j as f64 * cfg.dw).collect();
        Ok(Self {
            w,
            dw: cfg.dw,
            w_max: cfg.w_max,
        })
    }

    /// The real-frequency samples; `w()[0] == 0.0`.
    #[must_use]
    pub fn w(&self) -> &[f64] {
        &self.w
    }

    /// Number of real-frequency samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.w.len()
    }

    /// Whether the grid has no samples (never true for a grid built via [`Self::build`]).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    /// Frequency resolution used to build this grid.
    #[must_use]
    pub const fn dw(&self) -> f64 {
        self.dw
    }

    /// Frequency cutoff used to build this grid.
    #[must_use]
    pub const fn w_max(&self) -> f64 {
        self.w_max
    }
}

/// The Matsubara index grid `L = {0, 1, ..., n_l - 1}`.
#[must_use]
pub fn matsubara_indices(n_l: usize) -> Vec<usize> {
    (0..n_l).collect()
}

/// `omega_l = 2 * pi * l * Theta`, the l-th Matsubara frequency.
#[must_use]
pub fn matsubara_frequency(l: usize, theta: f64) -> f64 {
    2.0 * std::f64::consts::PI * l as f64 * theta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> GridConfig {
        GridConfig {
            dx: 0.1,
            x_max: 20.0,
            n_l: 128,
            dw: 0.1,
            w_max: 20.0,
            origin: GridOrigin::NodeCentered,
        }
    }

    #[test]
    fn node_centered_starts_at_zero() {
        let grid = WaveVectorGrid::build(&cfg()).unwrap();
        assert_eq!(grid.x()[0], 0.0);
    }

    #[test]
    fn cell_centered_starts_at_half_dx() {
        let mut c = cfg();
        c.origin = GridOrigin::CellCentered;
        let grid = WaveVectorGrid::build(&c).unwrap();
        assert!((grid.x()[0] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn frequency_grid_starts_at_zero() {
        let grid = FrequencyGrid::build(&cfg()).unwrap();
        assert_eq!(grid.w()[0], 0.0);
    }

    #[test]
    fn rejects_non_positive_resolution() {
        let mut c = cfg();
        c.dx = 0.0;
        assert!(WaveVectorGrid::build(&c).is_err());
    }

    #[test]
    fn rejects_cutoff_not_larger_than_resolution() {
        let mut c = cfg();
        c.x_max = c.dx;
        assert!(WaveVectorGrid::build(&c).is_err());
    }

    #[test]
    fn matsubara_frequency_formula() {
        let theta = 1.0;
        assert_eq!(matsubara_frequency(0, theta), 0.0);
        assert!((matsubara_frequency(1, theta) - 2.0 * std::f64::consts::PI).abs() < 1e-12);
    }
}
