//! Component 4.L: aggregate run configuration and validation.
//!
//! Each sub-config validates its own constraints; [`RunConfig::validate`] composes them and adds
//! the cross-cutting checks that only make sense once every piece is assembled (e.g. requiring a
//! dynamic config when the selected theory is a quantum one).

use crate::error::{Error, Result};
use crate::grid::GridConfig;
use crate::picard::PicardConfig;
use crate::theory::Theory;

/// Frequency-grid and target-wave-vector controls for the dynamic (qSTLS-family) schemes.
#[derive(Clone, Copy, Debug)]
pub struct DynamicConfig {
    /// The single wave-vector at which the dynamic structure factor is evaluated.
    pub x_target: f64,
    /// Whether the qSTLS-IET auxiliary response caches a partially-dynamic (state-point-only)
    /// fixed kernel, or recomputes a fully-dynamic (Omega-coupled) kernel every iteration.
    pub static_mode: QstlsIetStatic,
}

/// Resolution of the `qstls_iet_static` open question (spec.md §9): both code paths are
/// implemented, selected explicitly rather than silently falling back to one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QstlsIetStatic {
    /// Cache a single `K_fixed` per state point, reused across every Picard iteration.
    PartiallyDynamic,
    /// Recompute the auxiliary-response kernel every iteration, coupled to the current `Omega`.
    FullyDynamic,
}

impl DynamicConfig {
    /// Validates `x_target > 0`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `x_target` is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.x_target <= 0.0 {
            return Err(Error::Config("dynamic target wave-vector must be positive".into()));
        }
        Ok(())
    }
}

/// CSR outer-loop controls for the VS-STLS / qVS-STLS variational schemes.
#[derive(Clone, Copy, Debug)]
pub struct VsConfig {
    /// Initial bracket for the secant search on the CSR parameter `alpha`.
    pub alpha_lo: f64,
    /// Initial bracket for the secant search on the CSR parameter `alpha`.
    pub alpha_hi: f64,
    /// Convergence threshold on `alpha`.
    pub alpha_tol: f64,
    /// Iteration cap for the secant search.
    pub max_iter: usize,
    /// Finite-difference step in `rs` used to estimate thermodynamic derivatives.
    pub drs: f64,
}

impl VsConfig {
    /// Validates the alpha bracket is ordered, the tolerance is positive, and the iteration cap
    /// and step size are nonzero.
    ///
    /// # Errors
    /// Returns [`Error::Config`] on any violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.alpha_lo >= self.alpha_hi {
            return Err(Error::Config("alpha bracket must satisfy alpha_lo < alpha_hi".into()));
        }
        if self.alpha_tol <= 0.0 {
            return Err(Error::Config("alpha tolerance must be positive".into()));
        }
        if self.max_iter == 0 {
            return Err(Error::Config("alpha search iteration cap must be at least 1".into()));
        }
        if self.drs <= 0.0 {
            return Err(Error::Config("rs finite-difference step must be positive".into()));
        }
        Ok(())
    }
}

/// The full run configuration assembled from CLI flags.
#[derive(Clone, Copy, Debug)]
pub struct RunConfig {
    /// Which dielectric theory to solve.
    pub theory: Theory,
    /// Coupling parameter.
    pub rs: f64,
    /// Degeneracy parameter.
    pub theta: f64,
    /// Wave-vector and Matsubara-truncation grid.
    pub grid: GridConfig,
    /// Picard-loop mixing and convergence controls.
    pub picard: PicardConfig,
    /// Dynamic-scheme controls, required when `theory.is_quantum()` and a dynamic run is
    /// requested.
    pub dynamic: Option<DynamicConfig>,
    /// VS outer-loop controls, required when `theory.is_variational()`.
    pub vs: Option<VsConfig>,
}

impl RunConfig {
    /// Validates every sub-config and the cross-cutting requirements between `theory` and the
    /// optional sub-configs.
    ///
    /// # Errors
    /// Returns [`Error::Config`] on any violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.rs <= 0.0 {
            return Err(Error::Config("rs must be positive".into()));
        }
        if self.theta < 0.0 {
            return Err(Error::Config("Theta must be non-negative".into()));
        }
        self.grid.validate()?;
        self.picard.validate()?;

        if self.theory.is_variational() {
            self.vs
                .ok_or_else(|| Error::Config(format!("{} requires VS outer-loop configuration", self.theory)))?
                .validate()?;
        }
        if let Some(dynamic) = self.dynamic {
            self.grid.validate_dynamic()?;
            dynamic.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridOrigin;

    fn base_grid() -> GridConfig {
        GridConfig {
            dx: 0.1,
            x_max: 10.0,
            n_l: 16,
            dw: 0.1,
            w_max: 10.0,
            origin: GridOrigin::NodeCentered,
        }
    }

    fn base_picard() -> PicardConfig {
        PicardConfig {
            mix: 0.1,
            min_err: 1e-5,
            n_iter: 100,
        }
    }

    #[test]
    fn rejects_non_positive_rs() {
        let cfg = RunConfig {
            theory: Theory::Stls,
            rs: 0.0,
            theta: 1.0,
            grid: base_grid(),
            picard: base_picard(),
            dynamic: None,
            vs: None,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn variational_theory_requires_vs_config() {
        let cfg = RunConfig {
            theory: Theory::VsStls,
            rs: 1.0,
            theta: 1.0,
            grid: base_grid(),
            picard: base_picard(),
            dynamic: None,
            vs: None,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_a_complete_static_configuration() {
        let cfg = RunConfig {
            theory: Theory::Stls,
            rs: 1.0,
            theta: 1.0,
            grid: base_grid(),
            picard: base_picard(),
            dynamic: None,
            vs: None,
        };
        assert!(cfg.validate().is_ok());
    }
}
