//! Component A (part 2): reduced chemical potential via bracketed bisection.

use crate::error::{Error, Result};
use crate::fermi_dirac::{fermi_dirac_one_half, GAMMA_THREE_HALVES};

/// Absolute tolerance on the bisection bracket width, `1e-10` per spec.
const TOLERANCE: f64 = 1e-10;
/// Bisection iteration cap; with a `[-10, 10]` bracket this converges in ~60-70 steps, well
/// inside this budget.
const MAX_ITER: usize = 200;

/// The normalization condition whose root is the chemical potential:
/// `Gamma(3/2) * F_{1/2}(mu) - 2 / (3 * Theta^{3/2}) = 0`.
#[must_use]
pub fn normalization_condition(mu: f64, theta: f64) -> f64 {
    GAMMA_THREE_HALVES * fermi_dirac_one_half(mu) - 2.0 / (3.0 * theta.powf(1.5))
}

/// Solves the Fermi normalization condition for `mu` given `Theta`, by bracketed bisection on
/// `[mu_lo, mu_hi]`.
///
/// # Errors
/// Returns [`Error::Config`] if `mu_lo >= mu_hi` or if the bracket does not straddle a root
/// (`f(mu_lo)` and `f(mu_hi)` share a sign).
pub fn solve_chemical_potential(theta: f64, mu_lo: f64, mu_hi: f64) -> Result<f64> {
    if mu_lo >= mu_hi {
        return Err(Error::Config(format!(
            "mu bracket is empty or inverted: lo={mu_lo} >= hi={mu_hi}"
        )));
    }

    let mut lo = mu_lo;
    let mut hi = mu_hi;
    let mut f_lo = normalization_condition(lo, theta);
    let f_hi = normalization_condition(hi, theta);

    if f_lo == 0.0 {
        return Ok(lo);
    }
    if f_hi == 0.0 {
        return Ok(hi);
    }
    if f_lo.signum() == f_hi.signum() {
        return Err(Error::Config(format!(
            "chemical potential bracket [{mu_lo}, {mu_hi}] does not straddle a root \
             (f(lo)={f_lo}, f(hi)={f_hi})"
        )));
    }

    let mut iter = 0;
    while hi - lo > TOLERANCE && iter < MAX_ITER {
        let mid = 0.5 * (lo + hi);
        let f_mid = normalization_condition(mid, theta);
        if f_mid == 0.0 {
            return Ok(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
        iter += 1;
    }

    Ok(0.5 * (lo + hi))
}
