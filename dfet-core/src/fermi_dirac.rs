//! The complete Fermi-Dirac integral of order 1/2, `F_{1/2}(mu)`, used by the chemical-potential
//! normalization condition in component A.
//!
//! `F_{1/2}(mu) = \int_0^\infty x^{1/2} / (1 + exp(x - mu)) dx`
//!
//! Rather than reimplementing the rational/asymptotic fit GSL uses internally, this evaluates the
//! integral directly with the crate's own adaptive quadrature (component B): the integrand decays
//! like `exp(mu - x)` for `x` past the Fermi edge, so truncating at `mu + CUTOFF_MARGIN` (or a
//! fixed floor for very negative `mu`) introduces negligible error relative to the `1e-5` default
//! quadrature tolerance.

use crate::quadrature::Quadrature;

/// How far past the Fermi edge (or past the origin, for negative `mu`) the truncated integral
/// extends before the exponential tail is considered negligible.
const CUTOFF_MARGIN: f64 = 40.0;
/// Minimum truncation point, covering the non-degenerate (`mu` very negative) regime.
const CUTOFF_FLOOR: f64 = 60.0;

/// Evaluates `F_{1/2}(mu)` by direct quadrature of its integral definition.
#[must_use]
pub fn fermi_dirac_one_half(mu: f64) -> f64 {
    let upper = (mu + CUTOFF_MARGIN).max(CUTOFF_FLOOR);
    let q = Quadrature::new(1e-10);
    q.integrate(|x| x.sqrt() / (1.0 + (x - mu).exp()), 0.0, upper)
        .unwrap_or(0.0)
}

/// `Gamma(3/2) = sqrt(pi) / 2`, used by the normalization condition of component A.
pub const GAMMA_THREE_HALVES: f64 = 0.886_226_925_452_758;

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn matches_known_value_at_mu_zero() {
        // F_{1/2}(0) = Gamma(3/2) * eta(3/2) where eta is the Dirichlet eta function;
        // the accepted reference value is approximately 0.6782.
        let f = fermi_dirac_one_half(0.0);
        assert!(approx_eq!(f64, f, 0.678_093_55, epsilon = 1e-4));
    }

    #[test]
    fn monotonically_increasing_in_mu() {
        let a = fermi_dirac_one_half(-2.0);
        let b = fermi_dirac_one_half(0.0);
        let c = fermi_dirac_one_half(2.0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn gamma_three_halves_matches_sqrt_pi_over_two() {
        assert!(approx_eq!(
            f64,
            GAMMA_THREE_HALVES,
            std::f64::consts::PI.sqrt() / 2.0,
            epsilon = 1e-12
        ));
    }
}
