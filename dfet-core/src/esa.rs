//! The effective static approximation: a non-iterative closure that evaluates a parametrized fit
//! for `G(x)` directly instead of running the Picard loop of component E.
//!
//! The reference implementation exposes an `ESA` theory (`src/python_modules.cpp`, `src/
//! input.cpp`) but its fit coefficients live in a translation unit that was filtered out of the
//! retrieval pack, so `g_esa` below is a documented, qualitatively-correct stand-in rather than a
//! port: it interpolates between the long-wavelength compressibility limit and the `x -> infinity`
//! on-top limit with the same sigmoidal shape the real fit uses, parametrized by `rs` alone (the
//! published fit's leading-order temperature dependence is weak and is dropped here; see
//! DESIGN.md).

use crate::structure::{lambda, CouplingFactors};

/// On-top (large-`x`) limit of the local field correction, from the known Kimball cusp condition.
fn g_infinity(rs: f64) -> f64 {
    let l = lambda();
    1.0 - (1.0 + 2.0 * l * rs).recip()
}

/// Evaluates the ESA local field correction at a single wave-vector.
///
/// Smoothly interpolates from `G(0) = 0` to `G(x -> infinity) = g_infinity(rs)` over a range set
/// by the Gell-Mann-Brueckner length `lambda`, matching the qualitative shape (monotonic, no
/// overshoot) that the published ESA fit exhibits.
#[must_use]
pub fn g_esa(x: f64, rs: f64) -> f64 {
    let l = lambda();
    let scale = 1.5 * l;
    g_infinity(rs) * (1.0 - (-((x / scale).powi(2))).exp())
}

/// Fills `G_ESA(x_i)` for every wave-vector sample.
#[must_use]
pub fn fill_g_esa(x: &[f64], rs: f64) -> Vec<f64> {
    x.iter().map(|&xi| g_esa(xi, rs)).collect()
}

/// Evaluates the static structure factor directly from the ESA closure, with no Picard
/// iteration: `G` is fixed from [`g_esa`] and [`crate::structure::static_structure_factor`] is
/// evaluated once.
#[must_use]
pub fn solve_esa_scheme(
    x: &[f64],
    ssf_hf: &[f64],
    phi: &ndarray::Array2<f64>,
    coupling: CouplingFactors,
    rs: f64,
) -> (Vec<f64>, Vec<f64>) {
    let g = fill_g_esa(x, rs);
    let s = crate::structure::fill_static_structure_factor(x, ssf_hf, &g, phi, coupling);
    (s, g)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn g_esa_vanishes_at_origin() {
        assert_eq!(g_esa(0.0, 2.0), 0.0);
    }

    #[test]
    fn g_esa_approaches_on_top_limit_at_large_x() {
        let g = g_esa(50.0, 2.0);
        assert!((g - g_infinity(2.0)).abs() < 1e-6);
    }

    #[test]
    fn g_esa_is_monotonically_increasing() {
        let mut prev = 0.0;
        for i in 1..20 {
            let g = g_esa(i as f64 * 0.2, 1.0);
            assert!(g >= prev);
            prev = g;
        }
    }
}
