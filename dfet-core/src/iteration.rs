//! Component E: the static-scheme Picard loop (STLS, STLS-IET, and the RPA/ESA degenerate
//! cases that reuse the same harness).

use crate::logging::LoggingConfig;
use crate::picard::{l2_residual, mix_in_place, PicardConfig, SolveOutcome};
use crate::quadrature::Quadrature;
use crate::spline::CubicSpline;
use crate::structure::{fill_static_structure_factor, CouplingFactors};
use tracing::{debug, info};

/// STLS local-field-correction kernel (spec.md §4.E):
///
/// `k(x, y, S) = -3/4 * y^2 * (S - 1) * (1 + (x^2 - y^2)/(2xy) * ln|(x+y)/(x-y)|)`, with the
/// `x = y` limit `y^2 * (S - 1)`.
fn slfc_kernel(y: f64, x: f64, s_y: f64) -> f64 {
    if x <= 0.0 || y <= 0.0 {
        return 0.0;
    }
    let y2 = y * y;
    let x2 = x * x;
    if (x - y).abs() < 1e-12 {
        return y2 * (s_y - 1.0);
    }
    let ratio = if x > y {
        (x + y) / (x - y)
    } else {
        (x + y) / (y - x)
    };
    -0.75 * y2 * (s_y - 1.0) * (1.0 + (x2 - y2) / (2.0 * x * y) * ratio.ln())
}

/// Evaluates `G_new(x)` by quadrature of [`slfc_kernel`] against a spline-interpolated `S(y)`.
#[must_use]
pub fn static_local_field_correction(x: f64, x_max: f64, s_spline: &CubicSpline, quad: &Quadrature) -> f64 {
    quad.integrate(|y| slfc_kernel(y, x, s_spline.eval(y)), 0.0, x_max)
        .unwrap_or(0.0)
}

/// Fills `G_new(x_i)` for every wave-vector sample.
#[must_use]
pub fn fill_static_local_field_correction(x: &[f64], s: &[f64], quad: &Quadrature) -> Vec<f64> {
    let x_vec: Vec<f64> = x.to_vec();
    let s_spline = CubicSpline::new(x_vec, s.to_vec())
        .expect("wave-vector grid has at least 3 strictly increasing samples");
    let x_max = *x.last().unwrap_or(&0.0);
    x.iter()
        .map(|&xi| static_local_field_correction(xi, x_max, &s_spline, quad))
        .collect()
}

/// Runs the static-scheme Picard loop to convergence (or the iteration cap), starting from
/// `g = 0`.
///
/// `bridge`, when present, is subtracted from `G` before every evaluation of the structure-factor
/// closure (the STLS-IET variant of spec.md §4.E).
#[must_use]
pub fn solve_static_scheme(
    x: &[f64],
    ssf_hf: &[f64],
    phi: &ndarray::Array2<f64>,
    coupling: CouplingFactors,
    bridge: Option<&[f64]>,
    picard: PicardConfig,
    quad: &Quadrature,
    logging: LoggingConfig,
) -> (Vec<f64>, Vec<f64>, SolveOutcome) {
    let n_x = x.len();
    let mut g = vec![0.0; n_x];
    let mut g_eff = vec![0.0; n_x];
    let apply_bridge = |g: &[f64], g_eff: &mut [f64]| {
        if let Some(b) = bridge {
            for i in 0..n_x {
                g_eff[i] = g[i] - b[i];
            }
        } else {
            g_eff.copy_from_slice(g);
        }
    };
    apply_bridge(&g, &mut g_eff);
    let mut s = fill_static_structure_factor(x, ssf_hf, &g_eff, phi, coupling);

    let mut residual = f64::INFINITY;
    let mut iterations = 0;
    while iterations < picard.n_iter && residual > picard.min_err {
        let g_new = fill_static_local_field_correction(x, &s, quad);
        residual = l2_residual(&g_new, &g);
        mix_in_place(&mut g, &g_new, picard.mix);
        apply_bridge(&g, &mut g_eff);
        s = fill_static_structure_factor(x, ssf_hf, &g_eff, phi, coupling);
        iterations += 1;
        if logging.should_log_iter(iterations) {
            debug!(iterations, residual, "static Picard iteration");
        }
    }

    let converged = residual <= picard.min_err;
    if converged {
        info!(iterations, residual, "static scheme converged");
    } else {
        tracing::warn!(
            iterations,
            residual,
            "static scheme did not converge within the iteration cap"
        );
    }

    (s, g, SolveOutcome {
        converged,
        residual,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemical_potential::solve_chemical_potential;
    use crate::grid::{GridConfig, GridOrigin, WaveVectorGrid};
    use crate::lindhard::fill_phi_matsubara;
    use crate::structure::fill_ssf_hf;

    fn small_grid() -> WaveVectorGrid {
        let cfg = GridConfig {
            dx: 0.5,
            x_max: 5.0,
            n_l: 8,
            dw: 0.5,
            w_max: 5.0,
            origin: GridOrigin::NodeCentered,
        };
        WaveVectorGrid::build(&cfg).unwrap()
    }

    #[test]
    fn ssf_vanishes_at_origin_after_convergence() {
        let grid = small_grid();
        let theta = 1.0;
        let rs = 1.0;
        let mu = solve_chemical_potential(theta, -10.0, 10.0).unwrap();
        let quad = Quadrature::default_tolerance();
        let phi = fill_phi_matsubara(grid.x(), 8, theta, mu, &quad);
        let ssf_hf = fill_ssf_hf(grid.x(), theta, mu, &quad);
        let coupling = CouplingFactors::new(rs, theta);
        let picard = PicardConfig {
            mix: 0.3,
            min_err: 1e-4,
            n_iter: 200,
        };
        let (s, _, _) = solve_static_scheme(
            grid.x(),
            &ssf_hf,
            &phi,
            coupling,
            None,
            picard,
            &quad,
            LoggingConfig::quiet(),
        );
        assert_eq!(s[0], 0.0);
    }

    #[test]
    fn rpa_is_stls_with_g_identically_zero() {
        // Running the closure once with G == 0 throughout (no iteration) is exactly the RPA
        // static structure factor, per spec.md §8's law.
        let grid = small_grid();
        let theta = 1.0;
        let rs = 0.01;
        let mu = solve_chemical_potential(theta, -10.0, 10.0).unwrap();
        let quad = Quadrature::default_tolerance();
        let phi = fill_phi_matsubara(grid.x(), 8, theta, mu, &quad);
        let ssf_hf = fill_ssf_hf(grid.x(), theta, mu, &quad);
        let coupling = CouplingFactors::new(rs, theta);
        let g_zero = vec![0.0; grid.len()];
        let s_rpa = fill_static_structure_factor(grid.x(), &ssf_hf, &g_zero, &phi, coupling);

        let picard = PicardConfig {
            mix: 0.1,
            min_err: 1e-5,
            n_iter: 500,
        };
        let (s_stls, _, _) = solve_static_scheme(
            grid.x(),
            &ssf_hf,
            &phi,
            coupling,
            None,
            picard,
            &quad,
            LoggingConfig::quiet(),
        );

        for (a, b) in s_rpa.iter().zip(&s_stls) {
            assert!((a - b).abs() < 1e-3, "small-rs STLS should track RPA closely");
        }
    }
}
