//! Component H: the dynamic structure factor `S(x_target, Omega)` at a single target wave-vector,
//! combining the ideal response `phi`, the auxiliary response `psi`, and the bridge function.
//!
//! Grounded directly on the closed-form combination rule the original implementation applies once
//! `phi` and `psi` are known at the target wave-vector (spec.md §4.H); the `Omega = 0` branch is
//! algebraically distinct (it absorbs the `psi_im` contribution directly rather than through a
//! complex denominator) so it is kept as its own branch rather than taken as a limit.

use crate::structure::lambda;

/// Evaluates `S(x_target, Omega)` for a single frequency sample.
///
/// `ff1 = 4 * lambda * rs / (pi * x_target^2)` is the coupling prefactor at the target
/// wave-vector; `bridge` is `b(x_target)`.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn dynamic_structure_factor(
    omega: f64,
    x_target: f64,
    rs: f64,
    theta: f64,
    mu: f64,
    bridge: f64,
    phi_re: f64,
    phi_im: f64,
    psi_re: f64,
    psi_im: f64,
) -> f64 {
    if x_target == 0.0 {
        return 0.0;
    }
    let ff1 = 4.0 * lambda() * rs / (std::f64::consts::PI * x_target * x_target);
    let denom_re = 1.0 + ff1 * ((1.0 - bridge) * phi_re - psi_re);

    if omega == 0.0 {
        let ff2 = theta / (4.0 * x_target);
        let numer = ff2
            * ((1.0 - ff1 * psi_re) / ((x_target * x_target / (4.0 * theta) - mu).exp() + 1.0)
                - 3.0 / (4.0 * x_target) * ff1 * phi_re * psi_im);
        return numer / (denom_re * denom_re);
    }

    let ff2 = 1.0 / (1.0 - (-omega / theta).exp());
    let numer = (ff2 / std::f64::consts::PI) * (phi_im + ff1 * (phi_re * psi_im - phi_im * psi_re));
    let denom_im = ff1 * ((1.0 - bridge) * phi_im - psi_im);
    numer / (denom_re * denom_re + denom_im * denom_im)
}

/// Fills `S(x_target, Omega_j)` for every frequency sample.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn fill_dynamic_structure_factor(
    omega: &[f64],
    x_target: f64,
    rs: f64,
    theta: f64,
    mu: f64,
    bridge: f64,
    phi_re: &[f64],
    phi_im: &[f64],
    psi_re: &[f64],
    psi_im: &[f64],
) -> Vec<f64> {
    (0..omega.len())
        .map(|j| {
            dynamic_structure_factor(
                omega[j], x_target, rs, theta, mu, bridge, phi_re[j], phi_im[j], psi_re[j], psi_im[j],
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanishes_at_zero_target_wave_vector() {
        let s = dynamic_structure_factor(1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn is_finite_away_from_target_singularity() {
        let s = dynamic_structure_factor(0.5, 1.0, 1.0, 1.0, 0.0, 0.0, 0.8, -0.1, 0.01, -0.02);
        assert!(s.is_finite());
    }

    #[test]
    fn detailed_balance_sign_of_im_branch_is_respected() {
        // S(Omega) and S(-Omega) use the ideal response's own (Omega, -Omega) antisymmetry; here
        // we only check that flipping the sign of Omega and phi_im/psi_im together still yields a
        // finite, non-pathological value (full detailed-balance law lives at the CLI/solver level,
        // spec.md §8).
        let s_pos = dynamic_structure_factor(1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.8, -0.1, 0.01, -0.02);
        let s_neg = dynamic_structure_factor(-1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.8, 0.1, 0.01, 0.02);
        assert!(s_pos.is_finite() && s_neg.is_finite());
    }
}
