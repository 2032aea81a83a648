//! Component D: the static-structure-factor closure.

use crate::quadrature::Quadrature;

/// `lambda = (4 / (9 pi))^(1/3)`, the Gell-Mann-Brueckner constant used throughout the closure.
#[must_use]
pub fn lambda() -> f64 {
    (4.0 / (9.0 * std::f64::consts::PI)).powf(1.0 / 3.0)
}

/// Hartree-Fock static structure factor integrand at `x > 0`.
fn ssf_hf_integrand(y: f64, x: f64, theta: f64, mu: f64) -> f64 {
    let y2 = y * y;
    let ypx = y + x;
    let ymx = y - x;
    -3.0 * theta / (4.0 * x) * y / ((y2 / theta - mu).exp() + 1.0)
        * ((1.0 + (mu - ymx * ymx / theta).exp()) / (1.0 + (mu - ypx * ypx / theta).exp())).ln()
}

/// Hartree-Fock static structure factor integrand at `x = 0`.
fn ssf_hf_integrand_at_origin(y: f64, theta: f64, mu: f64) -> f64 {
    let y2 = y * y;
    -3.0 * y2 / (1.0 + (y2 / theta - mu).exp()).powi(2)
}

/// Computes `S_HF(x)` for a single wave-vector by quadrature over `y in [0, x_max]`.
#[must_use]
pub fn ssf_hf(x: f64, x_max: f64, theta: f64, mu: f64, quad: &Quadrature) -> f64 {
    let integral = if x > 0.0 {
        quad.integrate(|y| ssf_hf_integrand(y, x, theta, mu), 0.0, x_max)
    } else {
        quad.integrate(|y| ssf_hf_integrand_at_origin(y, theta, mu), 0.0, x_max)
    };
    1.0 + integral.unwrap_or(0.0)
}

/// Fills `S_HF(x_i)` for every wave-vector sample.
#[must_use]
pub fn fill_ssf_hf(x: &[f64], theta: f64, mu: f64, quad: &Quadrature) -> Vec<f64> {
    let x_max = *x.last().unwrap_or(&0.0);
    x.iter().map(|&xi| ssf_hf(xi, x_max, theta, mu, quad)).collect()
}

/// Coupling prefactors used throughout the closure, derived once per state point.
#[derive(Clone, Copy, Debug)]
pub struct CouplingFactors {
    /// `4 * lambda^2 * rs`.
    pub f1: f64,
    /// `(3 * Theta / 2) * f1`.
    pub f2: f64,
}

impl CouplingFactors {
    /// Derives the coupling prefactors for a given `(rs, Theta)` state point.
    #[must_use]
    pub fn new(rs: f64, theta: f64) -> Self {
        let l = lambda();
        let f1 = 4.0 * l * l * rs;
        let f2 = 1.5 * theta * f1;
        Self { f1, f2 }
    }
}

/// Evaluates the static structure factor closure at a single wave-vector:
///
/// `S(x) = S_HF(x) - f2 * (1 - G(x)) * sum_l c_l * phi_l(x)^2 /
///          (pi * lambda * x^2 + f1 * (1 - G(x)) * phi_l(x))`
///
/// `S(0)` is defined to be `0` regardless of the other arguments.
#[must_use]
pub fn static_structure_factor(
    x: f64,
    ssf_hf_x: f64,
    g_x: f64,
    phi_row: &[f64],
    coupling: CouplingFactors,
) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let pilambda = std::f64::consts::PI * lambda();
    let x2 = x * x;
    let one_minus_g = 1.0 - g_x;
    let mut sum = 0.0;
    for (l, &phi_l) in phi_row.iter().enumerate() {
        let denom = pilambda * x2 + coupling.f1 * one_minus_g * phi_l;
        let mut term = phi_l * phi_l / denom;
        if l > 0 {
            term *= 2.0;
        }
        sum += term;
    }
    ssf_hf_x - coupling.f2 * one_minus_g * sum
}

/// Fills `S(x_i)` for every wave-vector sample given the current `G` field and ideal response.
#[must_use]
pub fn fill_static_structure_factor(
    x: &[f64],
    ssf_hf: &[f64],
    g: &[f64],
    phi: &ndarray::Array2<f64>,
    coupling: CouplingFactors,
) -> Vec<f64> {
    x.iter()
        .enumerate()
        .map(|(i, &xi)| {
            static_structure_factor(xi, ssf_hf[i], g[i], phi.row(i).as_slice().unwrap(), coupling)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssf_is_zero_at_origin() {
        let phi_row = vec![1.0, 0.5];
        let coupling = CouplingFactors::new(1.0, 1.0);
        assert_eq!(static_structure_factor(0.0, 5.0, 0.0, &phi_row, coupling), 0.0);
    }

    #[test]
    fn rpa_reduces_with_g_zero() {
        // G == 0 is exactly the RPA limit: the formula should just use phi unmodified.
        let phi_row = vec![0.3, 0.1];
        let coupling = CouplingFactors::new(1.0, 1.0);
        let s_rpa = static_structure_factor(2.0, 1.2, 0.0, &phi_row, coupling);
        assert!(s_rpa.is_finite());
    }

    #[test]
    fn coupling_factors_scale_with_rs() {
        let low = CouplingFactors::new(0.1, 1.0);
        let high = CouplingFactors::new(1.0, 1.0);
        assert!(low.f1 < high.f1);
        assert!(low.f2 < high.f2);
    }
}
