//! Component F: the auxiliary density response `psi(x, Omega)` used by the qSTLS/qSTLS-IET
//! dynamic schemes.
//!
//! `psi` is built from a three-level nested quadrature (spec.md §4.F). The two inner levels
//! (`level2`, `level3`) depend only on the state point `(rs, Theta, mu)` and the static structure
//! factor `S` — never on the `psi` iterate itself — so they are evaluated once per `(x, Omega)`
//! pair and cached as [`FixedKernel`] ("K_fixed"). Only the outer level (`level1`) is re-evaluated
//! every Picard iteration, against the current `psi_re` at the `Omega = 0` slice.

use crate::quadrature::Quadrature;
use crate::spline::CubicSpline;
use ndarray::{Array2, Array3};

/// Level-3 (innermost) integrand for the real part, `Omega != 0` branch.
fn level3_re_integrand_dynamic(q: f64, x: f64, w: f64, u: f64, theta: f64, mu: f64, omega: f64) -> f64 {
    let (x2, w2, u2, omega2) = (x * x, w * w, u * u, omega * omega);
    let f1 = x2 + w2 - u2 + 4.0 * x * q;
    let f2 = x2 + w2 - u2 - 4.0 * x * q;
    let logarg = ((f1 * f1 - 4.0 * omega2) / (f2 * f2 - 4.0 * omega2)).abs();
    -(3.0 / 8.0) * q / ((q * q / theta - mu).exp() + 1.0) * logarg.ln()
}

/// Level-3 integrand for the real part, `Omega == 0` branch (spec.md §4.F analytic limit).
fn level3_re_integrand_static(q: f64, x: f64, w: f64, u: f64, theta: f64, mu: f64) -> f64 {
    if x == 0.0 || q == 0.0 {
        return 0.0;
    }
    let (x2, w2, u2, q2) = (x * x, w * w, u * u, q * q);
    let t = x2 + w2 - u2;
    let f1 = t + 4.0 * x * q;
    let f2 = t - 4.0 * x * q;
    let logarg = (f1 / f2).abs();
    -(3.0 / (4.0 * theta)) * q / ((q2 / theta - mu).exp() + (-q2 / theta + mu).exp() + 2.0)
        * ((q2 - t * t / (16.0 * x2)) * logarg.ln() + (q / x) * t / 2.0)
}

/// Level-3 integrand for the imaginary part: a rectangular window in `q` set by energy-momentum
/// conservation, matching spec.md §4.F's indicator-function construction.
fn level3_im_integrand(q: f64, x: f64, w: f64, u: f64, theta: f64, mu: f64, omega: f64) -> f64 {
    let (x2, w2, u2) = (x * x, w * w, u * u);
    let t = (x2 + w2 - u2) / 2.0;
    let h1 = (t + omega) / (2.0 * x);
    let h2 = (t - omega) / (2.0 * x);
    let out1 = if q * q > h1 * h1 { 1.0 } else { 0.0 };
    let out2 = if q * q > h2 * h2 { -1.0 } else { 0.0 };
    (3.0 * std::f64::consts::PI / 8.0) * (out1 + out2) * q / ((q * q / theta - mu).exp() + 1.0)
}

/// Integrates a level-3 integrand over `q` on the wave-vector grid's support.
fn level3_integral<F>(f: F, q_min: f64, q_max: f64, quad: &Quadrature) -> f64
where
    F: Fn(f64) -> f64,
{
    if q_max <= q_min {
        return 0.0;
    }
    quad.integrate(f, q_min, q_max).unwrap_or(0.0)
}

/// Level-2: integrates the level-3 result over `u` weighted by `(S(u) - 1)`, for a fixed
/// `(x, w, Omega)`. This is one entry of the cacheable "fixed" kernel.
///
/// Exposed crate-wide as [`level2_entry_pub`] so [`crate::parallel`] can drive it directly from a
/// per-worker spline/quadrature pair.
fn level2_entry(
    x: f64,
    w: f64,
    omega: f64,
    x_grid: &[f64],
    s_spline: &CubicSpline,
    theta: f64,
    mu: f64,
    quad: &Quadrature,
) -> (f64, f64) {
    let x_min = x_grid[0];
    let x_max = *x_grid.last().unwrap();
    let u_min = (w - x).abs();
    let u_max = (w + x).min(x_max);

    let re = if u_max <= u_min {
        0.0
    } else {
        quad.integrate(
            |u| {
                let ssfm1 = s_spline.eval(u) - 1.0;
                let q_min = x_min;
                let q_max = x_max;
                let inner = if omega == 0.0 {
                    level3_integral(
                        |q| level3_re_integrand_static(q, x, w, u, theta, mu),
                        q_min,
                        q_max,
                        quad,
                    )
                } else {
                    level3_integral(
                        |q| level3_re_integrand_dynamic(q, x, w, u, theta, mu, omega),
                        q_min,
                        q_max,
                        quad,
                    )
                };
                u * ssfm1 * inner
            },
            u_min,
            u_max,
        )
        .unwrap_or(0.0)
    };

    let im = if x == 0.0 || u_max <= u_min {
        0.0
    } else {
        quad.integrate(
            |u| {
                let ssfm1 = s_spline.eval(u) - 1.0;
                if omega == 0.0 {
                    let x2 = x * x;
                    let w2 = w * w;
                    let u2 = u * u;
                    let t = x2 + w2 - u2;
                    0.5 * u * ssfm1 * t / ((t * t / (16.0 * theta * x2) - mu).exp() + 1.0)
                } else {
                    let t = ((x * x + w * w - u * u) / 2.0).abs();
                    let q_min = ((omega - t) / (2.0 * x)).abs();
                    let q_max = (omega + t) / (2.0 * x);
                    u * ssfm1
                        * level3_integral(
                            |q| level3_im_integrand(q, x, w, u, theta, mu, omega),
                            q_min,
                            q_max,
                            quad,
                        )
                }
            },
            u_min,
            u_max,
        )
        .unwrap_or(0.0)
    };

    (re, im)
}

/// Crate-visible entry point for [`crate::parallel::compute_fixed_kernel_parallel`]: a single
/// `(x, w, Omega)` level-2 evaluation against a caller-owned spline and quadrature workspace.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub(crate) fn level2_entry_pub(
    x: f64,
    w: f64,
    omega: f64,
    x_grid: &[f64],
    s_spline: &CubicSpline,
    theta: f64,
    mu: f64,
    quad: &Quadrature,
) -> (f64, f64) {
    level2_entry(x, w, omega, x_grid, s_spline, theta, mu, quad)
}

/// The cacheable, iterate-independent part of the auxiliary-response quadrature: `K_fixed(x, w,
/// Omega)` for every grid point `w`, at every `(x, Omega)` target pair.
///
/// Depends on `(rs, Theta, mu)` and the static structure factor only. Stable across every Picard
/// iteration of the dynamic scheme for a fixed state point, which is what makes caching it to
/// disk (component I) worthwhile.
#[derive(Clone, Debug)]
pub struct FixedKernel {
    /// Real-part kernel, shape `(n_x, n_W, n_x)`.
    pub re: Array3<f64>,
    /// Imaginary-part kernel, shape `(n_x, n_W, n_x)`.
    pub im: Array3<f64>,
    populated: bool,
}

impl FixedKernel {
    /// Allocates an empty, unpopulated kernel of the given shape.
    #[must_use]
    pub fn empty(n_x: usize, n_w: usize) -> Self {
        Self {
            re: Array3::zeros((n_x, n_w, n_x)),
            im: Array3::zeros((n_x, n_w, n_x)),
            populated: false,
        }
    }

    /// Whether this kernel holds computed values (as opposed to being a fresh [`Self::empty`]).
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.populated
    }

    /// Assembles a populated kernel from pre-computed real/imaginary arrays, used by
    /// [`crate::parallel::compute_fixed_kernel_parallel`].
    #[must_use]
    pub fn from_parts(re: Array3<f64>, im: Array3<f64>) -> Self {
        Self { re, im, populated: true }
    }

    /// Computes every `(x_i, Omega_j, w_k)` entry from scratch.
    #[must_use]
    pub fn compute(x: &[f64], omega: &[f64], s: &[f64], theta: f64, mu: f64, quad: &Quadrature) -> Self {
        let x_vec: Vec<f64> = x.to_vec();
        let s_spline = CubicSpline::new(x_vec, s.to_vec())
            .expect("wave-vector grid has at least 3 strictly increasing samples");
        let n_x = x.len();
        let n_w = omega.len();
        let mut re = Array3::zeros((n_x, n_w, n_x));
        let mut im = Array3::zeros((n_x, n_w, n_x));
        for (i, &xi) in x.iter().enumerate() {
            for (j, &wj) in omega.iter().enumerate() {
                for (k, &wk) in x.iter().enumerate() {
                    let (r, m) = level2_entry(xi, wk, wj, x, &s_spline, theta, mu, quad);
                    re[[i, j, k]] = r;
                    im[[i, j, k]] = m;
                }
            }
        }
        Self { re, im, populated: true }
    }
}

/// Level-1 integrand weight: `S(w) * (1 - b(w)) - (psi_re(w, 0) / phi_re(w, 0)) * (S(w) - 1)`,
/// zero at `w = 0` where `phi_re` vanishes (spec.md §4.F).
fn level1_weight(w_idx: usize, s: &[f64], bridge: &[f64], psi_re_w0: &[f64], phi_re_w0: &[f64]) -> f64 {
    if w_idx == 0 {
        return 0.0;
    }
    let psi_phi = psi_re_w0[w_idx] / phi_re_w0[w_idx];
    s[w_idx] * (1.0 - bridge[w_idx]) - psi_phi * (s[w_idx] - 1.0)
}

/// Evaluates `psi_re_new(x_i, Omega_j)` and `psi_im_new(x_i, Omega_j)` from a populated
/// [`FixedKernel`] and the current `psi_re` at the `Omega = 0` slice.
#[must_use]
pub fn update_auxiliary_response(
    x: &[f64],
    s: &[f64],
    bridge: &[f64],
    psi_re_w0: &[f64],
    phi_re_w0: &[f64],
    fixed: &FixedKernel,
) -> (Array2<f64>, Array2<f64>) {
    let n_x = fixed.re.shape()[0];
    let n_w = fixed.re.shape()[1];
    let weights: Vec<f64> = (0..n_x).map(|k| level1_weight(k, s, bridge, psi_re_w0, phi_re_w0)).collect();

    let x_vec: Vec<f64> = x.to_vec();
    let mut psi_re = Array2::zeros((n_x, n_w));
    let mut psi_im = Array2::zeros((n_x, n_w));
    for i in 0..n_x {
        for j in 0..n_w {
            let values: Vec<f64> = (0..n_x)
                .map(|k| if x[k] == 0.0 { 0.0 } else { weights[k] / x[k] * fixed.re[[i, j, k]] })
                .collect();
            let spline = CubicSpline::new(x_vec.clone(), values);
            psi_re[[i, j]] = spline.map_or(0.0, |sp| {
                trapezoid_from_spline(&sp, x_vec[0], *x_vec.last().unwrap())
            });

            let values_im: Vec<f64> = (0..n_x)
                .map(|k| if x[k] == 0.0 { 0.0 } else { weights[k] / x[k] * fixed.im[[i, j, k]] })
                .collect();
            let spline_im = CubicSpline::new(x_vec.clone(), values_im);
            psi_im[[i, j]] = spline_im.map_or(0.0, |sp| {
                trapezoid_from_spline(&sp, x_vec[0], *x_vec.last().unwrap())
            });
        }
    }
    (psi_re, psi_im)
}

/// Fully-dynamic level-1 bracket coefficient at a single `(w, Omega_j)` pair: the real and
/// imaginary parts of `(psi/phi)(w, Omega_j) * (S(w) - 1)`, evaluated at every frequency rather
/// than only at `Omega = 0` (spec.md §4.F "Fully-dynamic closure"). `phi_re`/`phi_im` and the
/// current `psi_re`/`psi_im` iterate are flat `n_x * n_W` fields, row-major `(x, Omega)`.
#[allow(clippy::too_many_arguments)]
fn fully_dynamic_bracket(
    w_idx: usize,
    omega_idx: usize,
    n_w: usize,
    s: &[f64],
    bridge: &[f64],
    psi_re: &[f64],
    psi_im: &[f64],
    phi_re: &[f64],
    phi_im: &[f64],
) -> (f64, f64) {
    if w_idx == 0 {
        return (0.0, 0.0);
    }
    let idx = w_idx * n_w + omega_idx;
    let pr = phi_re[idx];
    let pi = phi_im[idx];
    let denom = pr * pr + pi * pi;
    let base = s[w_idx] * (1.0 - bridge[w_idx]);
    if denom <= f64::EPSILON {
        return (base, 0.0);
    }
    let yr = psi_re[idx];
    let yi = psi_im[idx];
    let coeff_re = (pr * yr + pi * yi) / denom;
    let coeff_im = (pi * yr - pr * yi) / denom;
    let sm1 = s[w_idx] - 1.0;
    (base - coeff_re * sm1, -coeff_im * sm1)
}

/// Fully-dynamic auxiliary-response update (spec.md §4.F): couples `psi(w, Omega)` at every
/// frequency into its own fixed point, rather than only the `Omega = 0` slice. Reuses the same
/// state-point-only [`FixedKernel`] as [`update_auxiliary_response`] — the two components of that
/// kernel (`fixed.re`, `fixed.im`) are the "two independent `K_fixed` tables" spec.md §4.F
/// describes, combined here by complex multiplication with the per-`(w, Omega)` bracket instead
/// of a single real weight.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn update_auxiliary_response_fully_dynamic(
    x: &[f64],
    s: &[f64],
    bridge: &[f64],
    psi_re: &[f64],
    psi_im: &[f64],
    phi_re: &[f64],
    phi_im: &[f64],
    fixed: &FixedKernel,
) -> (Array2<f64>, Array2<f64>) {
    let n_x = fixed.re.shape()[0];
    let n_w = fixed.re.shape()[1];
    let x_vec: Vec<f64> = x.to_vec();
    let mut psi_re_new = Array2::zeros((n_x, n_w));
    let mut psi_im_new = Array2::zeros((n_x, n_w));
    for j in 0..n_w {
        let bracket: Vec<(f64, f64)> = (0..n_x)
            .map(|k| fully_dynamic_bracket(k, j, n_w, s, bridge, psi_re, psi_im, phi_re, phi_im))
            .collect();
        for i in 0..n_x {
            let values_re: Vec<f64> = (0..n_x)
                .map(|k| {
                    if x[k] == 0.0 {
                        0.0
                    } else {
                        let (br, bi) = bracket[k];
                        (fixed.re[[i, j, k]] * br - fixed.im[[i, j, k]] * bi) / x[k]
                    }
                })
                .collect();
            let spline_re = CubicSpline::new(x_vec.clone(), values_re);
            psi_re_new[[i, j]] = spline_re.map_or(0.0, |sp| {
                trapezoid_from_spline(&sp, x_vec[0], *x_vec.last().unwrap())
            });

            let values_im: Vec<f64> = (0..n_x)
                .map(|k| {
                    if x[k] == 0.0 {
                        0.0
                    } else {
                        let (br, bi) = bracket[k];
                        (fixed.re[[i, j, k]] * bi + fixed.im[[i, j, k]] * br) / x[k]
                    }
                })
                .collect();
            let spline_im = CubicSpline::new(x_vec.clone(), values_im);
            psi_im_new[[i, j]] = spline_im.map_or(0.0, |sp| {
                trapezoid_from_spline(&sp, x_vec[0], *x_vec.last().unwrap())
            });
        }
    }
    (psi_re_new, psi_im_new)
}

/// Composite trapezoidal quadrature of an already-tabulated spline over its own knot spacing; used
/// to close the level-1 integral without re-deriving a fresh adaptive interval tree for every
/// `(x_i, Omega_j)` pair (the integrand is already as smooth as the spline that represents it).
fn trapezoid_from_spline(spline: &CubicSpline, a: f64, b: f64) -> f64 {
    const STEPS: usize = 256;
    let h = (b - a) / STEPS as f64;
    let mut sum = 0.5 * (spline.eval(a) + spline.eval(b));
    for i in 1..STEPS {
        sum += spline.eval(a + i as f64 * h);
    }
    sum * h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_grid(n: usize, dx: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dx).collect()
    }

    #[test]
    fn fixed_kernel_is_finite_and_marked_populated() {
        let x = uniform_grid(6, 0.5);
        let omega = uniform_grid(3, 0.5);
        let s: Vec<f64> = x.iter().map(|&xi| 1.0 - (-xi).exp()).collect();
        let quad = Quadrature::default_tolerance();
        let fixed = FixedKernel::compute(&x, &omega, &s, 1.0, 0.0, &quad);
        assert!(fixed.is_populated());
        assert!(fixed.re.iter().all(|v| v.is_finite()));
        assert!(fixed.im.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn empty_kernel_is_not_populated() {
        let fixed = FixedKernel::empty(4, 2);
        assert!(!fixed.is_populated());
    }

    #[test]
    fn update_produces_finite_fields() {
        let x = uniform_grid(6, 0.5);
        let omega = uniform_grid(3, 0.5);
        let s: Vec<f64> = x.iter().map(|&xi| 1.0 - (-xi).exp()).collect();
        let bridge = vec![0.0; x.len()];
        let phi_re_w0: Vec<f64> = x.iter().map(|&xi| if xi == 0.0 { 1.0 } else { 1.0 / (1.0 + xi) }).collect();
        let psi_re_w0 = vec![0.0; x.len()];
        let quad = Quadrature::default_tolerance();
        let fixed = FixedKernel::compute(&x, &omega, &s, 1.0, 0.0, &quad);
        let (re, im) = update_auxiliary_response(&x, &s, &bridge, &psi_re_w0, &phi_re_w0, &fixed);
        assert!(re.iter().all(|v| v.is_finite()));
        assert!(im.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn fully_dynamic_update_produces_finite_fields() {
        let x = uniform_grid(6, 0.5);
        let omega = uniform_grid(3, 0.5);
        let n_w = omega.len();
        let s: Vec<f64> = x.iter().map(|&xi| 1.0 - (-xi).exp()).collect();
        let bridge = vec![0.0; x.len()];
        let phi_re: Vec<f64> = x
            .iter()
            .flat_map(|&xi| (0..n_w).map(move |_| if xi == 0.0 { 1.0 } else { 1.0 / (1.0 + xi) }))
            .collect();
        let phi_im = vec![0.0; x.len() * n_w];
        let psi_re = vec![0.0; x.len() * n_w];
        let psi_im = vec![0.0; x.len() * n_w];
        let quad = Quadrature::default_tolerance();
        let fixed = FixedKernel::compute(&x, &omega, &s, 1.0, 0.0, &quad);
        let (re, im) = update_auxiliary_response_fully_dynamic(&x, &s, &bridge, &psi_re, &psi_im, &phi_re, &phi_im, &fixed);
        assert!(re.iter().all(|v| v.is_finite()));
        assert!(im.iter().all(|v| v.is_finite()));
    }
}
