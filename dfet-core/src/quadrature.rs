//! Component B (part 2): adaptive 1-D quadrature.
//!
//! A doubly-adaptive Gauss-Kronrod (7/15-point) recursive subdivision, equivalent in spirit to
//! `gsl_integration_cquad`: each subinterval is refined until its local relative error estimate
//! drops below target, with refinement itself bounded by a total interval-count budget so a
//! pathological integrand cannot spin forever.

use crate::error::{Error, Result};

/// 15-point Gauss-Kronrod nodes on `[-1, 1]` (abscissae) and the corresponding Kronrod / embedded
/// 7-point Gauss weights. Values from the standard G7,K15 tabulation.
const GK_NODES: [f64; 15] = [
    -0.991_455_371_120_813,
    -0.949_107_912_342_759,
    -0.864_864_423_359_769,
    -0.741_531_185_599_394,
    -0.586_087_235_467_691,
    -0.405_845_151_377_397,
    -0.207_784_955_007_898,
    0.0,
    0.207_784_955_007_898,
    0.405_845_151_377_397,
    0.586_087_235_467_691,
    0.741_531_185_599_394,
    0.864_864_423_359_769,
    0.949_107_912_342_759,
    0.991_455_371_120_813,
];

const GK_WEIGHTS: [f64; 15] = [
    0.022_935_322_010_529,
    0.063_092_092_629_979,
    0.104_790_010_322_250,
    0.140_653_259_715_525,
    0.169_004_726_639_267,
    0.190_350_578_064_785,
    0.204_432_940_075_298,
    0.209_482_141_084_728,
    0.204_432_940_075_298,
    0.190_350_578_064_785,
    0.169_004_726_639_267,
    0.140_653_259_715_525,
    0.104_790_010_322_250,
    0.063_092_092_629_979,
    0.022_935_322_010_529,
];

const G_WEIGHTS: [f64; 7] = [
    0.129_484_966_168_870,
    0.279_705_391_489_277,
    0.381_830_050_505_119,
    0.417_959_183_673_469,
    0.381_830_050_505_119,
    0.279_705_391_489_277,
    0.129_484_966_168_870,
];

/// Indices into `GK_NODES`/`GK_WEIGHTS` of the embedded 7-point Gauss rule.
const G_IN_GK: [usize; 7] = [1, 3, 5, 7, 9, 11, 13];

/// Owns the subdivision workspace for one adaptive integration; reused across calls so a worker
/// allocates it once.
#[derive(Clone, Debug)]
pub struct Quadrature {
    relative_error: f64,
    max_intervals: usize,
}

struct Interval {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

impl Quadrature {
    /// Creates a quadrature with the given relative error target and an interval budget
    /// equivalent to the historical `cquad` workspace size of 100.
    #[must_use]
    pub const fn new(relative_error: f64) -> Self {
        Self {
            relative_error,
            max_intervals: 100,
        }
    }

    /// The default relative error target used throughout the solver, `1e-5`.
    #[must_use]
    pub const fn default_tolerance() -> Self {
        Self::new(1e-5)
    }

    /// Integrates `f` over `[a, b]`.
    ///
    /// # Errors
    /// Returns [`Error::NumericalFailure`] if `f` ever evaluates to a non-finite value.
    pub fn integrate<F>(&self, mut f: F, a: f64, b: f64) -> Result<f64>
    where
        F: FnMut(f64) -> f64,
    {
        if (b - a).abs() < f64::EPSILON {
            return Ok(0.0);
        }
        let mut checked = |x: f64| -> Result<f64> {
            let v = f(x);
            if !v.is_finite() {
                return Err(Error::NumericalFailure(format!(
                    "quadrature integrand evaluated to non-finite value at x={x}"
                )));
            }
            Ok(v)
        };

        let first = gauss_kronrod(&mut checked, a, b)?;
        let mut intervals = vec![first];
        let mut total: f64 = intervals[0].value;
        let mut total_error: f64 = intervals[0].error;

        while total_error > self.relative_error * total.abs().max(1e-300)
            && intervals.len() < self.max_intervals
        {
            // Subdivide the interval with the largest error estimate.
            let (worst_idx, _) = intervals
                .iter()
                .enumerate()
                .max_by(|(_, x), (_, y)| x.error.partial_cmp(&y.error).unwrap())
                .unwrap();
            let worst = intervals.swap_remove(worst_idx);
            let mid = 0.5 * (worst.a + worst.b);
            let left = gauss_kronrod(&mut checked, worst.a, mid)?;
            let right = gauss_kronrod(&mut checked, mid, worst.b)?;

            total += left.value + right.value - worst.value;
            total_error += left.error + right.error - worst.error;

            intervals.push(left);
            intervals.push(right);
        }

        Ok(total)
    }
}

/// Single Gauss-Kronrod evaluation over `[a, b]`, with the 7-point Gauss rule embedded in the
/// 15-point Kronrod rule giving a cheap error estimate.
fn gauss_kronrod<F>(f: &mut F, a: f64, b: f64) -> Result<Interval>
where
    F: FnMut(f64) -> Result<f64>,
{
    let half_length = 0.5 * (b - a);
    let center = 0.5 * (a + b);

    let mut kronrod = 0.0;
    let mut gauss = 0.0;
    let mut g_idx = 0;
    for k in 0..15 {
        let x = center + half_length * GK_NODES[k];
        let fx = f(x)?;
        kronrod += GK_WEIGHTS[k] * fx;
        if G_IN_GK.contains(&k) {
            gauss += G_WEIGHTS[g_idx] * fx;
            g_idx += 1;
        }
    }
    kronrod *= half_length;
    gauss *= half_length;

    Ok(Interval {
        a,
        b,
        value: kronrod,
        error: (kronrod - gauss).abs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn integrates_polynomial_exactly() {
        let q = Quadrature::default_tolerance();
        let result = q.integrate(|x| x * x, 0.0, 3.0).unwrap();
        assert!(approx_eq!(f64, result, 9.0, epsilon = 1e-6));
    }

    #[test]
    fn integrates_sine_over_period() {
        let q = Quadrature::default_tolerance();
        let result = q
            .integrate(f64::sin, 0.0, 2.0 * std::f64::consts::PI)
            .unwrap();
        assert!(result.abs() < 1e-6);
    }

    #[test]
    fn refines_near_sharp_peak() {
        let q = Quadrature::default_tolerance();
        let result = q.integrate(|x| (-1000.0 * x * x).exp(), -1.0, 1.0).unwrap();
        let expected = (std::f64::consts::PI / 1000.0).sqrt();
        assert!(approx_eq!(f64, result, expected, epsilon = 1e-3));
    }

    #[test]
    fn propagates_non_finite_as_error() {
        let q = Quadrature::default_tolerance();
        let result = q.integrate(|x| 1.0 / x, -1.0, 1.0);
        assert!(result.is_err());
    }
}
