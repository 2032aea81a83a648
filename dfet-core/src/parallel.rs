//! Component J: parallelizing the per-wave-vector work of [`crate::auxiliary::FixedKernel`]
//! construction across a static block partition of the outer wave-vector index, the way the
//! reference implementation's `#pragma omp for` distributes its own outer loop over threads.

use crate::quadrature::Quadrature;
use crate::spline::CubicSpline;
use ndarray::Array3;
use rayon::prelude::*;

/// Computes [`crate::auxiliary::FixedKernel`] with the outer wave-vector index partitioned across
/// the Rayon global thread pool, one contiguous block per worker.
///
/// Each worker gets its own [`CubicSpline`] of `S` and its own [`Quadrature`] workspace, since
/// neither is `Sync`-shareable across the adaptive-interval recursion cheaply; rebuilding the
/// (cheap) spline once per worker is preferable to locking.
#[must_use]
pub fn compute_fixed_kernel_parallel(
    x: &[f64],
    omega: &[f64],
    s: &[f64],
    theta: f64,
    mu: f64,
    tolerance: f64,
) -> crate::auxiliary::FixedKernel {
    let n_x = x.len();
    let n_w = omega.len();
    let mut re = Array3::<f64>::zeros((n_x, n_w, n_x));
    let mut im = Array3::<f64>::zeros((n_x, n_w, n_x));

    let rows: Vec<(usize, Vec<f64>, Vec<f64>)> = (0..n_x)
        .into_par_iter()
        .map(|i| {
            let quad = Quadrature::new(tolerance);
            let x_vec: Vec<f64> = x.to_vec();
            let s_spline = CubicSpline::new(x_vec, s.to_vec())
                .expect("wave-vector grid has at least 3 strictly increasing samples");
            let mut row_re = vec![0.0; n_w * n_x];
            let mut row_im = vec![0.0; n_w * n_x];
            for (j, &wj) in omega.iter().enumerate() {
                for (k, &wk) in x.iter().enumerate() {
                    let (r, m) = crate::auxiliary::level2_entry_pub(x[i], wk, wj, x, &s_spline, theta, mu, &quad);
                    row_re[j * n_x + k] = r;
                    row_im[j * n_x + k] = m;
                }
            }
            (i, row_re, row_im)
        })
        .collect();

    for (i, row_re, row_im) in rows {
        for j in 0..n_w {
            for k in 0..n_x {
                re[[i, j, k]] = row_re[j * n_x + k];
                im[[i, j, k]] = row_im[j * n_x + k];
            }
        }
    }

    crate::auxiliary::FixedKernel::from_parts(re, im)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_and_sequential_construction_agree() {
        let x: Vec<f64> = (0..6).map(|i| i as f64 * 0.5).collect();
        let omega: Vec<f64> = (0..3).map(|i| i as f64 * 0.5).collect();
        let s: Vec<f64> = x.iter().map(|&xi| 1.0 - (-xi).exp()).collect();
        let quad = Quadrature::default_tolerance();
        let sequential = crate::auxiliary::FixedKernel::compute(&x, &omega, &s, 1.0, 0.0, &quad);
        let parallel = compute_fixed_kernel_parallel(&x, &omega, &s, 1.0, 0.0, 1e-5);
        for (a, b) in sequential.re.iter().zip(parallel.re.iter()) {
            assert!((a - b).abs() < 1e-8);
        }
    }
}
