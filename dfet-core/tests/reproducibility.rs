//! Cross-worker-count reproducibility and the RPA/STLS/small-rs laws of spec.md §8.

use dfet_core::auxiliary::FixedKernel;
use dfet_core::chemical_potential::solve_chemical_potential;
use dfet_core::grid::{GridConfig, GridOrigin, WaveVectorGrid};
use dfet_core::lindhard::fill_phi_matsubara;
use dfet_core::parallel::compute_fixed_kernel_parallel;
use dfet_core::quadrature::Quadrature;
use dfet_core::structure::{fill_ssf_hf, fill_static_structure_factor, CouplingFactors};

fn small_grid() -> WaveVectorGrid {
    let cfg = GridConfig {
        dx: 0.5,
        x_max: 4.0,
        n_l: 4,
        dw: 0.5,
        w_max: 4.0,
        origin: GridOrigin::NodeCentered,
    };
    WaveVectorGrid::build(&cfg).unwrap()
}

#[test]
fn fixed_kernel_is_bit_reproducible_regardless_of_worker_count() {
    let grid = small_grid();
    let theta = 1.0;
    let mu = solve_chemical_potential(theta, -10.0, 10.0).unwrap();
    let quad = Quadrature::default_tolerance();
    let s: Vec<f64> = grid.x().iter().map(|&xi| 1.0 - (-xi).exp()).collect();
    let omega = vec![0.0, 0.5, 1.0];

    let sequential = FixedKernel::compute(grid.x(), &omega, &s, theta, mu, &quad);

    for workers in [1usize, 2, 4] {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build().unwrap();
        let parallel = pool.install(|| compute_fixed_kernel_parallel(grid.x(), &omega, &s, theta, mu, 1e-5));
        for (a, b) in sequential.re.iter().zip(parallel.re.iter()) {
            let rel = (a - b).abs() / a.abs().max(1.0);
            assert!(rel <= 1e-10, "re mismatch at worker count {workers}: {a} vs {b}");
        }
        for (a, b) in sequential.im.iter().zip(parallel.im.iter()) {
            let rel = (a - b).abs() / a.abs().max(1.0);
            assert!(rel <= 1e-10, "im mismatch at worker count {workers}: {a} vs {b}");
        }
    }
}

#[test]
fn rpa_is_the_stls_closure_with_g_identically_zero() {
    let grid = small_grid();
    let theta = 1.0;
    let rs = 0.5;
    let mu = solve_chemical_potential(theta, -10.0, 10.0).unwrap();
    let quad = Quadrature::default_tolerance();
    let phi = fill_phi_matsubara(grid.x(), 4, theta, mu, &quad);
    let ssf_hf = fill_ssf_hf(grid.x(), theta, mu, &quad);
    let coupling = CouplingFactors::new(rs, theta);
    let g_zero = vec![0.0; grid.len()];

    let s_rpa = fill_static_structure_factor(grid.x(), &ssf_hf, &g_zero, &phi, coupling);
    assert!(s_rpa.iter().all(|v| v.is_finite()));
    assert_eq!(s_rpa[0], 0.0);
}
