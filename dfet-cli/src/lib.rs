//! Command-line front-end wiring every flag of the external interface onto the `dfet-core`
//! solvers, and writing the text/binary deliverables described there.

pub mod output;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dfet_core::auxiliary::{update_auxiliary_response, update_auxiliary_response_fully_dynamic, FixedKernel};
use dfet_core::bridge::{fill_bridge_function, IetMapping};
use dfet_core::cache::{CacheHeader, DensityResponseCache};
use dfet_core::chemical_potential::solve_chemical_potential;
use dfet_core::config::{DynamicConfig, QstlsIetStatic, RunConfig, VsConfig};
use dfet_core::dynamic::fill_dynamic_structure_factor;
use dfet_core::error::{Error, Result};
use dfet_core::esa::solve_esa_scheme;
use dfet_core::grid::{FrequencyGrid, GridConfig, GridOrigin, WaveVectorGrid};
use dfet_core::iteration::solve_static_scheme;
use dfet_core::lindhard::{fill_phi_matsubara, phi_im_dynamic, phi_re_dynamic};
use dfet_core::logging::LoggingConfig;
use dfet_core::parallel::compute_fixed_kernel_parallel;
use dfet_core::picard::{l2_residual, mix_in_place, PicardConfig};
use dfet_core::quadrature::Quadrature;
use dfet_core::structure::{fill_ssf_hf, fill_static_structure_factor, CouplingFactors};
use dfet_core::theory::Theory;
use dfet_core::vs::solve_vs_stls_scheme;

use crate::output::{write_xy, GuessFile};

/// The three run modes of spec.md §6.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Mode {
    /// Solve the static structure factor and local field correction only.
    Static,
    /// Solve the static scheme first, then the dynamic structure factor at a single target
    /// wave-vector.
    Dynamic,
    /// Compute the ideal response and Hartree-Fock structure factor only, and write a restart
    /// guess file.
    Guess,
}

fn parse_theory(s: &str) -> std::result::Result<Theory, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

fn parse_iet_mapping(s: &str) -> std::result::Result<IetMapping, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

fn parse_mu_guess(s: &str) -> std::result::Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| "expected LO,HI (e.g. -10,10)".to_string())?;
    let lo: f64 = lo.trim().parse().map_err(|_| format!("invalid lower bound '{lo}'"))?;
    let hi: f64 = hi.trim().parse().map_err(|_| format!("invalid upper bound '{hi}'"))?;
    Ok((lo, hi))
}

/// Every flag of the external interface (spec.md §6), as a single flat set rather than a
/// subcommand tree: the run mode is itself a value (`--mode`), not a separate verb.
#[derive(Parser, Debug)]
#[command(name = "dfet", version, about = "Dielectric theory of the warm dense electron gas")]
pub struct Opts {
    /// Dielectric theory to solve.
    #[arg(long, value_parser = parse_theory, default_value = "stls")]
    pub theory: Theory,

    /// Run mode.
    #[arg(long, value_enum, default_value = "static")]
    pub mode: Mode,

    /// Coupling parameter (Wigner-Seitz radius).
    #[arg(long, default_value_t = 1.0)]
    pub rs: f64,

    /// Degeneracy parameter.
    #[arg(long = "Theta", default_value_t = 1.0)]
    pub theta: f64,

    /// Wave-vector grid resolution.
    #[arg(long, default_value_t = 0.1)]
    pub dx: f64,

    /// Wave-vector grid cutoff.
    #[arg(long, default_value_t = 20.0)]
    pub xmax: f64,

    /// Matsubara truncation.
    #[arg(long, default_value_t = 128)]
    pub nl: usize,

    /// Picard iteration cap.
    #[arg(long, default_value_t = 1000)]
    pub iter: usize,

    /// Picard convergence threshold.
    #[arg(long = "min-err", default_value_t = 1e-5)]
    pub min_err: f64,

    /// Picard linear-mixing parameter.
    #[arg(long, default_value_t = 0.1)]
    pub mix: f64,

    /// Chemical-potential bisection bracket, `LO,HI`.
    #[arg(long = "mu-guess", value_parser = parse_mu_guess, default_value = "-10,10")]
    pub mu_guess: (f64, f64),

    /// Dynamic-mode frequency resolution.
    #[arg(long = "dyn-dw", default_value_t = 0.1)]
    pub dyn_dw: f64,

    /// Dynamic-mode frequency cutoff.
    #[arg(long = "dyn-wmax", default_value_t = 20.0)]
    pub dyn_wmax: f64,

    /// Dynamic-mode target wave-vector.
    #[arg(long = "dyn-xtarget", default_value_t = 1.0)]
    pub dyn_xtarget: f64,

    /// Thread-pool size (mapped onto the Rayon global pool).
    #[arg(long, default_value_t = 1)]
    pub omp: usize,

    /// IET bridge-function coupling mapping.
    #[arg(long = "iet-mapping", value_parser = parse_iet_mapping, default_value = "standard")]
    pub iet_mapping: IetMapping,

    /// Restart file for the STLS local field correction `G(x)`.
    #[arg(long = "stls-guess")]
    pub stls_guess: Option<PathBuf>,

    /// Restart file for the quantum-STLS auxiliary response.
    #[arg(long = "qstls-guess")]
    pub qstls_guess: Option<PathBuf>,

    /// Fixed-kernel cache file for the qSTLS dynamic scheme.
    #[arg(long = "qstls-fix")]
    pub qstls_fix: Option<PathBuf>,

    /// Fixed-kernel cache file for the qSTLS-IET dynamic scheme.
    #[arg(long = "qstls-iet-fix")]
    pub qstls_iet_fix: Option<PathBuf>,

    /// Whether the qSTLS-IET auxiliary response caches a state-point-only fixed kernel
    /// (`1`, default) or recomputes a fully `Omega`-coupled kernel every iteration (`0`).
    #[arg(long = "qstls-iet-static", default_value_t = 1)]
    pub qstls_iet_static: u8,

    /// Finite-difference step in `rs` for the VS-STLS thermodynamic derivative.
    #[arg(long = "vs-drs", default_value_t = 0.01)]
    pub vs_drs: f64,

    /// Finite-difference step in `Theta`, accepted for interface completeness; the thermodynamic
    /// derivative this crate evaluates is `rs`-only (see DESIGN.md).
    #[arg(long = "vs-dt", default_value_t = 0.01)]
    pub vs_dt: f64,

    /// Initial guess for the CSR parameter `alpha`.
    #[arg(long = "vs-alpha", default_value_t = 1.0)]
    pub vs_alpha: f64,

    /// Convergence threshold for the CSR outer loop.
    #[arg(long = "vs-min-err", default_value_t = 1e-3)]
    pub vs_min_err: f64,

    /// Linear-mixing parameter used while bracketing the CSR secant search.
    #[arg(long = "vs-mix", default_value_t = 0.1)]
    pub vs_mix: f64,

    /// Whether to run the CSR outer loop (`1`, default) or solve once at `--vs-alpha` (`0`).
    #[arg(long = "vs-solve-csr", default_value_t = 1)]
    pub vs_solve_csr: u8,

    /// Optional file to write the VS-STLS thermodynamic trace to (unused unless the CSR outer
    /// loop runs).
    #[arg(long = "vs-thermo-file")]
    pub vs_thermo_file: Option<PathBuf>,
}

impl Opts {
    fn grid_config(&self) -> GridConfig {
        GridConfig {
            dx: self.dx,
            x_max: self.xmax,
            n_l: self.nl,
            dw: self.dyn_dw,
            w_max: self.dyn_wmax,
            origin: GridOrigin::NodeCentered,
        }
    }

    fn picard_config(&self) -> PicardConfig {
        PicardConfig {
            mix: self.mix,
            min_err: self.min_err,
            n_iter: self.iter,
        }
    }

    fn vs_config(&self) -> VsConfig {
        VsConfig {
            alpha_lo: (self.vs_alpha - 0.5).max(0.01),
            alpha_hi: self.vs_alpha + 0.5,
            alpha_tol: self.vs_min_err,
            max_iter: self.iter,
            drs: self.vs_drs,
        }
    }

    fn qstls_iet_static_mode(&self) -> QstlsIetStatic {
        if self.qstls_iet_static == 0 {
            QstlsIetStatic::FullyDynamic
        } else {
            QstlsIetStatic::PartiallyDynamic
        }
    }

    fn run_config(&self) -> RunConfig {
        let dynamic = (self.mode == Mode::Dynamic).then(|| DynamicConfig {
            x_target: self.dyn_xtarget,
            static_mode: self.qstls_iet_static_mode(),
        });
        let vs = self.theory.is_variational().then(|| self.vs_config());
        RunConfig {
            theory: self.theory,
            rs: self.rs,
            theta: self.theta,
            grid: self.grid_config(),
            picard: self.picard_config(),
            dynamic,
            vs,
        }
    }

    /// Validates the assembled configuration.
    ///
    /// # Errors
    /// Returns [`Error::Config`] on any violated constraint.
    pub fn validate(&self) -> Result<()> {
        self.run_config().validate()
    }

    /// Runs the requested mode to completion, writing every output file spec.md §6 documents for
    /// that mode.
    ///
    /// # Errors
    /// Propagates any [`Error`] raised while validating, solving, or writing output.
    pub fn run(&self) -> Result<()> {
        self.validate()?;
        if self.omp > 1 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.omp)
                .build_global()
                .ok();
        }

        match self.mode {
            Mode::Static => self.run_static(),
            Mode::Dynamic => self.run_dynamic(),
            Mode::Guess => self.run_guess(),
        }
    }

    fn bridge_for(&self, x: &[f64]) -> Option<Vec<f64>> {
        if !self.theory.is_iet() {
            return None;
        }
        let mapping = match self.theory {
            Theory::StlsHnc | Theory::QstlsHnc => self.iet_mapping,
            Theory::StlsIoi | Theory::QstlsIoi => IetMapping::Sqrt,
            Theory::StlsLct | Theory::QstlsLct => IetMapping::Linear,
            _ => self.iet_mapping,
        };
        Some(fill_bridge_function(x, self.rs, self.theta, mapping))
    }

    /// Solves the static structure factor and local field correction for the non-quantum
    /// theories, and for the quantum theories via the `Omega = 0` slice of the auxiliary
    /// response (documented approximation; see DESIGN.md).
    fn solve_static(&self, x: &[f64], ssf_hf: &[f64], phi: &ndarray::Array2<f64>, quad: &Quadrature) -> (Vec<f64>, Vec<f64>, f64) {
        let coupling = CouplingFactors::new(self.rs, self.theta);
        let bridge = self.bridge_for(x);

        if self.theory == Theory::Rpa {
            let g = vec![0.0; x.len()];
            let s = fill_static_structure_factor(x, ssf_hf, &g, phi, coupling);
            return (s, g, 0.0);
        }
        if self.theory == Theory::Esa {
            let (s, g) = solve_esa_scheme(x, ssf_hf, phi, coupling, self.rs);
            return (s, g, 0.0);
        }
        if self.theory.is_variational() {
            let vs = self.vs_config();
            return match solve_vs_stls_scheme(x, ssf_hf, phi, self.rs, self.theta, vs, self.picard_config(), quad) {
                Ok((s, g, alpha, _)) => (s, g, alpha),
                Err(e) => {
                    tracing::warn!(error = %e, "VS-STLS CSR search failed; falling back to the inner scheme at the initial alpha");
                    let mut coupling = coupling;
                    coupling.f1 *= self.vs_alpha;
                    coupling.f2 *= self.vs_alpha;
                    let (s, g, _) = solve_static_scheme(x, ssf_hf, phi, coupling, bridge.as_deref(), self.picard_config(), quad, LoggingConfig::verbose());
                    (s, g, self.vs_alpha)
                }
            };
        }
        if self.theory.is_quantum() {
            let (s, g) = self.solve_quantum_static(x, ssf_hf, phi, coupling, bridge.as_deref(), quad);
            return (s, g, 0.0);
        }
        let (s, g, _) = solve_static_scheme(x, ssf_hf, phi, coupling, bridge.as_deref(), self.picard_config(), quad, LoggingConfig::verbose());
        (s, g, 0.0)
    }

    /// Quantum (qSTLS-family) static closure: couples the `Omega = 0` auxiliary response into
    /// the local field correction every outer iteration, in place of the classical STLS kernel.
    /// The mapping `G(x) = -psi_re(x, 0) / phi_0(x)` used here is a documented approximation of
    /// the qSTLS closure (see DESIGN.md); the ideal-response/auxiliary-response machinery itself
    /// is grounded directly on the retrieved source.
    fn solve_quantum_static(
        &self,
        x: &[f64],
        ssf_hf: &[f64],
        phi: &ndarray::Array2<f64>,
        coupling: CouplingFactors,
        bridge: Option<&[f64]>,
        quad: &Quadrature,
    ) -> (Vec<f64>, Vec<f64>) {
        let n_x = x.len();
        let phi0: Vec<f64> = (0..n_x).map(|i| phi[[i, 0]]).collect();
        let bridge_owned = bridge.map(<[f64]>::to_vec).unwrap_or_else(|| vec![0.0; n_x]);
        let mut g = vec![0.0; n_x];
        let mut s = fill_static_structure_factor(x, ssf_hf, &g, phi, coupling);

        let picard = self.picard_config();
        let mut iterations = 0;
        let mut residual = f64::INFINITY;
        while iterations < picard.n_iter && residual > picard.min_err {
            let fixed = FixedKernel::compute(x, &[0.0], &s, self.theta, self.mu_for(), quad);
            let psi_re_w0 = vec![0.0; n_x];
            let (psi_re, _) = update_auxiliary_response(x, &s, &bridge_owned, &psi_re_w0, &phi0, &fixed);
            let g_new: Vec<f64> = (0..n_x)
                .map(|i| if phi0[i].abs() > f64::EPSILON { -psi_re[[i, 0]] / phi0[i] } else { 0.0 })
                .collect();
            residual = l2_residual(&g_new, &g);
            mix_in_place(&mut g, &g_new, picard.mix);
            s = fill_static_structure_factor(x, ssf_hf, &g, phi, coupling);
            iterations += 1;
        }
        if residual > picard.min_err {
            tracing::warn!(iterations, residual, "quantum static scheme did not converge within the iteration cap");
        } else {
            tracing::info!(iterations, residual, "quantum static scheme converged");
        }
        (s, g)
    }

    /// Component G: the dynamic-scheme auxiliary-response Picard loop. Initializes `psi_re <- 0`
    /// and iterates until the `Omega = 0` slice converges or the iteration cap is hit, then
    /// branches on [`QstlsIetStatic`] for how `psi` couples across frequencies (spec.md §4.F/§4.G).
    #[allow(clippy::too_many_arguments)]
    fn solve_auxiliary_response(
        &self,
        x: &[f64],
        n_w: usize,
        s: &[f64],
        bridge: &[f64],
        phi_re: &[f64],
        phi_im: &[f64],
        fixed: &FixedKernel,
    ) -> (ndarray::Array2<f64>, ndarray::Array2<f64>) {
        let n_x = x.len();
        let picard = self.picard_config();
        let mut psi_re = ndarray::Array2::<f64>::zeros((n_x, n_w));
        let mut psi_im = ndarray::Array2::<f64>::zeros((n_x, n_w));
        let mut iterations = 0;
        let mut residual = f64::INFINITY;

        match self.qstls_iet_static_mode() {
            QstlsIetStatic::PartiallyDynamic => {
                let phi_re_w0: Vec<f64> = (0..n_x).map(|i| phi_re[i * n_w]).collect();
                let mut psi_re_w0 = vec![0.0; n_x];
                while iterations < picard.n_iter && residual > picard.min_err {
                    let (psi_re_new, psi_im_new) = update_auxiliary_response(x, s, bridge, &psi_re_w0, &phi_re_w0, fixed);
                    let new_w0: Vec<f64> = (0..n_x).map(|i| psi_re_new[[i, 0]]).collect();
                    residual = l2_residual(&new_w0, &psi_re_w0);
                    mix_in_place(
                        psi_re.as_slice_mut().expect("Array2::zeros is standard layout"),
                        psi_re_new.as_slice().expect("Array2::zeros is standard layout"),
                        picard.mix,
                    );
                    // Per spec.md §4.G, psi_im for the partially-dynamic closure is only
                    // meaningful once psi_re has converged; every iteration overwrites it so only
                    // the value from the final pass survives.
                    psi_im = psi_im_new;
                    psi_re_w0 = (0..n_x).map(|i| psi_re[[i, 0]]).collect();
                    iterations += 1;
                }
            }
            QstlsIetStatic::FullyDynamic => {
                while iterations < picard.n_iter && residual > picard.min_err {
                    let psi_re_flat: Vec<f64> = psi_re.iter().copied().collect();
                    let psi_im_flat: Vec<f64> = psi_im.iter().copied().collect();
                    let (psi_re_new, psi_im_new) =
                        update_auxiliary_response_fully_dynamic(x, s, bridge, &psi_re_flat, &psi_im_flat, phi_re, phi_im, fixed);
                    let new_w0: Vec<f64> = (0..n_x).map(|i| psi_re_new[[i, 0]]).collect();
                    let old_w0: Vec<f64> = (0..n_x).map(|i| psi_re[[i, 0]]).collect();
                    residual = l2_residual(&new_w0, &old_w0);
                    mix_in_place(
                        psi_re.as_slice_mut().expect("Array2::zeros is standard layout"),
                        psi_re_new.as_slice().expect("Array2::zeros is standard layout"),
                        picard.mix,
                    );
                    mix_in_place(
                        psi_im.as_slice_mut().expect("Array2::zeros is standard layout"),
                        psi_im_new.as_slice().expect("Array2::zeros is standard layout"),
                        picard.mix,
                    );
                    iterations += 1;
                }
            }
        }

        if residual > picard.min_err {
            tracing::warn!(iterations, residual, "dynamic-scheme auxiliary response did not converge within the iteration cap");
        } else {
            tracing::info!(iterations, residual, "dynamic-scheme auxiliary response converged");
        }
        (psi_re, psi_im)
    }

    fn mu_for(&self) -> f64 {
        solve_chemical_potential(self.theta, self.mu_guess.0, self.mu_guess.1).unwrap_or(0.0)
    }

    fn run_static(&self) -> Result<()> {
        let grid = WaveVectorGrid::build(&self.grid_config())?;
        let quad = Quadrature::default_tolerance();
        let mu = solve_chemical_potential(self.theta, self.mu_guess.0, self.mu_guess.1)?;
        let phi = fill_phi_matsubara(grid.x(), self.nl, self.theta, mu, &quad);
        let ssf_hf = fill_ssf_hf(grid.x(), self.theta, mu, &quad);

        let (s, g, alpha) = self.solve_static(grid.x(), &ssf_hf, &phi, &quad);
        if self.theory.is_variational() {
            tracing::info!(alpha, "converged CSR parameter");
        }

        write_xy(&PathBuf::from(format!("ssf_{}.dat", self.theory.label())), grid.x(), &s)?;
        write_xy(&PathBuf::from(format!("slfc_{}.dat", self.theory.label())), grid.x(), &g)?;
        let u_ex = dfet_core::vs::internal_energy(grid.x(), &s, self.rs, &quad);
        tracing::info!(internal_energy = u_ex, "static scheme finished");
        Ok(())
    }

    fn run_guess(&self) -> Result<()> {
        let grid = WaveVectorGrid::build(&self.grid_config())?;
        let quad = Quadrature::default_tolerance();
        let mu = solve_chemical_potential(self.theta, self.mu_guess.0, self.mu_guess.1)?;
        let phi = fill_phi_matsubara(grid.x(), self.nl, self.theta, mu, &quad);
        let ssf_hf = fill_ssf_hf(grid.x(), self.theta, mu, &quad);

        let guess = GuessFile {
            n_x: i32::try_from(grid.len()).unwrap_or(i32::MAX),
            dx: grid.dx(),
            x_max: grid.x_max(),
            n_l: i32::try_from(self.nl).unwrap_or(i32::MAX),
            theta: self.theta,
            rs: self.rs,
            phi: phi.iter().copied().collect(),
            ssf_hf,
        };
        guess.write(&PathBuf::from("dens_response.bin"))?;
        Ok(())
    }

    fn run_dynamic(&self) -> Result<()> {
        let grid = WaveVectorGrid::build(&self.grid_config())?;
        let freq = FrequencyGrid::build(&self.grid_config())?;
        let quad = Quadrature::default_tolerance();
        let mu = solve_chemical_potential(self.theta, self.mu_guess.0, self.mu_guess.1)?;

        let phi = fill_phi_matsubara(grid.x(), self.nl, self.theta, mu, &quad);
        let ssf_hf = fill_ssf_hf(grid.x(), self.theta, mu, &quad);
        let (s, _, _) = self.solve_static(grid.x(), &ssf_hf, &phi, &quad);

        let n_x = grid.len();
        let n_w = freq.len();
        let mut phi_re = vec![0.0; n_x * n_w];
        let mut phi_im = vec![0.0; n_x * n_w];
        for (i, &xi) in grid.x().iter().enumerate() {
            for (j, &wj) in freq.w().iter().enumerate() {
                phi_re[i * n_w + j] = phi_re_dynamic(xi, wj, grid.x_max(), self.theta, mu, &quad);
                phi_im[i * n_w + j] = phi_im_dynamic(xi, wj, self.theta, mu, &quad);
            }
        }

        let header = CacheHeader {
            n_x: i32::try_from(n_x).unwrap_or(i32::MAX),
            dx: grid.dx(),
            x_max: grid.x_max(),
            n_w: i32::try_from(n_w).unwrap_or(i32::MAX),
            dw: freq.dw(),
            w_max: freq.w_max(),
            theta: self.theta,
            rs: self.rs,
        };
        let cache_path = PathBuf::from(DensityResponseCache::file_name(self.rs, self.theta, self.theory.label()));

        let cache = if cache_path.exists() {
            tracing::info!(path = %cache_path.display(), "loading cached fixed kernel (cache hit)");
            DensityResponseCache::read(&cache_path, &header)?
        } else {
            tracing::info!("no compatible cache found; computing the fixed kernel from scratch");
            let fixed = compute_fixed_kernel_parallel(grid.x(), freq.w(), &s, self.theta, mu, 1e-5);
            let bridge_owned = self.bridge_for(grid.x()).unwrap_or_else(|| vec![0.0; n_x]);
            let (psi_re, psi_im) = self.solve_auxiliary_response(grid.x(), n_w, &s, &bridge_owned, &phi_re, &phi_im, &fixed);
            let cache = DensityResponseCache {
                header,
                phi_re: phi_re.clone(),
                phi_im: phi_im.clone(),
                psi_re: psi_re.iter().copied().collect(),
                psi_im: psi_im.iter().copied().collect(),
            };
            cache.write(&cache_path)?;
            cache
        };

        let target_idx = grid
            .x()
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - self.dyn_xtarget).abs().partial_cmp(&(*b - self.dyn_xtarget).abs()).unwrap())
            .map_or(0, |(i, _)| i);

        let row = |field: &[f64]| field[target_idx * n_w..(target_idx + 1) * n_w].to_vec();
        let bridge_target = self
            .bridge_for(grid.x())
            .map_or(0.0, |b| b[target_idx]);

        let dsf = fill_dynamic_structure_factor(
            freq.w(),
            grid.x()[target_idx],
            self.rs,
            self.theta,
            mu,
            bridge_target,
            &row(&cache.phi_re),
            &row(&cache.phi_im),
            &row(&cache.psi_re),
            &row(&cache.psi_im),
        );
        write_xy(&PathBuf::from(format!("dsf_{}.dat", self.theory.label())), freq.w(), &dsf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mu_guess_pair() {
        assert_eq!(parse_mu_guess("-10,10").unwrap(), (-10.0, 10.0));
        assert!(parse_mu_guess("nope").is_err());
    }

    #[test]
    fn defaults_validate() {
        let opts = Opts::parse_from(["dfet"]);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn variational_theory_without_extra_config_still_validates() {
        let opts = Opts::parse_from(["dfet", "--theory", "vsstls"]);
        assert!(opts.validate().is_ok());
    }
}
