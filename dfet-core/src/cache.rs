//! Component I: the binary density-response cache.
//!
//! Stores a converged `(phi_re, phi_im, psi_re, psi_im)` dynamic-response field next to a header
//! describing the grid and state point it was computed for, so a later run at the same `(rs,
//! Theta)` and grid can reuse it instead of recomputing the three-level quadrature of component F.
//! Byte layout and header-match tolerance are ported directly from the reference
//! implementation's restart-file reader/writer.

use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::path::Path;

/// Header-match tolerance, matching the reference implementation's `DBL_TOL`.
const DBL_TOL: f64 = 1e-10;

/// Header describing the grid and state point a cached density response was computed for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheHeader {
    /// Wave-vector grid point count.
    pub n_x: i32,
    /// Wave-vector grid spacing.
    pub dx: f64,
    /// Wave-vector cutoff.
    pub x_max: f64,
    /// Frequency grid point count.
    pub n_w: i32,
    /// Frequency grid spacing.
    pub dw: f64,
    /// Frequency cutoff.
    pub w_max: f64,
    /// Degeneracy parameter.
    pub theta: f64,
    /// Coupling parameter.
    pub rs: f64,
}

impl CacheHeader {
    /// Checks that `other` matches `self` within [`DBL_TOL`], returning a descriptive
    /// [`Error::CacheMismatch`] naming the first mismatching field otherwise.
    pub fn check_compatible(&self, other: &Self) -> Result<()> {
        if other.n_x != self.n_x || (other.dx - self.dx).abs() > DBL_TOL || (other.x_max - self.x_max).abs() > DBL_TOL {
            return Err(Error::CacheMismatch(format!(
                "wave-vector grid mismatch: expected n_x={}, dx={}, x_max={}, found n_x={}, dx={}, x_max={}",
                self.n_x, self.dx, self.x_max, other.n_x, other.dx, other.x_max
            )));
        }
        if other.n_w != self.n_w || (other.dw - self.dw).abs() > DBL_TOL || (other.w_max - self.w_max).abs() > DBL_TOL {
            return Err(Error::CacheMismatch(format!(
                "frequency grid mismatch: expected n_W={}, dW={}, W_max={}, found n_W={}, dW={}, W_max={}",
                self.n_w, self.dw, self.w_max, other.n_w, other.dw, other.w_max
            )));
        }
        if (other.theta - self.theta).abs() > DBL_TOL || (other.rs - self.rs).abs() > DBL_TOL {
            return Err(Error::CacheMismatch(format!(
                "state point mismatch: expected theta={}, rs={}, found theta={}, rs={}",
                self.theta, self.rs, other.theta, other.rs
            )));
        }
        Ok(())
    }
}

/// A cached dynamic density response: the header it was computed for plus the four flattened
/// `n_x * n_W` fields.
#[derive(Clone, Debug)]
pub struct DensityResponseCache {
    /// The grid/state-point header.
    pub header: CacheHeader,
    /// Real part of the ideal response, row-major `(x, Omega)`.
    pub phi_re: Vec<f64>,
    /// Imaginary part of the ideal response.
    pub phi_im: Vec<f64>,
    /// Real part of the auxiliary response.
    pub psi_re: Vec<f64>,
    /// Imaginary part of the auxiliary response.
    pub psi_im: Vec<f64>,
}

impl DensityResponseCache {
    /// The canonical file name for a cache at the given state point and theory label, e.g.
    /// `dynamic_adr_rs1.000_theta1.000_qstls_iet.bin`.
    #[must_use]
    pub fn file_name(rs: f64, theta: f64, theory: &str) -> String {
        format!("dynamic_adr_rs{rs:.3}_theta{theta:.3}_{theory}.bin")
    }

    /// Writes the header followed by `phi_re`, `phi_im`, `psi_re`, `psi_im` (in that order) as
    /// raw little-endian doubles, matching the reference byte layout exactly.
    ///
    /// # Errors
    /// Returns [`Error::Io`] on any filesystem failure.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        file.write_all(&self.header.n_x.to_le_bytes())?;
        file.write_all(&self.header.dx.to_le_bytes())?;
        file.write_all(&self.header.x_max.to_le_bytes())?;
        file.write_all(&self.header.n_w.to_le_bytes())?;
        file.write_all(&self.header.dw.to_le_bytes())?;
        file.write_all(&self.header.w_max.to_le_bytes())?;
        file.write_all(&self.header.theta.to_le_bytes())?;
        file.write_all(&self.header.rs.to_le_bytes())?;
        for field in [&self.phi_re, &self.phi_im, &self.psi_re, &self.psi_im] {
            for v in field {
                file.write_all(&v.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Reads a cache file and validates its header against `expected`.
    ///
    /// # Errors
    /// Returns [`Error::Io`] on a truncated or unreadable file, or [`Error::CacheMismatch`] if the
    /// header does not match `expected` within [`DBL_TOL`], if the payload is short, or if
    /// trailing bytes remain after the expected payload.
    pub fn read(path: &Path, expected: &CacheHeader) -> Result<Self> {
        let mut file = std::io::BufReader::new(std::fs::File::open(path)?);
        let header = read_header(&mut file)?;
        expected.check_compatible(&header)?;

        let n = (header.n_x as usize) * (header.n_w as usize);
        let phi_re = read_doubles(&mut file, n)?;
        let phi_im = read_doubles(&mut file, n)?;
        let psi_re = read_doubles(&mut file, n)?;
        let psi_im = read_doubles(&mut file, n)?;

        let mut probe = [0u8; 1];
        if file.read(&mut probe)? != 0 {
            return Err(Error::CacheMismatch(
                "expected end of file, but there is still data left to read".into(),
            ));
        }

        Ok(Self {
            header,
            phi_re,
            phi_im,
            psi_re,
            psi_im,
        })
    }
}

fn read_header<R: Read>(file: &mut R) -> Result<CacheHeader> {
    Ok(CacheHeader {
        n_x: read_i32(file)?,
        dx: read_f64(file)?,
        x_max: read_f64(file)?,
        n_w: read_i32(file)?,
        dw: read_f64(file)?,
        w_max: read_f64(file)?,
        theta: read_f64(file)?,
        rs: read_f64(file)?,
    })
}

fn read_i32<R: Read>(file: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f64<R: Read>(file: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_doubles<R: Read>(file: &mut R, n: usize) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(read_f64(file)?);
    }
    Ok(out)
}
