//! Text and binary output writers for the CLI's deliverables (spec.md §6).

use dfet_core::error::Result;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Writes a two-column `x value` (or `Omega value`) text table, one row per sample.
pub fn write_xy(path: &Path, x: &[f64], y: &[f64]) -> Result<()> {
    let mut file = BufWriter::new(std::fs::File::create(path)?);
    for (&xi, &yi) in x.iter().zip(y) {
        writeln!(file, "{xi:.10e} {yi:.10e}")?;
    }
    Ok(())
}

/// The static-scheme restart/guess file: the input header plus `phi` (flattened `n_x * n_l`,
/// row-major) and `S_HF(x)`, matching spec.md §6's `dens_response.bin` description.
#[derive(Clone, Debug)]
pub struct GuessFile {
    /// Wave-vector sample count.
    pub n_x: i32,
    /// Wave-vector resolution.
    pub dx: f64,
    /// Wave-vector cutoff.
    pub x_max: f64,
    /// Matsubara truncation.
    pub n_l: i32,
    /// Degeneracy parameter.
    pub theta: f64,
    /// Coupling parameter.
    pub rs: f64,
    /// Flattened `phi[x, l]`.
    pub phi: Vec<f64>,
    /// `S_HF(x)`.
    pub ssf_hf: Vec<f64>,
}

impl GuessFile {
    /// Writes the header then the `phi` and `S_HF` payloads as little-endian doubles.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut file = BufWriter::new(std::fs::File::create(path)?);
        file.write_all(&self.n_x.to_le_bytes())?;
        file.write_all(&self.dx.to_le_bytes())?;
        file.write_all(&self.x_max.to_le_bytes())?;
        file.write_all(&self.n_l.to_le_bytes())?;
        file.write_all(&self.theta.to_le_bytes())?;
        file.write_all(&self.rs.to_le_bytes())?;
        for v in &self.phi {
            file.write_all(&v.to_le_bytes())?;
        }
        for v in &self.ssf_hf {
            file.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    /// Reads a guess file back, without cross-checking it against a caller-supplied header (the
    /// guess/restart file is advisory input, unlike the validated fixed-kernel cache of
    /// component I).
    pub fn read(path: &Path) -> Result<Self> {
        let mut file = std::io::BufReader::new(std::fs::File::open(path)?);
        let n_x = read_i32(&mut file)?;
        let dx = read_f64(&mut file)?;
        let x_max = read_f64(&mut file)?;
        let n_l = read_i32(&mut file)?;
        let theta = read_f64(&mut file)?;
        let rs = read_f64(&mut file)?;
        let phi = read_doubles(&mut file, n_x as usize * n_l as usize)?;
        let ssf_hf = read_doubles(&mut file, n_x as usize)?;
        Ok(Self {
            n_x,
            dx,
            x_max,
            n_l,
            theta,
            rs,
            phi,
            ssf_hf,
        })
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_file_round_trips() {
        let guess = GuessFile {
            n_x: 2,
            dx: 0.1,
            x_max: 0.2,
            n_l: 2,
            theta: 1.0,
            rs: 1.0,
            phi: vec![0.1, 0.2, 0.3, 0.4],
            ssf_hf: vec![1.0, 1.1],
        };
        let dir = std::env::temp_dir().join(format!("dfet-cli-guess-test-{:x}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("guess.bin");
        guess.write(&path).unwrap();
        let loaded = GuessFile::read(&path).unwrap();
        assert_eq!(loaded.phi, guess.phi);
        assert_eq!(loaded.ssf_hf, guess.ssf_hf);
        std::fs::remove_file(&path).unwrap();
    }
}
