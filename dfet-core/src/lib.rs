//! Self-consistent dielectric-theory solvers for the warm dense uniform electron gas.
//!
//! This crate computes the static and dynamic structure factors of the three-dimensional uniform
//! electron gas at finite temperature, under a family of closures of increasing sophistication:
//! RPA, (quantum-)STLS, its hypernetted-chain/IET bridge-corrected variants, the
//! variationally-self-consistent VS-STLS/qVS-STLS schemes, and the non-iterative ESA closure.
//!
//! The data flow mirrors the physical dependency chain:
//! `A` (grids) `-> C` (ideal density response) `-> D` (structure-factor closure) `-> E`
//! (classical Picard loop), or, for the quantum/dynamic schemes, `-> G -> F -> H` (the auxiliary-
//! response loop feeding the dynamic structure factor). The VS variant wraps `E`/`G` in `K`.

pub mod auxiliary;
pub mod bridge;
pub mod cache;
pub mod chemical_potential;
pub mod config;
pub mod dynamic;
pub mod error;
pub mod esa;
pub mod fermi_dirac;
pub mod grid;
pub mod iteration;
pub mod lindhard;
pub mod logging;
pub mod parallel;
pub mod picard;
pub mod quadrature;
pub mod spline;
pub mod structure;
pub mod theory;
pub mod vs;

pub use error::{Error, Result};
