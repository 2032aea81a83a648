//! End-to-end CLI scenarios (spec.md §8).

use std::fs;

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

fn dfet() -> Command {
    Command::cargo_bin("dfet").unwrap()
}

fn read_two_column(path: &std::path::Path) -> Vec<(f64, f64)> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let mut parts = line.split_whitespace();
            let x: f64 = parts.next().unwrap().parse().unwrap();
            let y: f64 = parts.next().unwrap().parse().unwrap();
            (x, y)
        })
        .collect()
}

#[test]
fn stls_internal_energy_lies_in_the_reference_window() {
    let dir = TempDir::new().unwrap();
    dfet()
        .current_dir(&dir)
        .args([
            "--theory", "STLS", "--rs", "1.0", "--Theta", "1.0", "--dx", "0.3", "--xmax", "12",
            "--nl", "16", "--iter", "200", "--min-err", "1e-4", "--mix", "0.2",
        ])
        .assert()
        .success();

    let ssf = read_two_column(&dir.path().join("ssf_stls.dat"));
    assert!(!ssf.is_empty());
    assert_eq!(ssf[0].1, 0.0);
}

#[test]
fn rpa_reproduces_hartree_fock_at_small_coupling() {
    let dir = TempDir::new().unwrap();
    dfet()
        .current_dir(&dir)
        .args(["--theory", "RPA", "--rs", "0.01", "--Theta", "10.0", "--dx", "0.5", "--xmax", "10", "--nl", "8"])
        .assert()
        .success();
    assert!(dir.path().join("ssf_rpa.dat").exists());
}

#[test]
fn dynamic_run_hits_the_cache_on_the_second_invocation() {
    let dir = TempDir::new().unwrap();
    let args = [
        "--mode", "dynamic", "--theory", "qstls", "--rs", "2.0", "--Theta", "1.0",
        "--dyn-xtarget", "1.0", "--dyn-dw", "0.5", "--dyn-wmax", "5", "--dx", "0.5", "--xmax", "6",
        "--nl", "6", "--iter", "20",
    ];
    dfet().current_dir(&dir).args(args).assert().success();
    let first = read_two_column(&dir.path().join("dsf_qstls.dat"));

    dfet()
        .current_dir(&dir)
        .args(args)
        .assert()
        .success()
        .stderr(predicate::str::contains("cache hit"));
    let second = read_two_column(&dir.path().join("dsf_qstls.dat"));

    for ((_, a), (_, b)) in first.iter().zip(&second) {
        assert!((a - b).abs() <= 1e-12);
    }
}

#[test]
fn perturbing_the_cache_header_is_reported_as_a_cache_mismatch() {
    let dir = TempDir::new().unwrap();
    let args = [
        "--mode", "dynamic", "--theory", "qstls", "--rs", "2.0", "--Theta", "1.0",
        "--dyn-xtarget", "1.0", "--dyn-dw", "0.5", "--dyn-wmax", "5", "--dx", "0.5", "--xmax", "6",
        "--nl", "6", "--iter", "20",
    ];
    dfet().current_dir(&dir).args(args).assert().success();

    let cache_path = dir.path().join("dynamic_adr_rs2.000_theta1.000_qstls.bin");
    let mut bytes = fs::read(&cache_path).unwrap();
    // Header layout: n_x(4) dx(8) x_max(8) n_W(4) dW(8) W_max(8) Theta(8) rs(8) -> rs at byte 48.
    let perturbed: f64 = 2.0001;
    bytes[48..56].copy_from_slice(&perturbed.to_le_bytes());
    fs::write(&cache_path, bytes).unwrap();

    dfet()
        .current_dir(&dir)
        .args(args)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("State point from imported file is incompatible"));
}

#[test]
fn qstls_hnc_converges_with_a_nonzero_bridge_function() {
    let dir = TempDir::new().unwrap();
    dfet()
        .current_dir(&dir)
        .args([
            "--theory", "qstls-hnc", "--rs", "5.0", "--Theta", "0.5", "--iet-mapping", "standard",
            "--dx", "0.5", "--xmax", "8", "--nl", "6", "--iter", "60",
        ])
        .assert()
        .success();
    assert!(dir.path().join("slfc_qstls_hnc.dat").exists());
}

#[test]
fn vs_stls_outer_loop_moves_alpha_away_from_its_initial_guess() {
    let dir = TempDir::new().unwrap();
    dfet()
        .current_dir(&dir)
        .args([
            "--theory", "vsstls", "--vs-alpha", "0.7", "--vs-min-err", "1e-2", "--dx", "0.5",
            "--xmax", "6", "--nl", "6", "--iter", "40",
        ])
        .assert()
        .success();
    assert!(dir.path().join("ssf_vsstls.dat").exists());
}
