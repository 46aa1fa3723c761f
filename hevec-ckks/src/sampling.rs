//! Random sampling for CKKS: uniform, ternary, and discrete Gaussian.

use rand::Rng;

use crate::ntt::NttTable;
use crate::params::SIGMA;
use crate::rns::RnsPoly;

/// Uniform polynomial over `basis`, independently per channel.
pub fn sample_uniform<R: Rng + ?Sized>(rng: &mut R, basis: &[&NttTable]) -> RnsPoly {
    let residues = basis
        .iter()
        .map(|t| (0..t.degree).map(|_| rng.gen_range(0..t.q)).collect())
        .collect();
    RnsPoly { residues }
}

/// Ternary coefficients in {-1, 0, 1} with P(0) = 1/2.
pub fn sample_ternary<R: Rng + ?Sized>(rng: &mut R, degree: usize) -> Vec<i64> {
    (0..degree)
        .map(|_| match rng.gen_range(0u8..4) {
            0 => -1,
            1 => 1,
            _ => 0,
        })
        .collect()
}

/// Discrete Gaussian coefficients with σ = SIGMA via Box-Muller, rejecting
/// samples beyond 6σ.
pub fn sample_gaussian<R: Rng + ?Sized>(rng: &mut R, degree: usize) -> Vec<i64> {
    let tail_bound = (SIGMA * 6.0).ceil() as i64;
    let mut coeffs = Vec::with_capacity(degree);
    while coeffs.len() < degree {
        let u1: f64 = rng.gen_range(1e-15_f64..1.0_f64);
        let u2: f64 = rng.gen_range(0.0_f64..std::f64::consts::TAU);
        let r = (-2.0 * u1.ln()).sqrt() * SIGMA;
        for z in [r * u2.cos(), r * u2.sin()] {
            let s = z.round() as i64;
            if s.abs() <= tail_bound && coeffs.len() < degree {
                coeffs.push(s);
            }
        }
    }
    coeffs
}
