//! Residue Number System (RNS) polynomial representation.
//!
//! A polynomial in Z_Q[X]/(X^N+1), Q = q_0·…·q_{k-1}, is stored as one
//! residue vector per prime. Every operation takes the `basis` (the NTT
//! tables of the primes the polynomial lives over) explicitly; the poly
//! itself only knows how many channels it has.

use serde::{Deserialize, Serialize};

use crate::ntt::{add_mod, center, inv_mod, mul_mod, reduce_signed, sub_mod, NttTable};

/// A polynomial in RNS form. `residues[i][j]` is coefficient j mod prime i,
/// kept in `[0, q_i)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RnsPoly {
    pub residues: Vec<Vec<u64>>,
}

impl RnsPoly {
    pub fn zero(degree: usize, channels: usize) -> Self {
        Self {
            residues: vec![vec![0u64; degree]; channels],
        }
    }

    /// Reduce signed integer coefficients into every channel of `basis`.
    pub fn from_signed(coeffs: &[i64], basis: &[&NttTable]) -> Self {
        let residues = basis
            .iter()
            .map(|t| {
                let mut res = vec![0u64; t.degree];
                for (r, &c) in res.iter_mut().zip(coeffs) {
                    *r = reduce_signed(c as i128, t.q);
                }
                res
            })
            .collect();
        Self { residues }
    }

    /// Center one residue vector mod `q` and re-reduce it into `basis`.
    /// This is the per-limb gadget digit used by key switching.
    pub fn lift_channel(residue: &[u64], q: u64, basis: &[&NttTable]) -> Self {
        let centered: Vec<i64> = residue.iter().map(|&v| center(v, q)).collect();
        Self::from_signed(&centered, basis)
    }

    pub fn channels(&self) -> usize {
        self.residues.len()
    }

    pub fn degree(&self) -> usize {
        self.residues.first().map_or(0, Vec::len)
    }

    pub fn add(&self, other: &RnsPoly, basis: &[&NttTable]) -> RnsPoly {
        self.zip_with(other, basis, add_mod)
    }

    pub fn sub(&self, other: &RnsPoly, basis: &[&NttTable]) -> RnsPoly {
        self.zip_with(other, basis, sub_mod)
    }

    pub fn neg(&self, basis: &[&NttTable]) -> RnsPoly {
        let residues = self
            .residues
            .iter()
            .zip(basis)
            .map(|(res, t)| res.iter().map(|&a| if a == 0 { 0 } else { t.q - a }).collect())
            .collect();
        RnsPoly { residues }
    }

    /// Negacyclic product, one NTT multiplication per channel.
    pub fn mul(&self, other: &RnsPoly, basis: &[&NttTable]) -> RnsPoly {
        debug_assert_eq!(self.channels(), other.channels());
        let residues = self
            .residues
            .iter()
            .zip(&other.residues)
            .zip(basis)
            .map(|((a, b), t)| t.mul(a, b))
            .collect();
        RnsPoly { residues }
    }

    /// Balanced CRT lift of every coefficient to a real number.
    ///
    /// Garner's mixed-radix form with centered digits,
    /// x = d_0 + q_0·(d_1 + q_1·(d_2 + ..)), so the result lies in
    /// (-Q/2, Q/2] for Q the product of the basis primes.
    pub fn to_centered_f64(&self, basis: &[&NttTable]) -> Vec<f64> {
        let k = self.channels();
        // inv[i][j] = q_j⁻¹ mod q_i for j < i
        let inv: Vec<Vec<u64>> = (0..k)
            .map(|i| (0..i).map(|j| inv_mod(basis[j].q % basis[i].q, basis[i].q)).collect())
            .collect();

        let mut digits = vec![0i64; k];
        (0..self.degree())
            .map(|c| {
                for i in 0..k {
                    let q = basis[i].q;
                    let mut t = self.residues[i][c];
                    for (j, &d) in digits[..i].iter().enumerate() {
                        t = mul_mod(sub_mod(t, reduce_signed(d as i128, q), q), inv[i][j], q);
                    }
                    digits[i] = center(t, q);
                }
                digits
                    .iter()
                    .zip(basis)
                    .rev()
                    .fold(0.0, |acc, (&d, t)| acc * t.q as f64 + d as f64)
            })
            .collect()
    }

    /// Galois automorphism σ_g: X → X^g, with X^N = -1.
    ///
    /// `g` must be odd, which makes j → g·j mod 2N a bijection.
    pub fn automorphism(&self, g: usize, basis: &[&NttTable]) -> RnsPoly {
        let n = self.degree();
        let two_n = 2 * n;
        debug_assert!(g % 2 == 1 && g < two_n);

        let residues = self
            .residues
            .iter()
            .zip(basis)
            .map(|(res, t)| {
                let mut out = vec![0u64; n];
                for (j, &c) in res.iter().enumerate() {
                    let idx = (g * j) % two_n;
                    if idx < n {
                        out[idx] = c;
                    } else {
                        out[idx - n] = if c == 0 { 0 } else { t.q - c };
                    }
                }
                out
            })
            .collect();
        RnsPoly { residues }
    }

    /// Divide by the last prime of `basis` with rounding and drop it.
    ///
    /// With r the centered residue mod q_last, (x - r) is an exact multiple
    /// of q_last, so channel i becomes (x_i - r) · q_last⁻¹ mod q_i.
    pub fn divide_by_last(&self, basis: &[&NttTable]) -> RnsPoly {
        let last = self.channels() - 1;
        let q_last = basis[last].q;
        let r: Vec<i64> = self.residues[last].iter().map(|&v| center(v, q_last)).collect();

        let residues = self.residues[..last]
            .iter()
            .zip(basis)
            .map(|(res, t)| {
                let q = t.q;
                let q_last_inv = inv_mod(q_last % q, q);
                res.iter()
                    .zip(&r)
                    .map(|(&x, &ri)| {
                        let diff = sub_mod(x, reduce_signed(ri as i128, q), q);
                        mul_mod(diff, q_last_inv, q)
                    })
                    .collect()
            })
            .collect();
        RnsPoly { residues }
    }

    /// Keep only the first `channels` residues (modulus switching).
    pub fn truncate(&self, channels: usize) -> RnsPoly {
        RnsPoly {
            residues: self.residues[..channels].to_vec(),
        }
    }

    /// First `channels` residues followed by the last one. Restricts a
    /// key-switching key to the basis {q_0..q_{k-1}, P}.
    pub fn select_with_last(&self, channels: usize) -> RnsPoly {
        let mut residues = self.residues[..channels].to_vec();
        if let Some(last) = self.residues.last() {
            residues.push(last.clone());
        }
        RnsPoly { residues }
    }

    fn zip_with(&self, other: &RnsPoly, basis: &[&NttTable], op: fn(u64, u64, u64) -> u64) -> RnsPoly {
        debug_assert_eq!(self.channels(), other.channels());
        let residues = self
            .residues
            .iter()
            .zip(&other.residues)
            .zip(basis)
            .map(|((a, b), t)| a.iter().zip(b).map(|(&x, &y)| op(x, y, t.q)).collect())
            .collect();
        RnsPoly { residues }
    }
}
