//! CKKS key material based on Ring-LWE.
//!
//! The public key is an RLWE instance (b, a) with b = -(a·s + e) over the
//! data primes. Key-switching keys live over the full basis
//! {q_0, .., q_L, P} and use a per-prime gadget: part i encrypts P·s'
//! in channel i only, so a ciphertext component d can be switched from s'
//! to s by summing lift(d mod q_i)·part_i and dividing by P.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::ntt::{add_mod, mul_mod, NttTable};
use crate::rns::RnsPoly;
use crate::sampling::{sample_gaussian, sample_ternary, sample_uniform};

/// Ternary secret key. Coefficients are wiped when the key is dropped.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretKey {
    coeffs: Vec<i64>,
}

impl SecretKey {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, degree: usize) -> Self {
        Self {
            coeffs: sample_ternary(rng, degree),
        }
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len()
    }

    /// s reduced into every channel of `basis`.
    pub fn poly(&self, basis: &[&NttTable]) -> RnsPoly {
        RnsPoly::from_signed(&self.coeffs, basis)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey").finish_non_exhaustive()
    }
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.coeffs.zeroize();
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Public encryption key over the data primes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicKey {
    /// b = -(a·s + e)
    pub b: RnsPoly,
    pub a: RnsPoly,
}

impl PublicKey {
    pub fn generate<R: Rng + ?Sized>(sk: &SecretKey, rng: &mut R, data_basis: &[&NttTable]) -> Self {
        let s = sk.poly(data_basis);
        let a = sample_uniform(rng, data_basis);
        let e = RnsPoly::from_signed(&sample_gaussian(rng, sk.degree()), data_basis);
        let b = a.mul(&s, data_basis).add(&e, data_basis).neg(data_basis);
        Self { b, a }
    }
}

/// Switches a ciphertext component from a key s' back to s.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeySwitchKey {
    /// (b_i, a_i) per data prime, over {q_0, .., q_L, P}.
    pub parts: Vec<(RnsPoly, RnsPoly)>,
}

impl KeySwitchKey {
    /// Build a key for `target` = s' given as a polynomial over `full_basis`
    /// (data primes followed by the special prime).
    pub fn generate<R: Rng + ?Sized>(
        sk: &SecretKey,
        target: &RnsPoly,
        rng: &mut R,
        full_basis: &[&NttTable],
    ) -> Self {
        let data = full_basis.len() - 1;
        let p = full_basis[data].q;
        let s = sk.poly(full_basis);

        let parts = (0..data)
            .map(|i| {
                let a = sample_uniform(rng, full_basis);
                let e = RnsPoly::from_signed(&sample_gaussian(rng, sk.degree()), full_basis);
                let mut b = a.mul(&s, full_basis).add(&e, full_basis).neg(full_basis);

                let q = full_basis[i].q;
                let p_mod = p % q;
                for (bj, &tj) in b.residues[i].iter_mut().zip(&target.residues[i]) {
                    *bj = add_mod(*bj, mul_mod(tj, p_mod, q), q);
                }
                (b, a)
            })
            .collect();

        Self { parts }
    }

    /// Key-switch `d` (over k data primes) into a pair (ks0, ks1) over the
    /// same primes with ks0 + ks1·s ≈ d·s'.
    ///
    /// `ks_basis` is the k data tables followed by the special prime.
    pub fn apply(&self, d: &RnsPoly, ks_basis: &[&NttTable]) -> (RnsPoly, RnsPoly) {
        let k = d.channels();
        debug_assert_eq!(ks_basis.len(), k + 1);
        debug_assert!(self.parts.len() >= k);

        let degree = d.degree();
        let mut acc0 = RnsPoly::zero(degree, k + 1);
        let mut acc1 = RnsPoly::zero(degree, k + 1);

        for (i, (b, a)) in self.parts.iter().take(k).enumerate() {
            let digit = RnsPoly::lift_channel(&d.residues[i], ks_basis[i].q, ks_basis);
            acc0 = acc0.add(&digit.mul(&b.select_with_last(k), ks_basis), ks_basis);
            acc1 = acc1.add(&digit.mul(&a.select_with_last(k), ks_basis), ks_basis);
        }

        (acc0.divide_by_last(ks_basis), acc1.divide_by_last(ks_basis))
    }

    pub(crate) fn is_well_formed(&self, data_primes: usize, degree: usize) -> bool {
        self.parts.len() == data_primes
            && self.parts.iter().all(|(b, a)| {
                b.channels() == data_primes + 1
                    && a.channels() == data_primes + 1
                    && b.residues.iter().chain(&a.residues).all(|r| r.len() == degree)
            })
    }
}

/// Rotation key for one step count.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GaloisKey {
    /// g with σ_g(X) = X^g.
    pub galois_element: usize,
    pub key: KeySwitchKey,
}

/// Rotation keys indexed by left-rotation step count.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GaloisKeys {
    pub keys: BTreeMap<usize, GaloisKey>,
}

impl GaloisKeys {
    pub fn get(&self, steps: usize) -> Option<&GaloisKey> {
        self.keys.get(&steps)
    }

    pub fn steps(&self) -> impl Iterator<Item = usize> + '_ {
        self.keys.keys().copied()
    }
}
