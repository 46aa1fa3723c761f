//! Encryption, decryption and homomorphic evaluation.
//!
//! Leveled arithmetic over the data-prime chain:
//! - fresh ciphertexts carry every data prime at the global scale
//! - `multiply` relinearizes and then rescales, consuming one prime
//! - operands at different levels are aligned by dropping primes
//! - rotations apply σ_{5^r} and key-switch back to s

use rand::Rng;

use crate::ciphertext::Ciphertext;
use crate::context::{PrivateContext, PublicContext};
use crate::error::{CkksError, Result};
use crate::keys::GaloisKey;
use crate::rns::RnsPoly;
use crate::sampling::{sample_gaussian, sample_ternary};

/// Relative tolerance when comparing scales for addition.
const SCALE_TOLERANCE: f64 = 1e-9;

impl PublicContext {
    /// Encrypt up to `slot_count()` values with the thread-local RNG.
    pub fn encrypt(&self, values: &[f64]) -> Result<Ciphertext> {
        self.encrypt_with_rng(values, &mut rand::thread_rng())
    }

    /// Encrypt with an explicit RNG: c0 = b·u + e1 + m, c1 = a·u + e2.
    pub fn encrypt_with_rng<R: Rng + ?Sized>(&self, values: &[f64], rng: &mut R) -> Result<Ciphertext> {
        let scale = self.params.global_scale;
        let limit = self.tables[0].q as f64 / 4.0;
        if let Some(&v) = values.iter().find(|v| (v.abs() * scale) >= limit) {
            return Err(CkksError::ValueOutOfRange { value: v, scale });
        }
        let coeffs = self.encoder.encode(values, scale)?;

        let degree = self.params.poly_modulus_degree;
        let basis = self.data_basis(self.params.data_prime_count());
        let pk = &self.keys.public_key;

        let m = RnsPoly::from_signed(&coeffs, &basis);
        let u = RnsPoly::from_signed(&sample_ternary(rng, degree), &basis);
        let e1 = RnsPoly::from_signed(&sample_gaussian(rng, degree), &basis);
        let e2 = RnsPoly::from_signed(&sample_gaussian(rng, degree), &basis);

        let c0 = pk.b.mul(&u, &basis).add(&e1, &basis).add(&m, &basis);
        let c1 = pk.a.mul(&u, &basis).add(&e2, &basis);

        Ok(Ciphertext {
            c0,
            c1,
            scale,
            len: values.len(),
            context_id: self.id,
        })
    }

    /// Slot-wise sum. Both operands must carry the same scale.
    pub fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        a.ensure_context(self)?;
        b.ensure_context(self)?;
        let tol = SCALE_TOLERANCE * a.scale.abs().max(b.scale.abs());
        if (a.scale - b.scale).abs() > tol {
            return Err(CkksError::ScaleMismatch {
                left: a.scale,
                right: b.scale,
            });
        }

        let k = a.level().min(b.level());
        let basis = self.data_basis(k);
        Ok(Ciphertext {
            c0: a.c0.truncate(k).add(&b.c0.truncate(k), &basis),
            c1: a.c1.truncate(k).add(&b.c1.truncate(k), &basis),
            scale: a.scale,
            len: a.len.max(b.len),
            context_id: self.id,
        })
    }

    /// Slot-wise product, relinearized and rescaled by the last prime.
    pub fn multiply(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        a.ensure_context(self)?;
        b.ensure_context(self)?;
        let k = a.level().min(b.level());
        if k < 2 {
            return Err(CkksError::DepthExhausted);
        }
        let relin = self.keys.relin_key.as_ref().ok_or(CkksError::MissingRelinKey)?;

        let basis = self.data_basis(k);
        let (a0, a1) = (a.c0.truncate(k), a.c1.truncate(k));
        let (b0, b1) = (b.c0.truncate(k), b.c1.truncate(k));

        let d0 = a0.mul(&b0, &basis);
        let d1 = a0.mul(&b1, &basis).add(&a1.mul(&b0, &basis), &basis);
        let d2 = a1.mul(&b1, &basis);

        let (ks0, ks1) = relin.apply(&d2, &self.ks_basis(k));
        let c0 = d0.add(&ks0, &basis);
        let c1 = d1.add(&ks1, &basis);

        let q_last = basis[k - 1].q as f64;
        Ok(Ciphertext {
            c0: c0.divide_by_last(&basis),
            c1: c1.divide_by_last(&basis),
            scale: a.scale * b.scale / q_last,
            len: a.len.max(b.len),
            context_id: self.id,
        })
    }

    /// Rotate slots left by `steps`. Step counts without a dedicated key
    /// are composed from the power-of-two keys.
    pub fn rotate(&self, ct: &Ciphertext, steps: usize) -> Result<Ciphertext> {
        ct.ensure_context(self)?;
        let slots = self.slot_count();
        let steps = steps % slots;
        if steps == 0 {
            return Ok(ct.clone());
        }

        let galois = &self.keys.galois_keys;
        if let Some(gk) = galois.get(steps) {
            return Ok(self.apply_galois(ct, gk));
        }

        let mut out = ct.clone();
        let mut remaining = steps;
        while remaining != 0 {
            let bit = 1usize << remaining.trailing_zeros();
            let gk = galois.get(bit).ok_or(CkksError::MissingGaloisKey(steps))?;
            out = self.apply_galois(&out, gk);
            remaining &= !bit;
        }
        Ok(out)
    }

    /// Rotate-and-add over powers of two covering the logical length.
    /// Slot 0 of the result holds the sum; the result has length 1.
    pub fn sum_slots(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        ct.ensure_context(self)?;
        let span = ct.len.max(1).next_power_of_two();
        let mut acc = ct.clone();
        let mut step = 1;
        while step < span {
            let rotated = self.rotate(&acc, step)?;
            acc = self.add(&acc, &rotated)?;
            step <<= 1;
        }
        acc.len = 1;
        Ok(acc)
    }

    fn apply_galois(&self, ct: &Ciphertext, gk: &GaloisKey) -> Ciphertext {
        let k = ct.level();
        let basis = self.data_basis(k);
        let g = gk.galois_element;

        let c0 = ct.c0.automorphism(g, &basis);
        let c1 = ct.c1.automorphism(g, &basis);
        let (ks0, ks1) = gk.key.apply(&c1, &self.ks_basis(k));

        Ciphertext {
            c0: c0.add(&ks0, &basis),
            c1: ks1,
            scale: ct.scale,
            len: ct.len,
            context_id: ct.context_id,
        }
    }
}

impl PrivateContext {
    /// Decrypt and decode the ciphertext's `len()` slots.
    ///
    /// m = c0 + c1·s is reconstructed over every prime the ciphertext still
    /// carries, so values past q_0/2 at higher levels decode correctly.
    pub fn decrypt(&self, ct: &Ciphertext) -> Result<Vec<f64>> {
        let public = self.public();
        ct.ensure_context(public)?;

        let basis = public.data_basis(ct.level());
        let s = self.secret.poly(&basis);
        let m = ct.c0.add(&ct.c1.mul(&s, &basis), &basis);
        let coeffs = m.to_centered_f64(&basis);

        Ok(public.encoder.decode_real(&coeffs, ct.scale, ct.len))
    }
}
