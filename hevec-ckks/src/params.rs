//! CKKS scheme parameters.
//!
//! A parameter set fixes the ring degree N, the modulus chain and the
//! default encoding scale. The chain is given as bit sizes: every entry
//! except the last becomes a data prime q_0..q_L, the last becomes the
//! special prime P used only during key switching.
//!
//! Each rescale consumes one data prime, so a chain with L+1 data primes
//! supports L ciphertext-ciphertext multiplications.

use serde::{Deserialize, Serialize};

use crate::error::{CkksError, Result};
use crate::ntt::find_ntt_primes;

/// Smallest accepted prime width.
pub const MIN_PRIME_BITS: u32 = 20;
/// Largest accepted prime width (products must fit in u128).
pub const MAX_PRIME_BITS: u32 = 60;

const MIN_DEGREE: usize = 8;
const MAX_DEGREE: usize = 1 << 17;

/// Standard deviation for discrete Gaussian error sampling.
pub const SIGMA: f64 = 3.2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CkksParams {
    /// Ring degree N. Power of two; N/2 slots per ciphertext.
    pub poly_modulus_degree: usize,
    /// Bit width of each modulus: q_0, .., q_L, then P.
    pub coeff_mod_bit_sizes: Vec<u32>,
    /// Encoding scale for fresh ciphertexts.
    pub global_scale: f64,
}

impl Default for CkksParams {
    fn default() -> Self {
        Self {
            poly_modulus_degree: 32768,
            coeff_mod_bit_sizes: vec![60, 40, 40, 40, 40, 60],
            global_scale: 2f64.powi(40),
        }
    }
}

impl CkksParams {
    pub fn new(poly_modulus_degree: usize, coeff_mod_bit_sizes: Vec<u32>, global_scale: f64) -> Self {
        Self {
            poly_modulus_degree,
            coeff_mod_bit_sizes,
            global_scale,
        }
    }

    /// Number of packed real values per ciphertext.
    pub fn slot_count(&self) -> usize {
        self.poly_modulus_degree / 2
    }

    /// Number of data primes q_0..q_L (excludes the special prime).
    pub fn data_prime_count(&self) -> usize {
        self.coeff_mod_bit_sizes.len().saturating_sub(1)
    }

    /// Multiplicative depth of a fresh ciphertext.
    pub fn max_depth(&self) -> usize {
        self.data_prime_count().saturating_sub(1)
    }

    /// Check the parameter set for internal consistency.
    pub fn validate(&self) -> Result<()> {
        let n = self.poly_modulus_degree;
        if !n.is_power_of_two() || !(MIN_DEGREE..=MAX_DEGREE).contains(&n) {
            return Err(CkksError::Configuration(format!(
                "poly_modulus_degree must be a power of two in [{MIN_DEGREE}, {MAX_DEGREE}], got {n}"
            )));
        }

        let bits = &self.coeff_mod_bit_sizes;
        if bits.len() < 2 {
            return Err(CkksError::Configuration(
                "coeff_mod_bit_sizes needs at least one data prime and the special prime".into(),
            ));
        }
        if let Some(&b) = bits
            .iter()
            .find(|&&b| !(MIN_PRIME_BITS..=MAX_PRIME_BITS).contains(&b))
        {
            return Err(CkksError::Configuration(format!(
                "prime bit size {b} outside [{MIN_PRIME_BITS}, {MAX_PRIME_BITS}]"
            )));
        }

        let special = bits[bits.len() - 1];
        let widest_data = bits[..bits.len() - 1].iter().copied().max().unwrap_or(0);
        if special < widest_data {
            return Err(CkksError::Configuration(format!(
                "special prime ({special} bits) must be at least as wide as every data prime ({widest_data} bits)"
            )));
        }

        let scale = self.global_scale;
        if !scale.is_finite() || scale <= 1.0 {
            return Err(CkksError::Configuration(format!(
                "global_scale must be finite and > 1, got {scale}"
            )));
        }
        if scale.log2() >= f64::from(bits[0]) {
            return Err(CkksError::Configuration(format!(
                "global_scale 2^{:.1} does not fit below the first prime ({} bits)",
                scale.log2(),
                bits[0]
            )));
        }

        Ok(())
    }

    /// Fail unless a fresh ciphertext survives `depth` multiplications.
    pub fn require_depth(&self, depth: usize) -> Result<()> {
        if self.max_depth() < depth {
            return Err(CkksError::Configuration(format!(
                "modulus chain supports {} multiplications, {} required (need at least {} data primes)",
                self.max_depth(),
                depth,
                depth + 1
            )));
        }
        Ok(())
    }

    /// Validate and derive the concrete moduli [q_0, .., q_L, P].
    pub fn generate_moduli(&self) -> Result<Vec<u64>> {
        self.validate()?;
        find_ntt_primes(self.poly_modulus_degree, &self.coeff_mod_bit_sizes)
    }
}
