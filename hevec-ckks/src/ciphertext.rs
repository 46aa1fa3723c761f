//! CKKS ciphertexts.
//!
//! A ciphertext is a pair (c0, c1) of RNS polynomials over the first k
//! data primes with c0 + c1·s ≈ Δ·m. It records its current scale Δ, the
//! number of meaningful slots and the id of the context that produced it.

use serde::{Deserialize, Serialize};

use crate::context::{ContextId, PublicContext};
use crate::error::{CkksError, Result};
use crate::rns::RnsPoly;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ciphertext {
    pub(crate) c0: RnsPoly,
    pub(crate) c1: RnsPoly,
    pub(crate) scale: f64,
    pub(crate) len: usize,
    pub(crate) context_id: ContextId,
}

impl Ciphertext {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Number of meaningful slots. Scalars have length 1.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of data primes still attached.
    pub fn level(&self) -> usize {
        self.c0.channels()
    }

    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub(crate) fn ensure_context(&self, ctx: &PublicContext) -> Result<()> {
        if self.context_id != ctx.id() {
            return Err(CkksError::ContextMismatch);
        }
        Ok(())
    }

    /// Structural check against `ctx`, used after deserialization.
    pub(crate) fn validate(&self, ctx: &PublicContext) -> Result<()> {
        self.ensure_context(ctx)?;

        let degree = ctx.params().poly_modulus_degree;
        let data = ctx.params().data_prime_count();
        let k = self.c0.channels();
        if k == 0 || k > data || self.c1.channels() != k {
            return Err(CkksError::Malformed(format!(
                "ciphertext has {k}/{} channels, context has {data} data primes",
                self.c1.channels()
            )));
        }
        if self.len > ctx.slot_count() {
            return Err(CkksError::Malformed(format!(
                "length {} exceeds {} slots",
                self.len,
                ctx.slot_count()
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(CkksError::Malformed(format!("invalid scale {}", self.scale)));
        }

        let basis = ctx.data_basis(k);
        for poly in [&self.c0, &self.c1] {
            for (res, t) in poly.residues.iter().zip(&basis) {
                if res.len() != degree || res.iter().any(|&v| v >= t.q) {
                    return Err(CkksError::Malformed("residue out of range".into()));
                }
            }
        }
        Ok(())
    }
}
