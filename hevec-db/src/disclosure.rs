//! Decryption of results and comparison against the plaintext computation.

use std::collections::BTreeMap;
use std::fmt;

use hevec_ckks::PrivateContext;
use serde::Serialize;

use crate::error::{Result, VecDbError};
use crate::similarity::EncryptedSimilarities;
use crate::store::VectorStore;

/// Name → cosine similarity in the clear.
pub type PlaintextSimilarities = BTreeMap<String, f64>;

/// One row of the decrypted-versus-plaintext report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comparison {
    pub name: String,
    pub decrypted: f64,
    pub plaintext: f64,
    pub difference: f64,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Word: {}", self.name)?;
        writeln!(f, "  Decrypted cosine similarity: {}", self.decrypted)?;
        writeln!(f, "  Plaintext cosine similarity: {}", self.plaintext)?;
        write!(f, "  Difference: {:.8}", self.difference)
    }
}

/// Decrypt slot 0 of every result.
pub fn decrypt_similarities(private: &PrivateContext, results: &EncryptedSimilarities) -> Result<PlaintextSimilarities> {
    results
        .iter()
        .map(|(name, ct)| {
            let slots = private.decrypt(ct).map_err(|e| VecDbError::entry(name, e.into()))?;
            let value = slots.first().copied().unwrap_or(f64::NAN);
            Ok((name.clone(), value))
        })
        .collect()
}

/// ⟨a, b⟩ / (‖a‖·‖b‖), summed in index order. Zero norms give NaN.
pub fn plaintext_cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    dot / (na * nb)
}

/// Cosine similarity between `query` and every stored vector, in the clear.
pub fn plaintext_similarities(store: &VectorStore, query: &[f64]) -> PlaintextSimilarities {
    store
        .iter()
        .map(|(name, v)| (name.to_string(), plaintext_cosine(v, query)))
        .collect()
}

/// Pair every decrypted value with its plaintext counterpart.
pub fn compare(decrypted: &PlaintextSimilarities, plaintext: &PlaintextSimilarities) -> Result<Vec<Comparison>> {
    decrypted
        .iter()
        .map(|(name, &dec)| {
            let plain = *plaintext
                .get(name)
                .ok_or_else(|| VecDbError::NotFound(name.clone()))?;
            Ok(Comparison {
                name: name.clone(),
                decrypted: dec,
                plaintext: plain,
                difference: (dec - plain).abs(),
            })
        })
        .collect()
}
