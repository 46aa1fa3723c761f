//! Encrypted table and query construction.
//!
//! Each vector is encrypted together with its inverse L2 norm, computed in
//! the clear, so that cosine similarity needs only multiplications and
//! rotations under encryption.

use std::collections::BTreeMap;
use std::time::Instant;

use hevec_ckks::{Ciphertext, PublicContext};
use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Result, VecDbError};
use crate::store::VectorStore;

/// An encrypted vector and its encrypted inverse norm.
#[derive(Clone, Debug)]
pub struct EncryptedEntry {
    pub vector: Ciphertext,
    pub inv_norm: Ciphertext,
}

/// Name → encrypted entry, ordered by name.
pub type EncryptedTable = BTreeMap<String, EncryptedEntry>;

/// The querier's encrypted vector. Carries no name.
pub type EncryptedQuery = EncryptedEntry;

/// 1 / ‖v‖₂. Zero vectors (including empty ones) are rejected.
pub fn inverse_norm(v: &[f64]) -> Result<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(VecDbError::ZeroNorm);
    }
    Ok(1.0 / norm)
}

pub fn encrypt_entry(ctx: &PublicContext, vector: &[f64]) -> Result<EncryptedEntry> {
    let inv = inverse_norm(vector)?;
    Ok(EncryptedEntry {
        vector: ctx.encrypt(vector)?,
        inv_norm: ctx.encrypt(&[inv])?,
    })
}

/// Encrypt every vector of `store` in parallel. The first failure aborts
/// the build and names the offending entry.
pub fn encrypt_table(ctx: &PublicContext, store: &VectorStore) -> Result<EncryptedTable> {
    let start = Instant::now();
    let entries: Vec<(&str, &[f64])> = store.iter().collect();

    let table = entries
        .par_iter()
        .map(|&(name, vector)| {
            let entry = encrypt_entry(ctx, vector).map_err(|e| VecDbError::entry(name, e))?;
            debug!("encrypted {name:?} ({} components)", vector.len());
            Ok((name.to_string(), entry))
        })
        .collect::<Result<EncryptedTable>>()?;

    info!("encrypted {} vectors in {:.2?}", table.len(), start.elapsed());
    Ok(table)
}

/// Encrypt the vector called `name`. Fails with `NotFound` before any
/// encryption when the name is absent.
pub fn encrypt_query(ctx: &PublicContext, store: &VectorStore, name: &str) -> Result<EncryptedQuery> {
    let vector = store
        .get(name)
        .ok_or_else(|| VecDbError::NotFound(name.to_string()))?;
    let query = encrypt_entry(ctx, vector).map_err(|e| VecDbError::entry(name, e))?;
    info!("encrypted query {name:?}");
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::create_contexts_with_rng;
    use hevec_ckks::{CkksError, CkksParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn contexts() -> (hevec_ckks::PrivateContext, PublicContext) {
        let params = CkksParams::new(256, vec![60, 40, 40, 40, 60], 2f64.powi(40));
        create_contexts_with_rng(&params, &mut StdRng::seed_from_u64(42)).unwrap()
    }

    #[test]
    fn inverse_norm_of_three_four() {
        assert!((inverse_norm(&[3.0, 4.0]).unwrap() - 0.2).abs() < 1e-15);
    }

    #[test]
    fn zero_and_empty_vectors_have_no_inverse_norm() {
        assert!(matches!(inverse_norm(&[0.0, 0.0]), Err(VecDbError::ZeroNorm)));
        assert!(matches!(inverse_norm(&[]), Err(VecDbError::ZeroNorm)));
    }

    #[test]
    fn entry_decrypts_to_vector_and_inverse_norm() {
        let (private, public) = contexts();
        let entry = encrypt_entry(&public, &[3.0, 4.0]).unwrap();
        let v = private.decrypt(&entry.vector).unwrap();
        let inv = private.decrypt(&entry.inv_norm).unwrap();
        assert!((v[0] - 3.0).abs() < 1e-6 && (v[1] - 4.0).abs() < 1e-6);
        assert_eq!(inv.len(), 1);
        assert!((inv[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn table_keeps_every_name() {
        let (_, public) = contexts();
        let store = VectorStore::from_vectors([("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        let table = encrypt_table(&public, &store).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn zero_vector_in_table_names_entry() {
        let (_, public) = contexts();
        let store = VectorStore::from_vectors([("ok", vec![1.0]), ("zero", vec![0.0])]);
        match encrypt_table(&public, &store).unwrap_err() {
            VecDbError::Entry { name, source } => {
                assert_eq!(name, "zero");
                assert!(matches!(*source, VecDbError::ZeroNorm));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn oversized_vector_is_engine_error() {
        let (_, public) = contexts();
        let long = vec![0.1; public.slot_count() + 1];
        let err = encrypt_entry(&public, &long).unwrap_err();
        assert!(matches!(err, VecDbError::Ckks(CkksError::TooManyValues { .. })));
    }

    #[test]
    fn unknown_query_is_not_found() {
        let (_, public) = contexts();
        let store = VectorStore::from_vectors([("a", vec![1.0])]);
        assert!(matches!(
            encrypt_query(&public, &store, "king"),
            Err(VecDbError::NotFound(name)) if name == "king"
        ));
    }
}
