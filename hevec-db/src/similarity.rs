//! Homomorphic cosine similarity.
//!
//! For a query q and entry v, each with an encrypted inverse norm:
//!
//! ```text
//! sim = sum_slots(q ⊙ v) × (1/‖q‖) × (1/‖v‖)
//! ```
//!
//! Three ciphertext multiplications, so the context needs at least
//! [`SIMILARITY_DEPTH`](crate::contexts::SIMILARITY_DEPTH) + 1 data primes.

use std::collections::BTreeMap;
use std::time::Instant;

use hevec_ckks::{Ciphertext, PublicContext};
use log::{debug, info};
use rayon::prelude::*;

use crate::builder::{EncryptedEntry, EncryptedQuery, EncryptedTable};
use crate::error::{Result, VecDbError};

/// Name → encrypted cosine similarity (slot 0).
pub type EncryptedSimilarities = BTreeMap<String, Ciphertext>;

/// Cosine similarity of two encrypted entries. The result is a scalar
/// ciphertext holding ⟨a, b⟩ / (‖a‖·‖b‖) in slot 0.
pub fn encrypted_cosine(ctx: &PublicContext, a: &EncryptedEntry, b: &EncryptedEntry) -> Result<Ciphertext> {
    let product = ctx.multiply(&a.vector, &b.vector)?;
    let dot = ctx.sum_slots(&product)?;
    let scaled = ctx.multiply(&dot, &a.inv_norm)?;
    Ok(ctx.multiply(&scaled, &b.inv_norm)?)
}

/// Similarity between the query and every table entry, in parallel.
pub fn compute_similarities(
    ctx: &PublicContext,
    query: &EncryptedQuery,
    table: &EncryptedTable,
) -> Result<EncryptedSimilarities> {
    let start = Instant::now();
    let entries: Vec<(&String, &EncryptedEntry)> = table.iter().collect();

    let results = entries
        .par_iter()
        .map(|&(name, entry)| {
            let sim = encrypted_cosine(ctx, query, entry).map_err(|e| VecDbError::entry(name, e))?;
            debug!("computed similarity for {name:?}");
            Ok((name.clone(), sim))
        })
        .collect::<Result<EncryptedSimilarities>>()?;

    info!(
        "computed {} encrypted similarities in {:.2?}",
        results.len(),
        start.elapsed()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::encrypt_entry;
    use crate::contexts::create_contexts_with_rng;
    use hevec_ckks::{CkksError, CkksParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> CkksParams {
        CkksParams::new(256, vec![60, 40, 40, 40, 60], 2f64.powi(40))
    }

    #[test]
    fn orthogonal_parallel_and_diagonal() {
        let (private, public) = create_contexts_with_rng(&params(), &mut StdRng::seed_from_u64(42)).unwrap();
        let a = encrypt_entry(&public, &[1.0, 0.0]).unwrap();
        let b = encrypt_entry(&public, &[0.0, 1.0]).unwrap();
        let c = encrypt_entry(&public, &[1.0, 1.0]).unwrap();

        let sim = |x, y| private.decrypt(&encrypted_cosine(&public, x, y).unwrap()).unwrap()[0];
        assert!((sim(&a, &a) - 1.0).abs() < 1e-3);
        assert!(sim(&a, &b).abs() < 1e-3);
        assert!((sim(&a, &c) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn result_is_a_single_slot_at_the_bottom_level() {
        let (_, public) = create_contexts_with_rng(&params(), &mut StdRng::seed_from_u64(42)).unwrap();
        let a = encrypt_entry(&public, &[0.3, -0.2, 0.9]).unwrap();
        let sim = encrypted_cosine(&public, &a, &a).unwrap();
        assert_eq!(sim.len(), 1);
        assert_eq!(sim.level(), 1);
    }

    #[test]
    fn foreign_entry_fails_with_its_name() {
        let (_, public) = create_contexts_with_rng(&params(), &mut StdRng::seed_from_u64(1)).unwrap();
        let (_, other) = create_contexts_with_rng(&params(), &mut StdRng::seed_from_u64(2)).unwrap();
        let query = encrypt_entry(&public, &[1.0, 2.0]).unwrap();

        let mut table = EncryptedTable::new();
        table.insert("mine".into(), encrypt_entry(&public, &[2.0, 1.0]).unwrap());
        table.insert("theirs".into(), encrypt_entry(&other, &[2.0, 1.0]).unwrap());

        match compute_similarities(&public, &query, &table).unwrap_err() {
            VecDbError::Entry { name, source } => {
                assert_eq!(name, "theirs");
                assert!(matches!(*source, VecDbError::Ckks(CkksError::ContextMismatch)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
