//! Full setup → compute → reveal runs through files, one role at a time.

use std::fs;
use std::path::{Path, PathBuf};

use hevec_ckks::{CkksError, CkksParams};
use hevec_db::codec::{load_query, load_results, load_table, save_query, save_results, save_table};
use hevec_db::{
    compare, compute_similarities, create_contexts_with_rng, decrypt_similarities, encrypt_query, encrypt_table,
    load_private_context, load_public_context, plaintext_similarities, save_contexts, VecDbError, VectorStore,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn params() -> CkksParams {
    CkksParams::new(1024, vec![60, 40, 40, 40, 60], 2f64.powi(40))
}

fn workdir() -> TempDir {
    tempfile::tempdir().unwrap()
}

fn at(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

fn setup(dir: &TempDir, embeddings: &str, query: &str, seed: u64) {
    let emb_path = at(dir, "word_embeddings.txt");
    fs::write(&emb_path, embeddings).unwrap();
    let store = VectorStore::load(&emb_path).unwrap();

    let (private, public) = create_contexts_with_rng(&params(), &mut StdRng::seed_from_u64(seed)).unwrap();
    save_contexts(
        &private,
        &public,
        at(dir, "context_private.bin"),
        at(dir, "context_public.bin"),
    )
    .unwrap();

    save_table(at(dir, "encrypted_vectors.bin"), &encrypt_table(&public, &store).unwrap()).unwrap();
    save_query(at(dir, "encrypted_query.bin"), &encrypt_query(&public, &store, query).unwrap()).unwrap();
}

fn compute(dir: &TempDir) {
    let public = load_public_context(at(dir, "context_public.bin")).unwrap();
    let table = load_table(at(dir, "encrypted_vectors.bin"), &public).unwrap();
    let query = load_query(at(dir, "encrypted_query.bin"), &public).unwrap();
    let results = compute_similarities(&public, &query, &table).unwrap();
    save_results(at(dir, "encrypted_results.bin"), &results).unwrap();
}

fn reveal(dir: &TempDir, query: &str) -> Vec<hevec_db::Comparison> {
    let private = load_private_context(at(dir, "context_private.bin")).unwrap();
    let results = load_results(at(dir, "encrypted_results.bin"), private.public()).unwrap();
    let decrypted = decrypt_similarities(&private, &results).unwrap();

    let store = VectorStore::load(at(dir, "word_embeddings.txt")).unwrap();
    let plaintext = plaintext_similarities(&store, store.get(query).unwrap());
    compare(&decrypted, &plaintext).unwrap()
}

#[test]
fn three_vector_scenario() {
    let dir = workdir();
    setup(&dir, "a 1 0\nb 0 1\nc 1 1\n", "a", 42);
    compute(&dir);
    let rows = reveal(&dir, "a");

    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    let expected = [1.0, 0.0, std::f64::consts::FRAC_1_SQRT_2];
    for (row, want) in rows.iter().zip(expected) {
        assert!((row.decrypted - want).abs() < 1e-3, "{}: {} vs {}", row.name, row.decrypted, want);
        assert!(row.difference < 1e-3);
    }
}

#[test]
fn realistic_embeddings_match_plaintext() {
    let dir = workdir();
    let mut text = String::new();
    for w in 0..12 {
        let comps: Vec<String> = (0..50)
            .map(|i| format!("{:.5}", (((w * 50 + i) as f64) * 0.731).sin() * 0.8))
            .collect();
        text.push_str(&format!("word{w} {}\n", comps.join(" ")));
    }
    setup(&dir, &text, "word3", 7);
    compute(&dir);
    let rows = reveal(&dir, "word3");

    assert_eq!(rows.len(), 12);
    for row in &rows {
        assert!(row.difference < 1e-3, "{}: difference {}", row.name, row.difference);
        // cosine, not its square: negative values survive
        assert!(row.decrypted.abs() <= 1.0 + 1e-3);
    }
    assert!(rows.iter().any(|r| r.plaintext < 0.0));
    let self_row = rows.iter().find(|r| r.name == "word3").unwrap();
    assert!((self_row.decrypted - 1.0).abs() < 1e-3);
}

#[test]
fn results_keep_table_names() {
    let dir = workdir();
    setup(&dir, "zeta 1 2\nalpha 2 1\nmid 0.5 0.5\n", "mid", 3);
    compute(&dir);

    let public = load_public_context(at(&dir, "context_public.bin")).unwrap();
    let table = load_table(at(&dir, "encrypted_vectors.bin"), &public).unwrap();
    let results = load_results(at(&dir, "encrypted_results.bin"), &public).unwrap();
    assert_eq!(
        table.keys().collect::<Vec<_>>(),
        results.keys().collect::<Vec<_>>()
    );
}

#[test]
fn public_context_file_cannot_decrypt() {
    let dir = workdir();
    setup(&dir, "a 1 0\nb 0 1\n", "a", 42);

    let err = load_private_context(at(&dir, "context_public.bin")).unwrap_err();
    assert!(matches!(err, VecDbError::Ckks(CkksError::MissingSecretKey)));
}

#[test]
fn artifacts_from_another_key_set_are_rejected() {
    let first = workdir();
    let second = workdir();
    setup(&first, "a 1 0\nb 0 1\n", "a", 1);
    setup(&second, "a 1 0\nb 0 1\n", "a", 2);

    let public = load_public_context(at(&first, "context_public.bin")).unwrap();
    let err = load_query(at(&second, "encrypted_query.bin"), &public).unwrap_err();
    assert!(matches!(err, VecDbError::Ckks(CkksError::ContextMismatch)));

    // mixing artifacts directly is rejected at the similarity step as well
    let other_public = load_public_context(at(&second, "context_public.bin")).unwrap();
    let table = load_table(at(&first, "encrypted_vectors.bin"), &public).unwrap();
    let query = load_query(at(&second, "encrypted_query.bin"), &other_public).unwrap();
    assert!(matches!(
        compute_similarities(&public, &query, &table),
        Err(VecDbError::Entry { .. })
    ));
}

#[test]
fn artifacts_are_not_interchangeable() {
    let dir = workdir();
    setup(&dir, "a 1 0\nb 0 1\n", "a", 42);
    let public = load_public_context(at(&dir, "context_public.bin")).unwrap();
    assert!(matches!(
        load_table(at(&dir, "encrypted_query.bin"), &public),
        Err(VecDbError::Codec(_))
    ));
    assert!(matches!(
        load_table(at(&dir, "context_public.bin"), &public),
        Err(VecDbError::Codec(_))
    ));
}

#[test]
fn malformed_and_empty_embedding_files() {
    let dir = workdir();
    let bad = at(&dir, "bad.txt");
    fs::write(&bad, "a 1 2\nb 1 two\n").unwrap();
    match VectorStore::load(&bad).unwrap_err() {
        VecDbError::Format { path, line, .. } => {
            assert_eq!(path, bad);
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    let not_finite = at(&dir, "nan.txt");
    fs::write(&not_finite, "a 1 2\nb 3 4\nc nan 1\n").unwrap();
    assert!(matches!(
        VectorStore::load(&not_finite),
        Err(VecDbError::Format { line: 3, .. })
    ));

    let empty = at(&dir, "empty.txt");
    fs::write(&empty, "").unwrap();
    assert!(VectorStore::load(&empty).unwrap().is_empty());
}

#[test]
fn missing_artifacts_are_reported_with_path() {
    let missing = Path::new("/nonexistent/hevec/context_public.bin");
    assert!(matches!(
        load_public_context(missing),
        Err(VecDbError::MissingFile { path, .. }) if path == missing
    ));
}
