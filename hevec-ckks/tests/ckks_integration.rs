//! End-to-end tests for the CKKS engine at a realistic ring size.
//!
//! Exercises encrypt → multiply → sum → multiply → decrypt at depth 3,
//! context serialization between parties, and capability separation.

use hevec_ckks::{CkksError, CkksParams, ContextKind, PrivateContext, PublicContext};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

fn test_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

fn params() -> CkksParams {
    CkksParams::new(1024, vec![60, 40, 40, 40, 60], 2f64.powi(40))
}

fn full_context(rng: &mut StdRng) -> PrivateContext {
    let mut ctx = PrivateContext::new(params(), rng).unwrap();
    ctx.generate_relin_keys(rng);
    ctx.generate_galois_keys(rng);
    ctx
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

// ═══════════════════════════════════════════════════════════════════════
// Depth-3 circuit
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn dot_product_times_two_scalars() {
    let mut rng = test_rng();
    let private = full_context(&mut rng);
    let public = private.to_public();

    let q: Vec<f64> = (0..50).map(|i| ((i as f64) * 0.37).sin()).collect();
    let v: Vec<f64> = (0..50).map(|i| ((i as f64) * 0.11).cos()).collect();
    let expected = q.iter().zip(&v).map(|(a, b)| a * b).sum::<f64>() / (norm(&q) * norm(&v));

    let start = Instant::now();
    let cq = public.encrypt_with_rng(&q, &mut rng).unwrap();
    let cv = public.encrypt_with_rng(&v, &mut rng).unwrap();
    let cq_inv = public.encrypt_with_rng(&[1.0 / norm(&q)], &mut rng).unwrap();
    let cv_inv = public.encrypt_with_rng(&[1.0 / norm(&v)], &mut rng).unwrap();

    let prod = public.multiply(&cq, &cv).unwrap();
    let dot = public.sum_slots(&prod).unwrap();
    let sim = public
        .multiply(&public.multiply(&dot, &cq_inv).unwrap(), &cv_inv)
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(sim.level(), 1);
    assert_eq!(sim.len(), 1);
    let got = private.decrypt(&sim).unwrap()[0];
    println!("cosine {got:.6} (expected {expected:.6}) in {elapsed:?}");
    assert!((got - expected).abs() < 1e-3, "got {got}, expected {expected}");
}

#[test]
fn sum_over_all_slots() {
    let mut rng = test_rng();
    let private = full_context(&mut rng);
    let public = private.public();
    let slots = public.slot_count();
    let values: Vec<f64> = (0..slots).map(|i| (i % 7) as f64 * 0.01).collect();
    let ct = public.encrypt_with_rng(&values, &mut rng).unwrap();

    let total = private.decrypt(&public.sum_slots(&ct).unwrap()).unwrap()[0];
    let expected: f64 = values.iter().sum();
    assert!((total - expected).abs() < 1e-3, "got {total}, expected {expected}");
}

#[test]
fn unnormalized_dot_product_of_large_vectors() {
    let mut rng = test_rng();
    let private = full_context(&mut rng);
    let public = private.public();
    let v = vec![1000.0; 300];
    let ct = public.encrypt_with_rng(&v, &mut rng).unwrap();

    let dot = public.sum_slots(&public.multiply(&ct, &ct).unwrap()).unwrap();
    let got = private.decrypt(&dot).unwrap()[0];
    assert!((got - 3e8).abs() < 1e-1, "got {got}, expected 3e8");
}

// ═══════════════════════════════════════════════════════════════════════
// Serialization between parties
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn computing_party_works_from_public_blob() {
    let mut rng = test_rng();
    let private = full_context(&mut rng);
    let public_blob = private.public().to_bytes().unwrap();
    let private_blob = private.to_bytes().unwrap();
    drop(private);

    // Computing party: public blob only.
    let public = PublicContext::from_bytes(&public_blob).unwrap();
    let a = public.encrypt_with_rng(&[0.5, 0.25], &mut rng).unwrap();
    let b = public.encrypt_with_rng(&[2.0, 4.0], &mut rng).unwrap();
    let result_bytes = public.sum_slots(&public.multiply(&a, &b).unwrap()).unwrap().to_bytes().unwrap();

    // Result holder: private blob.
    let private = PrivateContext::from_bytes(&private_blob).unwrap();
    assert_eq!(private.id(), public.id());
    let ct = private.public().ciphertext_from_bytes(&result_bytes).unwrap();
    let got = private.decrypt(&ct).unwrap()[0];
    assert!((got - 2.0).abs() < 1e-4, "got {got}");
}

#[test]
fn capability_views_are_separated() {
    let mut rng = test_rng();
    let private = full_context(&mut rng);
    let private_blob = private.to_bytes().unwrap();
    let public_blob = private.make_public().to_bytes().unwrap();

    assert!(matches!(
        PrivateContext::from_bytes(&public_blob),
        Err(CkksError::MissingSecretKey)
    ));
    assert!(matches!(
        PublicContext::from_bytes(&private_blob),
        Err(CkksError::ContextKind {
            found: ContextKind::Private,
            ..
        })
    ));
}

#[test]
fn truncated_ciphertext_bytes_are_rejected() {
    let mut rng = test_rng();
    let private = full_context(&mut rng);
    let ct = private.public().encrypt_with_rng(&[1.0], &mut rng).unwrap();
    let bytes = ct.to_bytes().unwrap();
    assert!(private
        .public()
        .ciphertext_from_bytes(&bytes[..bytes.len() / 2])
        .is_err());
}

#[test]
fn shallow_chain_cannot_finish_three_multiplications() {
    let mut rng = test_rng();
    let shallow = CkksParams::new(1024, vec![60, 40, 60], 2f64.powi(40));
    assert!(matches!(shallow.require_depth(3), Err(CkksError::Configuration(_))));

    let mut ctx = PrivateContext::new(shallow, &mut rng).unwrap();
    ctx.generate_relin_keys(&mut rng);
    let public = ctx.public();
    let x = public.encrypt_with_rng(&[1.0], &mut rng).unwrap();
    let once = public.multiply(&x, &x).unwrap();
    assert!(matches!(public.multiply(&once, &x), Err(CkksError::DepthExhausted)));
}
