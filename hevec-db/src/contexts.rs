//! Context lifecycle: create, persist and load the two context views.

use std::path::Path;
use std::time::Instant;

use hevec_ckks::{CkksError, CkksParams, PrivateContext, PublicContext};
use log::info;
use rand::Rng;

use crate::codec::{read_file, write_file, write_owner_only};
use crate::error::{Result, VecDbError};

/// Ciphertext-ciphertext multiplications in one cosine similarity:
/// query × entry, × query inverse norm, × entry inverse norm.
pub const SIMILARITY_DEPTH: usize = 3;

fn config_error(e: CkksError) -> VecDbError {
    match e {
        CkksError::Configuration(msg) => VecDbError::Configuration(msg),
        other => VecDbError::Ckks(other),
    }
}

/// Create a fresh key set and return its private and public views.
pub fn create_contexts(params: &CkksParams) -> Result<(PrivateContext, PublicContext)> {
    create_contexts_with_rng(params, &mut rand::thread_rng())
}

pub fn create_contexts_with_rng<R: Rng + ?Sized>(
    params: &CkksParams,
    rng: &mut R,
) -> Result<(PrivateContext, PublicContext)> {
    params.validate().map_err(config_error)?;
    params.require_depth(SIMILARITY_DEPTH).map_err(config_error)?;

    let start = Instant::now();
    let mut private = PrivateContext::new(params.clone(), rng).map_err(config_error)?;
    private.generate_relin_keys(rng);
    private.generate_galois_keys(rng);
    let public = private.to_public();

    info!(
        "created context {} (N={}, {} data primes, {} rotation keys) in {:.2?}",
        public.id(),
        params.poly_modulus_degree,
        params.data_prime_count(),
        public.galois_steps().len(),
        start.elapsed()
    );
    Ok((private, public))
}

/// Persist both views to two distinct files. The private file is
/// readable by its owner only.
pub fn save_contexts(
    private: &PrivateContext,
    public: &PublicContext,
    private_path: impl AsRef<Path>,
    public_path: impl AsRef<Path>,
) -> Result<()> {
    let (private_path, public_path) = (private_path.as_ref(), public_path.as_ref());
    if private_path == public_path {
        return Err(VecDbError::Configuration(format!(
            "private and public context paths must differ (both {})",
            private_path.display()
        )));
    }
    if private.id() != public.id() {
        return Err(VecDbError::Configuration(
            "private and public contexts belong to different key sets".into(),
        ));
    }

    write_owner_only(private_path, &private.to_bytes()?)?;
    write_file(public_path, &public.to_bytes()?)?;
    info!(
        "saved private context to {}, public context to {}",
        private_path.display(),
        public_path.display()
    );
    Ok(())
}

pub fn load_public_context(path: impl AsRef<Path>) -> Result<PublicContext> {
    let ctx = PublicContext::from_bytes(&read_file(path.as_ref())?)?;
    info!("loaded public context {}", ctx.id());
    Ok(ctx)
}

pub fn load_private_context(path: impl AsRef<Path>) -> Result<PrivateContext> {
    let ctx = PrivateContext::from_bytes(&read_file(path.as_ref())?)?;
    info!("loaded private context {}", ctx.id());
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small() -> CkksParams {
        CkksParams::new(256, vec![60, 40, 40, 40, 60], 2f64.powi(40))
    }

    #[test]
    fn views_share_identity() {
        let (private, public) = create_contexts_with_rng(&small(), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(private.id(), public.id());
        assert!(public.has_relin_key());
        assert_eq!(public.galois_steps().len(), 7); // 1..64 for 128 slots
    }

    #[test]
    fn insufficient_depth_is_configuration_error() {
        let shallow = CkksParams::new(256, vec![60, 40, 40, 60], 2f64.powi(40));
        let err = create_contexts_with_rng(&shallow, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, VecDbError::Configuration(_)));
    }

    #[test]
    fn invalid_params_are_configuration_errors() {
        let bad = CkksParams::new(300, vec![60, 40, 40, 40, 60], 2f64.powi(40));
        assert!(matches!(
            create_contexts_with_rng(&bad, &mut StdRng::seed_from_u64(1)),
            Err(VecDbError::Configuration(_))
        ));
    }

    #[test]
    fn identical_paths_are_refused() {
        let (private, public) = create_contexts_with_rng(&small(), &mut StdRng::seed_from_u64(42)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.bin");
        let err = save_contexts(&private, &public, &path, &path).unwrap_err();
        assert!(matches!(err, VecDbError::Configuration(_)));
        assert!(!path.exists());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let (private, public) = create_contexts_with_rng(&small(), &mut StdRng::seed_from_u64(42)).unwrap();
        let (priv_path, pub_path) = (dir.path().join("context_private.bin"), dir.path().join("context_public.bin"));
        save_contexts(&private, &public, &priv_path, &pub_path).unwrap();

        assert_eq!(load_public_context(&pub_path).unwrap().id(), public.id());
        assert_eq!(load_private_context(&priv_path).unwrap().id(), private.id());

        assert!(matches!(
            load_private_context(&pub_path),
            Err(VecDbError::Ckks(CkksError::MissingSecretKey))
        ));
        assert!(matches!(
            load_public_context(&priv_path),
            Err(VecDbError::Ckks(CkksError::ContextKind { .. }))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn private_context_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let (private, public) = create_contexts_with_rng(&small(), &mut StdRng::seed_from_u64(7)).unwrap();
        let (priv_path, pub_path) = (dir.path().join("context_private.bin"), dir.path().join("context_public.bin"));
        save_contexts(&private, &public, &priv_path, &pub_path).unwrap();
        let mode = std::fs::metadata(&priv_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "private context readable by others: {mode:o}");
    }
}
