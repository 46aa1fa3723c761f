//! # hevec-ckks
//!
//! Leveled RNS-CKKS over Z[X]/(X^N + 1) for approximate arithmetic on
//! packed real vectors.
//!
//! - Modulus chain generated from bit sizes at context creation; the last
//!   prime is reserved for key switching
//! - Canonical-embedding SIMD packing with N/2 slots, rotations via
//!   Galois automorphisms
//! - Relinearization and rotation through one special prime with a
//!   per-prime gadget
//! - Two capability views: [`PublicContext`] encrypts and evaluates,
//!   [`PrivateContext`] additionally decrypts
//!
//! ```no_run
//! use hevec_ckks::{CkksParams, PrivateContext};
//!
//! let mut rng = rand::thread_rng();
//! let mut private = PrivateContext::new(CkksParams::default(), &mut rng)?;
//! private.generate_relin_keys(&mut rng);
//! private.generate_galois_keys(&mut rng);
//!
//! let public = private.to_public();
//! let a = public.encrypt(&[1.0, 2.0, 3.0])?;
//! let b = public.encrypt(&[4.0, 5.0, 6.0])?;
//! let dot = public.sum_slots(&public.multiply(&a, &b)?)?;
//!
//! assert!((private.decrypt(&dot)?[0] - 32.0).abs() < 1e-3);
//! # Ok::<(), hevec_ckks::CkksError>(())
//! ```

pub mod ciphertext;
pub mod context;
pub mod error;
mod eval;
pub mod keys;
pub mod ntt;
pub mod params;
pub mod rns;
pub mod sampling;
pub mod simd;

pub use ciphertext::Ciphertext;
pub use context::{ContextId, ContextKind, PrivateContext, PublicContext};
pub use error::{CkksError, Result};
pub use params::CkksParams;
