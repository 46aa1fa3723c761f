use thiserror::Error;

use crate::context::ContextKind;

/// Errors raised by the CKKS engine.
#[derive(Debug, Error)]
pub enum CkksError {
    #[error("invalid parameters: {0}")]
    Configuration(String),

    #[error("ciphertext is bound to a different context")]
    ContextMismatch,

    #[error("scale mismatch: {left} vs {right}")]
    ScaleMismatch { left: f64, right: f64 },

    #[error("operation requires the secret key, which this context does not hold")]
    MissingSecretKey,

    #[error("expected a {expected} context, found a {found} context")]
    ContextKind {
        expected: ContextKind,
        found: ContextKind,
    },

    #[error("no relinearization key in context")]
    MissingRelinKey,

    #[error("no Galois key for rotation by {0}")]
    MissingGaloisKey(usize),

    #[error("modulus chain exhausted: cannot rescale a ciphertext with one prime left")]
    DepthExhausted,

    #[error("too many values: {count} > {slots} slots")]
    TooManyValues { count: usize, slots: usize },

    #[error("value {value} does not fit at scale {scale}")]
    ValueOutOfRange { value: f64, scale: f64 },

    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, CkksError>;
