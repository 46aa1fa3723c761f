use std::io;
use std::path::PathBuf;

use hevec_ckks::CkksError;
use thiserror::Error;

/// Errors raised by the encrypted similarity pipeline.
#[derive(Debug, Error)]
pub enum VecDbError {
    #[error("cannot open {}: {source}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: {reason}", path.display())]
    Format {
        path: PathBuf,
        /// 1-based; 0 when the whole file is unreadable as text.
        line: usize,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no vector named {0:?}")]
    NotFound(String),

    #[error("vector has zero norm")]
    ZeroNorm,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("entry {name:?}: {source}")]
    Entry {
        name: String,
        #[source]
        source: Box<VecDbError>,
    },

    #[error(transparent)]
    Ckks(#[from] CkksError),

    #[error("codec error: {0}")]
    Codec(String),
}

impl VecDbError {
    pub(crate) fn entry(name: &str, source: VecDbError) -> Self {
        VecDbError::Entry {
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}

impl From<bincode::Error> for VecDbError {
    fn from(e: bincode::Error) -> Self {
        VecDbError::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VecDbError>;
