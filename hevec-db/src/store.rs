//! Plaintext embedding store.
//!
//! Text format, one vector per line: `<name> <v1> <v2> ... <vk>`,
//! whitespace separated. Blank lines are skipped. A later line with the
//! same name replaces the earlier one.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Result, VecDbError};

/// Named plaintext vectors, ordered by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorStore {
    vectors: BTreeMap<String, Vec<f64>>,
}

impl VectorStore {
    /// Load every line of an embedding file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_limited(path, None)
    }

    /// Load at most the first `max_lines` lines of an embedding file.
    pub fn load_limited(path: impl AsRef<Path>, max_lines: Option<usize>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => VecDbError::MissingFile {
                path: path.to_path_buf(),
                source: e,
            },
            io::ErrorKind::InvalidData => format_error(path, 0, "not valid UTF-8".to_string()),
            _ => VecDbError::Io(e),
        })?;
        let store = Self::parse(&text, path, max_lines)?;
        debug!("loaded {} vectors from {}", store.len(), path.display());
        Ok(store)
    }

    /// Parse embedding text. `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path, max_lines: Option<usize>) -> Result<Self> {
        let mut vectors = BTreeMap::new();
        let limit = max_lines.unwrap_or(usize::MAX);

        for (idx, line) in text.lines().take(limit).enumerate() {
            let lineno = idx + 1;
            let mut parts = line.split_whitespace();
            let Some(name) = parts.next() else {
                continue;
            };

            let vector = parts
                .map(|tok| match tok.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    Ok(_) => Err(format_error(origin, lineno, format!("non-finite component {tok:?}"))),
                    Err(_) => Err(format_error(origin, lineno, format!("non-numeric component {tok:?}"))),
                })
                .collect::<Result<Vec<f64>>>()?;
            if vector.is_empty() {
                return Err(format_error(origin, lineno, format!("{name:?} has no components")));
            }

            if vectors.insert(name.to_string(), vector).is_some() {
                warn!(
                    "{}:{lineno}: duplicate name {name:?}, keeping the later vector",
                    origin.display()
                );
            }
        }

        Ok(Self { vectors })
    }

    pub fn from_vectors<I, S>(vectors: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        Self {
            vectors: vectors.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.vectors.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vectors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Length of the longest vector, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.values().map(Vec::len).max()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vectors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.vectors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

fn format_error(path: &Path, line: usize, reason: String) -> VecDbError {
    VecDbError::Format {
        path: PathBuf::from(path),
        line,
        reason,
    }
}
