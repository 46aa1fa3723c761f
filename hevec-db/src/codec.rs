//! Artifact container for encrypted tables, queries and results.
//!
//! Wire format:
//! ```text
//! "HEVC" | version u8 | kind u8 | bincode payload
//! ```
//! Ciphertexts inside the payload are opaque engine bytes; decoding them
//! requires the public context they were produced under.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use hevec_ckks::PublicContext;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::builder::{EncryptedEntry, EncryptedQuery, EncryptedTable};
use crate::error::{Result, VecDbError};
use crate::similarity::EncryptedSimilarities;

pub const MAGIC: &[u8; 4] = b"HEVC";
pub const VERSION: u8 = 1;
const HEADER_LEN: usize = 6;

/// What a container holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ArtifactKind {
    Table = 1,
    Query = 2,
    Results = 3,
}

impl ArtifactKind {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(ArtifactKind::Table),
            2 => Some(ArtifactKind::Query),
            3 => Some(ArtifactKind::Results),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct EntryBytes {
    vector: Vec<u8>,
    inv_norm: Vec<u8>,
}

impl EntryBytes {
    fn encode(entry: &EncryptedEntry) -> Result<Self> {
        Ok(Self {
            vector: entry.vector.to_bytes()?,
            inv_norm: entry.inv_norm.to_bytes()?,
        })
    }

    fn decode(&self, ctx: &PublicContext) -> Result<EncryptedEntry> {
        Ok(EncryptedEntry {
            vector: ctx.ciphertext_from_bytes(&self.vector)?,
            inv_norm: ctx.ciphertext_from_bytes(&self.inv_norm)?,
        })
    }
}

fn encode_container<T: Serialize>(kind: ArtifactKind, payload: &T) -> Result<Vec<u8>> {
    let body = bincode::serialize(payload)?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.push(kind as u8);
    out.extend_from_slice(&body);
    Ok(out)
}

fn decode_container<T: DeserializeOwned>(bytes: &[u8], expected: ArtifactKind) -> Result<T> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(VecDbError::Codec("not a hevec artifact (bad magic)".into()));
    }
    if bytes[4] != VERSION {
        return Err(VecDbError::Codec(format!("unsupported artifact version {}", bytes[4])));
    }
    match ArtifactKind::from_byte(bytes[5]) {
        Some(kind) if kind == expected => {}
        Some(kind) => {
            return Err(VecDbError::Codec(format!(
                "expected a {expected:?} artifact, found {kind:?}"
            )))
        }
        None => return Err(VecDbError::Codec(format!("unknown artifact kind {}", bytes[5]))),
    }
    Ok(bincode::deserialize(&bytes[HEADER_LEN..])?)
}

pub fn table_to_bytes(table: &EncryptedTable) -> Result<Vec<u8>> {
    let payload = table
        .iter()
        .map(|(name, entry)| Ok((name.clone(), EntryBytes::encode(entry)?)))
        .collect::<Result<BTreeMap<String, EntryBytes>>>()?;
    encode_container(ArtifactKind::Table, &payload)
}

pub fn table_from_bytes(ctx: &PublicContext, bytes: &[u8]) -> Result<EncryptedTable> {
    let payload: BTreeMap<String, EntryBytes> = decode_container(bytes, ArtifactKind::Table)?;
    payload
        .into_iter()
        .map(|(name, eb)| match eb.decode(ctx) {
            Ok(entry) => Ok((name, entry)),
            Err(e) => Err(VecDbError::entry(&name, e)),
        })
        .collect()
}

pub fn query_to_bytes(query: &EncryptedQuery) -> Result<Vec<u8>> {
    encode_container(ArtifactKind::Query, &EntryBytes::encode(query)?)
}

pub fn query_from_bytes(ctx: &PublicContext, bytes: &[u8]) -> Result<EncryptedQuery> {
    let payload: EntryBytes = decode_container(bytes, ArtifactKind::Query)?;
    payload.decode(ctx)
}

pub fn results_to_bytes(results: &EncryptedSimilarities) -> Result<Vec<u8>> {
    let payload = results
        .iter()
        .map(|(name, ct)| Ok((name.clone(), ct.to_bytes()?)))
        .collect::<Result<BTreeMap<String, Vec<u8>>>>()?;
    encode_container(ArtifactKind::Results, &payload)
}

pub fn results_from_bytes(ctx: &PublicContext, bytes: &[u8]) -> Result<EncryptedSimilarities> {
    let payload: BTreeMap<String, Vec<u8>> = decode_container(bytes, ArtifactKind::Results)?;
    payload
        .into_iter()
        .map(|(name, raw)| match ctx.ciphertext_from_bytes(&raw) {
            Ok(ct) => Ok((name, ct)),
            Err(e) => Err(VecDbError::entry(&name, e.into())),
        })
        .collect()
}

pub fn save_table(path: impl AsRef<Path>, table: &EncryptedTable) -> Result<()> {
    write_file(path.as_ref(), &table_to_bytes(table)?)
}

pub fn load_table(path: impl AsRef<Path>, ctx: &PublicContext) -> Result<EncryptedTable> {
    table_from_bytes(ctx, &read_file(path.as_ref())?)
}

pub fn save_query(path: impl AsRef<Path>, query: &EncryptedQuery) -> Result<()> {
    write_file(path.as_ref(), &query_to_bytes(query)?)
}

pub fn load_query(path: impl AsRef<Path>, ctx: &PublicContext) -> Result<EncryptedQuery> {
    query_from_bytes(ctx, &read_file(path.as_ref())?)
}

pub fn save_results(path: impl AsRef<Path>, results: &EncryptedSimilarities) -> Result<()> {
    write_file(path.as_ref(), &results_to_bytes(results)?)
}

pub fn load_results(path: impl AsRef<Path>, ctx: &PublicContext) -> Result<EncryptedSimilarities> {
    results_from_bytes(ctx, &read_file(path.as_ref())?)
}

/// Read a whole file, reporting a missing one as [`VecDbError::MissingFile`].
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => VecDbError::MissingFile {
            path: path.to_path_buf(),
            source: e,
        },
        _ => VecDbError::Io(e),
    })
}

/// Write a whole file, creating parent directories.
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    create_parent(path)?;
    fs::write(path, bytes)?;
    debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Write a file only its owner can read. Existing files are truncated and
/// narrowed to mode 0600 before the new contents land.
pub(crate) fn write_owner_only(path: &Path, bytes: &[u8]) -> Result<()> {
    create_parent(path)?;
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        if path.exists() {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    debug!("wrote {} bytes to {} (owner only)", bytes.len(), path.display());
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
