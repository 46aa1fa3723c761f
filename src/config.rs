//! `hevec.toml` configuration.
//!
//! ```toml
//! [paths]
//! data_dir = "data"
//! embeddings = "word_embeddings.txt"
//!
//! [query]
//! word = "king"
//! max_lines = 5000
//!
//! [ckks]
//! poly_modulus_degree = 32768
//! coeff_mod_bit_sizes = [60, 40, 40, 40, 40, 60]
//! scale_bits = 40
//! ```
//!
//! Every section and key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use hevec_ckks::CkksParams;
use log::info;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub query: QueryConfig,
    pub ckks: CkksConfig,
}

/// Artifact locations, relative to `data_dir` unless absolute.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub embeddings: PathBuf,
    pub private_context: PathBuf,
    pub public_context: PathBuf,
    pub encrypted_table: PathBuf,
    pub encrypted_query: PathBuf,
    pub encrypted_results: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".into(),
            embeddings: "word_embeddings.txt".into(),
            private_context: "context_private.bin".into(),
            public_context: "context_public.bin".into(),
            encrypted_table: "encrypted_vectors.bin".into(),
            encrypted_query: "encrypted_query.bin".into(),
            encrypted_results: "encrypted_results.bin".into(),
        }
    }
}

impl PathsConfig {
    pub fn resolve(&self, file: &Path) -> PathBuf {
        self.data_dir.join(file)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Name of the stored vector used as the query.
    pub word: String,
    /// Read only the first N lines of the embedding file.
    pub max_lines: Option<usize>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            word: "king".into(),
            max_lines: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CkksConfig {
    pub poly_modulus_degree: usize,
    pub coeff_mod_bit_sizes: Vec<u32>,
    /// log2 of the encoding scale.
    pub scale_bits: i32,
}

impl Default for CkksConfig {
    fn default() -> Self {
        let params = CkksParams::default();
        Self {
            poly_modulus_degree: params.poly_modulus_degree,
            coeff_mod_bit_sizes: params.coeff_mod_bit_sizes,
            scale_bits: params.global_scale.log2().round() as i32,
        }
    }
}

impl CkksConfig {
    pub fn params(&self) -> CkksParams {
        CkksParams::new(
            self.poly_modulus_degree,
            self.coeff_mod_bit_sizes.clone(),
            2f64.powi(self.scale_bits),
        )
    }
}

impl Config {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
