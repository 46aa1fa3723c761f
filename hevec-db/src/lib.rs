//! # hevec-db
//!
//! Encrypted cosine similarity between a private query and a table of
//! named embeddings.
//!
//! Three roles, three stages:
//! - **setup** (data holder): create contexts, encrypt the table and query
//! - **compute** (untrusted party): public context only, combine ciphertexts
//! - **reveal** (result holder): private context, decrypt and compare
//!
//! Artifacts crossing stage boundaries use the container in [`codec`].

pub mod builder;
pub mod codec;
pub mod contexts;
pub mod disclosure;
pub mod error;
pub mod similarity;
pub mod store;

pub use builder::{encrypt_entry, encrypt_query, encrypt_table, inverse_norm, EncryptedEntry, EncryptedQuery, EncryptedTable};
pub use contexts::{
    create_contexts, create_contexts_with_rng, load_private_context, load_public_context, save_contexts,
    SIMILARITY_DEPTH,
};
pub use disclosure::{
    compare, decrypt_similarities, plaintext_cosine, plaintext_similarities, Comparison, PlaintextSimilarities,
};
pub use error::{Result, VecDbError};
pub use similarity::{compute_similarities, encrypted_cosine, EncryptedSimilarities};
pub use store::VectorStore;
