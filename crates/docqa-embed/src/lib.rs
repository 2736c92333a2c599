//! Embedding collaborators for the vector index.
//!
//! `default_embedder` picks the implementation from configuration; setting
//! `APP_USE_FAKE_EMBEDDINGS=1` forces the deterministic hashing embedder for
//! fast tests and offline runs.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use docqa_core::config::{expand_path, EmbeddingConfig, EmbeddingProvider};
use docqa_core::traits::Embedder;

pub mod device;
pub mod hashing;
pub mod minilm;
pub mod pool;
pub mod tokenize;

pub use hashing::HashingEmbedder;
pub use minilm::SentenceEmbedder;
pub use pool::masked_mean_l2;

const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

pub fn default_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_fake || config.provider == EmbeddingProvider::Hashing {
        info!(dim = config.dim, "using hashing embedder");
        return Ok(Arc::new(HashingEmbedder::new(config.dim)));
    }
    let model_dir = resolve_model_dir(config.model_dir.as_deref())?;
    Ok(Arc::new(SentenceEmbedder::load(&model_dir, config.max_len, config.batch_size)?))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = [
        configured.map(expand_path),
        std::env::var("APP_MODEL_DIR").ok().map(expand_path),
        std::env::var("MODEL_DIR").ok().map(expand_path),
        Some(PathBuf::from(DEFAULT_MODEL_DIR)),
        Some(Path::new("..").join(DEFAULT_MODEL_DIR)),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Could not locate a sentence embedding model directory (set embedding.model_dir or APP_MODEL_DIR, or use APP_USE_FAKE_EMBEDDINGS=1)"))
}
