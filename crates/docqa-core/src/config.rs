//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`,
//! `config.<env>.toml` and `APP_*` env vars (nested keys separated by `__`,
//! e.g. `APP_RETRIEVAL__CHUNK_SIZE=500`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::FusionWeights;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.retrieval.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// All typed sections at once.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }
}

/// Every section the application reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub session: SessionConfig,
}

/// How each source's scores are brought into a comparable range before the
/// weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreNormalization {
    /// `1 / (rank_constant + rank)`, rank starting at 1.
    ReciprocalRank,
    /// `(score - min) / (max - min)` within the list; a flat list maps to 1.
    MinMax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k_lexical: usize,
    pub top_k_vector: usize,
    pub top_k_fused: usize,
    pub fusion_weight_lexical: f32,
    pub fusion_weight_vector: f32,
    pub normalization: ScoreNormalization,
    pub rank_constant: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            top_k_lexical: 2,
            top_k_vector: 2,
            top_k_fused: 4,
            fusion_weight_lexical: 0.3,
            fusion_weight_vector: 0.7,
            normalization: ScoreNormalization::ReciprocalRank,
            rank_constant: 60.0,
        }
    }
}

impl RetrievalConfig {
    /// Rejects bad parameters before any work starts.
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        for (name, k) in [
            ("top_k_lexical", self.top_k_lexical),
            ("top_k_vector", self.top_k_vector),
            ("top_k_fused", self.top_k_fused),
        ] {
            if k == 0 {
                return Err(Error::InvalidConfiguration(format!("{name} must be > 0")));
            }
        }
        if !self.rank_constant.is_finite() || self.rank_constant < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "rank_constant must be a finite number >= 0, got {}",
                self.rank_constant
            )));
        }
        self.weights()?;
        Ok(())
    }

    pub fn weights(&self) -> Result<FusionWeights> {
        FusionWeights::new(self.fusion_weight_lexical, self.fusion_weight_vector)
    }
}

pub(crate) fn validate_chunking(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::InvalidConfiguration("chunk_size must be > 0".into()));
    }
    if overlap >= chunk_size {
        return Err(Error::InvalidConfiguration(format!(
            "chunk_overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// Deterministic feature hashing, no model files needed.
    Hashing,
    /// Sentence-transformer BERT model (all-MiniLM-L6-v2 layout) run locally.
    Minilm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model_dir: Option<String>,
    /// Output dimension of the hashing embedder.
    pub dim: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Minilm,
            model_dir: None,
            dim: 384,
            max_len: 256,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Parent directory for per-upload staging directories. Defaults to the
    /// OS temp dir.
    pub staging_dir: Option<String>,
}

impl SessionConfig {
    pub fn staging_root(&self) -> PathBuf {
        self.staging_dir
            .as_deref()
            .map_or_else(env::temp_dir, expand_path)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
