use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Invalid fusion weights: lexical={lexical}, vector={vector}")]
    InvalidWeights { lexical: f32, vector: f32 },

    #[error("No document loaded")]
    NoDocumentLoaded,

    #[error("Lexical index failed: {0}")]
    Index(String),

    #[error("Retrieval task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps a collaborator failure from the embedding function, keeping the
    /// full context chain in the message.
    pub fn embedding(err: &anyhow::Error) -> Self {
        Self::EmbeddingUnavailable(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
