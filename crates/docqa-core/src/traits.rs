use crate::error::Result;
use crate::types::{RankedHit, SourceKind};

/// External embedding function. Implementations may call a local model or a
/// remote service; failures are opaque to the engine.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hashing:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// A built, read-only ranked-retrieval structure over one chunk sequence.
pub trait Retriever: Send + Sync {
    fn source(&self) -> SourceKind;
    /// At most `k` hits in descending score order, ties by lower chunk index.
    fn search(&self, query: &str, k: usize) -> Result<Vec<RankedHit>>;
}
