use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use docqa_core::traits::{Embedder, Retriever};
use docqa_core::types::{rank_order, Chunk, RankedHit, SourceKind};
use docqa_core::{Error, Result};

use crate::similarity::{dot, l2_normalize};

/// Exact cosine-similarity index over one document's chunk embeddings.
///
/// Vectors are produced by the external embedder from the chunk text as-is
/// (no case normalization), stored unit-length in one flat buffer, and never
/// modified after `build`.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    dim: usize,
    vectors: Vec<f32>,
    len: usize,
}

impl VectorIndex {
    /// Embeds every chunk and stores the vectors. Any embedder failure, a
    /// wrong vector count or a wrong dimension aborts the build.
    #[instrument(skip_all, fields(chunks = chunks.len(), embedder = embedder.id()))]
    pub fn build(chunks: &[Chunk], embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dim = embedder.dim();
        if dim == 0 {
            return Err(Error::EmbeddingUnavailable(format!("embedder {} reports dimension 0", embedder.id())));
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&texts).map_err(|e| {
                warn!(error = %e, "embedding chunks failed");
                Error::embedding(&e)
            })?
        };
        if embeddings.len() != chunks.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut vectors = Vec::with_capacity(chunks.len() * dim);
        for (seq, mut v) in embeddings.into_iter().enumerate() {
            check_vector(&v, dim).map_err(|reason| Error::EmbeddingUnavailable(format!("chunk {seq}: {reason}")))?;
            l2_normalize(&mut v);
            vectors.extend_from_slice(&v);
        }
        info!(chunks = chunks.len(), dim, "vector index built");
        Ok(Self { embedder, dim, vectors, len: chunks.len() })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Stored unit vector of chunk `seq`.
    pub fn vector(&self, seq: usize) -> Option<&[f32]> {
        (seq < self.len).then(|| &self.vectors[seq * self.dim..(seq + 1) * self.dim])
    }

    /// Embeds `query` and returns the `k` most similar chunks.
    #[instrument(skip_all, fields(k = k))]
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<RankedHit>> {
        if k == 0 || self.len == 0 {
            return Ok(Vec::new());
        }
        let mut embedded = self.embedder.embed_batch(&[query.to_string()]).map_err(|e| {
            warn!(error = %e, "embedding query failed");
            Error::embedding(&e)
        })?;
        if embedded.len() != 1 {
            return Err(Error::EmbeddingUnavailable(format!("embedder returned {} vectors for one query", embedded.len())));
        }
        let q = embedded.remove(0);
        self.search_vec(&q, k)
    }

    /// Nearest neighbours of a raw query vector by cosine similarity.
    pub fn search_vec(&self, query: &[f32], k: usize) -> Result<Vec<RankedHit>> {
        check_vector(query, self.dim).map_err(|reason| Error::EmbeddingUnavailable(format!("query: {reason}")))?;
        if k == 0 || self.len == 0 {
            return Ok(Vec::new());
        }
        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut hits: Vec<RankedHit> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(seq, v)| RankedHit { chunk: seq, score: dot(&q, v), source: SourceKind::Vector })
            .collect();
        let cmp = |a: &RankedHit, b: &RankedHit| rank_order(a.score, a.chunk, b.score, b.chunk);
        if hits.len() > k {
            hits.select_nth_unstable_by(k - 1, cmp);
            hits.truncate(k);
        }
        hits.sort_by(cmp);
        debug!(hits = hits.len(), "vector search");
        Ok(hits)
    }
}

fn check_vector(v: &[f32], dim: usize) -> std::result::Result<(), String> {
    if v.len() != dim {
        return Err(format!("expected dimension {dim}, got {}", v.len()));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err("vector contains non-finite values".into());
    }
    Ok(())
}

impl Retriever for VectorIndex {
    fn source(&self) -> SourceKind {
        SourceKind::Vector
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<RankedHit>> {
        Self::search(self, query, k)
    }
}
