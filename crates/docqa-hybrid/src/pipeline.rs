use std::sync::Arc;
use std::time::Instant;

use tokio::task::{self, JoinHandle};
use tracing::{debug, info, instrument};

use docqa_core::chunker::Chunker;
use docqa_core::config::RetrievalConfig;
use docqa_core::traits::{Embedder, Retriever};
use docqa_core::types::{Chunk, Document, FusedHit, RankedHit};
use docqa_core::{Error, Result};
use docqa_text::LexicalIndex;
use docqa_vector::VectorIndex;

use crate::fusion::Fusion;

/// A fused hit resolved to its chunk, ready to be handed to an answer
/// synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub chunk: Chunk,
    pub score: f32,
    pub lexical: Option<f32>,
    pub vector: Option<f32>,
}

/// One document's chunks plus both indexes built over them.
///
/// Immutable once built; share it behind an `Arc` and query concurrently.
pub struct RetrievalPipeline {
    document: Arc<Document>,
    chunks: Arc<Vec<Chunk>>,
    lexical: Arc<LexicalIndex>,
    vector: Arc<VectorIndex>,
    fusion: Fusion,
    config: RetrievalConfig,
}

impl RetrievalPipeline {
    /// Chunks `document` and builds the lexical and vector indexes in
    /// parallel. Either build failing fails the whole load.
    #[instrument(skip_all, fields(doc_id = %document.id, embedder = embedder.id()))]
    pub async fn build(document: Document, config: RetrievalConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        config.validate()?;
        let fusion = Fusion::new(config.weights()?, config.normalization, config.rank_constant);
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let started = Instant::now();

        let chunks = Arc::new(chunker.split(&document));
        let lexical_chunks = Arc::clone(&chunks);
        let lexical = task::spawn_blocking(move || LexicalIndex::build(&lexical_chunks));
        let vector_chunks = Arc::clone(&chunks);
        let vector = task::spawn_blocking(move || VectorIndex::build(&vector_chunks, embedder));
        let (lexical, vector) = tokio::try_join!(joined(lexical), joined(vector))?;

        info!(chunks = chunks.len(), elapsed_ms = started.elapsed().as_millis() as u64, "retrieval pipeline ready");
        Ok(Self {
            document: Arc::new(document),
            chunks,
            lexical: Arc::new(lexical),
            vector: Arc::new(vector),
            fusion,
            config,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn vector(&self) -> &VectorIndex {
        &self.vector
    }

    /// Runs both searches concurrently. A failure in either source fails the
    /// query; there is no single-source fallback.
    pub async fn search_both(&self, query: &str) -> Result<(Vec<RankedHit>, Vec<RankedHit>)> {
        let lexical: Arc<dyn Retriever> = self.lexical.clone();
        let vector: Arc<dyn Retriever> = self.vector.clone();
        tokio::try_join!(
            joined(spawn_search(lexical, query, self.config.top_k_lexical)),
            joined(spawn_search(vector, query, self.config.top_k_vector)),
        )
    }

    /// The `k` best fused hits for `query`.
    #[instrument(skip_all, fields(k = k))]
    pub async fn fused_hits(&self, query: &str, k: usize) -> Result<Vec<FusedHit>> {
        if k == 0 {
            return Err(Error::InvalidConfiguration("k must be > 0".into()));
        }
        let started = Instant::now();
        let (lexical, vector) = self.search_both(query).await?;
        let fused = self.fusion.fuse(&lexical, &vector, k);
        debug!(
            lexical = lexical.len(),
            vector = vector.len(),
            fused = fused.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "hybrid query"
        );
        Ok(fused)
    }

    /// Ranked passages that can answer `query`, best first, at most `k`.
    pub async fn answerable_passages(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let fused = self.fused_hits(query, k).await?;
        Ok(fused
            .into_iter()
            .filter_map(|hit| {
                self.chunks.get(hit.chunk).map(|chunk| Passage {
                    chunk: chunk.clone(),
                    score: hit.score,
                    lexical: hit.lexical,
                    vector: hit.vector,
                })
            })
            .collect())
    }
}

fn spawn_search(retriever: Arc<dyn Retriever>, query: &str, k: usize) -> JoinHandle<Result<Vec<RankedHit>>> {
    let query = query.to_owned();
    task::spawn_blocking(move || {
        let hits = retriever.search(&query, k)?;
        debug!(source = %retriever.source(), hits = hits.len(), "source search");
        Ok(hits)
    })
}

async fn joined<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    handle.await.map_err(|e| Error::Task(e.to_string()))?
}
