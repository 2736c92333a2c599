//! Domain types shared by the chunker, both indexes and the fusion engine.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sequence index of a chunk within its document. Both indexes are built over
/// the same chunk ordering, so a `ChunkRef` compares across retrieval paths.
pub type ChunkRef = usize;

/// One loaded document: its extracted text plus where it came from.
///
/// Held behind an `Arc` once loaded and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), source: source.into(), text: text.into() }
    }
}

/// A contiguous slice of a document's text, the unit of retrieval.
///
/// - `doc_id`: the owning document
/// - `seq`: position within the document, unique per document
/// - `start`/`end`: byte offsets, `&document.text[start..end] == text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub seq: ChunkRef,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    /// Length in characters, the unit `chunk_size` is measured in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Lexical,
    Vector,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexical => f.write_str("lexical"),
            Self::Vector => f.write_str("vector"),
        }
    }
}

/// A single hit from one retrieval source. `score` is source-specific but
/// higher is always better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedHit {
    pub chunk: ChunkRef,
    pub score: f32,
    pub source: SourceKind,
}

/// A hit after fusion. `lexical`/`vector` carry the weighted, normalized
/// contribution of each source, `None` when the chunk was absent from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedHit {
    pub chunk: ChunkRef,
    pub score: f32,
    pub lexical: Option<f32>,
    pub vector: Option<f32>,
}

/// Result ordering used everywhere: descending score, then ascending chunk
/// sequence index so equal scores always come out in the same order.
pub fn rank_order(a_score: f32, a_chunk: ChunkRef, b_score: f32, b_chunk: ChunkRef) -> Ordering {
    b_score.total_cmp(&a_score).then(a_chunk.cmp(&b_chunk))
}

/// Sorts hits into result order and keeps at most `k`.
pub fn sort_and_truncate(hits: &mut Vec<RankedHit>, k: usize) {
    hits.sort_by(|a, b| rank_order(a.score, a.chunk, b.score, b.chunk));
    hits.truncate(k);
}

/// Per-source fusion weights. Any non-negative pair with a positive sum is
/// accepted; the pair is normalized to sum to one before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    lexical: f32,
    vector: f32,
}

impl FusionWeights {
    pub fn new(lexical: f32, vector: f32) -> crate::Result<Self> {
        let valid = |w: f32| w.is_finite() && w >= 0.0;
        if !valid(lexical) || !valid(vector) || lexical + vector <= 0.0 {
            return Err(crate::Error::InvalidWeights { lexical, vector });
        }
        Ok(Self { lexical, vector })
    }

    pub fn lexical(&self) -> f32 {
        self.lexical
    }

    pub fn vector(&self) -> f32 {
        self.vector
    }

    /// The weight pair scaled to sum to one.
    pub fn normalized(&self) -> (f32, f32) {
        let total = self.lexical + self.vector;
        (self.lexical / total, self.vector / total)
    }
}
