// Weighted score fusion of the lexical and vector result lists

use std::collections::{BTreeMap, BTreeSet};

use docqa_core::config::ScoreNormalization;
use docqa_core::types::{rank_order, ChunkRef, FusedHit, FusionWeights, RankedHit};
use docqa_core::Result;

/// Rank constant of reciprocal-rank normalization, as used by the common
/// ensemble retrievers.
pub const DEFAULT_RANK_CONSTANT: f32 = 60.0;

/// Fusion parameters fixed for the lifetime of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fusion {
    weights: FusionWeights,
    normalization: ScoreNormalization,
    rank_constant: f32,
}

impl Fusion {
    pub fn new(weights: FusionWeights, normalization: ScoreNormalization, rank_constant: f32) -> Self {
        Self { weights, normalization, rank_constant }
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// Merges two ranked lists into at most `k` fused hits.
    ///
    /// Each list is normalized on its own, then scaled by its share of the
    /// weight pair. A chunk missing from one list only gets the other term.
    pub fn fuse(&self, lexical: &[RankedHit], vector: &[RankedHit], k: usize) -> Vec<FusedHit> {
        let (w_lex, w_vec) = self.weights.normalized();
        let mut by_chunk: BTreeMap<ChunkRef, FusedHit> = BTreeMap::new();

        for (chunk, norm) in self.normalize(lexical) {
            let hit = by_chunk.entry(chunk).or_insert_with(|| empty_hit(chunk));
            hit.lexical = Some(w_lex * norm);
        }
        for (chunk, norm) in self.normalize(vector) {
            let hit = by_chunk.entry(chunk).or_insert_with(|| empty_hit(chunk));
            hit.vector = Some(w_vec * norm);
        }

        let mut fused: Vec<FusedHit> = by_chunk
            .into_values()
            .map(|mut h| {
                h.score = h.lexical.unwrap_or(0.0) + h.vector.unwrap_or(0.0);
                h
            })
            .collect();
        fused.sort_by(|a, b| rank_order(a.score, a.chunk, b.score, b.chunk));
        fused.truncate(k);
        fused
    }

    /// Normalized score per distinct chunk of one source list, best first.
    fn normalize(&self, hits: &[RankedHit]) -> Vec<(ChunkRef, f32)> {
        let mut ordered: Vec<RankedHit> = hits.to_vec();
        ordered.sort_by(|a, b| rank_order(a.score, a.chunk, b.score, b.chunk));
        // A chunk listed twice keeps its best position.
        let mut seen = BTreeSet::new();
        ordered.retain(|h| seen.insert(h.chunk));

        match self.normalization {
            ScoreNormalization::ReciprocalRank => ordered
                .iter()
                .enumerate()
                .map(|(i, h)| (h.chunk, reciprocal_rank(i + 1, self.rank_constant)))
                .collect(),
            ScoreNormalization::MinMax => {
                let (min, max) = ordered.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), h| {
                    (lo.min(h.score), hi.max(h.score))
                });
                let span = max - min;
                ordered
                    .iter()
                    .map(|h| {
                        let norm = if span > 0.0 && span.is_finite() { (h.score - min) / span } else { 1.0 };
                        (h.chunk, norm)
                    })
                    .collect()
            }
        }
    }
}

fn empty_hit(chunk: ChunkRef) -> FusedHit {
    FusedHit { chunk, score: 0.0, lexical: None, vector: None }
}

/// `1 / (rank_constant + rank)`, rank starting at 1.
pub fn reciprocal_rank(rank: usize, rank_constant: f32) -> f32 {
    1.0 / (rank_constant + rank as f32)
}

/// One-shot fusion with raw weights and reciprocal-rank normalization.
///
/// Fails with `InvalidWeights` for a negative weight or an all-zero pair.
pub fn fuse(lexical: &[RankedHit], vector: &[RankedHit], weights: (f32, f32), k: usize) -> Result<Vec<FusedHit>> {
    let weights = FusionWeights::new(weights.0, weights.1)?;
    Ok(Fusion::new(weights, ScoreNormalization::ReciprocalRank, DEFAULT_RANK_CONSTANT).fuse(lexical, vector, k))
}
