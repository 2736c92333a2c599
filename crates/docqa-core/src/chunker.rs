//! Splits document text into overlapping chunks.
//!
//! The text is first cut into pieces using the coarsest separator that makes
//! every piece fit `chunk_size`: paragraphs, then lines, then sentences, then
//! words, then grapheme clusters. Separators stay attached to the piece they
//! end, so the pieces tile the text exactly. Pieces are then packed greedily
//! into chunks, each chunk after the first starting with up to `overlap`
//! characters taken from the end of its predecessor.
//!
//! Sizes are counted in characters; offsets are byte offsets.

use std::ops::Range;

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::validate_chunking;
use crate::error::Result;
use crate::types::{Chunk, Document};

const SEPARATORS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, overlap)?;
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self
            .split_ranges(&document.text)
            .into_iter()
            .enumerate()
            .map(|(seq, range)| Chunk {
                doc_id: document.id.clone(),
                seq,
                start: range.start,
                end: range.end,
                text: document.text[range].to_string(),
            })
            .collect();
        debug!(doc_id = %document.id, chunks = chunks.len(), "split document");
        chunks
    }

    /// Byte ranges of the chunks of `text`, in order.
    pub fn split_ranges(&self, text: &str) -> Vec<Range<usize>> {
        let mut pieces = Vec::new();
        collect_pieces(text, 0, 0, self.chunk_size, &mut pieces);
        let piece_chars: Vec<usize> = pieces.iter().map(|r| text[r.clone()].chars().count()).collect();

        let mut chunks: Vec<Range<usize>> = Vec::new();
        let mut next = 0;
        while next < pieces.len() {
            let (start, mut len) = match chunks.last() {
                None => (pieces[next].start, 0),
                Some(prev) => {
                    let budget = self.overlap.min(self.chunk_size.saturating_sub(piece_chars[next]));
                    tail_within(text, prev.clone(), budget)
                }
            };
            // Always take at least one piece so every iteration makes progress.
            len += piece_chars[next];
            let mut end = pieces[next].end;
            next += 1;
            while next < pieces.len() && len + piece_chars[next] <= self.chunk_size {
                len += piece_chars[next];
                end = pieces[next].end;
                next += 1;
            }
            chunks.push(start..end);
        }
        chunks
    }
}

/// Convenience form of [`Chunker::split`].
pub fn split(document: &Document, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(chunk_size, overlap)?.split(document))
}

fn collect_pieces(text: &str, base: usize, level: usize, limit: usize, out: &mut Vec<Range<usize>>) {
    if text.is_empty() {
        return;
    }
    if text.chars().count() <= limit {
        out.push(base..base + text.len());
        return;
    }
    let Some(separators) = SEPARATORS.get(level) else {
        out.extend(text.grapheme_indices(true).map(|(i, g)| base + i..base + i + g.len()));
        return;
    };
    let mut cuts: Vec<usize> = separators
        .iter()
        .flat_map(|sep| text.match_indices(sep).map(move |(i, _)| i + sep.len()))
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut piece_start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(text.len())) {
        if cut > piece_start {
            collect_pieces(&text[piece_start..cut], base + piece_start, level + 1, limit, out);
            piece_start = cut;
        }
    }
}

/// The longest suffix of `text[range]` made of whole grapheme clusters and
/// at most `max_chars` characters, as `(start_byte, char_count)`.
fn tail_within(text: &str, range: Range<usize>, max_chars: usize) -> (usize, usize) {
    let mut start = range.end;
    let mut chars = 0;
    for (i, g) in text[range.clone()].grapheme_indices(true).rev() {
        let n = g.chars().count();
        if chars + n > max_chars {
            break;
        }
        chars += n;
        start = range.start + i;
    }
    (start, chars)
}
