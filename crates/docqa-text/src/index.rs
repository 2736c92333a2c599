use std::collections::BTreeSet;
use std::fmt::Display;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::tokenizer::{TextAnalyzer, TokenStream};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info, instrument};

use docqa_core::normalize::normalize_lexical;
use docqa_core::traits::Retriever;
use docqa_core::types::{sort_and_truncate, Chunk, RankedHit, SourceKind};
use docqa_core::{Error, Result};

use crate::tantivy_utils::{build_schema, chunk_text_analyzer, register_tokenizer, SEQ_FIELD, TEXT_FIELD};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// In-RAM BM25 index over one document's chunks.
///
/// Chunk text is passed through `normalize_lexical` before indexing and every
/// query goes through the same function, so matching is case-insensitive on
/// both sides. Read-only once built.
pub struct LexicalIndex {
	reader: IndexReader,
	seq_field: Field,
	text_field: Field,
	analyzer: TextAnalyzer,
	num_chunks: usize,
}

fn index_err(e: impl Display) -> Error {
	Error::Index(e.to_string())
}

impl LexicalIndex {
	#[instrument(skip_all, fields(chunks = chunks.len()))]
	pub fn build(chunks: &[Chunk]) -> Result<Self> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let seq_field = schema.get_field(SEQ_FIELD).map_err(index_err)?;
		let text_field = schema.get_field(TEXT_FIELD).map_err(index_err)?;

		// One indexing thread keeps segment layout independent of the host.
		let mut index_writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES).map_err(index_err)?;
		for c in chunks {
			let doc = doc!(
				seq_field => c.seq as u64,
				text_field => normalize_lexical(&c.text),
			);
			index_writer.add_document(doc).map_err(index_err)?;
		}
		index_writer.commit().map_err(index_err)?;

		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(index_err)?;
		info!(chunks = chunks.len(), "lexical index built");
		Ok(Self { reader, seq_field, text_field, analyzer: chunk_text_analyzer(), num_chunks: chunks.len() })
	}

	pub fn len(&self) -> usize {
		self.num_chunks
	}

	pub fn is_empty(&self) -> bool {
		self.num_chunks == 0
	}

	/// Distinct index terms of `query` after normalization, in sorted order.
	pub fn query_terms(&self, query: &str) -> Vec<String> {
		let normalized = normalize_lexical(query);
		let mut analyzer = self.analyzer.clone();
		let mut stream = analyzer.token_stream(&normalized);
		let mut terms = BTreeSet::new();
		while stream.advance() {
			terms.insert(stream.token().text.clone());
		}
		terms.into_iter().collect()
	}

	#[instrument(skip_all, fields(k = k))]
	pub fn search(&self, query: &str, k: usize) -> Result<Vec<RankedHit>> {
		if k == 0 || self.num_chunks == 0 {
			return Ok(Vec::new());
		}
		let terms = self.query_terms(query);
		if terms.is_empty() {
			return Ok(Vec::new());
		}
		let clauses: Vec<(Occur, Box<dyn Query>)> = terms
			.iter()
			.map(|t| {
				let q: Box<dyn Query> = Box::new(TermQuery::new(Term::from_field_text(self.text_field, t), IndexRecordOption::WithFreqs));
				(Occur::Should, q)
			})
			.collect();
		let q = BooleanQuery::new(clauses);

		// Collect every match so ties at the cut-off resolve by chunk order,
		// not by tantivy's internal doc order.
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&q, &TopDocs::with_limit(self.num_chunks)).map_err(index_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(index_err)?;
			let seq = doc
				.get_first(self.seq_field)
				.and_then(|v| v.as_u64())
				.ok_or_else(|| Error::Index(format!("document {addr:?} has no sequence index")))?;
			hits.push(RankedHit { chunk: seq as usize, score, source: SourceKind::Lexical });
		}
		sort_and_truncate(&mut hits, k);
		debug!(terms = terms.len(), hits = hits.len(), "lexical search");
		Ok(hits)
	}
}

impl Retriever for LexicalIndex {
	fn source(&self) -> SourceKind {
		SourceKind::Lexical
	}

	fn search(&self, query: &str, k: usize) -> Result<Vec<RankedHit>> {
		Self::search(self, query, k)
	}
}
