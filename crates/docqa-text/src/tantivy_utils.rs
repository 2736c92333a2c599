use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "chunk_text";
pub const SEQ_FIELD: &str = "seq";
pub const TEXT_FIELD: &str = "text";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _seq_field = schema_builder.add_u64_field(SEQ_FIELD, INDEXED | STORED | FAST);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqs);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	let _text_field = schema_builder.add_text_field(TEXT_FIELD, text_options);
	schema_builder.build()
}

/// Word tokenizer for chunk text and queries. Input is already lower-cased by
/// `normalize_lexical`; the `LowerCaser` keeps the analyzer safe to use on
/// raw text too.
pub fn chunk_text_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(SimpleTokenizer::default()).filter(LowerCaser).build()
}

pub fn register_tokenizer(index: &Index) {
	index.tokenizers().register(TOKENIZER_NAME, chunk_text_analyzer());
}
