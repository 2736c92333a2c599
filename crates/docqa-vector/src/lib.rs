//! docqa-vector
//!
//! In-memory dense-vector index: stores one embedding per chunk and answers
//! exact top-k cosine-similarity queries.

pub mod index;
pub mod similarity;

pub use index::VectorIndex;
