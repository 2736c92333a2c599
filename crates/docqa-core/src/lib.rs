//! docqa-core
//!
//! Domain types, error taxonomy, configuration and the document chunker
//! shared by the lexical, vector and hybrid crates.

pub mod chunker;
pub mod config;
pub mod error;
pub mod normalize;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
