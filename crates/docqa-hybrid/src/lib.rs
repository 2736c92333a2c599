//! docqa-hybrid
//!
//! Fuses lexical and vector retrieval over one document and manages the
//! document's lifecycle within a session.

pub mod fusion;
pub mod pipeline;
pub mod prompt;
pub mod session;

pub use fusion::{fuse, Fusion};
pub use pipeline::{Passage, RetrievalPipeline};
pub use prompt::{ask, Answer, AnswerSynthesizer, PromptTemplate};
pub use session::Session;
