//! Core types, errors, configuration and chunking for the ragpipe workspace.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod persist;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{AnswerExtractor, Embedder};
pub use types::{Answer, Chunk, Document, RetrievalResult};
