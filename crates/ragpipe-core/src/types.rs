//! Domain types shared by the chunker, the embedding store and the retriever.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// One input file: `title` is the file stem, `content` the trimmed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub content: String,
}

/// A bounded span of a document that is embedded and retrieved on its own.
///
/// - `document_id`: title of the source document (serialized as `document`)
/// - `chunk_id`: `<document_id>_chunk_<n>`, 1-based per document, globally unique
/// - `text`: the non-empty payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Chunk {
    #[serde(rename = "document")]
    pub document_id: String,
    pub chunk_id: ChunkId,
    pub text: String,
}

impl Chunk {
    pub fn new(document_id: &str, ordinal: usize, text: String) -> Self {
        Self {
            document_id: document_id.to_string(),
            chunk_id: format!("{document_id}_chunk_{ordinal}"),
            text,
        }
    }
}

/// A chunk returned for a query, with its index position and L2 distance.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub text: String,
    pub meta: Chunk,
    pub position: usize,
    pub distance: f32,
}

/// Output of an answer-extraction service.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub score: f32,
}
