//! Embedding Store Builder: chunk texts, their vectors and metadata, position-aligned.

use std::path::Path;

use bincode::{Decode, Encode};
use chrono::Utc;
use tracing::{debug, info};

use ragpipe_core::persist::{load_binary, save_binary};
use ragpipe_core::traits::Embedder;
use ragpipe_core::types::Chunk;
use ragpipe_core::{Error, Result};

use crate::fingerprint::build_fingerprint;

/// Identity of one build run, stored ahead of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BundleHeader {
    pub format_version: u32,
    pub model_id: String,
    pub dim: usize,
    pub fingerprint: String,
    pub built_at_ms: i64,
}

/// Position `i` of `vectors`, `texts` and `metadata` always describes the same chunk.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct EmbeddingBundle {
    header: BundleHeader,
    vectors: Vec<Vec<f32>>,
    texts: Vec<String>,
    metadata: Vec<Chunk>,
}

impl EmbeddingBundle {
    pub const FORMAT_VERSION: u32 = 1;

    /// Embeds every chunk text in one batch call.
    pub fn build<E: Embedder + ?Sized>(chunks: &[Chunk], embedder: &E) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::InvalidConfig(
                "no chunks to embed; the document set produced no text".into(),
            ));
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        info!(count = texts.len(), model_id = embedder.model_id(), "embedding chunks");

        let vectors = embedder.embed_batch(&texts).map_err(|e| Error::service(&e))?;
        if vectors.len() != texts.len() {
            return Err(Error::InvalidConfig(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        let dim = uniform_dim(&vectors)?;
        if dim != embedder.dim() {
            return Err(Error::InvalidConfig(format!(
                "embedder declares dimension {} but produced {dim}",
                embedder.dim()
            )));
        }

        let header = BundleHeader {
            format_version: Self::FORMAT_VERSION,
            model_id: embedder.model_id().to_string(),
            dim,
            fingerprint: build_fingerprint(embedder.model_id(), chunks),
            built_at_ms: Utc::now().timestamp_millis(),
        };
        debug!(fingerprint = %header.fingerprint, dim, "bundle built");
        Ok(Self { header, vectors, texts, metadata: chunks.to_vec() })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_binary(path, self)?;
        info!(count = self.len(), path = %path.display(), "saved embedding bundle");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bundle: Self = load_binary(path)?;
        bundle.validate()?;
        info!(count = bundle.len(), model_id = %bundle.header.model_id, path = %path.display(), "loaded embedding bundle");
        Ok(bundle)
    }

    fn validate(&self) -> Result<()> {
        if self.header.format_version != Self::FORMAT_VERSION {
            return Err(Error::InvalidConfig(format!(
                "bundle format version {} is not supported (expected {})",
                self.header.format_version,
                Self::FORMAT_VERSION
            )));
        }
        let n = self.vectors.len();
        if self.texts.len() != n || self.metadata.len() != n {
            return Err(Error::InvalidConfig(format!(
                "bundle arrays are misaligned: {n} vectors, {} texts, {} metadata",
                self.texts.len(),
                self.metadata.len()
            )));
        }
        if n == 0 {
            return Err(Error::InvalidConfig("bundle is empty".into()));
        }
        if uniform_dim(&self.vectors)? != self.header.dim {
            return Err(Error::InvalidConfig(format!(
                "bundle vectors do not match header dimension {}",
                self.header.dim
            )));
        }
        Ok(())
    }

    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    pub fn model_id(&self) -> &str {
        &self.header.model_id
    }

    pub fn fingerprint(&self) -> &str {
        &self.header.fingerprint
    }

    pub fn dim(&self) -> usize {
        self.header.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn metadata(&self) -> &[Chunk] {
        &self.metadata
    }

    /// Text and metadata stored at `position`.
    pub fn get(&self, position: usize) -> Option<(&str, &Chunk)> {
        Some((self.texts.get(position)?.as_str(), self.metadata.get(position)?))
    }
}

fn uniform_dim(vectors: &[Vec<f32>]) -> Result<usize> {
    let dim = vectors.first().map_or(0, Vec::len);
    if dim == 0 {
        return Err(Error::InvalidConfig("embedding vectors have zero length".into()));
    }
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
        return Err(Error::InvalidConfig(format!(
            "vector {i} has length {} but the first has {dim}",
            v.len()
        )));
    }
    Ok(dim)
}
