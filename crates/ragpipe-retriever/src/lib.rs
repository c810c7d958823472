//! Query-time retrieval over a saved embedding bundle and index, plus the
//! interactive question session.

use std::path::Path;

use tracing::{debug, info};

use ragpipe_core::traits::{AnswerExtractor, Embedder};
use ragpipe_core::types::{Answer, RetrievalResult};
use ragpipe_core::{Error, Result};
use ragpipe_vector::{EmbeddingBundle, FlatL2Index};

pub mod session;

pub use session::{Session, SessionState};

/// Query-time view over a bundle and its index, with the model services that
/// produced the bundle.
pub struct Retriever<E, A> {
    bundle: EmbeddingBundle,
    index: FlatL2Index,
    embedder: E,
    answerer: A,
}

impl<E, A> Retriever<E, A>
where
    E: Embedder,
    A: AnswerExtractor,
{
    /// Fails with a configuration error unless the index was built from this
    /// bundle and the embedder is the model that built it.
    pub fn new(bundle: EmbeddingBundle, index: FlatL2Index, embedder: E, answerer: A) -> Result<Self> {
        check_compatible(&bundle, &index, &embedder)?;
        Ok(Self { bundle, index, embedder, answerer })
    }

    pub fn load(bundle_path: &Path, index_path: &Path, embedder: E, answerer: A) -> Result<Self> {
        let bundle = EmbeddingBundle::load(bundle_path)?;
        let index = FlatL2Index::load(index_path)?;
        let retriever = Self::new(bundle, index, embedder, answerer)?;
        info!(chunks = retriever.len(), model_id = retriever.bundle.model_id(), "retriever ready");
        Ok(retriever)
    }

    /// Embeds `query` and returns the `k` closest chunks, closest first.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        let mut vectors = self
            .embedder
            .embed_batch(&[query.to_string()])
            .map_err(|e| Error::service(&e))?;
        if vectors.len() != 1 {
            return Err(Error::Service(format!("embedder returned {} vectors for one query", vectors.len())));
        }
        let query_vector = vectors.remove(0);
        let hits = self.index.search(&query_vector, k)?;
        debug!(query, hits = hits.len(), "retrieved");

        hits.into_iter()
            .map(|hit| {
                let (text, meta) = self.bundle.get(hit.position).ok_or_else(|| {
                    Error::Validation(format!("index position {} is outside the bundle", hit.position))
                })?;
                Ok(RetrievalResult {
                    text: text.to_string(),
                    meta: meta.clone(),
                    position: hit.position,
                    distance: hit.distance,
                })
            })
            .collect()
    }

    pub fn answer(&self, query: &str, context: &str) -> Result<Answer> {
        self.answerer.answer(query, context).map_err(|e| Error::service(&e))
    }

    pub fn len(&self) -> usize {
        self.bundle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundle.is_empty()
    }

    pub fn bundle(&self) -> &EmbeddingBundle {
        &self.bundle
    }
}

fn check_compatible<E: Embedder + ?Sized>(bundle: &EmbeddingBundle, index: &FlatL2Index, embedder: &E) -> Result<()> {
    if index.fingerprint() != bundle.fingerprint() {
        return Err(Error::InvalidConfig(
            "index was not built from this embedding bundle (fingerprint mismatch); rerun build-index".into(),
        ));
    }
    if index.len() != bundle.len() || index.dim() != bundle.dim() {
        return Err(Error::InvalidConfig(format!(
            "index holds {} vectors of dim {} but the bundle holds {} of dim {}",
            index.len(),
            index.dim(),
            bundle.len(),
            bundle.dim()
        )));
    }
    if embedder.model_id() != bundle.model_id() {
        return Err(Error::InvalidConfig(format!(
            "bundle was embedded with '{}' but the query embedder is '{}'",
            bundle.model_id(),
            embedder.model_id()
        )));
    }
    Ok(())
}
