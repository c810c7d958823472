//! Model services: sentence embeddings and extractive question answering.
//!
//! Real models run on candle from local Hugging Face directories. Setting
//! `APP_USE_FAKE_MODELS=1` swaps in deterministic hashing/overlap fakes.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use ragpipe_core::config::{ModelSettings, resolve_with_base};
use ragpipe_core::traits::{AnswerExtractor, Embedder};

pub mod device;
pub mod fake;
pub mod minilm;
pub(crate) mod model_dir;
pub mod pool;
pub mod qa;
pub mod tokenize;

pub use fake::{HashingEmbedder, OverlapExtractor};
pub use minilm::MiniLmEmbedder;
pub use qa::DistilBertExtractor;

pub const FAKE_MODELS_ENV: &str = "APP_USE_FAKE_MODELS";
/// Matches all-MiniLM-L6-v2 so fake and real artifacts have the same shape.
pub const FAKE_EMBEDDING_DIM: usize = 384;

pub fn use_fake_models() -> bool {
    std::env::var(FAKE_MODELS_ENV)
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn get_default_embedder(models: &ModelSettings, base: &Path) -> Result<Box<dyn Embedder>> {
    if use_fake_models() {
        info!(dim = FAKE_EMBEDDING_DIM, "using hashing embedder");
        return Ok(Box::new(HashingEmbedder::new(FAKE_EMBEDDING_DIM)));
    }
    let dir = resolve_with_base(base, &models.embedding_dir);
    Ok(Box::new(MiniLmEmbedder::load(&dir, models.max_len)?))
}

pub fn get_default_answer_extractor(models: &ModelSettings, base: &Path) -> Result<Box<dyn AnswerExtractor>> {
    if use_fake_models() {
        info!("using overlap answer extractor");
        return Ok(Box::new(OverlapExtractor));
    }
    let dir = resolve_with_base(base, &models.qa_dir);
    Ok(Box::new(DistilBertExtractor::load(&dir, models.max_len)?))
}
