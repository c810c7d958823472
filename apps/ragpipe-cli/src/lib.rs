//! Pipeline stages behind the `ragpipe` subcommands.
//!
//! Each stage reads the previous stage's artifact from disk and writes its
//! own, so stages can be rerun independently.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use ragpipe_core::data_processor::{load_chunks, save_chunks, DataProcessor};
use ragpipe_core::traits::{AnswerExtractor, Embedder};
use ragpipe_core::Result;
use ragpipe_retriever::{Retriever, Session};
use ragpipe_vector::{EmbeddingBundle, FlatL2Index};

/// Chunks every document in `docs_dir` and writes the chunk file. Returns the chunk count.
pub fn preprocess(docs_dir: &Path, chunks_file: &Path, chunk_size: usize) -> Result<usize> {
    let chunks = DataProcessor::new(chunk_size).process_directory(docs_dir)?;
    save_chunks(chunks_file, &chunks)?;
    Ok(chunks.len())
}

/// Embeds the chunk file into a bundle. Returns the bundle size.
pub fn build_embeddings<E: Embedder + ?Sized>(chunks_file: &Path, bundle_file: &Path, embedder: &E) -> Result<usize> {
    let chunks = load_chunks(chunks_file)?;
    let spinner = spinner(format!("Embedding {} chunks with {}", chunks.len(), embedder.model_id()));
    let built = EmbeddingBundle::build(&chunks, embedder);
    spinner.finish_and_clear();
    let bundle = built?;
    bundle.save(bundle_file)?;
    Ok(bundle.len())
}

/// Indexes a saved bundle. Returns the index size.
pub fn build_index(bundle_file: &Path, index_file: &Path) -> Result<usize> {
    let bundle = EmbeddingBundle::load(bundle_file)?;
    let index = FlatL2Index::from_bundle(&bundle)?;
    index.save(index_file)?;
    Ok(index.len())
}

/// Loads both artifacts and wraps them in an interactive session.
pub fn open_session<E, A>(
    bundle_file: &Path,
    index_file: &Path,
    embedder: E,
    answerer: A,
    top_k: usize,
    exit_sentinel: &str,
) -> Result<Session<E, A>>
where
    E: Embedder,
    A: AnswerExtractor,
{
    let retriever = Retriever::load(bundle_file, index_file, embedder, answerer)?;
    info!(top_k, "session ready");
    Ok(Session::new(retriever, top_k, exit_sentinel))
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
