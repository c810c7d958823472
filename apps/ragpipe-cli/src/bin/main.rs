//! ragpipe: local retrieval-augmented question answering over a folder of text files.
//!
//! ```bash
//! ragpipe preprocess --docs ./documents
//! ragpipe build-embeddings
//! ragpipe build-index
//! ragpipe query -k 3
//! ```

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ragpipe_cli::{build_embeddings, build_index, open_session, preprocess};
use ragpipe_core::config::{Config, Settings};
use ragpipe_embed::{get_default_answer_extractor, get_default_embedder};

#[derive(Parser)]
#[command(name = "ragpipe")]
#[command(about = "Chunk, embed, index and query a local document set")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split documents into chunks and write the chunk file
    Preprocess {
        /// Directory of .txt documents
        #[arg(long)]
        docs: Option<PathBuf>,

        /// Chunk file to write
        #[arg(long)]
        out: Option<PathBuf>,

        /// Maximum words per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Embed every chunk and write the embedding bundle
    BuildEmbeddings {
        #[arg(long)]
        chunks: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Build the vector index from the embedding bundle
    BuildIndex {
        #[arg(long)]
        bundle: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Ask questions interactively
    Query {
        #[arg(long)]
        bundle: Option<PathBuf>,

        #[arg(long)]
        index: Option<PathBuf>,

        /// Number of chunks to retrieve per question
        #[arg(short, long)]
        k: Option<usize>,
    },
}

fn main() -> Result<()> {
    // stdout carries the interactive session, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let settings: Settings = config.settings()?;
    let base = std::env::current_dir()?;
    let paths = settings.data.resolve(&base);
    tracing::debug!(env = config.env_name(), "configuration loaded");

    match cli.command {
        Commands::Preprocess { docs, out, chunk_size } => {
            let docs = docs.unwrap_or(paths.docs_dir);
            let out = out.unwrap_or(paths.chunks_file);
            let chunk_size = chunk_size.unwrap_or(settings.chunking.chunk_size);
            anyhow::ensure!(chunk_size > 0, "--chunk-size must be at least 1");
            let count = preprocess(&docs, &out, chunk_size)?;
            println!("✅ Wrote {count} chunks to {}", out.display());
        }

        Commands::BuildEmbeddings { chunks, out } => {
            let chunks = chunks.unwrap_or(paths.chunks_file);
            let out = out.unwrap_or(paths.bundle_file);
            let embedder = get_default_embedder(&settings.models, &base)?;
            let count = build_embeddings(&chunks, &out, &embedder)?;
            println!("✅ Embedded {count} chunks into {}", out.display());
        }

        Commands::BuildIndex { bundle, out } => {
            let bundle = bundle.unwrap_or(paths.bundle_file);
            let out = out.unwrap_or(paths.index_file);
            let count = build_index(&bundle, &out)?;
            println!("✅ Indexed {count} vectors into {}", out.display());
        }

        Commands::Query { bundle, index, k } => {
            let bundle = bundle.unwrap_or(paths.bundle_file);
            let index = index.unwrap_or(paths.index_file);
            let top_k = k.unwrap_or(settings.retrieval.top_k);
            anyhow::ensure!(top_k > 0, "-k must be at least 1");
            let embedder = get_default_embedder(&settings.models, &base)?;
            let answerer = get_default_answer_extractor(&settings.models, &base)?;
            let mut session = open_session(&bundle, &index, embedder, answerer, top_k, &settings.retrieval.exit_sentinel)?;
            session.run(io::stdin().lock(), &mut io::stdout().lock())?;
        }
    }

    Ok(())
}
