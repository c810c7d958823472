//! Document loading and paragraph-packing chunker.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::persist::{read_bytes, write_atomic};
use crate::types::{Chunk, Document};

/// File extensions treated as text documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["txt"];

const PARAGRAPH_BREAK: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct DataProcessor {
    chunk_size: usize,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self { chunk_size: 100 }
    }
}

impl DataProcessor {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Loads every document directly inside `data_dir` and chunks it.
    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Chunk>> {
        let documents = self.load_documents(data_dir)?;
        self.run(&documents)
    }

    /// Reads each recognized text file in `data_dir` (non-recursive, sorted by name).
    pub fn load_documents(&self, data_dir: &Path) -> Result<Vec<Document>> {
        let files = list_document_files(data_dir)?;
        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            let content = read_file_content(path)?;
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            if content.trim().is_empty() {
                warn!(path = %path.display(), "document is empty");
            }
            debug!(title = %title, bytes = content.len(), "loaded document");
            documents.push(Document { title, content: content.trim().to_string() });
        }
        info!(count = documents.len(), dir = %data_dir.display(), "loaded documents");
        Ok(documents)
    }

    /// Collapses whitespace inside each paragraph to single spaces.
    ///
    /// Blank-line paragraph boundaries survive as exactly one `"\n\n"`, so the
    /// output can still be fed to [`DataProcessor::split`].
    pub fn clean(text: &str) -> String {
        paragraphs(text)
            .iter()
            .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join(PARAGRAPH_BREAK)
    }

    /// Greedily packs paragraphs into chunks of at most `chunk_size` words.
    ///
    /// Paragraphs are separated by blank lines (whitespace-only lines count).
    /// A paragraph longer than `chunk_size` is emitted on its own, unsplit.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        let mut buffer_words = 0usize;

        for paragraph in paragraphs(text) {
            let words = paragraph.split_whitespace().count();
            if buffer_words + words <= self.chunk_size {
                buffer.push(paragraph);
                buffer_words += words;
            } else {
                if !buffer.is_empty() {
                    chunks.push(buffer.join(PARAGRAPH_BREAK));
                }
                buffer = vec![paragraph];
                buffer_words = words;
            }
        }

        if !buffer.is_empty() {
            chunks.push(buffer.join(PARAGRAPH_BREAK));
        }
        chunks
    }

    /// Cleans and splits every document, numbering chunks from 1 per document.
    pub fn run(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let mut titles = HashSet::new();
        let mut all_chunks = Vec::new();
        for doc in documents {
            if !titles.insert(doc.title.as_str()) {
                return Err(Error::Validation(format!(
                    "duplicate document title '{}' would produce clashing chunk ids",
                    doc.title
                )));
            }
            let cleaned = Self::clean(&doc.content);
            let pieces = self.split(&cleaned);
            debug!(title = %doc.title, chunks = pieces.len(), "chunked document");
            all_chunks.extend(
                pieces
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| Chunk::new(&doc.title, i + 1, text)),
            );
        }
        info!(documents = documents.len(), chunks = all_chunks.len(), chunk_size = self.chunk_size, "created chunks");
        Ok(all_chunks)
    }
}

/// Writes the chunk list as pretty-printed JSON.
pub fn save_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    let json = serde_json::to_vec_pretty(chunks)
        .map_err(|e| Error::Parse(format!("failed to serialize chunks: {e}")))?;
    write_atomic(path, &json)?;
    info!(count = chunks.len(), path = %path.display(), "saved chunks");
    Ok(())
}

/// Reads a chunk file written by [`save_chunks`].
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let bytes = read_bytes(path)?;
    let chunks: Vec<Chunk> = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))?;
    let mut ids = HashSet::new();
    for chunk in &chunks {
        if chunk.text.trim().is_empty() {
            return Err(Error::Validation(format!("chunk '{}' has empty text", chunk.chunk_id)));
        }
        if !ids.insert(chunk.chunk_id.as_str()) {
            return Err(Error::Validation(format!("chunk id '{}' appears twice", chunk.chunk_id)));
        }
    }
    info!(count = chunks.len(), path = %path.display(), "loaded chunks");
    Ok(chunks)
}

/// Blank-line separated blocks of `text`, trimmed, lines rejoined with `\n`.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                out.push(lines.join("\n").trim().to_string());
                lines.clear();
            }
        } else {
            lines.push(line);
        }
    }
    if !lines.is_empty() {
        out.push(lines.join("\n").trim().to_string());
    }
    out
}

fn read_file_content(file_path: &Path) -> Result<String> {
    let bytes = fs::read(file_path).map_err(|e| Error::io(file_path, e))?;
    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).to_string()),
    }
}

fn list_document_files(root: &Path) -> Result<Vec<PathBuf>> {
    // walkdir reports an unreadable root lazily; surface it up front.
    fs::read_dir(root).map_err(|e| Error::io(root, e))?;
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            Error::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let recognized = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext));
        if recognized {
            files.push(path.to_path_buf());
        } else {
            debug!(path = %path.display(), "skipping non-text file");
        }
    }
    Ok(files)
}
