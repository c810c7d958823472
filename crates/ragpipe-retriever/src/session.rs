//! Interactive question loop over a [`Retriever`].

use std::io::{self, BufRead, Write};

use tracing::debug;

use ragpipe_core::traits::{AnswerExtractor, Embedder};
use ragpipe_core::types::RetrievalResult;

use crate::Retriever;

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loaded,
    AwaitingQuery,
    Answering,
    Exiting,
}

pub struct Session<E, A> {
    retriever: Retriever<E, A>,
    exit_sentinel: String,
    top_k: usize,
    state: SessionState,
}

impl<E, A> Session<E, A>
where
    E: Embedder,
    A: AnswerExtractor,
{
    pub fn new(retriever: Retriever<E, A>, top_k: usize, exit_sentinel: &str) -> Self {
        Self {
            retriever,
            exit_sentinel: exit_sentinel.trim().to_string(),
            top_k,
            state: SessionState::Loaded,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Reads queries until the exit sentinel or end of input.
    ///
    /// Only I/O failures on `input`/`out` abort the loop; retrieval and answer
    /// errors are printed and the next query is read.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> io::Result<()> {
        self.state = SessionState::AwaitingQuery;
        writeln!(out, "Loaded {} chunks. Type '{}' to quit.", self.retriever.len(), self.exit_sentinel)?;

        while self.state != SessionState::Exiting {
            write!(out, "\nAsk something (or type '{}'): ", self.exit_sentinel)?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                self.state = SessionState::Exiting;
                writeln!(out)?;
                break;
            }
            self.handle_line(&line, out)?;
        }
        writeln!(out, "Goodbye!")?;
        Ok(())
    }

    /// Processes one input line and returns the resulting state.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<SessionState> {
        let query = line.trim();
        if query.is_empty() {
            return Ok(self.state);
        }
        if query.to_lowercase() == self.exit_sentinel.to_lowercase() {
            self.state = SessionState::Exiting;
            return Ok(self.state);
        }

        self.state = SessionState::Answering;
        self.answer_query(query, out)?;
        self.state = SessionState::AwaitingQuery;
        Ok(self.state)
    }

    fn answer_query<W: Write>(&self, query: &str, out: &mut W) -> io::Result<()> {
        writeln!(out, "\nRetrieving top {} chunks for query: '{query}'", self.top_k)?;
        let results = match self.retriever.retrieve(query, self.top_k) {
            Ok(results) => results,
            Err(e) => return writeln!(out, "❌ Retrieval failed: {e}"),
        };
        let Some(top) = results.first() else {
            return writeln!(out, "No relevant chunks found.");
        };

        writeln!(out, "\nTop relevant chunks:")?;
        for r in &results {
            print_result(out, r)?;
        }

        debug!(context = %top.meta.chunk_id, "answering from top chunk");
        match self.retriever.answer(query, &top.text) {
            Ok(answer) => writeln!(out, "\nAnswer: {} (score {:.3})", answer.answer, answer.score),
            Err(e) => writeln!(out, "\n❌ Error generating answer: {e}"),
        }
    }
}

fn print_result<W: Write>(out: &mut W, result: &RetrievalResult) -> io::Result<()> {
    let preview: String = result.text.chars().take(PREVIEW_CHARS).collect();
    writeln!(out, "- [{}] {preview}...\n", result.meta.document_id)
}
