//! Deterministic stand-ins for the neural models.
//!
//! Selected with `APP_USE_FAKE_MODELS=1`; they need no model files and make
//! the whole pipeline runnable offline and in tests.

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::hash::Hasher;
use twox_hash::XxHash64;

use ragpipe_core::traits::{AnswerExtractor, Embedder};
use ragpipe_core::types::Answer;

/// Feature-hashing bag-of-words embedder.
///
/// Each token is hashed with xxHash64 (seed 0) into a signed bucket, then the
/// vector is L2-normalised. Texts sharing words land close in L2 distance.
pub struct HashingEmbedder {
    dim: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, model_id: format!("hashing:xxh64:d{dim}") }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str { &self.model_id }

    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.dim == 0 {
            bail!("hashing embedder needs a non-zero dimension");
        }
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Picks the context sentence sharing the most words with the question.
///
/// The score is the fraction of distinct question words found in that sentence.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverlapExtractor;

impl AnswerExtractor for OverlapExtractor {
    fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        if context.trim().is_empty() {
            bail!("cannot answer from an empty context");
        }
        let wanted: HashSet<String> = tokens(question).collect();
        let mut best = ("", 0usize);
        for sentence in sentences(context) {
            let found: HashSet<String> = tokens(sentence).collect();
            let overlap = wanted.intersection(&found).count();
            if best.0.is_empty() || overlap > best.1 {
                best = (sentence, overlap);
            }
        }
        let score = if wanted.is_empty() { 0.0 } else { best.1 as f32 / wanted.len() as f32 };
        Ok(Answer { answer: best.0.to_string(), score })
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '?', '!']).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_prefers_sentence_with_most_shared_words() {
        let ctx = "Cats sleep a lot. The capital of France is Paris! Dogs bark.";
        let a = OverlapExtractor.answer("What is the capital of France?", ctx).unwrap();
        assert_eq!(a.answer, "The capital of France is Paris!");
        assert!(a.score > 0.5 && a.score <= 1.0);
    }

    #[test]
    fn overlap_without_shared_words_returns_first_sentence_with_zero_score() {
        let a = OverlapExtractor.answer("zebra", "One. Two.").unwrap();
        assert_eq!(a.answer, "One.");
        assert_eq!(a.score, 0.0);
    }

    #[test]
    fn overlap_rejects_empty_context() {
        assert!(OverlapExtractor.answer("anything", "   ").is_err());
    }

    #[test]
    fn hashing_ignores_case_and_punctuation() {
        let e = HashingEmbedder::new(64);
        let v = e.embed_batch(&["Hello, World!".to_string(), "hello world".to_string()]).unwrap();
        assert_eq!(v[0], v[1]);
    }

    #[test]
    fn hashing_empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(8);
        let v = e.embed_batch(&[String::new()]).unwrap();
        assert!(v[0].iter().all(|x| *x == 0.0));
    }
}
