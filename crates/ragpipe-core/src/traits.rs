use crate::types::Answer;

/// Maps text to fixed-length vectors.
///
/// Implementations must return exactly one vector per input, all of length
/// `dim()`, and must be deterministic for a given `model_id()`.
pub trait Embedder: Send + Sync {
    /// Stable identity of the model; bundles record it and retrieval checks it.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Extracts an answer span for `question` out of `context`.
pub trait AnswerExtractor: Send + Sync {
    fn answer(&self, question: &str, context: &str) -> anyhow::Result<Answer>;
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn model_id(&self) -> &str { (**self).model_id() }
    fn dim(&self) -> usize { (**self).dim() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { (**self).embed_batch(texts) }
}

impl<T: AnswerExtractor + ?Sized> AnswerExtractor for Box<T> {
    fn answer(&self, question: &str, context: &str) -> anyhow::Result<Answer> { (**self).answer(question, context) }
}
