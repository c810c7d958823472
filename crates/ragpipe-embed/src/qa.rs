use anyhow::{Result, anyhow};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, linear};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use ragpipe_core::traits::AnswerExtractor;
use ragpipe_core::types::Answer;

use crate::device::select_device;
use crate::model_dir::{config_usize, ensure_dir, load_tokenizer, load_weights, read_config};

/// Longest answer span considered, in tokens.
const MAX_ANSWER_TOKENS: usize = 30;

/// Extractive question answering with DistilBERT and a `qa_outputs` span head
/// (e.g. `distilbert-base-uncased-distilled-squad`).
pub struct DistilBertExtractor {
    model: DistilBertModel,
    qa_outputs: Linear,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
}

impl DistilBertExtractor {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        ensure_dir(model_dir)?;
        let device = select_device();
        info!(dir = %model_dir.display(), "loading answer extractor");
        let tokenizer = load_tokenizer(model_dir)?;
        let raw_config = read_config(model_dir)?;
        let config: DistilBertConfig = serde_json::from_str(&raw_config)?;
        let dim = config_usize(&raw_config, "dim")?;
        let vb = load_weights(model_dir, &device)?;
        let qa_outputs = linear(dim, 2, vb.pp("qa_outputs"))?;
        let encoder_vb = if vb.contains_tensor("distilbert.embeddings.word_embeddings.weight") { vb.pp("distilbert") } else { vb };
        let model = DistilBertModel::load(encoder_vb, &config)?;
        Ok(Self { model, qa_outputs, tokenizer, device, max_len })
    }

    fn span_logits(&self, ids: &[u32]) -> Result<(Vec<f32>, Vec<f32>)> {
        let n = ids.len();
        let input_ids = Tensor::from_slice(ids, (1, n), &self.device)?;
        // Nothing is masked: a single unpadded sequence.
        let mask = Tensor::zeros((n, n), DType::U8, &self.device)?;
        let hidden = self.model.forward(&input_ids, &mask)?;
        let logits = self.qa_outputs.forward(&hidden)?.squeeze(0)?.to_device(&Device::Cpu)?.to_dtype(DType::F32)?;
        let start = logits.i((.., 0))?.to_vec1::<f32>()?;
        let end = logits.i((.., 1))?.to_vec1::<f32>()?;
        Ok((start, end))
    }
}

impl AnswerExtractor for DistilBertExtractor {
    fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let enc = self
            .tokenizer
            .encode((question, context), true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let n = enc.get_ids().len().min(self.max_len);
        let (start, end) = self.span_logits(&enc.get_ids()[..n])?;

        let sequence_ids = enc.get_sequence_ids();
        let in_context: Vec<bool> = (0..n).map(|i| sequence_ids.get(i).copied().flatten() == Some(1)).collect();
        let span = best_span(&start, &end, &in_context, MAX_ANSWER_TOKENS)
            .ok_or_else(|| anyhow!("no answer span inside the context"))?;

        let offsets = enc.get_offsets();
        let (from, to) = (offsets[span.start].0, offsets[span.end].1);
        let text = context
            .get(from..to)
            .ok_or_else(|| anyhow!("answer offsets {from}..{to} fall outside the context"))?;
        debug!(start = span.start, end = span.end, score = span.score, "extracted span");
        Ok(Answer { answer: text.trim().to_string(), score: span.score })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

/// Highest `start[s] + end[e]` over context tokens with `s <= e < s + max_tokens`.
///
/// The score is `p_start(s) * p_end(e)`, with both softmaxes taken over
/// context tokens only.
pub(crate) fn best_span(start: &[f32], end: &[f32], in_context: &[bool], max_tokens: usize) -> Option<Span> {
    let n = start.len().min(end.len()).min(in_context.len());
    let p_start = masked_softmax(&start[..n], &in_context[..n]);
    let p_end = masked_softmax(&end[..n], &in_context[..n]);

    let mut best: Option<(usize, usize, f32)> = None;
    for s in (0..n).filter(|&s| in_context[s]) {
        for e in (s..n.min(s + max_tokens)).filter(|&e| in_context[e]) {
            let logit = start[s] + end[e];
            if best.map_or(true, |(_, _, b)| logit > b) {
                best = Some((s, e, logit));
            }
        }
    }
    best.map(|(s, e, _)| Span { start: s, end: e, score: p_start[s] * p_end[e] })
}

fn masked_softmax(logits: &[f32], keep: &[bool]) -> Vec<f32> {
    let max = logits
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(l, _)| *l)
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().zip(keep).map(|(l, k)| if *k { (l - max).exp() } else { 0.0 }).collect();
    let total: f32 = exps.iter().sum();
    if total > 0.0 { exps.iter().map(|e| e / total).collect() } else { exps }
}
