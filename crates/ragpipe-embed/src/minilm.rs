use anyhow::Result;
use candle_core::Device;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use ragpipe_core::traits::Embedder;

use crate::device::select_device;
use crate::model_dir::{config_usize, ensure_dir, load_tokenizer, load_weights, model_name, read_config};
use crate::pool::masked_mean_l2;
use crate::tokenize::encode_batch;

const BATCH_SIZE: usize = 32;

/// Sentence embedder over a BERT encoder (e.g. `all-MiniLM-L6-v2`, 384 dims).
///
/// Vectors are mean-pooled over real tokens and L2-normalised.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl MiniLmEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        ensure_dir(model_dir)?;
        let device = select_device();
        info!(dir = %model_dir.display(), "loading sentence embedder");
        let tokenizer = load_tokenizer(model_dir)?;
        let raw_config = read_config(model_dir)?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let dim = config_usize(&raw_config, "hidden_size")?;
        let vb = load_weights(model_dir, &device)?;
        let vb = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") { vb.pp("bert") } else { vb };
        let model = BertModel::load(vb, &config)?;
        let model_id = format!("minilm:{}:d{}", model_name(model_dir), dim);
        info!(model_id = %model_id, "sentence embedder ready");
        Ok(Self { model, tokenizer, device, model_id, dim, max_len })
    }
}

impl Embedder for MiniLmEmbedder {
    fn model_id(&self) -> &str { &self.model_id }

    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let enc = encode_batch(&self.tokenizer, batch, self.max_len, &self.device)?;
            let hidden = self.model.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
            let pooled = masked_mean_l2(&hidden, &enc.attention_mask)?;
            out.extend(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?);
            debug!(done = out.len(), total = texts.len(), "embedded batch");
        }
        Ok(out)
    }
}
