//! Locating and reading a local Hugging Face style model directory.
//!
//! Expected layout: `config.json`, `tokenizer.json`, and either
//! `model.safetensors` or `pytorch_model.bin`.

use anyhow::{Context, Result, anyhow, bail};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use std::collections::HashMap;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::info;

pub(crate) fn ensure_dir(model_dir: &Path) -> Result<()> {
    if !model_dir.is_dir() {
        bail!(
            "model directory not found: {} (set the models.* config keys, or APP_USE_FAKE_MODELS=1 for offline runs)",
            model_dir.display()
        );
    }
    Ok(())
}

pub(crate) fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let path = model_dir.join("tokenizer.json");
    Tokenizer::from_file(&path).map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))
}

/// Raw `config.json`; callers deserialize the typed config and read extra keys from it.
pub(crate) fn read_config(model_dir: &Path) -> Result<String> {
    let path = model_dir.join("config.json");
    std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
}

pub(crate) fn config_usize(raw: &str, key: &str) -> Result<usize> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    value
        .get(key)
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| anyhow!("config.json has no integer '{}'", key))
}

pub(crate) fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let pickle = model_dir.join("pytorch_model.bin");
    let tensors: HashMap<String, Tensor> = if safetensors.exists() {
        info!(path = %safetensors.display(), "loading weights");
        candle_core::safetensors::load(&safetensors, device)?
    } else if pickle.exists() {
        info!(path = %pickle.display(), "loading weights");
        candle_core::pickle::read_all(&pickle)?.into_iter().collect()
    } else {
        bail!("no model.safetensors or pytorch_model.bin in {}", model_dir.display());
    };
    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}

/// Short human-readable name for a model directory.
pub(crate) fn model_name(model_dir: &Path) -> String {
    model_dir
        .file_name()
        .map_or_else(|| model_dir.display().to_string(), |n| n.to_string_lossy().to_string())
}
