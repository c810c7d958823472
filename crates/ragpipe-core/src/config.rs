//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_CHUNKING__CHUNK_SIZE`). Every key
//! has a built-in default so the pipeline runs without any config file.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.settings()?;
        Ok(config)
    }

    /// Wraps an already assembled figment; used by tests and embedders of the library.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment, env_name: "custom".to_string() }
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Typed view of the whole configuration, with defaults for missing keys.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub models: ModelSettings,
    pub retrieval: RetrievalSettings,
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be at least 1".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be at least 1".into()));
        }
        if self.retrieval.exit_sentinel.trim().is_empty() {
            return Err(Error::InvalidConfig("retrieval.exit_sentinel must not be empty".into()));
        }
        if self.models.max_len == 0 {
            return Err(Error::InvalidConfig("models.max_len must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub docs_dir: String,
    pub chunks_file: String,
    pub bundle_file: String,
    pub index_file: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            docs_dir: "./documents".to_string(),
            chunks_file: "processed_documents.json".to_string(),
            bundle_file: "embeddings.bin".to_string(),
            index_file: "index.bin".to_string(),
        }
    }
}

/// Artifact locations after `~`/`$VAR` expansion and base resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub docs_dir: PathBuf,
    pub chunks_file: PathBuf,
    pub bundle_file: PathBuf,
    pub index_file: PathBuf,
}

impl DataSettings {
    pub fn resolve(&self, base: &Path) -> DataPaths {
        DataPaths {
            docs_dir: resolve_with_base(base, &self.docs_dir),
            chunks_file: resolve_with_base(base, &self.chunks_file),
            bundle_file: resolve_with_base(base, &self.bundle_file),
            index_file: resolve_with_base(base, &self.index_file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Upper bound on words per chunk; a single longer paragraph is kept whole.
    pub chunk_size: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub embedding_dir: String,
    pub qa_dir: String,
    /// Token budget per encoded input.
    pub max_len: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            embedding_dir: "models/all-MiniLM-L6-v2".to_string(),
            qa_dir: "models/distilbert-base-uncased-distilled-squad".to_string(),
            max_len: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub exit_sentinel: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3, exit_sentinel: "exit".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
