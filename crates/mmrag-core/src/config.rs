//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`APP_RETRIEVAL__K=6` sets `retrieval.k`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Build from an explicit figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config = Self { figment: Figment::new().merge(Serialized::defaults(Settings::default())).merge(figment) };
        config.validate()?;
        Ok(config)
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        self.figment.extract().map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let s = self.settings()?;
        if s.retrieval.k == 0 {
            return Err(ConfigError::Invalid("retrieval.k must be at least 1".into()));
        }
        if s.summarize.concurrency == 0 {
            return Err(ConfigError::Invalid("summarize.concurrency must be at least 1".into()));
        }
        if s.chunking.max_characters == 0 {
            return Err(ConfigError::Invalid("chunking.max_characters must be positive".into()));
        }
        if s.timeouts.call_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts.call_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Typed view of the whole configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    pub chunking: ChunkingConfig,
    pub summarize: SummarizeSettings,
    pub timeouts: TimeoutSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub index: IndexSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 4 }
    }
}

/// Fragment boundary thresholds handed to the extractor, in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_characters: usize,
    pub new_after_n_chars: usize,
    pub combine_text_under_n_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_characters: 3000, new_after_n_chars: 2800, combine_text_under_n_chars: 2000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeSettings {
    /// Upper bound on in-flight summarization calls.
    pub concurrency: usize,
    /// When false, text fragments are indexed under their own content.
    pub summarize_texts: bool,
    pub max_text_fragments: Option<usize>,
}

impl Default for SummarizeSettings {
    fn default() -> Self {
        Self { concurrency: 1, summarize_texts: true, max_text_fragments: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub call_timeout_secs: u64,
}

impl TimeoutSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self { call_timeout_secs: 120 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProvider {
    Hash,
    BgeM3,
    Gemini,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model: String,
    /// Dimensionality of the hashing embedder.
    pub dim: usize,
    pub model_dir: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: EmbeddingProvider::Hash, model: "models/embedding-001".to_string(), dim: 768, model_dir: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub summary_model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-pro-latest".to_string(),
            summary_model: "gemini-1.5-flash".to_string(),
            temperature: 0.0,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Memory,
    Lance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    /// Root under which per-document LanceDB directories are created;
    /// relative paths resolve against the system temp directory.
    pub lance_dir: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { backend: IndexBackend::Memory, lance_dir: "mmrag-index".to_string() }
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
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
