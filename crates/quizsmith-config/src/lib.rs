//! Configuration loading for quizsmith.
//! Reads quizsmith.toml from the current directory or the path in the QUIZSMITH_CONFIG env var,
//! then applies environment overrides (after loading `.env`).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16    { 8000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsConfig {
    /// Directory holding the PDFs; a document id is a file name under it.
    #[serde(default = "default_document_root")]
    pub root: PathBuf,
}

fn default_document_root() -> PathBuf { PathBuf::from("data/pdf") }

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self { root: default_document_root() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    /// Leading lines of each page inspected for a chapter marker.
    #[serde(default = "default_scan_lines")]
    pub scan_lines: usize,
    /// Title fragments this short or shorter are dropped from the label.
    #[serde(default = "default_min_title_len")]
    pub min_title_len: usize,
    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,
}

fn default_scan_lines()     -> usize  { 5 }
fn default_min_title_len()  -> usize  { 3 }
fn default_fallback_label() -> String { "Full Document".to_string() }

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            scan_lines: default_scan_lines(),
            min_title_len: default_min_title_len(),
            fallback_label: default_fallback_label(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

fn default_max_chars()     -> usize { 1000 }
fn default_overlap_chars() -> usize { 150 }

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: default_max_chars(), overlap_chars: default_overlap_chars() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// `{chapter}` is replaced with the requested chapter label.
    #[serde(default = "default_query_template")]
    pub query_template: String,
}

fn default_top_k()          -> usize  { 4 }
fn default_query_template() -> String { "All key concepts and facts from {chapter}".to_string() }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: default_top_k(), query_template: default_query_template() }
    }
}

impl RetrievalConfig {
    pub fn query_for(&self, chapter: &str) -> String {
        self.query_template.replace("{chapter}", chapter)
    }
}

// ── Generation backend ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Gemini,
    OpenaiCompatible,
    Ollama,
}

#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub backend: LlmProvider,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

fn default_llm_model()   -> String { "gemini-2.5-flash".to_string() }
fn default_temperature() -> f32    { 0.3 }
fn default_max_tokens()  -> u32    { 4096 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmProvider::default(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            base_url: None,
            api_key: None,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ── Embedding backend ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// In-process sentence-transformers model run with Candle.
    #[default]
    Local,
    Gemini,
    Openai,
    OpenaiCompatible,
    Ollama,
}

#[derive(Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingProvider,
    /// Model identifier; each backend has its own default when unset.
    pub model: Option<String>,
    #[serde(default = "default_dim")]
    pub dim: usize,
    /// Token limit per text for the local model.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

fn default_dim()         -> usize  { 384 }
fn default_max_length()  -> usize  { 256 }
fn default_batch_size()  -> usize  { 32 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingProvider::default(),
            model: None,
            dim: default_dim(),
            max_length: default_max_length(),
            batch_size: default_batch_size(),
            base_url: None,
            api_key: None,
        }
    }
}

impl EmbeddingConfig {
    /// The configured model, or the backend's default.
    pub fn model_id(&self) -> &str {
        if let Some(model) = &self.model {
            return model;
        }
        match self.backend {
            EmbeddingProvider::Local            => "sentence-transformers/all-MiniLM-L6-v2",
            EmbeddingProvider::Gemini           => "text-embedding-004",
            EmbeddingProvider::Openai
            | EmbeddingProvider::OpenaiCompatible => "text-embedding-3-small",
            EmbeddingProvider::Ollama           => "nomic-embed-text",
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("backend", &self.backend)
            .field("model", &self.model_id())
            .field("dim", &self.dim)
            .field("max_length", &self.max_length)
            .field("batch_size", &self.batch_size)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}


impl Config {
    /// Load configuration from quizsmith.toml.
    /// Checks QUIZSMITH_CONFIG env var first, then current directory.
    /// A missing file means defaults; environment overrides are applied either way.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }

        let path = std::env::var("QUIZSMITH_CONFIG")
            .unwrap_or_else(|_| "quizsmith.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_file(Path::new(&path))?
        } else {
            tracing::info!(path = %path, "No config file found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("QUIZSMITH_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("QUIZSMITH_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring unparsable QUIZSMITH_PORT"),
            }
        }
        if let Some(root) = lookup("QUIZSMITH_DOCUMENT_ROOT") {
            self.documents.root = PathBuf::from(root);
        }

        let google_key = lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY"));

        if let Some(key) = lookup("QUIZSMITH_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        } else if self.llm.api_key.is_none() && self.llm.backend == LlmProvider::Gemini {
            self.llm.api_key = google_key.clone();
        }

        if let Some(key) = lookup("QUIZSMITH_EMBED_API_KEY") {
            self.embedding.api_key = Some(key);
        } else if self.embedding.api_key.is_none()
            && self.embedding.backend == EmbeddingProvider::Gemini
        {
            self.embedding.api_key = google_key;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.max_chars == 0 {
            return Err(ConfigError::Invalid("chunking.max_chars must be positive".to_string()));
        }
        if self.chunking.overlap_chars >= self.chunking.max_chars {
            return Err(ConfigError::Invalid(format!(
                "chunking.overlap_chars ({}) must be smaller than chunking.max_chars ({})",
                self.chunking.overlap_chars, self.chunking.max_chars
            )));
        }
        if self.segmentation.scan_lines == 0 {
            return Err(ConfigError::Invalid("segmentation.scan_lines must be positive".to_string()));
        }
        if self.segmentation.fallback_label.trim().is_empty() {
            return Err(ConfigError::Invalid("segmentation.fallback_label must not be empty".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be positive".to_string()));
        }
        if self.embedding.dim == 0 || self.embedding.batch_size == 0 || self.embedding.max_length == 0 {
            return Err(ConfigError::Invalid(
                "embedding.dim, embedding.batch_size and embedding.max_length must be positive".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        Ok(())
    }
}
