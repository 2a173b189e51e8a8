//! Configuration loading and validation for Engram.
//!
//! Loads configuration from `~/.engram/config.toml` with environment
//! variable overrides (`ENGRAM_*`). The engine consumes values only; loading
//! lives here so the core never touches the filesystem or the environment.

use engram_core::state::StateBounds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.engram/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the language-model backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider endpoint base URL. Any OpenAI-compatible endpoint works.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for the reply (Action stage).
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for compression, qualification, and fact extraction.
    /// Defaults to `model` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressor_model: Option<String>,

    /// Embedding model for semantic search. Empty disables embeddings.
    #[serde(default)]
    pub embedding_model: String,

    /// Turn-pipeline configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// HTTP gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Persona / instruction-content configuration.
    #[serde(default)]
    pub persona: PersonaConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            compressor_model: None,
            embedding_model: String::new(),
            engine: EngineConfig::default(),
            gateway: GatewayConfig::default(),
            persona: PersonaConfig::default(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("compressor_model", &self.compressor_model)
            .field("embedding_model", &self.embedding_model)
            .field("engine", &self.engine)
            .field("gateway", &self.gateway)
            .field("persona", &self.persona)
            .finish()
    }
}

/// Tunables for the per-turn pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recall fan-out: how many candidate artifacts to retrieve.
    #[serde(default = "default_recall_k")]
    pub recall_k: usize,

    /// Timeout for the Recall knowledge-store query.
    #[serde(default = "default_recall_timeout")]
    pub recall_timeout_secs: u64,

    /// Timeout for the Qualify model call.
    #[serde(default = "default_qualify_timeout")]
    pub qualify_timeout_secs: u64,

    /// Timeout for each Compress model call.
    #[serde(default = "default_compress_timeout")]
    pub compress_timeout_secs: u64,

    /// Overall timeout for reply generation.
    #[serde(default = "default_respond_timeout")]
    pub respond_timeout_secs: u64,

    /// Repair retries after an invalid compressor output.
    #[serde(default = "default_compress_retries")]
    pub compress_retries: u32,

    /// Emit per-stage intermediate outputs at DEBUG level.
    #[serde(default)]
    pub debug_trace: bool,

    /// Size caps for the cognitive state's fields.
    #[serde(default)]
    pub bounds: StateBounds,
}

fn default_recall_k() -> usize {
    5
}
fn default_recall_timeout() -> u64 {
    10
}
fn default_qualify_timeout() -> u64 {
    20
}
fn default_compress_timeout() -> u64 {
    45
}
fn default_respond_timeout() -> u64 {
    120
}
fn default_compress_retries() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recall_k: default_recall_k(),
            recall_timeout_secs: default_recall_timeout(),
            qualify_timeout_secs: default_qualify_timeout(),
            compress_timeout_secs: default_compress_timeout(),
            respond_timeout_secs: default_respond_timeout(),
            compress_retries: default_compress_retries(),
            debug_trace: false,
            bounds: StateBounds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8420
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { port: default_port(), host: default_host() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Namespace under the settings root, typically a user name.
    #[serde(default = "default_persona_name")]
    pub name: String,

    /// Root directory for persona and memory files.
    /// Defaults to `~/.engram/agent-settings`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_root: Option<String>,
}

fn default_persona_name() -> String {
    "default".into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self { name: default_persona_name(), settings_root: None }
    }
}

impl PersonaConfig {
    /// The directory persona files and the reflective log live in.
    pub fn dir(&self) -> PathBuf {
        let root = self
            .settings_root
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("agent-settings"));
        root.join(&self.name)
    }
}

impl AppConfig {
    /// Load from the default location with env-var overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("ENGRAM_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(url) = std::env::var("ENGRAM_API_URL") {
            config.api_url = url;
        }
        if let Ok(model) = std::env::var("ENGRAM_MODEL") {
            config.model = model;
        }
        if std::env::var("ENGRAM_DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
        {
            config.engine.debug_trace = true;
        }

        Ok(config)
    }

    /// Load from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// `~/.engram`
    pub fn config_dir() -> PathBuf {
        home_dir().join(".engram")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.recall_k == 0 {
            return Err(ConfigError::ValidationError(
                "engine.recall_k must be at least 1".into(),
            ));
        }
        if self.engine.bounds.max_text_chars == 0 {
            return Err(ConfigError::ValidationError(
                "engine.bounds.max_text_chars must be at least 1".into(),
            ));
        }
        if self.model.is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// The model used for compression and qualification.
    pub fn compressor_model(&self) -> &str {
        self.compressor_model.as_deref().unwrap_or(&self.model)
    }

    /// A commented starter config.
    pub fn default_toml() -> String {
        r#"# Engram configuration

# api_key = "sk-..."            # or ENGRAM_API_KEY / OPENAI_API_KEY
api_url = "https://api.openai.com/v1"
model = "gpt-4o"
# compressor_model = "gpt-4o-mini"
# embedding_model = "text-embedding-3-small"

[engine]
recall_k = 5
compress_retries = 1
debug_trace = false

[engine.bounds]
max_text_chars = 600
max_entities = 12
max_relations = 10
max_constraints = 12
max_artifacts = 8

[gateway]
host = "127.0.0.1"
port = 8420

[persona]
name = "default"
"#
        .into()
    }
}

fn home_dir() -> PathBuf {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
