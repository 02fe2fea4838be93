use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::qa::DEFAULT_MAX_CONTEXT_CHARS;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rodeo: RodeoConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    pub extraction: ExtractionConfig,
    pub completion: CompletionConfig,
    #[serde(default)]
    pub qa: QaConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct RodeoConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RodeoConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

/// Blob store (stage) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory that holds staged uploads.
    pub stage_dir: PathBuf,
    /// Location string the extraction service uses to resolve staged files.
    /// Defaults to `stage_dir`.
    #[serde(default)]
    pub stage_path: Option<String>,
}

/// Metadata registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: default_db_path(),
        }
    }
}

/// Which extractor handles documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Remote document-parsing service, local decoding only for unsupported types
    Remote,
    /// Local best-effort decoding only (offline mode)
    Local,
}

/// Text extraction service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub mode: ExtractionMode,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_extraction_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_true")]
    pub ocr: bool,
    #[serde(default = "default_true")]
    pub local_fallback: bool,
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
}

/// Completion service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_completion_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

/// Question answering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QaConfig {
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_max_context_chars(),
            preview_chars: default_preview_chars(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("docrodeo.db")
}

fn default_extraction_key_env() -> String {
    "RODEO_EXTRACTION_API_KEY".to_string()
}

fn default_completion_key_env() -> String {
    "RODEO_COMPLETION_API_KEY".to_string()
}

fn default_extraction_timeout() -> u64 {
    120
}

fn default_completion_timeout() -> u64 {
    60
}

fn default_model() -> String {
    "llama3.1-70b".to_string()
}

fn default_max_context_chars() -> usize {
    DEFAULT_MAX_CONTEXT_CHARS
}

fn default_preview_chars() -> usize {
    3000
}

fn default_http_port() -> u16 {
    8501
}

fn default_max_upload_bytes() -> u64 {
    200 * 1024 * 1024
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RODEO_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RODEO_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.qa.max_context_chars == 0 {
            anyhow::bail!("qa.max_context_chars must be greater than 0");
        }

        if self.http_server.max_upload_bytes == 0 {
            anyhow::bail!("http_server.max_upload_bytes must be greater than 0");
        }

        if self.extraction.timeout_secs == 0 || self.completion.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than 0");
        }

        if self.completion.model.trim().is_empty() {
            anyhow::bail!("completion.model must not be empty");
        }

        url::Url::parse(&self.completion.endpoint).with_context(|| {
            format!("completion.endpoint is not a valid URL: {}", self.completion.endpoint)
        })?;

        match (&self.extraction.mode, &self.extraction.endpoint) {
            (ExtractionMode::Remote, None) => {
                anyhow::bail!("extraction.endpoint is required when extraction.mode = \"remote\"");
            }
            (_, Some(endpoint)) => {
                url::Url::parse(endpoint).with_context(|| {
                    format!("extraction.endpoint is not a valid URL: {}", endpoint)
                })?;
            }
            (ExtractionMode::Local, None) => {}
        }

        Ok(())
    }

    /// Get the stage directory
    pub fn stage_dir(&self) -> &Path {
        &self.storage.stage_dir
    }

    /// Get the location string handed to the extraction service
    pub fn stage_path(&self) -> String {
        self.storage
            .stage_path
            .clone()
            .unwrap_or_else(|| self.storage.stage_dir.display().to_string())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.registry.db_path
    }
}

/// Read an optional API key from the environment variable named in config.
pub fn api_key_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.trim().is_empty())
}
