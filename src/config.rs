//! WolfFiles Configuration
//!
//! This module provides configuration structures for the WolfFiles
//! HTTP file API. Configuration is read once at startup from a TOML file,
//! with a small set of environment overrides applied on top.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main WolfFiles configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WolfFilesConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Object storage configuration
    pub storage: StorageConfig,

    /// Content generation provider (optional - generation routes answer 503 without it)
    #[serde(default)]
    pub generation: Option<GenerationConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Enable CORS
    #[serde(default)]
    pub cors_enabled: bool,

    /// Maximum accepted upload size in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

/// Which object store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// S3 or any S3-compatible service
    S3,
    /// In-process store, contents are lost on restart
    Memory,
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend implementation
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Bucket name
    #[serde(default)]
    pub bucket: String,

    /// Region name
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services (MinIO, R2, ...)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[serde(default)]
    pub path_style: bool,

    /// Static access key (falls back to the AWS environment/profile chain)
    #[serde(default)]
    pub access_key: Option<String>,

    /// Static secret key
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Deadline for a single backend call in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Content generation provider configuration (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// API base URL
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: String,

    /// Chat completion model for text files
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Image model
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Text-to-speech model
    #[serde(default = "default_speech_model")]
    pub speech_model: String,

    /// Text-to-speech voice
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Completion token cap for text generation
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_max_upload_mb() -> usize {
    100
}

fn default_backend() -> BackendKind {
    BackendKind::S3
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_generation_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_text_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "echo".to_string()
}

fn default_max_tokens() -> u32 {
    100
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: false,
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            path_style: false,
            access_key: None,
            secret_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            api_key: String::new(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            speech_model: default_speech_model(),
            voice: default_voice(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ServerConfig {
    /// Maximum accepted upload size in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl StorageConfig {
    /// Get the backend deadline as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GenerationConfig {
    /// Get the request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Environment variables that override file values at load time
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
}

impl EnvOverrides {
    /// Capture the overrides from the process environment
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            bucket: var("S3_BUCKET_NAME"),
            region: var("AWS_REGION"),
            endpoint: var("S3_ENDPOINT_URL"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL"),
        }
    }
}

impl WolfFilesConfig {
    /// Load configuration from a TOML file, applying environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: WolfFilesConfig = toml::from_str(&content)?;
        config.apply_overrides(EnvOverrides::from_env());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: WolfFilesConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides on top of file values
    pub fn apply_overrides(&mut self, env: EnvOverrides) {
        if let Some(bucket) = env.bucket {
            self.storage.bucket = bucket;
        }
        if let Some(region) = env.region {
            self.storage.region = region;
        }
        if let Some(endpoint) = env.endpoint {
            self.storage.endpoint = Some(endpoint);
        }

        // An API key in the environment enables generation even without a [generation] table
        if env.openai_api_key.is_some() || env.openai_base_url.is_some() {
            let generation = self.generation.get_or_insert_with(GenerationConfig::default);
            if let Some(key) = env.openai_api_key {
                generation.api_key = key;
            }
            if let Some(url) = env.openai_base_url {
                generation.base_url = url;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_address.is_empty() {
            return Err(Error::Config("server.bind_address cannot be empty".into()));
        }

        if self.storage.backend == BackendKind::S3 && self.storage.bucket.is_empty() {
            return Err(Error::Config(
                "storage.bucket cannot be empty (set it in the file or via S3_BUCKET_NAME)".into(),
            ));
        }

        if self.storage.access_key.is_some() != self.storage.secret_key.is_some() {
            return Err(Error::Config(
                "storage.access_key and storage.secret_key must be set together".into(),
            ));
        }

        if self.storage.timeout_secs == 0 {
            return Err(Error::Config("storage.timeout_secs must be greater than 0".into()));
        }

        if let Some(generation) = &self.generation {
            if generation.base_url.is_empty() {
                return Err(Error::Config("generation.base_url cannot be empty".into()));
            }
            if generation.timeout_secs == 0 {
                return Err(Error::Config("generation.timeout_secs must be greater than 0".into()));
            }
        }

        Ok(())
    }
}
