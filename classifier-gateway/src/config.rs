//! Configuration for the classifier gateway.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::transport::RetryPolicy;

/// Main configuration structure for the classifier gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted image upload in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Model-serving backend connection.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the serving REST API, e.g. `http://tf_serving:8501`.
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Overrides the predict URL derived from `base_url` and `model_name`.
    #[serde(default)]
    pub predict_url: Option<String>,
    /// Overrides the model status URL derived from `base_url` and `model_name`.
    #[serde(default)]
    pub status_url: Option<String>,
    /// Timeout of a single predict attempt.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
    /// Deadline for a whole predict call, retries included. Unset = no deadline.
    #[serde(default)]
    pub request_deadline_ms: Option<u64>,
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            model_name: default_model_name(),
            predict_url: None,
            status_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            health_timeout_ms: default_health_timeout_ms(),
            request_deadline_ms: None,
            pool_max_idle_per_host: default_pool_max_idle(),
        }
    }
}

impl BackendConfig {
    pub fn predict_url(&self) -> String {
        self.predict_url.clone().unwrap_or_else(|| {
            format!(
                "{}/v1/models/{}:predict",
                self.base_url.trim_end_matches('/'),
                self.model_name
            )
        })
    }

    pub fn status_url(&self) -> String {
        self.status_url.clone().unwrap_or_else(|| {
            format!(
                "{}/v1/models/{}",
                self.base_url.trim_end_matches('/'),
                self.model_name
            )
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn request_deadline(&self) -> Option<Duration> {
        self.request_deadline_ms.map(Duration::from_millis)
    }
}

/// Retry behaviour of predict calls.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_true")]
    pub jitter: bool,
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            jitter: true,
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
            .with_backoff(
                Duration::from_millis(self.backoff_base_ms),
                Duration::from_millis(self.backoff_max_ms),
            )
            .with_jitter(self.jitter)
            .with_retryable_statuses(self.retryable_statuses.clone())
    }
}

/// Model input and output description.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Square input edge in pixels. Must match what the served model expects;
    /// it has no default.
    pub input_size: u32,
    /// Label file, one class name per line. Defaults to the CIFAR-10 classes.
    #[serde(default)]
    pub labels_path: Option<PathBuf>,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HealthConfig {
    /// Probe the backend in the background at this interval.
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_backend_url() -> String {
    "http://localhost:8501".to_string()
}
fn default_model_name() -> String {
    "image_classifier".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_health_timeout_ms() -> u64 {
    2_000
}
fn default_pool_max_idle() -> usize {
    32
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_max_ms() -> u64 {
    5_000
}
fn default_retryable_statuses() -> Vec<u16> {
    vec![500, 502, 503, 504]
}
fn default_top_k() -> usize {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (GATEWAY__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Same as [`Config::load`] with an explicit config file base name.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("api.host", default_host())?
            .set_default("api.port", default_port() as i64)?
            .set_default("backend.base_url", default_backend_url())?
            .set_default("backend.model_name", default_model_name())?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("retry.retryable_statuses"),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.input_size == 0 {
            return Err(ConfigError::Message(
                "model.input_size must be greater than 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Message(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.model.default_top_k == 0 {
            return Err(ConfigError::Message(
                "model.default_top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
