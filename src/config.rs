use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DATABASE_PATH: &str = "data/docsum.sqlite";
const DEFAULT_MEDIA_ROOT: &str = "media";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_SUMMARIZATION_MODEL: &str = "deepseek-r1";
const DEFAULT_UPLOAD_MAX_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_LOG_FILE: &str = "logs/docsum.log";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Docsum server and admin tooling.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Location of the SQLite database holding users, sets, and documents.
    pub database_path: PathBuf,
    /// Directory under which uploaded file bytes are stored.
    pub media_root: PathBuf,
    /// Base URL of the Ollama runtime serving chat completions.
    pub ollama_url: String,
    /// Model identifier sent with every summarization request.
    pub summarization_model: String,
    /// Optional upper bound on a single model call, in seconds.
    pub summarization_timeout_secs: Option<u64>,
    /// Maximum accepted request body size for uploads.
    pub upload_max_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// File receiving a copy of every log line. An empty `DOCSUM_LOG_FILE` falls back to the default.
    pub log_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_path: load_env_or("DOCSUM_DATABASE_PATH", DEFAULT_DATABASE_PATH).into(),
            media_root: load_env_or("DOCSUM_MEDIA_ROOT", DEFAULT_MEDIA_ROOT).into(),
            ollama_url: load_env_or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            summarization_model: load_env_or("SUMMARIZATION_MODEL", DEFAULT_SUMMARIZATION_MODEL),
            summarization_timeout_secs: parse_optional("SUMMARIZATION_TIMEOUT_SECS")?,
            upload_max_bytes: parse_optional("UPLOAD_MAX_BYTES")?
                .unwrap_or(DEFAULT_UPLOAD_MAX_BYTES),
            server_port: parse_optional("SERVER_PORT")?,
            log_file: load_env_or("DOCSUM_LOG_FILE", DEFAULT_LOG_FILE).into(),
        })
    }

    /// Model call timeout, when one is configured. Zero disables the bound.
    pub fn summarization_timeout(&self) -> Option<Duration> {
        self.summarization_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.into(),
            media_root: DEFAULT_MEDIA_ROOT.into(),
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            summarization_model: DEFAULT_SUMMARIZATION_MODEL.into(),
            summarization_timeout_secs: None,
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            server_port: None,
            log_file: DEFAULT_LOG_FILE.into(),
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        database_path = %config.database_path.display(),
        media_root = %config.media_root.display(),
        ollama_url = %config.ollama_url,
        model = %config.summarization_model,
        timeout_secs = ?config.summarization_timeout_secs,
        server_port = ?config.server_port,
        log_file = %config.log_file.display(),
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_zero_disables_bound() {
        let config = Config {
            summarization_timeout_secs: Some(0),
            ..Config::default()
        };
        assert!(config.summarization_timeout().is_none());

        let config = Config {
            summarization_timeout_secs: Some(30),
            ..Config::default()
        };
        assert_eq!(config.summarization_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn defaults_point_at_local_ollama() {
        let config = Config::default();
        assert_eq!(config.ollama_url, "http://127.0.0.1:11434");
        assert_eq!(config.summarization_model, "deepseek-r1");
        assert!(config.server_port.is_none());
        assert_eq!(config.log_file, PathBuf::from("logs/docsum.log"));
    }
}
