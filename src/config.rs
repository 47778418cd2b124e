use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{RaghuError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP server listens on.
    /// Can be overridden with the `RAGHU_BIND` env var.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// SQLite database file.  Empty means `$XDG_DATA_HOME/raghu/raghu.db`.
    /// Can be overridden with the `RAGHU_DATABASE_PATH` env var.
    #[serde(default)]
    pub database_path: String,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub advice: AdviceConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

// -- Provider ----------------------------------------------------------------

/// Settings for the Gemini `generateContent` endpoint.  The API key is
/// deliberately absent: it is read from `GEMINI_API_KEY` only.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Can be overridden with the `GEMINI_BASE_URL` env var.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Can be overridden with the `GEMINI_MODEL` env var.
    #[serde(default = "default_model")]
    pub model: String,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after a transport failure.  Error statuses are not retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

// -- Advice ------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AdviceConfig {
    /// Keep the first successful answer per request and serve it on reload.
    #[serde(default = "default_true")]
    pub cache_answers: bool,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            cache_answers: true,
        }
    }
}

// -- Store -------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Extra attempts to open the database at startup.
    #[serde(default = "default_connect_retries")]
    pub connect_retries: usize,

    #[serde(default = "default_connect_backoff_ms")]
    pub connect_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connect_retries: default_connect_retries(),
            connect_backoff_ms: default_connect_backoff_ms(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> usize {
    1
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_true() -> bool {
    true
}
fn default_connect_retries() -> usize {
    3
}
fn default_connect_backoff_ms() -> u64 {
    250
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database_path: String::new(),
            provider: ProviderConfig::default(),
            advice: AdviceConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, falling back to defaults when the file
    /// does not exist, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        let mut config = if config_path.exists() {
            info!("loading config from {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents)
                .map_err(|e| RaghuError::Config(format!("parse error: {e}")))?
        } else {
            info!("no config file found, using defaults");
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).  Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = get("RAGHU_BIND") {
            self.bind = bind;
        }
        if let Some(path) = get("RAGHU_DATABASE_PATH") {
            self.database_path = path;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.provider.model = model;
        }
        if let Some(base_url) = get("GEMINI_BASE_URL") {
            self.provider.base_url = base_url;
        }
    }

    /// Resolved database file path.
    pub fn database_file(&self) -> PathBuf {
        if self.database_path.is_empty() {
            Self::data_dir().join("raghu.db")
        } else {
            PathBuf::from(&self.database_path)
        }
    }

    /// Returns the default config file path: `$XDG_CONFIG_HOME/raghu/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("raghu")
            .join("config.toml")
    }

    /// Returns the data directory: `$XDG_DATA_HOME/raghu/`
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join("raghu")
    }

    /// Get the Gemini API key from the environment.  There is no default.
    pub fn gemini_api_key() -> Result<SecretString> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| {
                RaghuError::Config("GEMINI_API_KEY environment variable not set".into())
            })
    }

    /// Generate the default config file contents.
    pub fn default_config_contents() -> &'static str {
        include_str!("../config.example.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let c = Config::default();
        assert_eq!(c.bind, "127.0.0.1:3000");
        assert!(c.database_path.is_empty());
        assert_eq!(c.provider.model, "gemini-2.5-flash");
        assert_eq!(c.provider.timeout_secs, 60);
        assert_eq!(c.provider.max_retries, 1);
        assert!(c.advice.cache_answers);
        assert_eq!(c.store.connect_retries, 3);
    }

    #[test]
    fn parse_partial_toml_fills_defaults() {
        let toml_str = r#"
        bind = "0.0.0.0:8080"

        [provider]
        model = "gemini-2.5-pro"
        timeout_secs = 15

        [advice]
        cache_answers = false
        "#;
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.bind, "0.0.0.0:8080");
        assert_eq!(c.provider.model, "gemini-2.5-pro");
        assert_eq!(c.provider.timeout_secs, 15);
        assert_eq!(c.provider.max_retries, 1);
        assert!(!c.advice.cache_answers);
        assert_eq!(c.store.connect_backoff_ms, 250);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let vars: HashMap<&str, &str> = [
            ("RAGHU_BIND", "0.0.0.0:9000"),
            ("RAGHU_DATABASE_PATH", "/tmp/raghu-test.db"),
            ("GEMINI_MODEL", "gemini-test"),
            ("GEMINI_BASE_URL", ""),
        ]
        .into_iter()
        .collect();

        let mut c = Config::default();
        c.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(c.bind, "0.0.0.0:9000");
        assert_eq!(c.database_file(), PathBuf::from("/tmp/raghu-test.db"));
        assert_eq!(c.provider.model, "gemini-test");
        // blank override is ignored
        assert_eq!(c.provider.base_url, default_base_url());
    }

    #[test]
    fn database_file_defaults_to_data_dir() {
        let c = Config::default();
        let path = c.database_file();
        assert!(path.ends_with("raghu/raghu.db"));
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(c.provider.max_retries, 1);
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bind = [").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(RaghuError::Config(_))));
    }

    #[test]
    fn default_config_contents_parses() {
        let contents = Config::default_config_contents();
        let c: Config = toml::from_str(contents).unwrap();
        assert_eq!(c.bind, "127.0.0.1:3000");
    }
}
