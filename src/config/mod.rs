//! Configuration management.
//!
//! Settings come from an optional TOML file overlaid with `BIOMED_SCREEN_*`
//! environment variables (nested keys use `__`, e.g.
//! `BIOMED_SCREEN_PUBMED__API_KEY`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [http]
//! contact_email = "lab@example.org"
//! timeout_secs = 30
//! max_concurrent_requests = 8
//! default_host_delay_ms = 1000
//!
//! [[http.host_delays]]
//! host = "api.crossref.org"
//! delay_ms = 50
//!
//! [retry]
//! max_attempts = 4
//! initial_delay_ms = 2000
//! max_delay_ms = 60000
//! backoff_multiplier = 2.0
//!
//! [pipeline]
//! concurrency = 4
//! confidence_threshold = "medium"
//!
//! [pubmed]
//! api_key = "your-ncbi-key"
//! tool = "biomed_screen"
//!
//! [logging]
//! file = "biomed-screen.log"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Confidence;
use crate::utils::{HttpClientConfig, RetryConfig};

/// File name looked up in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "biomed-screen.toml";

const ENV_PREFIX: &str = "BIOMED_SCREEN";

/// Hosts of the NCBI services (ID converter and E-utilities)
const NCBI_HOSTS: [&str; 2] = ["eutils.ncbi.nlm.nih.gov", "www.ncbi.nlm.nih.gov"];

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default)]
    pub pubmed: PubMedSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Contact address sent as `mailto` / `email` and in the User-Agent
    #[serde(default)]
    pub contact_email: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Minimum delay between requests to a host without an override
    #[serde(default = "default_host_delay_ms")]
    pub default_host_delay_ms: u64,

    /// Per-host overrides, applied on top of the built-in host delays
    #[serde(default)]
    pub host_delays: Vec<HostDelay>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            contact_email: None,
            timeout_secs: default_timeout_secs(),
            max_concurrent_requests: default_max_concurrent(),
            default_host_delay_ms: default_host_delay_ms(),
            host_delays: Vec::new(),
        }
    }
}

/// Minimum delay for one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDelay {
    pub host: String,
    pub delay_ms: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    8
}

fn default_host_delay_ms() -> u64 {
    1000
}

/// Retry settings for transient HTTP failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Batch processing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Papers processed at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Included papers whose Q1 confidence is below this are flagged for review
    #[serde(default = "default_threshold")]
    pub confidence_threshold: Confidence,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            confidence_threshold: default_threshold(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_threshold() -> Confidence {
    Confidence::Medium
}

/// NCBI E-utilities settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubMedSettings {
    /// NCBI API key (optional, raises the allowed request rate)
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    /// Tool name reported to NCBI
    #[serde(default = "default_tool")]
    pub tool: String,
}

impl Default for PubMedSettings {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            tool: default_tool(),
        }
    }
}

fn default_api_key() -> Option<String> {
    std::env::var("NCBI_API_KEY").ok().filter(|k| !k.is_empty())
}

fn default_tool() -> String {
    "biomed_screen".to_string()
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Also write JSON log lines to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Check values that would make a run impossible
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.concurrency must be at least 1".to_string(),
            ));
        }
        if self.http.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid(
                "http.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.backoff_multiplier must be >= 1.0".to_string(),
            ));
        }
        if let Some(entry) = self.http.host_delays.iter().find(|h| h.host.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "http.host_delays entry with empty host (delay_ms = {})",
                entry.delay_ms
            )));
        }
        Ok(())
    }

    /// Retry policy for the HTTP client
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
        }
    }

    /// Effective per-host delays: built-in values, adjusted for an NCBI API
    /// key, then the configured overrides
    pub fn host_delays(&self) -> HashMap<String, Duration> {
        let mut delays = default_host_delays();

        if self.pubmed.api_key.is_some() {
            for host in NCBI_HOSTS {
                delays.insert(host.to_string(), Duration::from_millis(100));
            }
        }

        for entry in &self.http.host_delays {
            delays.insert(
                entry.host.trim().to_lowercase(),
                Duration::from_millis(entry.delay_ms),
            );
        }
        delays
    }

    /// Settings for the shared HTTP client
    pub fn http_client_config(&self) -> HttpClientConfig {
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = match &self.http.contact_email {
            Some(email) => format!("biomed-screen/{} (mailto:{})", version, email),
            None => format!("biomed-screen/{}", version),
        };

        HttpClientConfig {
            user_agent,
            default_timeout: Duration::from_secs(self.http.timeout_secs),
            max_concurrent_requests: self.http.max_concurrent_requests,
            default_host_delay: Duration::from_millis(self.http.default_host_delay_ms),
            host_delays: self.host_delays(),
            retry: self.retry_config(),
        }
    }
}

/// Built-in minimum delays for the APIs the sources talk to
pub fn default_host_delays() -> HashMap<String, Duration> {
    let mut delays = HashMap::new();
    delays.insert("api.openalex.org".to_string(), Duration::from_millis(100));
    delays.insert("api.crossref.org".to_string(), Duration::from_millis(50));
    // About 3 requests per second, the NCBI limit without an API key
    for host in NCBI_HOSTS {
        delays.insert(host.to_string(), Duration::from_millis(340));
    }
    delays
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    build(Some(path))
}

/// Load configuration from `path`, or from the first file found by
/// [`find_config_file`], or from defaults; environment overrides always apply
pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => match find_config_file() {
            Some(found) => {
                tracing::debug!(path = %found.display(), "Using config file");
                build(Some(&found))
            }
            None => build(None),
        },
    }
}

fn build(path: Option<&Path>) -> Result<Config, ConfigError> {
    build_with_env(path, None)
}

/// `env` replaces the process environment when given
fn build_with_env(
    path: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Look for `biomed-screen.toml` in the working directory, then in the
/// platform config directory (`~/.config/biomed-screen/` on Linux)
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("biomed-screen").join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.concurrency, 4);
        assert_eq!(config.pipeline.confidence_threshold, Confidence::Medium);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.pubmed.tool, "biomed_screen");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_host_delays() {
        let mut config = Config::default();
        config.pubmed.api_key = None;
        let delays = config.host_delays();

        assert_eq!(delays["api.openalex.org"], Duration::from_millis(100));
        assert_eq!(delays["api.crossref.org"], Duration::from_millis(50));
        assert_eq!(delays["eutils.ncbi.nlm.nih.gov"], Duration::from_millis(340));
    }

    #[test]
    fn test_api_key_speeds_up_ncbi() {
        let mut config = Config::default();
        config.pubmed.api_key = Some("key".to_string());

        let delays = config.host_delays();
        assert_eq!(delays["eutils.ncbi.nlm.nih.gov"], Duration::from_millis(100));
        assert_eq!(delays["www.ncbi.nlm.nih.gov"], Duration::from_millis(100));
    }

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("biomed-screen.toml");
        std::fs::write(
            &path,
            r#"
[http]
contact_email = "lab@example.org"
default_host_delay_ms = 500

[[http.host_delays]]
host = "API.Crossref.org"
delay_ms = 250

[retry]
max_attempts = 2

[pipeline]
concurrency = 8
confidence_threshold = "high"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.http.contact_email.as_deref(), Some("lab@example.org"));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_delay_ms, 2000);
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.pipeline.confidence_threshold, Confidence::High);

        let http = config.http_client_config();
        assert_eq!(http.default_host_delay, Duration::from_millis(500));
        assert_eq!(http.host_delays["api.crossref.org"], Duration::from_millis(250));
        assert_eq!(http.retry.max_attempts, 2);
        assert!(http.user_agent.contains("mailto:lab@example.org"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[pipeline]\nconcurrency = 0\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_config_file_nonexistent() {
        let result = load_config(Path::new("/nonexistent/biomed-screen.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_environment_override() {
        let env = config::Map::from_iter([
            ("BIOMED_SCREEN_PUBMED__TOOL".to_string(), "screening_lab".to_string()),
            ("BIOMED_SCREEN_HTTP__TIMEOUT_SECS".to_string(), "5".to_string()),
        ]);
        let config = build_with_env(None, Some(env)).unwrap();

        assert_eq!(config.pubmed.tool, "screening_lab");
        assert_eq!(config.http.timeout_secs, 5);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("biomed-screen.toml");
        std::fs::write(&path, "[pubmed]\ntool = \"from_file\"\n").unwrap();

        let from_file = build_with_env(Some(&path), Some(config::Map::new())).unwrap();
        assert_eq!(from_file.pubmed.tool, "from_file");

        let env = config::Map::from_iter([(
            "BIOMED_SCREEN_PUBMED__TOOL".to_string(),
            "from_env".to_string(),
        )]);
        let overridden = build_with_env(Some(&path), Some(env)).unwrap();
        assert_eq!(overridden.pubmed.tool, "from_env");
    }
}
