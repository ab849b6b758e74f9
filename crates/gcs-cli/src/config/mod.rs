//! Configuration management for the gcs CLI
//!
//! Settings are layered: built-in defaults, then the TOML config file, then
//! `GCS_`-prefixed environment variables (`GCS_POLL__INTERVAL_SECS=5`).

use crate::api::{DEFAULT_API_URL, DEFAULT_ENVIRONMENT};
use crate::readiness::PollPolicy;
use etcetera::{choose_base_strategy, BaseStrategy};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] Box<figment::Error>),

    #[error("Failed to determine base directories: {0}")]
    BaseDirectories(String),

    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// CLI configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// OAuth and credential storage
    #[serde(default)]
    pub auth: AuthSettings,

    /// Readiness polling
    #[serde(default)]
    pub poll: PollConfig,

    /// SSH launcher
    #[serde(default)]
    pub ssh: SshSettings,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for the Cloud Shell API
    pub base_url: String,

    /// Environment resource name
    pub environment: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Directory holding the client secrets and the token cache
    pub credentials_dir: PathBuf,

    /// OAuth client secrets file name, relative to `credentials_dir`
    pub client_secrets_file: String,

    /// Token cache file name, relative to `credentials_dir`
    pub token_file: String,

    /// Loopback address the OAuth redirect points at
    pub callback_address: SocketAddr,

    /// How long to wait for the browser redirect; 0 waits forever
    pub callback_timeout_secs: u64,

    /// Delay before the callback listener shuts down after delivering a code
    pub shutdown_grace_ms: u64,

    /// Refresh tokens that expire within this many seconds
    pub refresh_margin_secs: u64,

    /// Try to open a browser; when false the code is always entered manually
    pub open_browser: bool,

    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        let home_dir = etcetera::home_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            credentials_dir: home_dir.join(".ssh"),
            client_secrets_file: "gcs_credentials.json".to_string(),
            token_file: "gcs_token.json".to_string(),
            callback_address: SocketAddr::from(([127, 0, 0, 1], 8086)),
            callback_timeout_secs: 300,
            shutdown_grace_ms: 3000,
            refresh_margin_secs: 60,
            open_browser: true,
            scopes: vec!["https://www.googleapis.com/auth/cloud-platform".to_string()],
        }
    }
}

impl AuthSettings {
    pub fn client_secrets_path(&self) -> PathBuf {
        self.credentials_dir.join(&self.client_secrets_file)
    }

    pub fn token_path(&self) -> PathBuf {
        self.credentials_dir.join(&self.token_file)
    }

    pub fn callback_timeout(&self) -> Option<Duration> {
        (self.callback_timeout_secs > 0).then(|| Duration::from_secs(self.callback_timeout_secs))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between status checks
    pub interval_secs: u64,

    /// Backoff ceiling for unrecognized states
    pub max_interval_secs: u64,

    /// Give up waiting after this many seconds; 0 waits forever
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3,
            max_interval_secs: 30,
            timeout_secs: 600,
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.interval_secs),
            max_interval: Duration::from_secs(self.max_interval_secs.max(self.interval_secs)),
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }
}

/// SSH configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshSettings {
    /// ssh executable
    pub binary: String,

    /// Options placed before the destination
    pub options: Vec<String>,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            binary: "ssh".to_string(),
            options: vec![
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
                "-o".to_string(),
                "UserKnownHostsFile=/dev/null".to_string(),
            ],
        }
    }
}

impl CliConfig {
    /// Load configuration from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path; a missing file yields defaults
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from: {}", path.display());

        let mut figment = Figment::from(Serialized::defaults(CliConfig::default()));
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        } else {
            debug!("Configuration file not found, using defaults");
        }
        figment = figment.merge(Env::prefixed("GCS_").split("__"));

        let mut config: Self = figment.extract().map_err(Box::new)?;
        config.expand_paths();
        config.validate()?;

        debug!("Successfully loaded configuration");
        Ok(config)
    }

    /// Get configuration directory
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let strategy =
            choose_base_strategy().map_err(|e| ConfigError::BaseDirectories(e.to_string()))?;
        Ok(strategy.config_dir().join("gcs"))
    }

    /// Default config file path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    fn expand_paths(&mut self) {
        if let Some(path_str) = self.auth.credentials_dir.to_str() {
            let expanded = shellexpand::tilde(path_str);
            self.auth.credentials_dir = PathBuf::from(expanded.as_ref());
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "poll.interval_secs",
                message: "must be greater than 0".to_string(),
            });
        }
        if !self.auth.callback_address.ip().is_loopback() {
            return Err(ConfigError::Invalid {
                key: "auth.callback_address",
                message: "must be a loopback address".to_string(),
            });
        }
        if self.ssh.binary.is_empty() {
            return Err(ConfigError::Invalid {
                key: "ssh.binary",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }
}
