use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Runtime settings, layered from the TOML config file and then
/// environment variable overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub google: GoogleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub updater: UpdaterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// File holding the bearer token presented to the Cloud DNS API.
    pub credentials_path: String,
    pub managed_zone: String,
    pub project_id: String,
    /// Fully qualified record name, e.g. "home.example.com."
    pub record: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_public_ip_endpoint")]
    pub public_ip_endpoint: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_ttl() -> u32 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_interval() -> u64 {
    300 // 5 minutes
}

fn default_public_ip_endpoint() -> String {
    "https://api.ipify.org".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Settings {
    /// Load settings from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from a specific file, then apply environment
    /// variable overrides.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            Error::config(format!(
                "failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let mut settings: Settings = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        settings.apply_env_overrides()?;

        Ok(settings)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        #[cfg(unix)]
        {
            PathBuf::from("/etc/clouddnsd")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\ProgramData\clouddnsd")
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.updater.interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.updater.timeout_seconds)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = env::var("GOOGLE_CREDENTIALS_PATH") {
            self.google.credentials_path = v;
        }
        if let Ok(v) = env::var("GOOGLE_MANAGED_ZONE") {
            self.google.managed_zone = v;
        }
        if let Ok(v) = env::var("GOOGLE_PROJECT_ID") {
            self.google.project_id = v;
        }
        if let Ok(v) = env::var("GOOGLE_RECORD") {
            self.google.record = v;
        }
        if let Ok(v) = env::var("GOOGLE_TTL") {
            self.google.ttl = parse_env("GOOGLE_TTL", &v)?;
        }
        if let Ok(v) = env::var("LOGGING_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = env::var("SERVER_ADDRESS") {
            self.server.address = v;
        }
        if let Ok(v) = env::var("UPDATER_INTERVAL") {
            self.updater.interval_seconds = parse_env("UPDATER_INTERVAL", &v)?;
        }
        if let Ok(v) = env::var("UPDATER_PUBLIC_IP_ENDPOINT") {
            self.updater.public_ip_endpoint = v;
        }
        if let Ok(v) = env::var("UPDATER_TIMEOUT") {
            self.updater.timeout_seconds = parse_env("UPDATER_TIMEOUT", &v)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::config(format!("invalid value for {}: {}", name, value)))
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}
