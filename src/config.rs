use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::poll::PollPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub filename: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // The desktop app keeps its cache under the platform data directory
        // (~/Library/Application Support on macOS).
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Granola");

        Self {
            dir,
            filename: "cache-v3.json".to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            timeout_secs: policy.timeout.as_secs(),
            interval_secs: policy.interval.as_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}

impl PollingConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            interval: Duration::from_secs(self.interval_secs),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context("Failed to read config file")?;

        let mut config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::from_file`], but a missing file means all defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        log::info!("No {} found, using default configuration", path.display());
        let mut config = Config::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.polling.interval_secs > 0,
            "polling.interval_secs must be at least 1"
        );
        Ok(())
    }

    // Override with environment variable if set
    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("GRANOLA_CACHE_DIR") {
            self.cache.dir = PathBuf::from(dir);
        }
    }
}
