//! Run configuration.
//!
//! Settings come from an optional TOML file with environment overrides for
//! the handful of options operators historically set through the
//! environment (`PROXY_LIST`, `PROXY_ROTATION_INTERVAL`, `REQUEST_TIMEOUT`,
//! `STORE_PATH`).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default retry ceiling for a single page fetch.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default proxy rotation interval in seconds.
pub const DEFAULT_ROTATION_INTERVAL_SECS: u64 = 300;

/// Top-level harvest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Directory snapshots are written under, created on demand.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Fetch-layer settings shared by every source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Overrides the per-source pages-per-run ceiling when set.
    #[serde(default)]
    pub max_pages: Option<u32>,
    /// Retry delay bounds in seconds, overriding the per-source defaults.
    /// Equal bounds give a fixed delay.
    #[serde(default)]
    pub retry_delay_secs: Option<[u64; 2]>,
    /// Inter-page delay bounds in seconds, overriding the per-source
    /// defaults.
    #[serde(default)]
    pub page_delay_secs: Option<[u64; 2]>,
}

/// Proxy pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Inline proxy addresses. Takes precedence over `file`.
    #[serde(default)]
    pub list: Vec<String>,
    /// Proxy list file, one address per line.
    #[serde(default = "default_proxy_file")]
    pub file: Option<String>,
    #[serde(default = "default_rotation_interval_secs")]
    pub rotation_interval_secs: u64,
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path. `None` disables the store entirely and runs
    /// fall back to snapshot-only persistence.
    #[serde(default = "default_store_path")]
    pub path: Option<String>,
}

impl HarvestConfig {
    /// Load from a TOML file if one exists, then apply environment
    /// overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            Some(path) => {
                debug!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(list) = env_string("PROXY_LIST") {
            self.proxy.list = list
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(interval) = env_parsed("PROXY_ROTATION_INTERVAL") {
            self.proxy.rotation_interval_secs = interval;
        }
        if let Some(timeout) = env_parsed("REQUEST_TIMEOUT") {
            self.fetch.timeout_secs = timeout;
        }
        if let Some(path) = env_string("STORE_PATH") {
            self.store.path = Some(path);
        }
    }

    /// Expanded store path, if the store is enabled.
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store
            .path
            .as_ref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            proxy: ProxyConfig::default(),
            store: StoreConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            max_pages: None,
            retry_delay_secs: None,
            page_delay_secs: None,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            file: default_proxy_file(),
            rotation_interval_secs: default_rotation_interval_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_rotation_interval_secs() -> u64 {
    DEFAULT_ROTATION_INTERVAL_SECS
}

fn default_proxy_file() -> Option<String> {
    Some("proxy_list.txt".to_string())
}

fn default_store_path() -> Option<String> {
    Some("data/harvest.db".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarvestConfig::default();
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.proxy.rotation_interval_secs, 300);
        assert!(config.proxy.list.is_empty());
        assert_eq!(config.output_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_parse_toml() {
        let raw = r#"
            output_dir = "out"

            [fetch]
            timeout_secs = 10
            max_pages = 5
            retry_delay_secs = [2, 5]

            [proxy]
            list = ["http://proxy-a:8080"]
            rotation_interval_secs = 60

            [store]
            path = "out/records.db"
        "#;
        let config: HarvestConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.fetch.max_pages, Some(5));
        assert_eq!(config.fetch.retry_delay_secs, Some([2, 5]));
        assert_eq!(config.proxy.list.len(), 1);
        assert_eq!(config.proxy.rotation_interval_secs, 60);
        assert_eq!(config.store.path.as_deref(), Some("out/records.db"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: HarvestConfig = toml::from_str("[fetch]\nmax_retries = 5\n").unwrap();
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.proxy.rotation_interval_secs, 300);
    }
}
