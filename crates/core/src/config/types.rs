use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::converter::ConverterConfig;
use crate::run::RunConfig;
use crate::transport::DirectoryTransportConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub transport: DirectoryTransportConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Runs allowed to execute at the same time.
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    /// Accepted runs wait for a free slot instead of being refused.
    #[serde(default)]
    pub queue_when_busy: bool,
    /// Finished runs kept for `GET /runs`; older ones are forgotten.
    #[serde(default = "default_retained_runs")]
    pub retained_runs: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_concurrent_runs: default_max_concurrent_runs(),
            queue_when_busy: false,
            retained_runs: default_retained_runs(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_max_concurrent_runs() -> usize {
    2
}

fn default_retained_runs() -> usize {
    100
}

/// Content cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Store fresh conversions for reuse by later runs.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Folder holding cached artifacts.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// SQLite index; defaults to `<dir>/index.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: default_cache_dir(),
            database_path: None,
        }
    }
}

impl CacheConfig {
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.dir.join("index.db"))
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("packforge-cache")
}
