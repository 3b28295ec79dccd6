use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Deserialize;
use anyhow::{bail, Context, Result};
use shared::protocol::DEFAULT_WINDOW_SECS;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/ndpeek/ndpeekd.toml";

/// Log file used when the table owns the terminal and none is configured
pub const DEFAULT_DISPLAY_LOG: &str = "ndpeekd.log";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_listener_listen")]
    pub listen: Ipv6Addr,
    /// Capture only on this interface
    #[serde(default)]
    pub interface: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_window")]
    pub window_secs: u64,
    #[serde(default = "default_prune_interval")]
    pub prune_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_refresh")]
    pub refresh_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log here instead of stderr, keeps the terminal table readable
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_listener_listen() -> Ipv6Addr {
    Ipv6Addr::UNSPECIFIED
}

fn default_window() -> u64 {
    DEFAULT_WINDOW_SECS
}

fn default_prune_interval() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_refresh() -> u64 {
    2000
}

fn default_api_listen() -> SocketAddr {
    SocketAddr::from((Ipv6Addr::LOCALHOST, 8054))
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            listen: default_listener_listen(),
            interface: None,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window(),
            prune_interval_secs: default_prune_interval(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            refresh_ms: default_refresh(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_api_listen(),
        }
    }
}

impl StatsConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }
}

impl DisplayConfig {
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load from an explicit path, or from the default path when it exists,
    /// falling back to built-in defaults otherwise.
    pub fn load_or_default(path: Option<&str>) -> Result<(Self, Option<PathBuf>)> {
        match path {
            Some(path) => Ok((Self::load(path)?, Some(PathBuf::from(path)))),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Ok((Self::load(DEFAULT_CONFIG_PATH)?, Some(PathBuf::from(DEFAULT_CONFIG_PATH))))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Where logs go. `None` means stderr, which only happens with the
    /// display off; otherwise log lines would tear through the table.
    pub fn log_file(&self) -> Option<PathBuf> {
        match &self.logging.file {
            Some(path) => Some(path.clone()),
            None if self.display.enabled => Some(PathBuf::from(DEFAULT_DISPLAY_LOG)),
            None => None,
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.stats.window_secs == 0 {
            bail!("stats.window_secs must be greater than zero");
        }
        if self.stats.prune_interval_secs == 0 {
            bail!("stats.prune_interval_secs must be greater than zero");
        }
        if self.display.refresh_ms == 0 {
            bail!("display.refresh_ms must be greater than zero");
        }
        Ok(())
    }
}
