//! Loader configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::entities::TransitionPolicy;

use super::args::CliArgs;

pub(crate) const APP_NAME: &str = "pixload";
pub(crate) const APP_QUALIFIER: &str = "dev";
pub(crate) const APP_ORGANIZATION: &str = "pixload";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Settings for an [`ImageLoader`](crate::infrastructure::image::ImageLoader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Strong memory cache budget in bytes.
    #[serde(default = "default_memory_cache_size")]
    pub memory_cache_size: usize,

    /// Keep evicted images reachable while something else holds them.
    #[serde(default = "default_true")]
    pub weak_references: bool,

    /// Reuse released pixel buffers.
    #[serde(default = "default_true")]
    pub bitmap_pooling: bool,

    /// Bitmap pool budget in bytes.
    #[serde(default = "default_bitmap_pool_size")]
    pub bitmap_pool_size: usize,

    /// Crossfade length in milliseconds; 0 disables the animation.
    #[serde(default = "default_crossfade_ms")]
    pub crossfade_ms: u64,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Maximum concurrent network fetches.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Hosts whose URLs accept `width`/`height` query parameters.
    #[serde(default = "default_cdn_hosts")]
    pub cdn_hosts: Vec<String>,

    /// Directory integer resource ids resolve against.
    #[serde(default)]
    pub resource_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

const fn default_memory_cache_size() -> usize {
    64 * 1024 * 1024
}

const fn default_bitmap_pool_size() -> usize {
    32 * 1024 * 1024
}

const fn default_crossfade_ms() -> u64 {
    200
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_cdn_hosts() -> Vec<String> {
    vec![
        "cdn.discordapp.com".to_string(),
        "media.discordapp.net".to_string(),
    ]
}

impl LoaderConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(memory_cache_size) = args.memory_cache_size {
            self.memory_cache_size = memory_cache_size;
        }
        if let Some(resource_dir) = &args.resource_dir {
            self.resource_dir = Some(resource_dir.clone());
        }
    }

    /// Returns the transition requests use by default.
    #[must_use]
    pub const fn transition(&self) -> TransitionPolicy {
        if self.crossfade_ms == 0 {
            TransitionPolicy::None
        } else {
            TransitionPolicy::Crossfade {
                duration: Duration::from_millis(self.crossfade_ms),
            }
        }
    }

    /// Returns the HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("pixload.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            memory_cache_size: default_memory_cache_size(),
            weak_references: true,
            bitmap_pooling: true,
            bitmap_pool_size: default_bitmap_pool_size(),
            crossfade_ms: default_crossfade_ms(),
            http_timeout_secs: default_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            cdn_hosts: default_cdn_hosts(),
            resource_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            memory_cache_size = 1024
            bitmap_pooling = false
            crossfade_ms = 0
            cdn_hosts = ["images.example.com"]
        "#;

        let config: LoaderConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.memory_cache_size, 1024);
        assert!(!config.bitmap_pooling);
        assert!(config.weak_references);
        assert_eq!(config.transition(), TransitionPolicy::None);
        assert_eq!(config.cdn_hosts, vec!["images.example.com".to_string()]);
        assert_eq!(config.max_concurrent_fetches, 4);
    }

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();

        assert_eq!(config.log_level, LogLevel::Info);
        assert!(matches!(config.transition(), TransitionPolicy::Crossfade { .. }));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let args = CliArgs::parse_from([
            "pixload",
            "--log-level",
            "debug",
            "--memory-cache-size",
            "2048",
            "a.png",
        ]);
        let mut config = LoaderConfig::default();
        config.merge_with_args(&args);

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.memory_cache_size, 2048);
        assert!(config.resource_dir.is_none());
    }
}
