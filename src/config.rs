//! Configuration management for spamorigin.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `SPAMORIGIN_*` environment variables, then command-line flags. Each layer
//! only overrides what it sets.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::errors::SpamOriginError;
use crate::groups::SAMPLE_LIMIT;
use crate::records::AggregationPolicy;
use crate::retry::{RetryConfig, RetryConfigBuilder};

pub const ENV_CONFIG: &str = "SPAMORIGIN_CONFIG";
pub const ENV_LIMIT: &str = "SPAMORIGIN_LIMIT";
pub const ENV_POLICY: &str = "SPAMORIGIN_POLICY";
pub const ENV_GRAPH_URL: &str = "SPAMORIGIN_GRAPH_URL";
pub const ENV_TIMEOUT_SECS: &str = "SPAMORIGIN_TIMEOUT_SECS";
pub const ENV_MAX_GROUPS: &str = "SPAMORIGIN_MAX_GROUPS";

/// Graph `$top` upper bound.
const MAX_PAGE_SIZE: usize = 1000;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mail fetch settings
    pub fetch: FetchConfig,

    /// Aggregation settings
    pub analysis: AnalysisConfig,

    /// Rendering preferences
    pub output: OutputConfig,
}

/// Mail fetch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum number of junk messages to analyze
    pub limit: usize,

    /// Microsoft Graph API root
    pub graph_base_url: String,

    /// Messages requested per Graph page
    pub page_size: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries for transient transport failures
    pub retry_attempts: u32,

    /// Initial delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

/// Aggregation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub policy: AggregationPolicy,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Maximum number of groups to render (0 = unlimited)
    pub max_groups: usize,

    /// Sample records shown per group
    pub samples_shown: usize,

    /// Whether to render the statistics block
    pub show_stats: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            limit: 50,
            graph_base_url: "https://graph.microsoft.com/v1.0".to_string(),
            page_size: 50,
            timeout_secs: 30,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfigBuilder::new()
            .max_attempts(self.retry_attempts)
            .initial_delay(Duration::from_millis(self.retry_delay_ms))
            .build()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_groups: 0, // unlimited
            samples_shown: 3,
            show_stats: true,
        }
    }
}

impl OutputConfig {
    /// Samples to render, never more than a group can hold.
    pub fn effective_samples(&self) -> usize {
        self.samples_shown.min(SAMPLE_LIMIT)
    }
}

impl Config {
    /// Full layered load: defaults, file, environment, CLI.
    pub fn load(cli: &crate::cli::Cli) -> Result<Self, ConfigError> {
        let file = cli
            .config
            .clone()
            .or_else(|| std::env::var_os(ENV_CONFIG).map(Into::into));

        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.merge_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            format: "TOML".to_string(),
            reason: e.to_string(),
        })
    }

    /// Apply `SPAMORIGIN_*` overrides read through `lookup`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_LIMIT) {
            match raw.trim().parse::<usize>() {
                Ok(limit) => self.fetch.limit = limit,
                Err(_) => warn!(var = ENV_LIMIT, value = %raw, "ignoring invalid value"),
            }
        }

        if let Some(raw) = lookup(ENV_POLICY) {
            match raw.parse::<AggregationPolicy>() {
                Ok(policy) => self.analysis.policy = policy,
                Err(e) => warn!(var = ENV_POLICY, "ignoring invalid value: {e}"),
            }
        }

        if let Some(url) = lookup(ENV_GRAPH_URL)
            && !url.trim().is_empty()
        {
            self.fetch.graph_base_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.fetch.timeout_secs = secs,
                Err(_) => warn!(var = ENV_TIMEOUT_SECS, value = %raw, "ignoring invalid value"),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_GROUPS) {
            match raw.trim().parse::<usize>() {
                Ok(max) => self.output.max_groups = max,
                Err(_) => warn!(var = ENV_MAX_GROUPS, value = %raw, "ignoring invalid value"),
            }
        }
    }

    /// Merge with CLI arguments, giving CLI precedence
    pub fn merge_with_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(limit) = cli.limit {
            self.fetch.limit = limit;
        }
        if let Some(policy) = cli.policy {
            self.analysis.policy = policy;
        }
        if let Some(max) = cli.max_groups {
            self.output.max_groups = max;
        }
        if let Some(samples) = cli.samples {
            self.output.samples_shown = samples;
        }
        if cli.no_stats {
            self.output.show_stats = false;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch.limit".to_string(),
                value: "0".to_string(),
                reason: "Limit must be at least 1".to_string(),
            });
        }

        if self.fetch.page_size == 0 || self.fetch.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "fetch.page_size".to_string(),
                value: self.fetch.page_size.to_string(),
                reason: format!("Page size must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }

        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch.timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        let url = self.fetch.graph_base_url.to_ascii_lowercase();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                field: "fetch.graph_base_url".to_string(),
                value: self.fetch.graph_base_url.clone(),
                reason: "Graph URL must use http or https".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration format
    #[error("Failed to parse {format} config: {reason}")]
    Parse { format: String, reason: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl From<ConfigError> for SpamOriginError {
    fn from(e: ConfigError) -> Self {
        SpamOriginError::configuration(e.to_string())
    }
}
