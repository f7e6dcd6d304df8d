//! Configuration file handling for ~/.antivacuum/config.ini.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::coord::WorldExtent;
use crate::gate::{
    GateConfig, KeyBinding, DEFAULT_AGGRESSIVE_KEY, DEFAULT_MAX_CONCURRENT_WARMS,
    DEFAULT_STANDARD_KEY,
};
use crate::probe::DEFAULT_PROBE_TIMEOUT;
use crate::scheduler::{
    SchedulerConfig, WarmMode, DEFAULT_PROBE_CONCURRENCY, DEFAULT_RESOLVE_BACKOFF,
    DEFAULT_RESOLVE_RETRIES, DEFAULT_SETTLE_DELAY,
};

/// Default log level when neither the file nor the environment sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the file
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid INI
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] ini::ParseError),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(super) fn invalid(section: &str, key: &str, value: &str, reason: &str) -> Self {
        ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub settle_delay_ms: u64,
    pub probe_concurrency: usize,
    pub probe_timeout_ms: u64,
    pub resolve_retries: u32,
    pub resolve_backoff_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            resolve_retries: DEFAULT_RESOLVE_RETRIES,
            resolve_backoff_ms: DEFAULT_RESOLVE_BACKOFF.as_millis() as u64,
        }
    }
}

/// `[gate]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    pub max_concurrent_warms: usize,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            max_concurrent_warms: DEFAULT_MAX_CONCURRENT_WARMS,
        }
    }
}

/// `[bindings]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSettings {
    pub standard_key: String,
    pub aggressive_key: String,
}

impl Default for BindingSettings {
    fn default() -> Self {
        Self {
            standard_key: DEFAULT_STANDARD_KEY.to_string(),
            aggressive_key: DEFAULT_AGGRESSIVE_KEY.to_string(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `antivacuum=debug`.
    pub level: String,
    /// Log file path. Logs go to stderr only when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    /// `[world]` section, validated on load.
    pub world: WorldExtent,
    pub scheduler: SchedulerSettings,
    pub gate: GateSettings,
    pub bindings: BindingSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.antivacuum/config.ini).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, self.to_config_string()).map_err(io_error)
    }

    /// Render as a commented INI document.
    pub fn to_config_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Scheduler settings as a [`SchedulerConfig`].
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let s = &self.scheduler;
        SchedulerConfig::default()
            .with_extent(self.world)
            .with_settle_delay(Duration::from_millis(s.settle_delay_ms))
            .with_probe_concurrency(s.probe_concurrency)
            .with_probe_timeout(Duration::from_millis(s.probe_timeout_ms))
            .with_resolve_retries(s.resolve_retries, Duration::from_millis(s.resolve_backoff_ms))
    }

    /// Gate settings and key bindings as a [`GateConfig`].
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            max_concurrent_warms: self.gate.max_concurrent_warms,
            bindings: vec![
                KeyBinding::new("standard", &self.bindings.standard_key, WarmMode::Standard),
                KeyBinding::new("aggressive", &self.bindings.aggressive_key, WarmMode::Aggressive),
            ],
        }
    }
}

/// Get the path to the config directory (~/.antivacuum).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".antivacuum")
}

/// Get the path to the config file (~/.antivacuum/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
