//! Configuration file support.
//!
//! Settings live in an INI file at `~/.antivacuum/config.ini`. Every key is
//! optional; values that are absent keep their defaults, unknown keys are
//! ignored, and a missing file yields the default configuration.

mod file;
mod parser;
mod writer;

pub use file::{
    config_directory, config_file_path, BindingSettings, ConfigError, ConfigFile, GateSettings,
    LoggingSettings, SchedulerSettings, DEFAULT_LOG_LEVEL,
};
