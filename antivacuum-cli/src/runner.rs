//! CLI runner for common setup.
//!
//! Loads configuration, initializes logging and owns the Tokio runtime the
//! warms run on.

use std::future::Future;
use std::path::{Path, PathBuf};

use antivacuum::config::{config_file_path, ConfigFile};
use antivacuum::logging::{init_logging, LoggingGuard};
use tokio::runtime::{Handle, Runtime};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Keeps the log file writer alive while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
    runtime: Runtime,
}

impl CliRunner {
    /// Load config, initialize logging and build the runtime.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file to read; the default path when `None`
    /// * `log_level` - Level overriding the configured one
    pub fn new(config_path: Option<&Path>, log_level: Option<&str>) -> Result<Self, CliError> {
        let config_path = resolve_config_path(config_path);
        let config = ConfigFile::load_from(&config_path)?;
        let logging_guard = init_logging(&config.logging, log_level)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("antivacuum-worker")
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
            runtime,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Handle for spawning onto the runner's runtime.
    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!(version = env!("CARGO_PKG_VERSION"), command, "Anti-Vacuum starting");
        info!(config = %self.config_path.display(), "Configuration loaded");
    }
}

/// The config file to use: `explicit` if given, otherwise the default path.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}
