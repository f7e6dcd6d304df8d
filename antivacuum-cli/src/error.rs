//! CLI error handling with user-friendly messages.

use std::process;

use antivacuum::config::ConfigError;
use antivacuum::logging::LoggingError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failed to load configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(#[from] LoggingError),

    /// Failed to create the Tokio runtime
    #[error("Failed to create Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Failed to install the Ctrl-C handler
    #[error("Failed to set signal handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),

    /// Failed to read commands from stdin
    #[error("Failed to read input: {0}")]
    Input(#[source] std::io::Error),

    /// The gate refused to start a warm
    #[error("Warm not started: {0}")]
    NotStarted(String),
}

impl CliError {
    /// Exit the process with an error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Config(ConfigError::InvalidValue { .. }) = self {
            eprintln!();
            eprintln!("Fix the value in the configuration file, or remove the key to use its default.");
            eprintln!("Run 'antivacuum config path' to see which file is read.");
        }

        process::exit(1)
    }
}
