//! Configuration CLI commands: `config path`, `config show` and `config init`.

use std::path::Path;

use antivacuum::config::ConfigFile;
use clap::Subcommand;

use crate::error::CliError;
use crate::runner::resolve_config_path;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a default configuration file if none exists
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);
    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            let config = ConfigFile::load_from(&path)?;
            print!("{}", config.to_config_string());
        }
        ConfigCommands::Init => {
            if path.exists() {
                println!("Configuration already exists: {}", path.display());
            } else {
                ConfigFile::default().save_to(&path)?;
                println!("Wrote default configuration: {}", path.display());
            }
        }
    }
    Ok(())
}
