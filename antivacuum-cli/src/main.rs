//! Anti-Vacuum CLI - Command-line interface
//!
//! Warms regions of a simulated lazy world, either directly (`warm`) or by
//! replaying key presses and commands through the event gate (`keys`).

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use antivacuum::gate::ActorPosition;
use antivacuum::scheduler::WarmMode;
use antivacuum::RegionAddress;
use clap::{Args, Parser, Subcommand};

use commands::common::{parse_position, parse_region, SourceOptions};
use commands::config::ConfigCommands;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "antivacuum")]
#[command(version, about = "Force lazily materialized regions to become fully resident", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.antivacuum/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level or filter directive (overrides the configuration; RUST_LOG wins)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Send feedback lines to the log instead of stdout
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Warm one region and print the feedback an actor would see
    Warm {
        /// Target region as RX,RZ
        #[arg(long, value_parser = parse_region, allow_hyphen_values = true)]
        region: RegionAddress,

        /// Warm mode: standard or aggressive
        #[arg(long, default_value = "standard")]
        mode: WarmMode,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Replay ticks from stdin: held keys per line, or /warm, /leave, /join
    Keys {
        /// Actor start position as X,Y,Z
        #[arg(long, default_value = "0,64,0", value_parser = parse_position, allow_hyphen_values = true)]
        at: ActorPosition,

        /// Allow command triggers
        #[arg(long)]
        privileged: bool,

        /// Pause between ticks in milliseconds
        #[arg(long, default_value = "0")]
        tick_ms: u64,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Simulated world behaviour.
#[derive(Args)]
struct SourceArgs {
    /// Added latency per cell read in milliseconds
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Fail every Nth cell read (0 disables)
    #[arg(long, default_value = "0")]
    fail_every: u64,
}

impl From<SourceArgs> for SourceOptions {
    fn from(args: SourceArgs) -> Self {
        SourceOptions {
            latency_ms: args.latency_ms,
            fail_every: args.fail_every,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();
    let log_level = cli.log_level.as_deref();

    match cli.command {
        Commands::Warm {
            region,
            mode,
            source,
        } => {
            let runner = CliRunner::new(config_path, log_level)?;
            commands::warm::run(
                commands::warm::WarmArgs {
                    region,
                    mode,
                    quiet: cli.quiet,
                    source: source.into(),
                },
                &runner,
            )
        }
        Commands::Keys {
            at,
            privileged,
            tick_ms,
            source,
        } => {
            let runner = CliRunner::new(config_path, log_level)?;
            commands::keys::run(
                commands::keys::KeysArgs {
                    start: at,
                    privileged,
                    tick_ms,
                    quiet: cli.quiet,
                    source: source.into(),
                },
                &runner,
            )
        }
        Commands::Config { command } => commands::config::run(command, config_path),
    }
}
