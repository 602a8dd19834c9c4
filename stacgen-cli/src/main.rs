//! stacgen CLI - Command-line interface
//!
//! This binary runs the stacgen queue worker and provides one-shot item
//! generation, COG validation and configuration helpers.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stacgen::logging::LogOptions;

use commands::config::ConfigCommands;
use commands::generate::GenerateArgs;
use commands::validate::ValidateArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Debug, Parser)]
#[command(name = "stacgen")]
#[command(version = stacgen::VERSION)]
#[command(about = "Build STAC items from geospatial deliveries", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.stacgen/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Consume jobs from the queue until interrupted
    Worker,

    /// Build one item from a job file and print it as JSON
    Generate {
        /// Job file: {"files": [...], "metadata": {...}, "provider": "..."}
        job: PathBuf,

        /// Collection to publish to, overriding the job's
        #[arg(long)]
        collection: Option<String>,

        /// Also publish the item to the configured catalog API
        #[arg(long)]
        publish: bool,
    },

    /// Check whether a GeoTIFF is cloud optimized
    Validate {
        /// GeoTIFF file to check
        path: PathBuf,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered metadata parsers
    Parsers,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        e.exit();
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();
    let log_options = |stdout| LogOptions {
        stdout,
        debug: cli.debug,
    };

    match cli.command {
        Commands::Worker => {
            let runner = CliRunner::new(config_path, log_options(true))?;
            commands::worker::run(runner)
        }
        Commands::Generate {
            job,
            collection,
            publish,
        } => {
            // stdout carries the item document only
            let runner = CliRunner::new(config_path, log_options(false))?;
            commands::generate::run(
                runner,
                GenerateArgs {
                    job,
                    collection,
                    publish,
                },
            )
        }
        Commands::Validate { path, strict, json } => {
            commands::validate::run(ValidateArgs { path, strict, json })
        }
        Commands::Parsers => commands::parsers::run(),
        Commands::Config { command } => commands::config::run(command, config_path),
    }
}
