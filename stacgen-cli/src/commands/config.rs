//! Configuration management CLI commands.
//!
//! Provides `config init` and `config path`.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use stacgen::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with every setting at its default
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against `--config` or the default location.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Init { force } => run_init(&path, force),
        ConfigCommands::Path => run_path(&path),
    }
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    let existed = path.exists();
    let written = init_file(path, force)?;

    if existed && !force {
        println!("Configuration already exists: {}", written.display());
        println!("Use --force to overwrite it with defaults.");
    } else {
        println!("Wrote default configuration: {}", written.display());
    }
    Ok(())
}

fn init_file(path: &Path, force: bool) -> Result<PathBuf, CliError> {
    if force {
        ConfigFile::default().save_to(path)?;
        return Ok(path.to_path_buf());
    }
    Ok(ConfigFile::ensure_exists(path)?)
}

fn run_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist, defaults are used)");
    }
    Ok(())
}
