//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization and creation
//! of the pipeline components shared by the `worker` and `generate` commands.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use stacgen::config::ConfigFile;
use stacgen::http::ReqwestClient;
use stacgen::item::ItemAssembler;
use stacgen::logging::{init_logging, LogOptions, LoggingGuard};
use stacgen::parser::ParserRegistry;
use stacgen::publish::CatalogPublisher;
use stacgen::resolver::AssetResolver;

use crate::error::CliError;

/// Loads the configuration from `--config`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Configuration file, default location when `None`
    /// * `options` - stdout mirroring and debug level
    pub fn new(config_path: Option<&Path>, options: LogOptions) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let logging_guard = init_logging(&config.logging.file, options)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("stacgen v{}", stacgen::VERSION);
        info!("stacgen CLI: {} command", command);
    }

    /// Multi-threaded runtime for the async commands.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }

    /// HTTP client with the configured download timeout.
    pub fn http_client(&self) -> Result<ReqwestClient, CliError> {
        Ok(ReqwestClient::with_timeout(
            self.config.assets.http_timeout_secs,
        )?)
    }

    /// Item assembler over the built-in parsers and configured mounts.
    pub fn assembler(
        &self,
        client: ReqwestClient,
    ) -> Result<ItemAssembler<ReqwestClient>, CliError> {
        let assembler = ItemAssembler::new(
            client,
            Arc::new(ParserRegistry::with_builtin()),
            AssetResolver::new(&self.config.mounts),
            &self.config,
        )?;
        info!(
            mounts = self.config.mounts.len(),
            check_cog = self.config.raster.check_cog,
            "Item assembler ready"
        );
        Ok(assembler)
    }

    /// Catalog publisher from the `[catalog]` section.
    pub fn publisher(&self, client: ReqwestClient) -> CatalogPublisher<ReqwestClient> {
        CatalogPublisher::new(client, &self.config.catalog)
    }
}
