//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;
use std::time::Duration;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Upstream catalog API and item defaults
    pub catalog: CatalogSettings,
    /// Raster validation behavior
    pub raster: RasterSettings,
    /// Job queue connection and list names
    pub queue: QueueSettings,
    /// Remote asset staging
    pub assets: AssetSettings,
    /// URL prefix to local path mappings, one per `[mount.<name>]` section
    pub mounts: Vec<MountSettings>,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Catalog API configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSettings {
    /// Base URL of the catalog API; publishing is impossible without it
    pub api_url: Option<String>,
    /// Publish each item produced by the worker to the catalog API
    pub publish: bool,
    /// POST/PUT attempts before giving up
    pub max_retries: u32,
    /// Pause between attempts in seconds
    pub retry_delay_secs: u64,
    /// `license` property used when a raster carries no copyright tag
    pub default_license: String,
}

impl CatalogSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Raster validation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasterSettings {
    /// Run the COG validator on every raster asset
    pub check_cog: bool,
    /// Log every COG report at info level
    pub log_cog_info: bool,
    /// Treat COG warnings as failures
    pub strict_cog: bool,
}

/// Job queue configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    /// Redis connection URL
    pub url: String,
    /// List jobs are popped from
    pub input_list: String,
    /// List results are pushed to
    pub output_list: String,
    /// Push each produced item to the output list
    pub publish: bool,
    /// Blocking pop timeout in seconds
    pub pop_timeout_secs: u64,
}

impl QueueSettings {
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_secs(self.pop_timeout_secs)
    }
}

/// Remote asset staging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSettings {
    /// Download remote job files into their mount before assembly
    pub download: bool,
    /// Delete files staged for a job once it finishes
    pub cleanup: bool,
    /// Timeout for metadata, sidecar and staging downloads
    pub http_timeout_secs: u64,
}

/// One URL prefix to local directory mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSettings {
    /// Section suffix, e.g. `imagery` for `[mount.imagery]`
    pub name: String,
    /// URL prefix, e.g. `https://account.blob.core.windows.net/imagery`
    pub url: String,
    /// Local directory the prefix maps to
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
