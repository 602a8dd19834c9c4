//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::settings::*;

// =============================================================================
// Catalog
// =============================================================================

/// Publish attempts before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Seconds between publish attempts.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// License reported for rasters without a copyright tag.
pub const DEFAULT_LICENSE: &str = "proprietary";

// =============================================================================
// Queue
// =============================================================================

pub const DEFAULT_QUEUE_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_INPUT_LIST: &str = "stac_generator_input";
pub const DEFAULT_OUTPUT_LIST: &str = "stac_generator_output";

/// Blocking pop timeout, short enough for the worker to notice shutdown.
pub const DEFAULT_POP_TIMEOUT_SECS: u64 = 1;

// =============================================================================
// Assets
// =============================================================================

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Logging
// =============================================================================

pub const DEFAULT_LOG_FILE_NAME: &str = "stacgen.log";

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            catalog: CatalogSettings {
                api_url: None,
                publish: false,
                max_retries: DEFAULT_MAX_RETRIES,
                retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
                default_license: DEFAULT_LICENSE.to_string(),
            },
            raster: RasterSettings::default(),
            queue: QueueSettings {
                url: DEFAULT_QUEUE_URL.to_string(),
                input_list: DEFAULT_INPUT_LIST.to_string(),
                output_list: DEFAULT_OUTPUT_LIST.to_string(),
                publish: false,
                pop_timeout_secs: DEFAULT_POP_TIMEOUT_SECS,
            },
            assets: AssetSettings {
                download: false,
                cleanup: true,
                http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            },
            mounts: Vec::new(),
            logging: LoggingSettings {
                file: config_dir.join("logs").join(DEFAULT_LOG_FILE_NAME),
            },
        }
    }
}
