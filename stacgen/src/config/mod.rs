//! Configuration loaded from `~/.stacgen/config.ini`.
//!
//! The file is read once at startup into an immutable [`ConfigFile`]; each
//! component receives the settings section it needs through its constructor.
//!
//! # Example
//!
//! ```
//! use stacgen::config::ConfigFile;
//!
//! let config = ConfigFile::from_ini_str(
//!     "[catalog]\napi_url = http://localhost:8080\nmax_retries = 3\n",
//! )
//! .unwrap();
//! assert_eq!(config.catalog.max_retries, 3);
//! assert_eq!(config.queue.input_list, "stac_generator_input");
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    AssetSettings, CatalogSettings, ConfigFile, LoggingSettings, MountSettings, QueueSettings,
    RasterSettings,
};
