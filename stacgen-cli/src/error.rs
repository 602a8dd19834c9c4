//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use stacgen::config::ConfigFileError;
use stacgen::http::HttpError;
use stacgen::item::AssemblyError;
use stacgen::publish::PublishError;
use stacgen::queue::QueueError;
use stacgen::raster::RasterError;
use stacgen::worker::WorkerError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to create the HTTP client
    Http(HttpError),
    /// Failed to read an input file
    FileRead { path: PathBuf, error: std::io::Error },
    /// Item assembly failed
    Assembly(AssemblyError),
    /// Publishing to the catalog API failed
    Publish(PublishError),
    /// The queue broker is unreachable
    Queue(QueueError),
    /// The worker stopped on a fatal error
    Worker(WorkerError),
    /// The raster could not be read
    Raster { path: PathBuf, error: RasterError },
    /// The raster is not a valid cloud-optimized GeoTIFF
    InvalidCog(PathBuf),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Queue(_) => {
                eprintln!();
                eprintln!("Check that the broker is running and that [queue] url in");
                eprintln!("the configuration file points at it.");
            }
            CliError::Publish(PublishError::ConfigMissing) => {
                eprintln!();
                eprintln!("Set [catalog] api_url in the configuration file.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Http(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path.display(), error)
            }
            CliError::Assembly(e) => write!(f, "Failed to build item: {}", e),
            CliError::Publish(e) => write!(f, "Failed to publish item: {}", e),
            CliError::Queue(e) => write!(f, "Queue error: {}", e),
            CliError::Worker(e) => write!(f, "Worker stopped: {}", e),
            CliError::Raster { path, error } => {
                write!(f, "Failed to read raster '{}': {}", path.display(), error)
            }
            CliError::InvalidCog(path) => {
                write!(f, "'{}' is not a valid cloud-optimized GeoTIFF", path.display())
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            CliError::Assembly(e) => Some(e),
            CliError::Publish(e) => Some(e),
            CliError::Queue(e) => Some(e),
            CliError::Worker(e) => Some(e),
            CliError::Raster { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<HttpError> for CliError {
    fn from(e: HttpError) -> Self {
        CliError::Http(e)
    }
}

impl From<AssemblyError> for CliError {
    fn from(e: AssemblyError) -> Self {
        CliError::Assembly(e)
    }
}

impl From<PublishError> for CliError {
    fn from(e: PublishError) -> Self {
        CliError::Publish(e)
    }
}

impl From<QueueError> for CliError {
    fn from(e: QueueError) -> Self {
        CliError::Queue(e)
    }
}

impl From<WorkerError> for CliError {
    fn from(e: WorkerError) -> Self {
        CliError::Worker(e)
    }
}
