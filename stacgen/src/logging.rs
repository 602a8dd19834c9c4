//! Logging infrastructure for stacgen.
//!
//! Provides structured logging with file output and optional console output:
//! - Writes to the configured log file (cleared on start)
//! - Optionally prints to stdout for interactive runs
//! - Configurable via RUST_LOG, overridden by the debug flag

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Logging options chosen by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogOptions {
    /// Mirror log output to stdout
    pub stdout: bool,
    /// Force debug level regardless of RUST_LOG
    pub debug: bool,
}

/// Initialize logging to `log_path`, plus stdout when requested.
///
/// Creates the parent directory if needed and clears any previous log file.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the file cannot be
/// cleared.
pub fn init_logging(log_path: &Path, options: LogOptions) -> Result<LoggingGuard, io::Error> {
    let (log_dir, log_file) = split_log_path(log_path)?;
    fs::create_dir_all(log_dir)?;
    fs::write(log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stdout_layer = options.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter(options.debug))
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Filter from RUST_LOG, defaulting to info; `debug` forces debug level.
fn env_filter(debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn split_log_path(path: &Path) -> Result<(&Path, &Path), io::Error> {
    let file = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("log path {} has no file name", path.display()),
        )
    })?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((dir, Path::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_split_log_path() {
        let (dir, file) = split_log_path(Path::new("/var/log/stacgen/stacgen.log")).unwrap();
        assert_eq!(dir, Path::new("/var/log/stacgen"));
        assert_eq!(file, Path::new("stacgen.log"));

        let (dir, file) = split_log_path(Path::new("stacgen.log")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert_eq!(file, Path::new("stacgen.log"));
    }

    #[test]
    fn test_split_rejects_directory_only_path() {
        assert!(split_log_path(&PathBuf::from("/")).is_err());
    }

    #[test]
    fn test_debug_flag_overrides_env() {
        assert_eq!(env_filter(true).to_string(), "debug");
    }

    #[test]
    fn test_guard_structure() {
        use tracing_appender::non_blocking::NonBlocking;

        let (non_blocking, guard) = NonBlocking::new(std::io::sink());
        drop(non_blocking);

        let _logging_guard = LoggingGuard { _file_guard: guard };
    }

    // Actual log output is not tested here: the global subscriber can only
    // be installed once per process.
}
