//! Download of remote job files into their mount.
//!
//! Used when storage is not actually mounted on the worker host: every
//! http(s) job file that maps to a mount and is missing locally is fetched
//! before assembly, and deleted again once the job is done.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{is_http, AssetResolver};
use crate::http::AsyncHttpClient;

/// Files written by [`stage_files`] for one job.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StagedFiles {
    paths: Vec<PathBuf>,
}

impl StagedFiles {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Deletes every staged file. Failures are logged.
    pub async fn cleanup(self) {
        for path in self.paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed staged file"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged file"),
            }
        }
    }
}

/// Downloads every mounted http(s) file that is missing locally.
///
/// Files that cannot be resolved or fetched are skipped; they may live
/// outside any configured storage account.
pub async fn stage_files<C: AsyncHttpClient>(
    client: &C,
    resolver: &AssetResolver,
    files: &[String],
) -> StagedFiles {
    let mut staged = StagedFiles::default();
    if resolver.is_passthrough() {
        return staged;
    }

    for reference in files.iter().filter(|f| is_http(f)) {
        let path = match resolver.resolve_local_path(reference) {
            Ok(path) => path,
            Err(e) => {
                debug!(reference = %reference, error = %e, "Not staging unmounted file");
                continue;
            }
        };
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            continue;
        }

        match download(client, reference, &path).await {
            Ok(bytes) => {
                info!(reference = %reference, path = %path.display(), bytes, "Staged file");
                staged.paths.push(path);
            }
            Err(e) => debug!(reference = %reference, error = %e, "Failed to stage file"),
        }
    }

    staged
}

async fn download<C: AsyncHttpClient>(
    client: &C,
    reference: &str,
    path: &Path,
) -> Result<usize, String> {
    let body = client.get(reference).await.map_err(|e| e.to_string())?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    // Readers never see a partial file at `path`.
    let partial = partial_path(path);
    let written = match tokio::fs::write(&partial, &body).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.to_string());
    }
    Ok(body.len())
}

/// Sibling of `path` that a download is written to before being renamed.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".part");
    path.with_file_name(name)
}
