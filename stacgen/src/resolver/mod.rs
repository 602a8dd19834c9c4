//! URL to local path mapping for job files.
//!
//! Storage containers are mounted on the worker host; each `[mount.<name>]`
//! section maps a URL prefix to the directory the container is mounted at.
//! With no mounts configured the resolver is a pass-through and references
//! are used as local paths.

mod staging;

pub use staging::{stage_files, StagedFiles};

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::asset::strip_query;
use crate::config::MountSettings;
use crate::error::{Classify, ErrorClass};

/// Errors raised by the resolver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No mount covers the reference
    #[error("no mount covers {0}")]
    NotMounted(String),
}

impl Classify for ResolveError {
    fn class(&self) -> ErrorClass {
        ErrorClass::FatalToJob
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Mount {
    prefix: String,
    path: PathBuf,
}

/// Maps file references to local paths and back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetResolver {
    mounts: Vec<Mount>,
}

impl AssetResolver {
    /// Resolver over the configured mounts.
    pub fn new(mounts: &[MountSettings]) -> Self {
        let mut mounts: Vec<Mount> = mounts
            .iter()
            .map(|m| Mount {
                prefix: m.url.trim_end_matches('/').to_string(),
                path: m.path.clone(),
            })
            .collect();
        // Longest prefix first so nested mounts win.
        mounts.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { mounts }
    }

    /// Resolver with no mounts.
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn is_passthrough(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Local path of a file reference.
    ///
    /// References without a URL scheme are already local and are returned
    /// unchanged (minus any query string).
    pub fn resolve_local_path(&self, reference: &str) -> Result<PathBuf, ResolveError> {
        let reference = strip_query(reference);
        if let Some(path) = reference.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if self.is_passthrough() || !is_url(reference) {
            return Ok(PathBuf::from(reference));
        }

        for mount in &self.mounts {
            let Some(rest) = reference.strip_prefix(mount.prefix.as_str()) else {
                continue;
            };
            if !rest.is_empty() && !rest.starts_with('/') {
                continue;
            }
            let relative = rest.trim_start_matches('/');
            if relative.split('/').any(|segment| segment == "..") {
                return Err(ResolveError::NotMounted(reference.to_string()));
            }
            return Ok(mount.path.join(relative));
        }

        Err(ResolveError::NotMounted(reference.to_string()))
    }

    /// Public URL of a local path.
    pub fn resolve_public_url(&self, path: &Path) -> Result<String, ResolveError> {
        if self.is_passthrough() {
            return Ok(path.display().to_string());
        }

        self.mounts
            .iter()
            .filter_map(|mount| {
                let relative = path.strip_prefix(&mount.path).ok()?;
                let segments: Option<Vec<&str>> = relative
                    .components()
                    .map(|c| match c {
                        Component::Normal(s) => s.to_str(),
                        _ => None,
                    })
                    .collect();
                let segments = segments?;
                Some(if segments.is_empty() {
                    mount.prefix.clone()
                } else {
                    format!("{}/{}", mount.prefix, segments.join("/"))
                })
            })
            .next()
            .ok_or_else(|| ResolveError::NotMounted(path.display().to_string()))
    }
}

/// Whether a reference carries a URL scheme.
pub fn is_url(reference: &str) -> bool {
    reference.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+')
    })
}

/// Whether a reference is fetchable over HTTP.
pub fn is_http(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> AssetResolver {
        AssetResolver::new(&[
            MountSettings {
                name: "imagery".to_string(),
                url: "https://acct.blob.core.windows.net/imagery/".to_string(),
                path: PathBuf::from("/mnt/imagery"),
            },
            MountSettings {
                name: "maxar".to_string(),
                url: "https://acct.blob.core.windows.net/imagery/maxar".to_string(),
                path: PathBuf::from("/mnt/maxar"),
            },
        ])
    }

    #[test]
    fn test_passthrough() {
        let r = AssetResolver::passthrough();
        assert_eq!(
            r.resolve_local_path("/data/scene.tif?x=1").unwrap(),
            PathBuf::from("/data/scene.tif")
        );
        assert_eq!(
            r.resolve_public_url(Path::new("/data/scene.tif")).unwrap(),
            "/data/scene.tif"
        );
    }

    #[test]
    fn test_url_maps_into_mount() {
        let path = resolver()
            .resolve_local_path("https://acct.blob.core.windows.net/imagery/planet/a.tif?sv=2020")
            .unwrap();
        assert_eq!(path, PathBuf::from("/mnt/imagery/planet/a.tif"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let path = resolver()
            .resolve_local_path("https://acct.blob.core.windows.net/imagery/maxar/0001/b.tif")
            .unwrap();
        assert_eq!(path, PathBuf::from("/mnt/maxar/0001/b.tif"));
    }

    #[test]
    fn test_prefix_must_end_at_segment() {
        let err = resolver()
            .resolve_local_path("https://acct.blob.core.windows.net/imagery2/a.tif")
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotMounted(_)));
    }

    #[test]
    fn test_parent_segments_are_rejected() {
        assert!(resolver()
            .resolve_local_path("https://acct.blob.core.windows.net/imagery/../etc/passwd")
            .is_err());
    }

    #[test]
    fn test_local_paths_pass_through_mounted_resolver() {
        assert_eq!(
            resolver().resolve_local_path("/tmp/readme.md").unwrap(),
            PathBuf::from("/tmp/readme.md")
        );
    }

    #[test]
    fn test_public_url() {
        let r = resolver();
        assert_eq!(
            r.resolve_public_url(Path::new("/mnt/maxar/0001/b.tif")).unwrap(),
            "https://acct.blob.core.windows.net/imagery/maxar/0001/b.tif"
        );
        assert!(matches!(
            r.resolve_public_url(Path::new("/srv/other.tif")),
            Err(ResolveError::NotMounted(_))
        ));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://x/a.tif"));
        assert!(is_url("s3://bucket/a.tif"));
        assert!(!is_url("/data/a.tif"));
        assert!(!is_url("C:\\data\\a.tif"));
    }
}
