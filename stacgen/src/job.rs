//! Job messages consumed by the worker and the `generate` command.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::item::AssemblyError;

/// Collection used when a job names neither a collection nor a provider.
pub const DEFAULT_COLLECTION: &str = "default";

/// One item to build.
///
/// ```
/// use stacgen::job::JobMessage;
///
/// let job = JobMessage::from_json(
///     r#"{"files": ["https://x/scene.tif"], "parser": "maxar", "metadataUrl": "https://x/m.json"}"#,
/// ).unwrap();
/// assert_eq!(job.provider.as_deref(), Some("maxar"));
/// assert_eq!(job.collection(), "maxar");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    /// Every file reference of the item, rasters and sidecars alike
    #[serde(default)]
    pub files: Vec<String>,

    /// Provider metadata handed to the parser
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    /// Where to fetch the metadata from when it is not inline
    #[serde(
        default,
        alias = "metadataUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata_url: Option<String>,

    /// Parser key
    #[serde(default, alias = "parser", skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Target collection for publishing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl JobMessage {
    /// Job with only file references.
    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Decodes and validates a job.
    pub fn from_json(text: &str) -> Result<Self, AssemblyError> {
        let job: Self =
            serde_json::from_str(text).map_err(|e| AssemblyError::InvalidJob(e.to_string()))?;
        job.validate()?;
        Ok(job)
    }

    /// Decodes a raw queue payload, which must be UTF-8 JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AssemblyError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| AssemblyError::InvalidJob(format!("payload is not UTF-8: {}", e)))?;
        Self::from_json(text)
    }

    /// Checks that a provider comes with metadata to parse.
    pub fn validate(&self) -> Result<(), AssemblyError> {
        if let Some(provider) = &self.provider {
            if provider.trim().is_empty() {
                return Err(AssemblyError::InvalidJob(
                    "provider must not be empty".to_string(),
                ));
            }
            if self.metadata.is_none() && self.metadata_url.is_none() {
                return Err(AssemblyError::InvalidJob(format!(
                    "provider '{}' requires metadata or metadata_url",
                    provider
                )));
            }
        }
        Ok(())
    }

    /// Publish collection: the job's own, else the provider key, else
    /// [`DEFAULT_COLLECTION`].
    pub fn collection(&self) -> &str {
        self.collection
            .as_deref()
            .or(self.provider.as_deref())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_COLLECTION)
    }
}
