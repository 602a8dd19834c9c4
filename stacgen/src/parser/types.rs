//! Core parser trait, capabilities and error type.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::error::{Classify, ErrorClass};

/// Partial STAC item produced by a parser, merged over the assembled item.
pub type ItemFragment = Map<String, Value>;

/// STAC view extension schema, used by the satellite parsers.
pub const VIEW_EXTENSION: &str = "https://stac-extensions.github.io/view/v1.0.0/schema.json";

/// Errors raised by parsers and the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParserError {
    /// No parser is registered under the provider key
    #[error("Unsupported metadata type: {0}")]
    UnsupportedProvider(String),

    /// A field the parser cannot work without is absent
    #[error("metadata field '{0}' is missing")]
    MissingField(String),

    /// The sidecar document could not be decoded
    #[error("invalid sidecar {file}: {reason}")]
    InvalidSidecar { file: String, reason: String },
}

impl Classify for ParserError {
    fn class(&self) -> ErrorClass {
        ErrorClass::FatalToJob
    }
}

/// Everything a parser may look at.
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
    /// Job metadata payload (fetched from `metadata_url` when only that was given)
    pub metadata: &'a Map<String, Value>,
    /// Every file reference in the job
    pub files: &'a [String],
    /// Contents of the sidecar named by [`SidecarSource`], when available
    pub sidecar: Option<&'a [u8]>,
}

/// A provider-specific metadata parser.
///
/// Parsers do no I/O: anything they need beyond the job metadata is declared
/// through [`SidecarSource`] and handed to them in [`ParseInput::sidecar`].
pub trait MetadataParser: Send + Sync {
    /// Returns the parser's name for logging and identification.
    fn name(&self) -> &str;

    /// Builds an item fragment from the job input.
    fn parse(&self, input: &ParseInput<'_>) -> Result<ItemFragment, ParserError>;

    /// Filename to asset key mapping, when the parser provides one.
    fn as_asset_key_mapper(&self) -> Option<&dyn AssetKeyMapper> {
        None
    }

    /// Sidecar document selection, when the parser needs one.
    fn as_sidecar_source(&self) -> Option<&dyn SidecarSource> {
        None
    }
}

/// Optional capability: custom asset keys.
pub trait AssetKeyMapper: Send + Sync {
    /// Asset key for a filename (last path segment, extension included).
    fn asset_key(&self, filename: &str) -> String;
}

/// Optional capability: a job file the parser reads.
pub trait SidecarSource: Send + Sync {
    /// Picks the sidecar among the job's file references.
    fn sidecar<'a>(&self, files: &'a [String]) -> Option<&'a str>;
}

/// Empty fragment carrying the given extensions, the shape every built-in
/// parser starts from.
pub fn empty_fragment(extensions: &[&str]) -> ItemFragment {
    let mut fragment = Map::new();
    fragment.insert("type".to_string(), json!("Feature"));
    fragment.insert("stac_extensions".to_string(), json!(extensions));
    fragment.insert("properties".to_string(), Value::Object(Map::new()));
    fragment
}

/// Sets one entry of a fragment's `properties` map.
pub fn insert_property(fragment: &mut ItemFragment, key: &str, value: Value) {
    let mut properties = match fragment.remove("properties") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    properties.insert(key.to_string(), value);
    fragment.insert("properties".to_string(), Value::Object(properties));
}
