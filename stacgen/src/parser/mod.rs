//! Provider metadata parsers.
//!
//! A parser turns a job's provider metadata (and optionally one sidecar file
//! from the job) into an item fragment that is merged over the assembled item.
//!
//! # Built-in parsers
//!
//! - [`ExampleParser`] - copies the metadata `ID`
//! - [`MaxarParser`] - reads `DeliveryMetadata.xml`
//! - [`PlanetParser`] - reads the scene `*_metadata.json`
//!
//! # Example
//!
//! ```
//! use serde_json::{json, Map};
//! use stacgen::parser::{ParseInput, ParserRegistry};
//!
//! let registry = ParserRegistry::with_builtin();
//! let parser = registry.get_parser("Example").unwrap();
//!
//! let metadata: Map<String, serde_json::Value> =
//!     serde_json::from_value(json!({"ID": "scene-1"})).unwrap();
//! let fragment = parser
//!     .parse(&ParseInput { metadata: &metadata, files: &[], sidecar: None })
//!     .unwrap();
//! assert_eq!(fragment["id"], "scene-1");
//! ```

mod example;
mod maxar;
mod planet;
mod registry;
mod types;

pub use example::ExampleParser;
pub use maxar::{MaxarParser, DELIVERY_METADATA_FILE, DELIVERY_NAMESPACE};
pub use planet::{PlanetParser, SCENE_METADATA_SUFFIX};
pub use registry::{normalize_key, ParserRegistry, ParserTier};
pub use types::{
    empty_fragment, insert_property, AssetKeyMapper, ItemFragment, MetadataParser, ParseInput,
    ParserError, SidecarSource, VIEW_EXTENSION,
};
