//! Asset classification and key derivation.
//!
//! Every file reference in a job is classified purely from its reference
//! string: no file is opened here. The classification decides whether the
//! file goes through raster introspection or is attached as a sidecar asset.
//!
//! # Example
//!
//! ```
//! use stacgen::asset::{classify, MediaType};
//!
//! let c = classify("https://store.example.com/scene/readme.md?sig=abc");
//! assert!(!c.is_tiled_raster);
//! assert_eq!(c.media_type, MediaType::PlainText);
//! ```

mod classify;
mod key;

pub use classify::{classify, extension_of, filename_of, strip_query, Classification, MediaType};
pub use key::{is_preview_key, PREVIEW_ASSET_KEY};
