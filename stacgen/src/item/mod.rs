//! STAC item model, merge engine and assembler.
//!
//! # Assembly
//!
//! [`ItemAssembler`] builds one [`CatalogItem`] from a [`crate::job::JobMessage`]
//! in a fixed sequence of steps:
//!
//! 1. sidecar assets (classified by extension)
//! 2. raster assets and raster-derived metadata
//! 3. provider metadata, merged over the item with [`merge`]
//! 4. footprint reconciliation

mod assembler;
mod error;
mod merge;
mod model;

pub use assembler::{AssemblyState, ItemAssembler};
pub use error::{AssemblyError, ItemError};
pub use merge::{merge, merge_maps};
pub use model::{Asset, CatalogItem, Geometry, Link, STAC_VERSION};
