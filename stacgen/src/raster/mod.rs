//! Raster access for GeoTIFF assets.
//!
//! - [`tiff`]: header and directory reader (classic TIFF and BigTIFF)
//! - [`cog`]: structural validator for cloud-optimized layouts
//! - [`geo`]: georeferencing from GeoTIFF tags
//! - [`introspect`]: item-level metadata read from a raster
//! - [`media`]: media type selection for raster assets
//!
//! Files are opened, read and closed inside a single call. Nothing here keeps
//! a handle across calls.

pub mod cog;
pub mod geo;
pub mod introspect;
pub mod media;
pub mod tiff;

#[cfg(test)]
pub(crate) mod fixture;

use thiserror::Error;

use crate::error::{Classify, ErrorClass};

pub use cog::{
    check_layout, BackendCapabilities, CogError, CogValidator, LevelLayout, RasterLayout,
    ValidationReport,
};
pub use geo::GeoTransform;
pub use introspect::{BandInfo, RasterInfo};
pub use media::raster_media_type;
pub use tiff::{Directory, TagValue, TiffFile};

/// Errors raised while reading a raster file.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The file does not start with a TIFF header
    #[error("not a TIFF file")]
    NotTiff,

    /// The TIFF structure is inconsistent or truncated
    #[error("malformed TIFF: {0}")]
    Malformed(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for RasterError {
    fn class(&self) -> ErrorClass {
        ErrorClass::FatalToJob
    }
}
