//! Cloud-optimized GeoTIFF structural validation.
//!
//! The checks follow GDAL's `validate_cloud_optimized_geotiff` rules: the
//! main IFD sits near the start of the file, overview IFDs follow it in
//! decreasing resolution, and image blocks are stored in the reverse order
//! (smallest overview first, main image last) so a reader can fetch the
//! header and the overviews it needs with few range requests.
//!
//! [`check_layout`] runs the rules against an already extracted
//! [`RasterLayout`]. [`CogValidator::validate`] extracts the layout from a file
//! and additionally re-opens every overview level.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::tiff::{Directory, TiffFile};
use super::RasterError;
use crate::error::{Classify, ErrorClass};

/// Main IFD must start before this byte offset.
pub const MAX_MAIN_IFD_OFFSET: u64 = 300;

/// Images larger than this in either dimension must be tiled.
pub const TILING_THRESHOLD: u64 = 512;

const NOT_GEOTIFF: &str = "The file is not a GeoTIFF";

/// Outcome of one validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn from_findings(errors: Vec<String>, warnings: Vec<String>, strict: bool) -> Self {
        let is_valid = errors.is_empty() && !(strict && !warnings.is_empty());
        Self {
            is_valid,
            errors,
            warnings,
        }
    }
}

/// Physical layout of one image level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelLayout {
    pub width: u64,
    pub height: u64,
    pub tiled: bool,
    pub ifd_offset: u64,
    /// Offset of the first tile or strip, 0 when absent
    pub block_offset: u64,
}

impl LevelLayout {
    fn exceeds_tiling_threshold(&self) -> bool {
        self.width > TILING_THRESHOLD || self.height > TILING_THRESHOLD
    }
}

impl From<&Directory> for LevelLayout {
    fn from(dir: &Directory) -> Self {
        Self {
            width: dir.width(),
            height: dir.height(),
            tiled: dir.is_tiled(),
            ifd_offset: dir.offset,
            block_offset: dir.first_block_offset(),
        }
    }
}

/// Layout of a raster file: main image, internal overviews, sidecar overviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterLayout {
    pub main: LevelLayout,
    /// Internal overviews, most detailed first
    pub overviews: Vec<LevelLayout>,
    /// A `.ovr` sidecar exists next to the file
    pub external_overviews: bool,
}

impl RasterLayout {
    pub fn from_tiff(tiff: &TiffFile) -> Self {
        Self {
            main: LevelLayout::from(tiff.main_image()),
            overviews: tiff.overviews().into_iter().map(LevelLayout::from).collect(),
            external_overviews: false,
        }
    }

    /// Decimation factor of each overview relative to the main image.
    pub fn decimations(&self) -> Vec<u64> {
        self.overviews
            .iter()
            .map(|ov| {
                if ov.width == 0 {
                    0
                } else {
                    (self.main.width as f64 / ov.width as f64).round() as u64
                }
            })
            .collect()
    }
}

/// Runs the layout rules and builds a report.
pub fn check_layout(layout: &RasterLayout, strict: bool) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let main = &layout.main;
    let overviews = &layout.overviews;

    if layout.external_overviews {
        warnings.push("Overviews found in external .ovr file. They should be internal".to_string());
    }

    if main.exceeds_tiling_threshold() {
        if !main.tiled {
            errors.push("The file is greater than 512xH or 512xW, but is not tiled".to_string());
        }
        if overviews.is_empty() {
            warnings.push(
                "The file is greater than 512xH or 512xW, it is recommended \
                 to include internal overviews"
                    .to_string(),
            );
        }
    }

    if main.ifd_offset > MAX_MAIN_IFD_OFFSET {
        errors.push(format!(
            "The offset of the main IFD should be < {}. It is {} instead",
            MAX_MAIN_IFD_OFFSET, main.ifd_offset
        ));
    }

    let decimations = layout.decimations();
    if decimations.windows(2).any(|w| w[0] >= w[1]) {
        errors.push("Overviews should be sorted".to_string());
    }
    for (ix, dec) in decimations.iter().enumerate() {
        if *dec <= 1 {
            errors.push(format!(
                "Invalid Decimation {} for overview level {}",
                dec, ix
            ));
        }
    }

    let mut previous = main.ifd_offset;
    for (ix, ov) in overviews.iter().enumerate() {
        if ov.ifd_offset < previous {
            if ix == 0 {
                errors.push(format!(
                    "The offset of the IFD for overview of index {} is {}, whereas it should \
                     be greater than the one of the main image, which is at byte {}",
                    ix, ov.ifd_offset, previous
                ));
            } else {
                errors.push(format!(
                    "The offset of the IFD for overview of index {} is {}, whereas it should \
                     be greater than the one of index {}, which is at byte {}",
                    ix,
                    ov.ifd_offset,
                    ix - 1,
                    previous
                ));
            }
        }
        previous = ov.ifd_offset;
    }

    // Index 0 is the main image, index i > 0 is overview i - 1.
    let blocks: Vec<u64> = std::iter::once(main.block_offset)
        .chain(overviews.iter().map(|o| o.block_offset))
        .collect();
    let last = blocks.len() - 1;
    let last_ifd = overviews.last().map_or(main.ifd_offset, |o| o.ifd_offset);

    if blocks[last] != 0 && blocks[last] < last_ifd {
        if overviews.is_empty() {
            errors.push(
                "The offset of the first block of the image should be after its IFD".to_string(),
            );
        } else {
            errors.push(
                "The offset of the first block of the smallest overview should be after its IFD"
                    .to_string(),
            );
        }
    }

    for i in (1..last).rev() {
        if blocks[i] < blocks[i + 1] {
            errors.push(format!(
                "The offset of the first block of overview of index {} should be after \
                 the one of the overview of index {}",
                i - 1,
                i
            ));
        }
    }

    if blocks.len() >= 2 && blocks[0] < blocks[1] {
        errors.push(
            "The offset of the first block of the main resolution image should be after \
             the one of the overview of index 0"
                .to_string(),
        );
    }

    ValidationReport::from_findings(errors, warnings, strict)
}

/// Features a raster backend declares about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub name: String,
    /// Reports the byte offset of every IFD
    pub ifd_offsets: bool,
    /// Reports the offset of the first data block per level
    pub block_offsets: bool,
    /// Opens overview levels individually
    pub overview_levels: bool,
}

impl BackendCapabilities {
    /// Capabilities of the built-in [`TiffFile`] reader.
    pub fn builtin() -> Self {
        Self {
            name: "stacgen-tiff".to_string(),
            ifd_offsets: true,
            block_offsets: true,
            overview_levels: true,
        }
    }
}

/// Errors raised while constructing a validator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CogError {
    /// The raster backend cannot expose internal layout
    #[error("raster backend {backend} lacks {missing} support required for COG validation")]
    ToolingUnsupported {
        backend: String,
        missing: &'static str,
    },
}

impl Classify for CogError {
    fn class(&self) -> ErrorClass {
        ErrorClass::FatalToProcess
    }
}

/// Validates raster files against the cloud-optimized layout rules.
#[derive(Debug, Clone)]
pub struct CogValidator {
    capabilities: BackendCapabilities,
}

impl CogValidator {
    /// Creates a validator, checking that the backend exposes what the
    /// rules need.
    pub fn new(capabilities: BackendCapabilities) -> Result<Self, CogError> {
        let missing = if !capabilities.ifd_offsets {
            Some("IFD offset")
        } else if !capabilities.block_offsets {
            Some("block offset")
        } else if !capabilities.overview_levels {
            Some("overview level")
        } else {
            None
        };

        if let Some(missing) = missing {
            return Err(CogError::ToolingUnsupported {
                backend: capabilities.name,
                missing,
            });
        }

        Ok(Self { capabilities })
    }

    /// Validator backed by the built-in TIFF reader.
    pub fn builtin() -> Self {
        Self {
            capabilities: BackendCapabilities::builtin(),
        }
    }

    pub fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    /// Validates the file at `path`.
    ///
    /// Structural problems are reported in the returned report. Only I/O
    /// failures (missing file, permission denied) are returned as errors.
    pub fn validate(&self, path: &Path, strict: bool) -> Result<ValidationReport, RasterError> {
        let mut layout = match TiffFile::open(path) {
            Ok(tiff) => RasterLayout::from_tiff(&tiff),
            Err(RasterError::NotTiff) => {
                return Ok(ValidationReport::from_findings(
                    vec![NOT_GEOTIFF.to_string()],
                    Vec::new(),
                    strict,
                ));
            }
            Err(RasterError::Malformed(reason)) => {
                return Ok(ValidationReport::from_findings(
                    vec![format!("{}: {}", NOT_GEOTIFF, reason)],
                    Vec::new(),
                    strict,
                ));
            }
            Err(e) => return Err(e),
        };
        layout.external_overviews = sidecar_overview_path(path).exists();

        let report = check_layout(&layout, strict);
        let mut errors = report.errors;

        for ix in 0..layout.overviews.len() {
            let level = TiffFile::open(path)?
                .overviews()
                .get(ix)
                .map(|dir| LevelLayout::from(*dir));
            match level {
                Some(level) if level.exceeds_tiling_threshold() && !level.tiled => {
                    errors.push(format!("Overview of index {} is not tiled", ix));
                }
                Some(_) => {}
                None => errors.push(format!("Overview of index {} could not be opened", ix)),
            }
        }

        let report = ValidationReport::from_findings(errors, report.warnings, strict);
        debug!(
            path = %path.display(),
            is_valid = report.is_valid,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "COG validation finished"
        );
        Ok(report)
    }
}

/// `<path>.ovr`, where GDAL looks for external overviews.
fn sidecar_overview_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".ovr");
    PathBuf::from(name)
}
