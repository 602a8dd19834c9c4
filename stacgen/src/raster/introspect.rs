//! Item-level metadata read from a GeoTIFF.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::geo::{self, GeoTransform};
use super::tiff::{
    Directory, TagValue, TiffFile, TAG_BITS_PER_SAMPLE, TAG_COPYRIGHT, TAG_DATETIME,
    TAG_GDAL_NODATA, TAG_SAMPLE_FORMAT,
};
use super::RasterError;

/// STAC projection extension schema.
pub const PROJECTION_EXTENSION: &str =
    "https://stac-extensions.github.io/projection/v1.1.0/schema.json";

/// STAC raster extension schema.
pub const RASTER_EXTENSION: &str = "https://stac-extensions.github.io/raster/v1.1.0/schema.json";

/// Format of the TIFF `DateTime` tag.
const TIFF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Per-band description for the `raster:bands` asset field.
#[derive(Debug, Clone, PartialEq)]
pub struct BandInfo {
    pub data_type: &'static str,
    pub nodata: Option<f64>,
}

impl BandInfo {
    fn to_json(&self) -> Value {
        let mut band = Map::new();
        band.insert("data_type".to_string(), json!(self.data_type));
        if let Some(nodata) = self.nodata {
            band.insert("nodata".to_string(), nodata_value(nodata));
        }
        Value::Object(band)
    }
}

/// Metadata extracted from the main image of a GeoTIFF.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub width: u64,
    pub height: u64,
    pub transform: Option<GeoTransform>,
    pub epsg: Option<u32>,
    pub projected: bool,
    pub bands: Vec<BandInfo>,
    pub datetime: Option<DateTime<Utc>>,
    pub copyright: Option<String>,
}

impl RasterInfo {
    /// Reads the file at `path`. The file is closed before this returns.
    pub fn read(path: &Path) -> Result<Self, RasterError> {
        let tiff = TiffFile::open(path)?;
        let info = Self::from_directory(tiff.main_image());
        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            epsg = ?info.epsg,
            "Read raster metadata"
        );
        Ok(info)
    }

    pub fn from_directory(dir: &Directory) -> Self {
        let band_count = dir.samples_per_pixel().max(1);
        let data_type = data_type(dir);
        let nodata = dir
            .tag(TAG_GDAL_NODATA)
            .and_then(TagValue::as_str)
            .and_then(|s| s.trim().parse::<f64>().ok());

        let datetime = dir
            .tag(TAG_DATETIME)
            .and_then(TagValue::as_str)
            .and_then(|s| NaiveDateTime::parse_from_str(s.trim(), TIFF_DATETIME_FORMAT).ok())
            .map(|naive| naive.and_utc());

        let copyright = dir
            .tag(TAG_COPYRIGHT)
            .and_then(TagValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            width: dir.width(),
            height: dir.height(),
            transform: GeoTransform::from_directory(dir),
            epsg: geo::epsg(dir),
            projected: geo::is_projected(dir),
            bands: (0..band_count)
                .map(|_| BandInfo { data_type, nodata })
                .collect(),
            datetime,
            copyright,
        }
    }

    /// Footprint in the raster's native CRS.
    pub fn bbox(&self) -> Option<[f64; 4]> {
        self.transform.map(|t| t.bounds(self.width, self.height))
    }

    /// Pixel size, only reported for projected rasters.
    pub fn gsd(&self) -> Option<f64> {
        if !self.projected {
            return None;
        }
        self.transform.and_then(|t| t.ground_sample_distance())
    }

    /// Item properties contributed by this raster.
    pub fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("proj:epsg".to_string(), json!(self.epsg));
        props.insert("proj:shape".to_string(), json!([self.height, self.width]));
        if let Some(transform) = self.transform {
            props.insert("proj:transform".to_string(), json!(transform.to_affine()));
        }
        if let Some(bbox) = self.bbox() {
            props.insert("proj:bbox".to_string(), json!(bbox));
        }
        if let Some(gsd) = self.gsd() {
            props.insert("gsd".to_string(), json!(gsd));
        }
        props
    }

    /// Extension schemas the properties and asset fields use.
    pub fn extensions(&self) -> Vec<String> {
        vec![
            PROJECTION_EXTENSION.to_string(),
            RASTER_EXTENSION.to_string(),
        ]
    }

    /// Extra fields for this raster's asset.
    pub fn asset_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(
            "raster:bands".to_string(),
            Value::Array(self.bands.iter().map(BandInfo::to_json).collect()),
        );
        fields
    }
}

/// STAC raster data type from BitsPerSample and SampleFormat.
fn data_type(dir: &Directory) -> &'static str {
    let bits = dir
        .tag(TAG_BITS_PER_SAMPLE)
        .and_then(TagValue::first_u64)
        .unwrap_or(8);
    let format = dir
        .tag(TAG_SAMPLE_FORMAT)
        .and_then(TagValue::first_u64)
        .unwrap_or(1);

    match (format, bits) {
        (1, 8) => "uint8",
        (1, 16) => "uint16",
        (1, 32) => "uint32",
        (1, 64) => "uint64",
        (2, 8) => "int8",
        (2, 16) => "int16",
        (2, 32) => "int32",
        (2, 64) => "int64",
        (3, 16) => "float16",
        (3, 32) => "float32",
        (3, 64) => "float64",
        (5, 32) => "cfloat32",
        (5, 64) => "cfloat64",
        _ => "other",
    }
}

/// JSON has no NaN or infinity; the raster extension spells them as strings.
fn nodata_value(value: f64) -> Value {
    if value.is_nan() {
        json!("nan")
    } else if value.is_infinite() {
        json!(if value > 0.0 { "inf" } else { "-inf" })
    } else {
        json!(value)
    }
}
