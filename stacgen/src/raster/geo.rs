//! Georeferencing from GeoTIFF tags.
//!
//! Only what an item needs: the affine geotransform, the EPSG code and the
//! footprint in the raster's native CRS. No reprojection happens here.

use std::collections::BTreeMap;

use super::tiff::{
    Directory, TagValue, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT,
    TAG_MODEL_TRANSFORMATION,
};

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// GDAL-ordered affine transform from pixel to model coordinates.
///
/// `x = origin_x + col * pixel_width + row * row_rotation`
/// `y = origin_y + col * col_rotation + row * pixel_height`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Reads the transform from ModelTransformation, or from
    /// ModelPixelScale plus ModelTiepoint.
    pub fn from_directory(dir: &Directory) -> Option<Self> {
        let mut transform = if let Some(m) = dir
            .tag(TAG_MODEL_TRANSFORMATION)
            .map(TagValue::to_f64s)
            .filter(|m| m.len() >= 16)
        {
            Self {
                origin_x: m[3],
                pixel_width: m[0],
                row_rotation: m[1],
                origin_y: m[7],
                col_rotation: m[4],
                pixel_height: m[5],
            }
        } else {
            let scale = dir.tag(TAG_MODEL_PIXEL_SCALE).map(TagValue::to_f64s)?;
            let tiepoint = dir.tag(TAG_MODEL_TIEPOINT).map(TagValue::to_f64s)?;
            if scale.len() < 2 || tiepoint.len() < 6 {
                return None;
            }
            let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
            Self {
                origin_x: x - i * scale[0],
                pixel_width: scale[0],
                row_rotation: 0.0,
                origin_y: y + j * scale[1],
                col_rotation: 0.0,
                pixel_height: -scale[1],
            }
        };

        if geo_keys(dir).get(&KEY_RASTER_TYPE) == Some(&RASTER_PIXEL_IS_POINT) {
            transform.origin_x -= 0.5 * transform.pixel_width + 0.5 * transform.row_rotation;
            transform.origin_y -= 0.5 * transform.col_rotation + 0.5 * transform.pixel_height;
        }

        Some(transform)
    }

    /// Model coordinates of a pixel corner.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// `[minx, miny, maxx, maxy]` of a `width` x `height` raster.
    pub fn bounds(&self, width: u64, height: u64) -> [f64; 4] {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(w, h),
            self.apply(0.0, h),
        ];
        let mut bounds = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
        for (x, y) in corners {
            bounds[0] = bounds[0].min(x);
            bounds[1] = bounds[1].min(y);
            bounds[2] = bounds[2].max(x);
            bounds[3] = bounds[3].max(y);
        }
        bounds
    }

    /// Affine coefficients in the order used by the STAC projection
    /// extension (`proj:transform`).
    pub fn to_affine(&self) -> [f64; 6] {
        [
            self.pixel_width,
            self.row_rotation,
            self.origin_x,
            self.col_rotation,
            self.pixel_height,
            self.origin_y,
        ]
    }

    /// Ground sample distance, when pixels are square and unrotated.
    pub fn ground_sample_distance(&self) -> Option<f64> {
        let (w, h) = (self.pixel_width.abs(), self.pixel_height.abs());
        let unrotated = self.row_rotation == 0.0 && self.col_rotation == 0.0;
        (unrotated && w > 0.0 && (w - h).abs() <= w * 1e-9).then_some(w)
    }
}

/// GeoKey directory entries whose values are stored inline.
pub fn geo_keys(dir: &Directory) -> BTreeMap<u16, u16> {
    let Some(raw) = dir.tag(TAG_GEO_KEY_DIRECTORY).map(TagValue::to_u64s) else {
        return BTreeMap::new();
    };
    if raw.len() < 4 {
        return BTreeMap::new();
    }

    let count = raw[3] as usize;
    raw[4..]
        .chunks_exact(4)
        .take(count)
        .filter(|entry| entry[1] == 0 && entry[2] == 1)
        .map(|entry| (entry[0] as u16, entry[3] as u16))
        .collect()
}

/// EPSG code of the raster CRS, if it is a registered code.
pub fn epsg(dir: &Directory) -> Option<u32> {
    let keys = geo_keys(dir);
    [KEY_PROJECTED_TYPE, KEY_GEOGRAPHIC_TYPE]
        .iter()
        .filter_map(|key| keys.get(key))
        .find(|code| **code != 0 && **code != USER_DEFINED)
        .map(|code| *code as u32)
}

/// Whether the CRS is projected rather than geographic.
pub fn is_projected(dir: &Directory) -> bool {
    let keys = geo_keys(dir);
    keys.get(&KEY_MODEL_TYPE) == Some(&MODEL_TYPE_PROJECTED)
        || keys.contains_key(&KEY_PROJECTED_TYPE)
}
