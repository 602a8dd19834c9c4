//! Extension-based media type lookup.

use std::fmt;

/// Media types known to the classifier.
///
/// The string forms follow the STAC best-practice media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// GeoTIFF (`.tif`, `.tiff`)
    GeoTiff,
    /// GeoTIFF validated as cloud-optimized
    CloudOptimizedGeoTiff,
    /// JSON document
    Json,
    /// GeoJSON document
    GeoJson,
    /// Shapefile geometry (`.shp`)
    Shapefile,
    /// Shapefile index (`.shx`)
    ShapefileIndex,
    /// Shapefile attribute table (`.dbf`)
    ShapefileAttributes,
    /// Shapefile projection (`.prj`)
    ShapefileProjection,
    /// Shapefile code page (`.cpg`)
    ShapefileCodePage,
    /// Plain text, including markdown readmes
    PlainText,
    /// XML document
    Xml,
    /// HTML document
    Html,
    /// PNG image
    Png,
    /// JPEG image
    Jpeg,
    /// Zip archive
    Zip,
    /// Anything else
    Unknown,
}

impl MediaType {
    /// Returns the media type string written into asset records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeoTiff => "image/tiff; application=geotiff",
            Self::CloudOptimizedGeoTiff => "image/tiff; application=geotiff; profile=cloud-optimized",
            Self::Json => "application/json",
            Self::GeoJson => "application/geo+json",
            Self::Shapefile => "application/vnd.shp",
            Self::ShapefileIndex => "application/vnd.shx",
            Self::ShapefileAttributes => "application/vnd.dbf",
            Self::ShapefileProjection => "text/plain; profile=prj",
            Self::ShapefileCodePage => "text/plain; profile=cpg",
            Self::PlainText => "text/plain",
            Self::Xml => "application/xml",
            Self::Html => "text/html",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Zip => "application/zip",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// Looks up a media type from a lower- or upper-case extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "tif" | "tiff" => Self::GeoTiff,
            "json" => Self::Json,
            "geojson" => Self::GeoJson,
            "shp" => Self::Shapefile,
            "shx" => Self::ShapefileIndex,
            "dbf" => Self::ShapefileAttributes,
            "prj" => Self::ShapefileProjection,
            "cpg" => Self::ShapefileCodePage,
            "txt" | "md" | "text" | "log" => Self::PlainText,
            "xml" => Self::Xml,
            "htm" | "html" => Self::Html,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "zip" => Self::Zip,
            _ => Self::Unknown,
        }
    }

    /// Whether this is one of the TIFF media types.
    pub fn is_tiff_family(&self) -> bool {
        matches!(self, Self::GeoTiff | Self::CloudOptimizedGeoTiff)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a file reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// True exactly when the media type is in the TIFF family
    pub is_tiled_raster: bool,
    /// Media type derived from the extension
    pub media_type: MediaType,
}

/// Classifies a file reference (URL or path) by its extension.
pub fn classify(reference: &str) -> Classification {
    let media_type = extension_of(reference)
        .map(MediaType::from_extension)
        .unwrap_or(MediaType::Unknown);

    Classification {
        is_tiled_raster: media_type.is_tiff_family(),
        media_type,
    }
}

/// Removes any query string and fragment from a reference.
pub fn strip_query(reference: &str) -> &str {
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    &reference[..end]
}

/// Returns the last path segment of a reference, without query string.
pub fn filename_of(reference: &str) -> &str {
    let path = strip_query(reference).trim_end_matches(['/', '\\']);
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Returns the extension of the reference's filename, if it has one.
pub fn extension_of(reference: &str) -> Option<&str> {
    let name = filename_of(reference);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}
