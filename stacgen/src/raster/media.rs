//! Media type selection for raster assets.

use std::path::Path;

use tracing::{info, warn};

use super::cog::CogValidator;
use crate::asset::MediaType;
use crate::config::RasterSettings;

/// Media type for a GeoTIFF asset.
///
/// Without a validator (COG checking disabled) every GeoTIFF is reported as a
/// plain GeoTIFF. With one, the cloud-optimized profile is reported only when
/// the validator accepts the file.
pub fn raster_media_type(
    path: &Path,
    validator: Option<&CogValidator>,
    settings: &RasterSettings,
) -> MediaType {
    let Some(validator) = validator.filter(|_| settings.check_cog) else {
        return MediaType::GeoTiff;
    };

    let report = match validator.validate(path, settings.strict_cog) {
        Ok(report) => report,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "COG check could not read raster");
            return MediaType::GeoTiff;
        }
    };

    if settings.log_cog_info {
        info!(path = %path.display(), is_cog = report.is_valid, "COG check");
        if !report.errors.is_empty() {
            info!(path = %path.display(), errors = ?report.errors, "COG errors");
        }
        if !report.warnings.is_empty() {
            info!(path = %path.display(), warnings = ?report.warnings, "COG warnings");
        }
    }

    if report.is_valid {
        MediaType::CloudOptimizedGeoTiff
    } else {
        MediaType::GeoTiff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::fixture::TiffFixture;
    use tempfile::TempDir;

    fn settings(check_cog: bool) -> RasterSettings {
        RasterSettings {
            check_cog,
            log_cog_info: true,
            strict_cog: false,
        }
    }

    #[test]
    fn test_disabled_check_is_plain_geotiff() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.tif");
        TiffFixture::cog(1024, 1024, &[2]).write_to(&path).unwrap();

        let validator = CogValidator::builtin();
        assert_eq!(
            raster_media_type(&path, Some(&validator), &settings(false)),
            MediaType::GeoTiff
        );
    }

    #[test]
    fn test_valid_cog_is_upgraded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.tif");
        TiffFixture::cog(1024, 1024, &[2]).write_to(&path).unwrap();

        let validator = CogValidator::builtin();
        assert_eq!(
            raster_media_type(&path, Some(&validator), &settings(true)),
            MediaType::CloudOptimizedGeoTiff
        );
    }

    #[test]
    fn test_invalid_cog_is_not_upgraded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.tif");
        let mut fixture = TiffFixture::cog(1024, 1024, &[2]);
        fixture.blocks_main_first = true;
        fixture.write_to(&path).unwrap();

        let validator = CogValidator::builtin();
        assert_eq!(
            raster_media_type(&path, Some(&validator), &settings(true)),
            MediaType::GeoTiff
        );
    }

    #[test]
    fn test_unreadable_file_is_plain_geotiff() {
        let dir = TempDir::new().unwrap();
        let validator = CogValidator::builtin();
        assert_eq!(
            raster_media_type(&dir.path().join("gone.tif"), Some(&validator), &settings(true)),
            MediaType::GeoTiff
        );
    }
}
