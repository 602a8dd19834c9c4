//! Planet scene parser.
//!
//! Reads the `properties` object of the `*_metadata.json` file delivered with
//! each scene.

use serde_json::{json, Value};
use tracing::{error, info};

use super::types::{
    empty_fragment, insert_property, AssetKeyMapper, ItemFragment, MetadataParser, ParseInput,
    ParserError, SidecarSource, VIEW_EXTENSION,
};
use crate::asset::{filename_of, PREVIEW_ASSET_KEY};

/// Suffix of the scene metadata document.
pub const SCENE_METADATA_SUFFIX: &str = "_metadata.json";

/// Scene property, STAC property. All values are numeric.
const FIELDS: &[(&str, &str)] = &[
    ("view_angle", "view:off_nadir"),
    ("cloud_cover", "eo:cloud_cover"),
    ("gsd", "gsd"),
    ("satellite_azimuth", "view:azimuth"),
    ("sun_azimuth", "view:sun_azimuth"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct PlanetParser;

impl MetadataParser for PlanetParser {
    fn name(&self) -> &str {
        "planet"
    }

    fn parse(&self, input: &ParseInput<'_>) -> Result<ItemFragment, ParserError> {
        let mut fragment = empty_fragment(&[VIEW_EXTENSION]);

        let Some(bytes) = input.sidecar else {
            error!("Metadata file not found in the provided payload");
            return Ok(fragment);
        };

        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| ParserError::InvalidSidecar {
                file: SCENE_METADATA_SUFFIX.to_string(),
                reason: e.to_string(),
            })?;
        let Some(properties) = document.get("properties").and_then(Value::as_object) else {
            return Err(ParserError::MissingField("properties".to_string()));
        };

        for (key, property) in FIELDS {
            match properties.get(*key).and_then(as_number) {
                Some(v) => insert_property(&mut fragment, property, json!(v)),
                None => error!(key = key, "Key not found within metadata"),
            }
        }

        info!(parser = self.name(), "Parsed scene metadata");
        Ok(fragment)
    }

    fn as_asset_key_mapper(&self) -> Option<&dyn AssetKeyMapper> {
        Some(self)
    }

    fn as_sidecar_source(&self) -> Option<&dyn SidecarSource> {
        Some(self)
    }
}

/// Numbers, or strings holding numbers.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl AssetKeyMapper for PlanetParser {
    fn asset_key(&self, filename: &str) -> String {
        let lower = filename.to_ascii_lowercase();
        if lower.contains("thumb") {
            PREVIEW_ASSET_KEY.to_string()
        } else if lower.ends_with(SCENE_METADATA_SUFFIX) {
            "metadata".to_string()
        } else {
            filename.to_string()
        }
    }
}

impl SidecarSource for PlanetParser {
    fn sidecar<'a>(&self, files: &'a [String]) -> Option<&'a str> {
        files
            .iter()
            .map(String::as_str)
            .find(|f| filename_of(f).contains(SCENE_METADATA_SUFFIX))
    }
}
