//! Catalog item, asset and geometry types.
//!
//! [`CatalogItem`] is the working representation used during assembly. It
//! converts to and from the STAC item JSON document with
//! [`CatalogItem::to_document`] and [`CatalogItem::from_document`]; the merge
//! engine works on that JSON form.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::ItemError;

/// STAC specification version written into every item.
pub const STAC_VERSION: &str = "1.0.0";

/// A STAC asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub roles: BTreeSet<String>,
    /// Extension fields such as `raster:bands` or the preview `rel`
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
}

impl Asset {
    pub fn new(href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            media_type: Some(media_type.into()),
            title: None,
            roles: BTreeSet::new(),
            extra_fields: Map::new(),
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.insert(role.to_string());
        self
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }
}

/// A STAC link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// GeoJSON geometry. Coordinates are kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Value,
}

impl Geometry {
    /// Closed, counter-clockwise polygon covering a 2D or 3D bbox.
    pub fn from_bbox(bbox: &[f64]) -> Option<Self> {
        let (minx, miny, maxx, maxy) = match *bbox {
            [minx, miny, maxx, maxy] => (minx, miny, maxx, maxy),
            [minx, miny, _, maxx, maxy, _] => (minx, miny, maxx, maxy),
            _ => return None,
        };
        Some(Self {
            kind: "Polygon".to_string(),
            coordinates: serde_json::json!([[
                [minx, miny],
                [maxx, miny],
                [maxx, maxy],
                [minx, maxy],
                [minx, miny]
            ]]),
        })
    }

    /// 2D bounding box of every position in the geometry.
    pub fn bbox(&self) -> Option<[f64; 4]> {
        let mut bounds = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
        let mut found = false;
        visit_positions(&self.coordinates, &mut |x, y| {
            found = true;
            bounds[0] = bounds[0].min(x);
            bounds[1] = bounds[1].min(y);
            bounds[2] = bounds[2].max(x);
            bounds[3] = bounds[3].max(y);
        });
        found.then_some(bounds)
    }
}

fn visit_positions(value: &Value, f: &mut impl FnMut(f64, f64)) {
    let Value::Array(items) = value else {
        return;
    };
    match (items.first().and_then(Value::as_f64), items.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => f(x, y),
        _ => items.iter().for_each(|item| visit_positions(item, f)),
    }
}

/// The item under assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub geometry: Option<Geometry>,
    /// 4 or 6 numbers
    pub bbox: Option<Vec<f64>>,
    pub datetime: DateTime<Utc>,
    pub extensions: BTreeSet<String>,
    /// Properties other than `datetime`
    pub properties: Map<String, Value>,
    pub assets: BTreeMap<String, Asset>,
    pub links: Vec<Link>,
    /// Top-level members not modeled above, e.g. `collection`
    pub extra_fields: Map<String, Value>,
}

impl CatalogItem {
    /// An empty item with a fresh id, stamped now.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            geometry: None,
            bbox: None,
            datetime: Utc::now(),
            extensions: BTreeSet::new(),
            properties: Map::new(),
            assets: BTreeMap::new(),
            links: Vec::new(),
            extra_fields: Map::new(),
        }
    }

    /// Serializes to a STAC item document.
    pub fn to_document(&self) -> Value {
        let mut properties = self.properties.clone();
        properties.insert(
            "datetime".to_string(),
            Value::String(self.datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );

        let doc = ItemDocument {
            kind: "Feature".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: self.extensions.iter().cloned().collect(),
            id: self.id.clone(),
            geometry: self.geometry.clone(),
            bbox: self.bbox.clone(),
            properties,
            links: self.links.clone(),
            assets: self.assets.clone(),
            extra_fields: self.extra_fields.clone(),
        };

        // Every field is a string, number, map or sequence with string keys.
        serde_json::to_value(doc).unwrap_or(Value::Null)
    }

    /// Parses a STAC item document.
    pub fn from_document(value: Value) -> Result<Self, ItemError> {
        let doc: ItemDocument =
            serde_json::from_value(value).map_err(|e| ItemError::InvalidDocument(e.to_string()))?;

        let mut properties = doc.properties;
        let datetime = match properties.remove("datetime") {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ItemError::InvalidDocument(format!("datetime '{}': {}", s, e)))?,
            Some(other) => {
                return Err(ItemError::InvalidDocument(format!(
                    "datetime must be an RFC 3339 string, got {}",
                    other
                )));
            }
            None => return Err(ItemError::InvalidDocument("missing datetime".to_string())),
        };

        if let Some(bbox) = &doc.bbox {
            if bbox.len() != 4 && bbox.len() != 6 {
                return Err(ItemError::InvalidDocument(format!(
                    "bbox must have 4 or 6 numbers, got {}",
                    bbox.len()
                )));
            }
        }

        Ok(Self {
            id: doc.id,
            geometry: doc.geometry,
            bbox: doc.bbox,
            datetime,
            extensions: doc.stac_extensions.into_iter().collect(),
            properties,
            assets: doc.assets,
            links: doc.links,
            extra_fields: doc.extra_fields,
        })
    }

    /// Derives whichever of bbox and geometry is missing from the other.
    pub fn reconcile_footprint(&mut self) {
        if self.geometry.is_none() {
            if let Some(bbox) = &self.bbox {
                self.geometry = Geometry::from_bbox(bbox);
            }
        }
        if self.bbox.is_none() {
            if let Some(geometry) = &self.geometry {
                self.bbox = geometry.bbox().map(|b| b.to_vec());
            }
        }
        if self.bbox.is_none() || self.geometry.is_none() {
            self.bbox = None;
            self.geometry = None;
        }
    }
}

impl Default for CatalogItem {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire form of a STAC item.
#[derive(Debug, Serialize, Deserialize)]
struct ItemDocument {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "default_stac_version")]
    stac_version: String,
    #[serde(default)]
    stac_extensions: Vec<String>,
    id: String,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bbox: Option<Vec<f64>>,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    assets: BTreeMap<String, Asset>,
    #[serde(flatten)]
    extra_fields: Map<String, Value>,
}

fn default_stac_version() -> String {
    STAC_VERSION.to_string()
}
