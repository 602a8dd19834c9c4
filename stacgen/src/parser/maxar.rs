//! Maxar delivery parser.
//!
//! Reads the `product` element of `DeliveryMetadata.xml` and maps acquisition
//! and illumination fields to `eo` and `view` properties.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use serde_json::Value;
use tracing::{error, info, warn};

use super::types::{
    empty_fragment, insert_property, AssetKeyMapper, ItemFragment, MetadataParser, ParseInput,
    ParserError, SidecarSource, VIEW_EXTENSION,
};
use crate::asset::{filename_of, PREVIEW_ASSET_KEY};

/// Namespace of the delivery metadata schema.
pub const DELIVERY_NAMESPACE: &str = "http://xsd.digitalglobe.com/xsd/dm";

/// Name of the delivery metadata document.
pub const DELIVERY_METADATA_FILE: &str = "DeliveryMetadata.xml";

/// Suffix of the browse image shipped with each delivery.
const BROWSE_SUFFIX: &str = "browse.jpg";

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Float,
    Text,
}

/// `product` child element, STAC property, value kind.
const FIELDS: &[(&str, &str, FieldKind)] = &[
    ("cloudCover", "eo:cloud_cover", FieldKind::Float),
    ("earliestAcquisitionTime", "datetime", FieldKind::Text),
    ("sunElevation", "view:sun_elevation", FieldKind::Float),
    ("sunAzimuth", "view:sun_azimuth", FieldKind::Float),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct MaxarParser;

impl MetadataParser for MaxarParser {
    fn name(&self) -> &str {
        "maxar"
    }

    fn parse(&self, input: &ParseInput<'_>) -> Result<ItemFragment, ParserError> {
        let mut fragment = empty_fragment(&[VIEW_EXTENSION]);

        let Some(bytes) = input.sidecar else {
            error!("Metadata file not found in the provided payload");
            return Ok(fragment);
        };

        let invalid = |reason: String| ParserError::InvalidSidecar {
            file: DELIVERY_METADATA_FILE.to_string(),
            reason,
        };
        let text = std::str::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
        let Some(product) = read_product(text).map_err(invalid)? else {
            error!("Product element not found");
            return Ok(fragment);
        };

        for (element, property, kind) in FIELDS {
            let Some(text) = product.get(*element).map(String::as_str) else {
                error!(element = element, "Element not found within product");
                continue;
            };

            let value = match kind {
                FieldKind::Text => Value::String(text.to_string()),
                FieldKind::Float => match text.parse::<f64>() {
                    Ok(v) => serde_json::json!(v),
                    Err(_) => {
                        warn!(element = element, value = text, "Element is not a number");
                        continue;
                    }
                },
            };
            insert_property(&mut fragment, property, value);
        }

        info!(parser = self.name(), "Parsed delivery metadata");
        Ok(fragment)
    }

    fn as_asset_key_mapper(&self) -> Option<&dyn AssetKeyMapper> {
        Some(self)
    }

    fn as_sidecar_source(&self) -> Option<&dyn SidecarSource> {
        Some(self)
    }
}

/// Text of each field element under the root's first `product` child.
///
/// Only elements in [`DELIVERY_NAMESPACE`] count. Returns `Ok(None)` when
/// there is no such `product` element.
fn read_product(xml: &str) -> Result<Option<BTreeMap<String, String>>, String> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Local name of each open element, `None` outside the namespace
    let mut open: Vec<Option<String>> = Vec::new();
    let mut product: Option<BTreeMap<String, String>> = None;
    let mut in_product = false;

    loop {
        let (ns, event) = reader.read_resolved_event().map_err(|e| e.to_string())?;
        match event {
            Event::Start(start) => {
                let name = delivery_name(&ns, start.local_name().as_ref());
                if open.len() == 1 && product.is_none() && name.as_deref() == Some("product") {
                    product = Some(BTreeMap::new());
                    in_product = true;
                }
                open.push(name);
            }
            Event::Empty(empty) => {
                let name = delivery_name(&ns, empty.local_name().as_ref());
                if open.len() == 1 && product.is_none() && name.as_deref() == Some("product") {
                    product = Some(BTreeMap::new());
                }
            }
            Event::Text(text) => {
                if let (true, 3, Some(fields), Some(Some(field))) =
                    (in_product, open.len(), product.as_mut(), open.last())
                {
                    let value = text.unescape().map_err(|e| e.to_string())?;
                    fields
                        .entry(field.clone())
                        .or_insert_with(|| value.trim().to_string());
                }
            }
            Event::End(_) => {
                open.pop();
                if open.len() == 1 {
                    in_product = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !open.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    Ok(product)
}

fn delivery_name(ns: &ResolveResult<'_>, local: &[u8]) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) if *uri == DELIVERY_NAMESPACE.as_bytes() => {
            Some(String::from_utf8_lossy(local).into_owned())
        }
        _ => None,
    }
}

impl AssetKeyMapper for MaxarParser {
    fn asset_key(&self, filename: &str) -> String {
        if filename.to_ascii_lowercase().ends_with(BROWSE_SUFFIX) {
            PREVIEW_ASSET_KEY.to_string()
        } else {
            filename.to_string()
        }
    }
}

impl SidecarSource for MaxarParser {
    fn sidecar<'a>(&self, files: &'a [String]) -> Option<&'a str> {
        files
            .iter()
            .map(String::as_str)
            .find(|f| filename_of(f).contains(DELIVERY_METADATA_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    const DELIVERY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ns0:DeliveryMetadata xmlns:ns0="http://xsd.digitalglobe.com/xsd/dm">
  <ns0:product>
    <ns0:cloudCover>0.12</ns0:cloudCover>
    <ns0:earliestAcquisitionTime>2020-07-13T16:47:58.547500Z</ns0:earliestAcquisitionTime>
    <ns0:sunElevation>61.3</ns0:sunElevation>
    <ns0:sunAzimuth>140.9</ns0:sunAzimuth>
  </ns0:product>
</ns0:DeliveryMetadata>"#;

    fn parse(sidecar: Option<&[u8]>) -> Result<ItemFragment, ParserError> {
        MaxarParser.parse(&ParseInput {
            metadata: &Map::new(),
            files: &[],
            sidecar,
        })
    }

    #[test]
    fn test_product_fields_are_mapped() {
        let fragment = parse(Some(DELIVERY.as_bytes())).unwrap();

        assert_eq!(fragment["stac_extensions"], json!([VIEW_EXTENSION]));
        let props = &fragment["properties"];
        assert_eq!(props["eo:cloud_cover"], json!(0.12));
        assert_eq!(props["datetime"], "2020-07-13T16:47:58.547500Z");
        assert_eq!(props["view:sun_elevation"], json!(61.3));
        assert_eq!(props["view:sun_azimuth"], json!(140.9));
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let xml = r#"<DeliveryMetadata xmlns="http://xsd.digitalglobe.com/xsd/dm">
            <product><cloudCover>5</cloudCover><sunAzimuth>north</sunAzimuth></product>
        </DeliveryMetadata>"#;

        let fragment = parse(Some(xml.as_bytes())).unwrap();
        assert_eq!(fragment["properties"], json!({"eo:cloud_cover": 5.0}));
    }

    #[test]
    fn test_missing_sidecar_yields_empty_fragment() {
        let fragment = parse(None).unwrap();
        assert_eq!(fragment["properties"], json!({}));
        assert_eq!(fragment["stac_extensions"], json!([VIEW_EXTENSION]));
    }

    #[test]
    fn test_wrong_namespace_has_no_product() {
        let xml = "<DeliveryMetadata><product><cloudCover>5</cloudCover></product></DeliveryMetadata>";
        let fragment = parse(Some(xml.as_bytes())).unwrap();
        assert_eq!(fragment["properties"], json!({}));
    }

    #[test]
    fn test_only_first_text_of_direct_children_counts() {
        let xml = r#"<m:DeliveryMetadata xmlns:m="http://xsd.digitalglobe.com/xsd/dm">
            <m:product>
              <m:band><m:cloudCover>0.9</m:cloudCover></m:band>
              <m:cloudCover> 0.3 </m:cloudCover>
              <m:cloudCover>0.4</m:cloudCover>
            </m:product>
            <m:product><m:sunAzimuth>10</m:sunAzimuth></m:product>
        </m:DeliveryMetadata>"#;

        let fragment = parse(Some(xml.as_bytes())).unwrap();
        assert_eq!(fragment["properties"], json!({"eo:cloud_cover": 0.3}));
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse(Some(b"<DeliveryMetadata>")).unwrap_err();
        assert!(matches!(err, ParserError::InvalidSidecar { .. }));
    }

    #[test]
    fn test_sidecar_and_keys() {
        let files = vec![
            "https://x/0001/DeliveryMetadata.xml?sig=1".to_string(),
            "https://x/0001/scene.tif".to_string(),
        ];
        assert_eq!(MaxarParser.sidecar(&files), Some(files[0].as_str()));
        assert_eq!(MaxarParser.asset_key("20JUL13-BROWSE.JPG"), "rendered_preview");
        assert_eq!(MaxarParser.asset_key("scene.tif"), "scene.tif");
    }
}
