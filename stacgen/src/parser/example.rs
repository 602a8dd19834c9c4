//! Reference parser: copies the metadata `ID` into the item id.

use serde_json::Value;

use super::types::{empty_fragment, ItemFragment, MetadataParser, ParseInput, ParserError};

/// Metadata key holding the item id.
const ID_KEY: &str = "ID";

/// Minimal parser, a template for provider parsers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExampleParser;

impl MetadataParser for ExampleParser {
    fn name(&self) -> &str {
        "example"
    }

    fn parse(&self, input: &ParseInput<'_>) -> Result<ItemFragment, ParserError> {
        let id = input
            .metadata
            .get(ID_KEY)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ParserError::MissingField(ID_KEY.to_string()))?;

        let mut fragment = empty_fragment(&[]);
        let id = match id {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        };
        fragment.insert("id".to_string(), id);
        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn parse(metadata: Value) -> Result<ItemFragment, ParserError> {
        let metadata: Map<String, Value> = serde_json::from_value(metadata).unwrap();
        ExampleParser.parse(&ParseInput {
            metadata: &metadata,
            files: &[],
            sidecar: None,
        })
    }

    #[test]
    fn test_id_is_copied() {
        let fragment = parse(json!({"ID": "scene-42", "other": 1})).unwrap();
        assert_eq!(fragment["id"], "scene-42");
        assert_eq!(fragment["type"], "Feature");
        assert_eq!(fragment["stac_extensions"], json!([]));
        assert_eq!(fragment["properties"], json!({}));
    }

    #[test]
    fn test_numeric_id_becomes_string() {
        let fragment = parse(json!({"ID": 42})).unwrap();
        assert_eq!(fragment["id"], "42");
    }

    #[test]
    fn test_missing_id() {
        assert_eq!(
            parse(json!({"id": "lowercase"})).unwrap_err(),
            ParserError::MissingField("ID".to_string())
        );
    }
}
