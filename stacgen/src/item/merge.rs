//! Recursive structural merge of JSON documents.
//!
//! For every key of the overlay: when both sides hold a map the two maps are
//! merged recursively, otherwise the overlay value replaces the base value.
//! Keys only present in the base are kept. Arrays are replaced, not
//! concatenated.

use serde_json::{Map, Value};

/// Merges `overlay` over `base`, overlay winning on conflicts.
///
/// ```
/// use serde_json::json;
/// use stacgen::item::merge;
///
/// let base = json!({"properties": {"gsd": 10.0, "license": "proprietary"}});
/// let overlay = json!({"properties": {"gsd": 0.5}, "id": "scene-1"});
/// assert_eq!(
///     merge(&base, &overlay),
///     json!({"properties": {"gsd": 0.5, "license": "proprietary"}, "id": "scene-1"})
/// );
/// ```
pub fn merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => Value::Object(merge_maps(b, o)),
        _ => overlay.clone(),
    }
}

/// Map form of [`merge`].
pub fn merge_maps(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let next = match (merged.get(key), value) {
            (Some(Value::Object(b)), Value::Object(o)) => Value::Object(merge_maps(b, o)),
            _ => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}
