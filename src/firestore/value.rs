use serde_json::{Map, Value};

use crate::firestore::error::{internal_error, invalid_argument, FirestoreResult};
use crate::firestore::model::DocumentData;

/// A single field change applied by `update_doc` or a batched update.
///
/// Keys of an update map are dotted field paths (`"address.city"`).
#[derive(Clone, Debug, PartialEq)]
pub enum FieldUpdate {
    /// Replaces the field with the given value.
    Set(Value),
    /// Appends each element not already present in the array field.
    ArrayUnion(Vec<Value>),
    /// Removes every instance of each element from the array field.
    ArrayRemove(Vec<Value>),
    /// Removes the field from the document.
    Delete,
}

impl FieldUpdate {
    pub fn set(value: impl Into<Value>) -> Self {
        FieldUpdate::Set(value.into())
    }

    pub fn array_union<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        FieldUpdate::ArrayUnion(values.into_iter().map(Into::into).collect())
    }

    pub fn array_remove<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        FieldUpdate::ArrayRemove(values.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for FieldUpdate {
    fn from(value: Value) -> Self {
        FieldUpdate::Set(value)
    }
}

/// Splits a dotted field path into its segments.
pub fn field_path_segments(path: &str) -> FirestoreResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(invalid_argument(format!("Invalid field path '{path}'")));
    }
    Ok(segments)
}

/// Reads the value at a dotted field path.
pub fn value_at_path<'a>(data: &'a DocumentData, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Applies `update` at `path`, creating intermediate maps as needed.
pub fn apply_field_update(
    data: &mut DocumentData,
    path: &str,
    update: &FieldUpdate,
) -> FirestoreResult<()> {
    let segments = field_path_segments(path)?;
    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| invalid_argument("Field path cannot be empty"))?;

    let mut target = data;
    for segment in parents {
        let entry = target
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        target = entry
            .as_object_mut()
            .ok_or_else(|| internal_error(format!("Field '{segment}' is not a map")))?;
    }

    match update {
        FieldUpdate::Set(value) => {
            target.insert(leaf.to_string(), value.clone());
        }
        FieldUpdate::Delete => {
            target.remove(*leaf);
        }
        FieldUpdate::ArrayUnion(values) => {
            let mut current = existing_array(target.get(*leaf));
            for value in values {
                if !current.contains(value) {
                    current.push(value.clone());
                }
            }
            target.insert(leaf.to_string(), Value::Array(current));
        }
        FieldUpdate::ArrayRemove(values) => {
            let mut current = existing_array(target.get(*leaf));
            current.retain(|item| !values.contains(item));
            target.insert(leaf.to_string(), Value::Array(current));
        }
    }
    Ok(())
}

fn existing_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Deep-merges `incoming` into `target`, the semantics of `set` with merge.
///
/// Nested maps are merged key by key; any other value replaces the existing
/// one.
pub fn merge_into(target: &mut DocumentData, incoming: DocumentData) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_into(existing, nested),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> DocumentData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn set_creates_nested_maps() {
        let mut data = doc(json!({ "name": "sf" }));
        apply_field_update(&mut data, "address.city", &FieldUpdate::set("San Francisco")).unwrap();
        assert_eq!(
            Value::Object(data),
            json!({ "name": "sf", "address": { "city": "San Francisco" } })
        );
    }

    #[test]
    fn array_union_skips_existing_values() {
        let mut data = doc(json!({ "tags": ["a", "b"] }));
        apply_field_update(&mut data, "tags", &FieldUpdate::array_union(["b", "c"])).unwrap();
        assert_eq!(data["tags"], json!(["a", "b", "c"]));
    }

    #[test]
    fn array_remove_drops_every_match() {
        let mut data = doc(json!({ "tags": ["a", "b", "a", "c"] }));
        apply_field_update(&mut data, "tags", &FieldUpdate::array_remove(["a"])).unwrap();
        assert_eq!(data["tags"], json!(["b", "c"]));
    }

    #[test]
    fn delete_removes_field() {
        let mut data = doc(json!({ "a": { "b": 1, "c": 2 } }));
        apply_field_update(&mut data, "a.b", &FieldUpdate::Delete).unwrap();
        assert_eq!(Value::Object(data), json!({ "a": { "c": 2 } }));
    }

    #[test]
    fn rejects_empty_segments() {
        let mut data = DocumentData::new();
        let err = apply_field_update(&mut data, "a..b", &FieldUpdate::Delete).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn merge_is_recursive() {
        let mut data = doc(json!({ "a": { "x": 1, "y": 2 }, "b": 1 }));
        merge_into(&mut data, doc(json!({ "a": { "y": 3 }, "c": true })));
        assert_eq!(
            Value::Object(data),
            json!({ "a": { "x": 1, "y": 3 }, "b": 1, "c": true })
        );
    }

    #[test]
    fn reads_nested_values() {
        let data = doc(json!({ "a": { "b": { "c": 5 } } }));
        assert_eq!(value_at_path(&data, "a.b.c"), Some(&json!(5)));
        assert_eq!(value_at_path(&data, "a.x"), None);
    }
}
