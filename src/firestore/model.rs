use std::fmt::{Display, Formatter};

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::firestore::error::{invalid_argument, FirestoreResult};

/// Field-to-value mapping stored in a document.
pub type DocumentData = Map<String, Value>;

/// Name of the field that carries the document id once merged into the data.
pub const ID_FIELD: &str = "id";

const AUTO_ID_LENGTH: usize = 20;

/// Document fields tagged with the store-assigned identifier.
///
/// Serializes flat, i.e. `{"id": "...", ...fields}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentWithId {
    pub id: String,
    #[serde(flatten)]
    pub data: DocumentData,
}

impl DocumentWithId {
    pub fn new(id: impl Into<String>, data: DocumentData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Splits a flat map carrying an `id` field into id and payload.
    ///
    /// Returns `None` when the map has no string `id`.
    pub fn from_flat(mut data: DocumentData) -> Option<Self> {
        match data.remove(ID_FIELD) {
            Some(Value::String(id)) => Some(Self { id, data }),
            _ => None,
        }
    }

    /// Returns the fields with the id merged in under [`ID_FIELD`].
    pub fn into_flat(self) -> DocumentData {
        let mut data = self.data;
        data.insert(ID_FIELD.to_string(), Value::String(self.id));
        data
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// Fully qualified location of a document: collection path plus id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    collection: String,
    id: String,
}

impl DocumentKey {
    pub fn new(collection: &str, id: &str) -> FirestoreResult<Self> {
        let collection = validate_collection_path(collection)?;
        validate_document_id(id)?;
        Ok(Self {
            collection,
            id: id.to_string(),
        })
    }

    /// Parses `collection/.../id` into a key.
    pub fn from_path(path: &str) -> FirestoreResult<Self> {
        let (collection, id) = path.trim_matches('/').rsplit_once('/').ok_or_else(|| {
            invalid_argument("Document keys must point to a document (even number of segments)")
        })?;
        Self::new(collection, id)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl Display for DocumentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Normalises and validates a collection path such as `users` or `users/u1/posts`.
pub fn validate_collection_path(path: &str) -> FirestoreResult<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(invalid_argument("Collection path cannot be empty"));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(invalid_argument(format!(
            "Found empty segment in collection path '{path}'"
        )));
    }
    if segments.len() % 2 == 0 {
        return Err(invalid_argument(format!(
            "Collection references must point to a collection (odd number of segments), got '{path}'"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_document_id(id: &str) -> FirestoreResult<()> {
    if id.is_empty() {
        return Err(invalid_argument("Document ID cannot be empty."));
    }
    if id.contains('/') {
        return Err(invalid_argument("Document ID cannot contain '/'."));
    }
    Ok(())
}

/// Generates a random 20 character alphanumeric document id.
pub fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(AUTO_ID_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_with_id_serializes_flat() {
        let doc = DocumentWithId::new(
            "sf",
            json!({ "name": "San Francisco" }).as_object().cloned().unwrap(),
        );
        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded, json!({ "id": "sf", "name": "San Francisco" }));

        let decoded: DocumentWithId = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn from_flat_strips_id() {
        let flat = json!({ "id": "la", "state": "CA" }).as_object().cloned().unwrap();
        let doc = DocumentWithId::from_flat(flat).unwrap();
        assert_eq!(doc.id, "la");
        assert!(doc.get(ID_FIELD).is_none());
        assert_eq!(doc.get("state"), Some(&json!("CA")));
    }

    #[test]
    fn key_parses_nested_paths() {
        let key = DocumentKey::from_path("users/alovelace/repos/engine").unwrap();
        assert_eq!(key.collection(), "users/alovelace/repos");
        assert_eq!(key.id(), "engine");
        assert_eq!(key.to_string(), "users/alovelace/repos/engine");
    }

    #[test]
    fn rejects_invalid_paths() {
        let err = validate_collection_path("users/alovelace").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
        assert!(validate_collection_path("").is_err());
        assert!(validate_collection_path("a//b/c").is_err());
        assert!(DocumentKey::new("cities", "").is_err());
        assert!(DocumentKey::new("cities", "a/b").is_err());
    }

    #[test]
    fn auto_ids_are_alphanumeric() {
        let id = generate_auto_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_auto_id());
    }
}
