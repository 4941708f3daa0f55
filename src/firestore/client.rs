use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::memory::InMemoryDocumentStore;
use crate::firestore::model::{
    validate_collection_path, DocumentData, DocumentKey, DocumentWithId, ID_FIELD,
};
use crate::firestore::query::{document_id, where_in, QueryConstraint};
use crate::firestore::store::{DocumentStore, WriteOperation};
use crate::firestore::value::FieldUpdate;
use crate::firestore::write_batch::WriteBatch;
use crate::util::{chunk, DEFAULT_CHUNK_SIZE};

/// Convenience client over an injected [`DocumentStore`].
///
/// Every helper forwards to the store and reshapes the result: ids are merged
/// into returned documents, bulk reads are chunked and bulk writes are folded
/// into a single atomic batch.
#[derive(Clone)]
pub struct Firestore {
    store: Arc<dyn DocumentStore>,
}

impl Firestore {
    /// Creates a client backed by the supplied store implementation.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Returns a client that stores documents in memory only.
    pub fn with_in_memory() -> Self {
        Self::new(Arc::new(InMemoryDocumentStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Produces a new document id for `collection` without writing.
    pub fn generate_id(&self, collection: &str) -> String {
        self.store.generate_id(collection)
    }

    /// Returns the validated key of `collection/id`.
    pub fn doc_ref(&self, collection: &str, id: &str) -> FirestoreResult<DocumentKey> {
        DocumentKey::new(collection, id)
    }

    /// Starts an empty write batch against this client's store.
    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new(Arc::clone(&self.store))
    }

    /// Fetches `collection/id`, returning `None` when it does not exist.
    pub async fn get_doc(&self, collection: &str, id: &str) -> FirestoreResult<Option<DocumentWithId>> {
        let key = DocumentKey::new(collection, id)?;
        let snapshot = self.store.get_document(&key).await?;
        Ok(snapshot.into_document())
    }

    /// Runs a single-constraint query over `collection`.
    pub async fn get_docs(
        &self,
        collection: &str,
        constraint: QueryConstraint,
    ) -> FirestoreResult<Vec<DocumentWithId>> {
        self.query_docs(collection, &[constraint]).await
    }

    /// Runs a query over `collection` with every constraint ANDed together.
    pub async fn query_docs(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> FirestoreResult<Vec<DocumentWithId>> {
        let collection = validate_collection_path(collection)?;
        let snapshots = self.store.run_query(&collection, constraints).await?;
        Ok(snapshots
            .into_iter()
            .filter_map(|snapshot| snapshot.into_document())
            .collect())
    }

    /// Stores `data` under a freshly generated id and returns that id.
    pub async fn add_doc(&self, collection: &str, data: DocumentData) -> FirestoreResult<String> {
        let collection = validate_collection_path(collection)?;
        let id = self.store.generate_id(&collection);
        self.write_one(WriteOperation::Set {
            key: DocumentKey::new(&collection, &id)?,
            data,
            merge: false,
        })
        .await?;
        Ok(id)
    }

    /// Writes `data` to `collection/id`.
    ///
    /// With `merge`, nested maps are merged into the existing document instead
    /// of replacing it.
    pub async fn set_doc(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
        merge: bool,
    ) -> FirestoreResult<()> {
        let key = DocumentKey::new(collection, id)?;
        self.write_one(WriteOperation::Set { key, data, merge }).await
    }

    /// Applies a partial update to an existing document.
    ///
    /// # Errors
    /// Returns `firestore/invalid-argument` if `fields` is empty and
    /// `firestore/not-found` if the document does not exist.
    pub async fn update_doc(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldUpdate>,
    ) -> FirestoreResult<()> {
        if fields.is_empty() {
            return Err(invalid_argument("Function update_doc() requires at least one field"));
        }
        let key = DocumentKey::new(collection, id)?;
        self.write_one(WriteOperation::Update { key, fields }).await
    }

    /// Deletes `collection/id`. Succeeds even if the document does not exist.
    pub async fn delete_doc(&self, collection: &str, id: &str) -> FirestoreResult<()> {
        let key = DocumentKey::new(collection, id)?;
        self.write_one(WriteOperation::Delete { key }).await
    }

    /// Fetches every document whose id is in `ids`.
    ///
    /// The ids are split into groups of `chunk_size` (default
    /// [`DEFAULT_CHUNK_SIZE`]) and one `in` query is issued per group, in
    /// group order. Results keep the store's order within a group, but the
    /// overall order is not guaranteed to follow `ids`. Unknown ids are
    /// skipped, and a `chunk_size` of zero fetches nothing.
    pub async fn fetch_by_ids<S>(
        &self,
        collection: &str,
        ids: &[S],
        chunk_size: Option<usize>,
    ) -> FirestoreResult<Vec<DocumentWithId>>
    where
        S: AsRef<str>,
    {
        let collection = validate_collection_path(collection)?;
        let ids: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
        let groups = chunk(&ids, chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE));
        log::debug!(
            "fetching {} document(s) from {collection} in {} chunk(s)",
            ids.len(),
            groups.len()
        );

        let mut documents = Vec::with_capacity(ids.len());
        for group in groups {
            let snapshots = self
                .store
                .run_query(&collection, &[where_in(document_id(), group)])
                .await?;
            documents.extend(snapshots.into_iter().filter_map(|snapshot| snapshot.into_document()));
        }
        Ok(documents)
    }

    /// Adds every document in one atomic batch, each under a generated id.
    ///
    /// An `id` field in the input is replaced by the generated one and never
    /// stored. Returns the documents tagged with their new ids, in input order.
    pub async fn add_all(
        &self,
        collection: &str,
        documents: Vec<DocumentData>,
    ) -> FirestoreResult<Vec<DocumentWithId>> {
        let collection = validate_collection_path(collection)?;
        let mut batch = self.batch();
        let mut added = Vec::with_capacity(documents.len());
        for mut data in documents {
            data.remove(ID_FIELD);
            let id = self.store.generate_id(&collection);
            batch.set(&collection, &id, data.clone())?;
            added.push(DocumentWithId::new(id, data));
        }
        batch.commit().await?;
        Ok(added)
    }

    /// Overwrites every document in one atomic batch, targeting each
    /// document's own id. An `id` field inside the data is not stored.
    pub async fn set_all(&self, collection: &str, documents: Vec<DocumentWithId>) -> FirestoreResult<()> {
        let collection = validate_collection_path(collection)?;
        let mut batch = self.batch();
        for DocumentWithId { id, mut data } in documents {
            data.remove(ID_FIELD);
            batch.set(&collection, &id, data)?;
        }
        batch.commit().await
    }

    /// Deletes every listed document in one atomic batch.
    ///
    /// An empty list still commits an (empty) batch.
    pub async fn delete_all<S>(&self, collection: &str, ids: &[S]) -> FirestoreResult<()>
    where
        S: AsRef<str>,
    {
        let collection = validate_collection_path(collection)?;
        let mut batch = self.batch();
        for id in ids {
            batch.delete(&collection, id.as_ref())?;
        }
        batch.commit().await
    }

    async fn write_one(&self, write: WriteOperation) -> FirestoreResult<()> {
        self.store.commit(vec![write]).await
    }
}

impl fmt::Debug for Firestore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Firestore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::error::unavailable;
    use crate::firestore::query::{where_contains, where_equals};
    use serde_json::{json, Value};

    fn doc(value: Value) -> DocumentData {
        value.as_object().cloned().unwrap()
    }

    fn client() -> (Firestore, InMemoryDocumentStore) {
        let store = InMemoryDocumentStore::new();
        (Firestore::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn add_then_get_attaches_id() {
        let (client, _) = client();
        let id = client
            .add_doc("cities", doc(json!({ "name": "Tokyo" })))
            .await
            .unwrap();
        let fetched = client.get_doc("cities", &id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.get("name"), Some(&json!("Tokyo")));
        assert!(client.get_doc("cities", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_applies_sentinels() {
        let (client, _) = client();
        client
            .set_doc("rooms", "eros", doc(json!({ "members": ["ann"], "topic": "x" })), false)
            .await
            .unwrap();
        client
            .update_doc(
                "rooms",
                "eros",
                BTreeMap::from([
                    ("members".to_string(), FieldUpdate::array_union(["bob"])),
                    ("topic".to_string(), FieldUpdate::Delete),
                ]),
            )
            .await
            .unwrap();
        let room = client.get_doc("rooms", "eros").await.unwrap().unwrap();
        assert_eq!(room.into_flat(), doc(json!({ "id": "eros", "members": ["ann", "bob"] })));
    }

    #[tokio::test]
    async fn update_requires_fields_and_existing_document() {
        let (client, _) = client();
        let err = client.update_doc("rooms", "eros", BTreeMap::new()).await.unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");

        let err = client
            .update_doc(
                "rooms",
                "eros",
                BTreeMap::from([("topic".to_string(), FieldUpdate::set("x"))]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/not-found");
    }

    #[tokio::test]
    async fn get_docs_filters_by_constraint() {
        let (client, _) = client();
        client
            .set_all(
                "cities",
                vec![
                    DocumentWithId::new("sf", doc(json!({ "state": "CA", "tags": ["tech"] }))),
                    DocumentWithId::new("nyc", doc(json!({ "state": "NY", "tags": ["finance"] }))),
                ],
            )
            .await
            .unwrap();

        let ca = client.get_docs("cities", where_equals("state", "CA")).await.unwrap();
        assert_eq!(ca.len(), 1);
        assert_eq!(ca[0].id, "sf");

        let finance = client
            .get_docs("cities", where_contains("tags", "finance"))
            .await
            .unwrap();
        assert_eq!(finance[0].id, "nyc");
    }

    #[tokio::test]
    async fn fetch_by_ids_with_zero_chunk_size_is_empty() {
        let (client, _) = client();
        client.add_doc("cities", DocumentData::new()).await.unwrap();
        let docs = client.fetch_by_ids("cities", &["a", "b"], Some(0)).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn set_all_strips_embedded_id() {
        let (client, _) = client();
        client
            .set_all(
                "cities",
                vec![DocumentWithId::new("sf", doc(json!({ "id": "stale", "name": "SF" })))],
            )
            .await
            .unwrap();
        let stored = client.get_doc("cities", "sf").await.unwrap().unwrap();
        assert_eq!(stored.id, "sf");
        assert!(stored.data.get(ID_FIELD).is_none());
    }

    #[tokio::test]
    async fn bulk_write_failure_applies_nothing() {
        let (client, store) = client();
        store.fail_next_commit(unavailable("offline"));
        let err = client
            .add_all("cities", vec![DocumentData::new(), DocumentData::new()])
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/unavailable");
        assert_eq!(store.document_count("cities"), 0);
    }

    #[tokio::test]
    async fn delete_all_removes_listed_documents() {
        let (client, store) = client();
        let added = client
            .add_all("cities", vec![DocumentData::new(), DocumentData::new(), DocumentData::new()])
            .await
            .unwrap();
        let doomed: Vec<&str> = added.iter().take(2).map(|doc| doc.id.as_str()).collect();
        client.delete_all("cities", &doomed).await.unwrap();
        assert_eq!(store.document_count("cities"), 1);
    }

    #[tokio::test]
    async fn rejects_document_paths_as_collections() {
        let (client, _) = client();
        let err = client.add_doc("cities/sf", DocumentData::new()).await.unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }
}
