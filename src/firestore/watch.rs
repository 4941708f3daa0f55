use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::StreamExt;

use crate::firestore::client::Firestore;
use crate::firestore::error::{FirestoreError, FirestoreResult};
use crate::firestore::model::{DocumentData, DocumentKey, DocumentWithId};
use crate::firestore::query::QueryConstraint;
use crate::firestore::snapshot::{DocumentChange, DocumentChangeType, DocumentSnapshot, QuerySnapshot};
use crate::firestore::store::DocumentStore;
use crate::util::Subscription;

/// A confirmed change to a document matched by a query.
#[derive(Clone, Debug, PartialEq)]
pub enum CollectionEvent {
    Added(DocumentWithId),
    Modified(DocumentWithId),
    Removed(String),
}

impl CollectionEvent {
    pub fn id(&self) -> &str {
        match self {
            CollectionEvent::Added(doc) | CollectionEvent::Modified(doc) => &doc.id,
            CollectionEvent::Removed(id) => id,
        }
    }
}

type Expand<S, T> = Arc<dyn Fn(S) -> Vec<T> + Send + Sync + 'static>;

impl Firestore {
    /// Streams every document change reported for the query, one at a time.
    ///
    /// No filtering is applied: cached and locally pending changes are
    /// delivered too.
    pub fn watch_changes(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> Subscription<DocumentChange, FirestoreError> {
        self.query_subscription("changes", collection, constraints, |snapshot| {
            snapshot.into_doc_changes()
        })
    }

    /// Streams the full change list of each query snapshot.
    pub fn watch_bulk_changes(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> Subscription<Vec<DocumentChange>, FirestoreError> {
        self.query_subscription("bulk-changes", collection, constraints, |snapshot| {
            vec![snapshot.into_doc_changes()]
        })
    }

    /// Streams confirmed added/modified/removed events for the query.
    ///
    /// Each change is judged on its own document: changes served from cache
    /// or carrying pending writes are dropped, the rest of the snapshot is
    /// still delivered.
    pub fn collection_events(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> Subscription<CollectionEvent, FirestoreError> {
        self.query_subscription("collection-events", collection, constraints, |snapshot| {
            snapshot
                .into_doc_changes()
                .into_iter()
                .filter(|change| !change.doc.metadata().is_stale())
                .filter_map(|change| match change.kind {
                    DocumentChangeType::Removed => Some(CollectionEvent::Removed(change.doc.id().to_string())),
                    DocumentChangeType::Added => change.doc.into_document().map(CollectionEvent::Added),
                    DocumentChangeType::Modified => change.doc.into_document().map(CollectionEvent::Modified),
                })
                .collect()
        })
    }

    /// Streams the confirmed data of `collection/id`; `None` once it is gone.
    pub fn watch_doc_changes(
        &self,
        collection: &str,
        id: &str,
    ) -> Subscription<Option<DocumentData>, FirestoreError> {
        self.document_subscription("doc-changes", collection, id, |snapshot| {
            if snapshot.metadata().is_stale() {
                return Vec::new();
            }
            vec![snapshot.data().cloned()]
        })
    }

    /// Like [`watch_doc_changes`](Self::watch_doc_changes) with the id merged
    /// into the data.
    pub fn doc_events(
        &self,
        collection: &str,
        id: &str,
    ) -> Subscription<Option<DocumentWithId>, FirestoreError> {
        self.document_subscription("doc-events", collection, id, |snapshot| {
            if snapshot.metadata().is_stale() {
                return Vec::new();
            }
            vec![snapshot.into_document()]
        })
    }

    fn query_subscription<T, F>(
        &self,
        label: &str,
        collection: &str,
        constraints: &[QueryConstraint],
        expand: F,
    ) -> Subscription<T, FirestoreError>
    where
        T: Send + 'static,
        F: Fn(QuerySnapshot) -> Vec<T> + Send + Sync + 'static,
    {
        let store = Arc::clone(self.store());
        let target = collection.to_string();
        let constraints: Arc<[QueryConstraint]> = constraints.into();
        let expand: Expand<QuerySnapshot, T> = Arc::new(expand);
        Subscription::new(format!("{label}:{collection}"), move || {
            open_query(
                Arc::clone(&store),
                target.clone(),
                Arc::clone(&constraints),
                Arc::clone(&expand),
            )
        })
    }

    fn document_subscription<T, F>(
        &self,
        label: &str,
        collection: &str,
        id: &str,
        expand: F,
    ) -> Subscription<T, FirestoreError>
    where
        T: Send + 'static,
        F: Fn(DocumentSnapshot) -> Vec<T> + Send + Sync + 'static,
    {
        let store = Arc::clone(self.store());
        let key = DocumentKey::new(collection, id);
        let expand: Expand<DocumentSnapshot, T> = Arc::new(expand);
        Subscription::new(format!("{label}:{collection}/{id}"), move || {
            open_document(Arc::clone(&store), key.clone(), Arc::clone(&expand))
        })
    }
}

async fn open_query<T>(
    store: Arc<dyn DocumentStore>,
    collection: String,
    constraints: Arc<[QueryConstraint]>,
    expand: Expand<QuerySnapshot, T>,
) -> FirestoreResult<BoxStream<'static, FirestoreResult<T>>>
where
    T: Send + 'static,
{
    let receiver = store.listen_query(&collection, &constraints).await?;
    Ok(expand_stream(receiver, expand))
}

async fn open_document<T>(
    store: Arc<dyn DocumentStore>,
    key: FirestoreResult<DocumentKey>,
    expand: Expand<DocumentSnapshot, T>,
) -> FirestoreResult<BoxStream<'static, FirestoreResult<T>>>
where
    T: Send + 'static,
{
    let receiver = store.listen_document(&key?).await?;
    Ok(expand_stream(receiver, expand))
}

fn expand_stream<S, T>(
    receiver: async_channel::Receiver<FirestoreResult<S>>,
    expand: Expand<S, T>,
) -> BoxStream<'static, FirestoreResult<T>>
where
    S: Send + 'static,
    T: Send + 'static,
{
    receiver
        .flat_map(move |result| {
            let items: Vec<FirestoreResult<T>> = match result {
                Ok(snapshot) => expand(snapshot).into_iter().map(Ok).collect(),
                Err(err) => vec![Err(err)],
            };
            stream::iter(items)
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::memory::InMemoryDocumentStore;
    use crate::firestore::query::where_equals;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> DocumentData {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn collection_events_skip_stale_snapshots() {
        let client = Firestore::new(Arc::new(InMemoryDocumentStore::new().with_local_echo()));
        client
            .set_doc("cities", "sf", doc(json!({ "state": "CA" })), false)
            .await
            .unwrap();

        let mut events = client.collection_events("cities", &[where_equals("state", "CA")]);
        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first, CollectionEvent::Added(DocumentWithId::new("sf", doc(json!({ "state": "CA" })))));

        client
            .set_doc("cities", "sf", doc(json!({ "state": "CA", "pop": 1 })), false)
            .await
            .unwrap();
        client.delete_doc("cities", "sf").await.unwrap();

        let modified = events.next().await.unwrap().unwrap();
        assert!(matches!(modified, CollectionEvent::Modified(ref doc) if doc.get("pop") == Some(&json!(1))));
        let removed = events.next().await.unwrap().unwrap();
        assert_eq!(removed, CollectionEvent::Removed("sf".into()));
    }

    #[tokio::test]
    async fn watch_changes_delivers_stale_changes_too() {
        let client = Firestore::new(Arc::new(InMemoryDocumentStore::new().with_local_echo()));
        client.set_doc("cities", "sf", DocumentData::new(), false).await.unwrap();

        let mut changes = client.watch_changes("cities", &[]);
        let cached = changes.next().await.unwrap().unwrap();
        let confirmed = changes.next().await.unwrap().unwrap();
        assert_eq!(cached.doc.id(), "sf");
        assert_eq!(confirmed.doc.id(), "sf");
        assert_eq!(cached.kind, DocumentChangeType::Added);
    }

    #[tokio::test]
    async fn doc_events_report_absence_and_id() {
        let client = Firestore::with_in_memory();
        let mut events = client.doc_events("users", "ada");
        assert_eq!(events.next().await.unwrap().unwrap(), None);

        client
            .set_doc("users", "ada", doc(json!({ "name": "Ada" })), false)
            .await
            .unwrap();
        let present = events.next().await.unwrap().unwrap().unwrap();
        assert_eq!(present.id, "ada");
        assert_eq!(present.get("name"), Some(&json!("Ada")));
    }

    #[tokio::test]
    async fn invalid_targets_fail_on_first_poll() {
        let client = Firestore::with_in_memory();
        let mut events = client.watch_doc_changes("users/ada", "x");
        let err = events.next().await.unwrap().unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }
}
