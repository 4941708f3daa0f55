use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{generate_auto_id, DocumentData, DocumentKey};
use crate::firestore::query::QueryConstraint;
use crate::firestore::snapshot::{DocumentSnapshot, QuerySnapshot};
use crate::firestore::value::FieldUpdate;

/// A single write queued in a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOperation {
    Set {
        key: DocumentKey,
        data: DocumentData,
        merge: bool,
    },
    Update {
        key: DocumentKey,
        fields: BTreeMap<String, FieldUpdate>,
    },
    Delete {
        key: DocumentKey,
    },
}

impl WriteOperation {
    pub fn key(&self) -> &DocumentKey {
        match self {
            WriteOperation::Set { key, .. }
            | WriteOperation::Update { key, .. }
            | WriteOperation::Delete { key } => key,
        }
    }
}

/// Receiving end of a listener registered with a [`DocumentStore`].
///
/// The store keeps pushing snapshots until the receiver is dropped.
pub type SnapshotReceiver<T> = async_channel::Receiver<FirestoreResult<T>>;

/// The backend document database the helpers delegate to.
///
/// Implementations own transport, caching and consistency. `commit` must be
/// atomic: either every write in the slice applies or none does.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Produces a fresh document id for `collection` without writing anything.
    fn generate_id(&self, _collection: &str) -> String {
        generate_auto_id()
    }

    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot>;

    /// Returns every document in `collection` satisfying all `constraints`.
    async fn run_query(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> FirestoreResult<Vec<DocumentSnapshot>>;

    async fn commit(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()>;

    /// Registers a query listener. The first delivery reports the current
    /// result set as `added` changes.
    async fn listen_query(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> FirestoreResult<SnapshotReceiver<QuerySnapshot>>;

    /// Registers a single-document listener. The first delivery reports the
    /// current state, including absence.
    async fn listen_document(
        &self,
        key: &DocumentKey,
    ) -> FirestoreResult<SnapshotReceiver<DocumentSnapshot>>;
}
