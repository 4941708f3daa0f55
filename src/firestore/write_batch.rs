use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::firestore::error::{invalid_argument, resource_exhausted, FirestoreResult};
use crate::firestore::model::{DocumentData, DocumentKey};
use crate::firestore::store::{DocumentStore, WriteOperation};
use crate::firestore::value::FieldUpdate;

/// Maximum number of writes the backend accepts in one batch.
pub const MAX_BATCH_WRITES: usize = 500;

/// Aggregates write operations and commits them atomically.
///
/// Writes are only queued locally; nothing reaches the store until
/// [`commit`](WriteBatch::commit).
#[derive(Clone)]
pub struct WriteBatch {
    store: Arc<dyn DocumentStore>,
    writes: Vec<WriteOperation>,
}

impl WriteBatch {
    pub(crate) fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            writes: Vec::new(),
        }
    }

    /// Queues an overwrite of `collection/id` with `data`.
    pub fn set(&mut self, collection: &str, id: &str, data: DocumentData) -> FirestoreResult<&mut Self> {
        self.push_set(collection, id, data, false)
    }

    /// Queues a set that deep-merges `data` into the existing document.
    pub fn set_merge(
        &mut self,
        collection: &str,
        id: &str,
        data: DocumentData,
    ) -> FirestoreResult<&mut Self> {
        self.push_set(collection, id, data, true)
    }

    /// Queues a partial update; the document must exist at commit time.
    pub fn update(
        &mut self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldUpdate>,
    ) -> FirestoreResult<&mut Self> {
        self.ensure_capacity()?;
        if fields.is_empty() {
            return Err(invalid_argument("Function update() requires at least one field"));
        }
        let key = DocumentKey::new(collection, id)?;
        self.writes.push(WriteOperation::Update { key, fields });
        Ok(self)
    }

    /// Queues a delete of `collection/id`.
    pub fn delete(&mut self, collection: &str, id: &str) -> FirestoreResult<&mut Self> {
        self.ensure_capacity()?;
        let key = DocumentKey::new(collection, id)?;
        self.writes.push(WriteOperation::Delete { key });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[WriteOperation] {
        &self.writes
    }

    /// Commits all queued writes atomically.
    ///
    /// An empty batch is still sent to the store and succeeds.
    pub async fn commit(self) -> FirestoreResult<()> {
        let count = self.writes.len();
        log::debug!("committing write batch with {count} operation(s)");
        self.store.commit(self.writes).await.map_err(|err| {
            log::warn!("write batch of {count} operation(s) failed: {err}");
            err
        })
    }

    fn push_set(
        &mut self,
        collection: &str,
        id: &str,
        data: DocumentData,
        merge: bool,
    ) -> FirestoreResult<&mut Self> {
        self.ensure_capacity()?;
        let key = DocumentKey::new(collection, id)?;
        self.writes.push(WriteOperation::Set { key, data, merge });
        Ok(self)
    }

    fn ensure_capacity(&self) -> FirestoreResult<()> {
        if self.writes.len() >= MAX_BATCH_WRITES {
            return Err(resource_exhausted(format!(
                "WriteBatch cannot contain more than {MAX_BATCH_WRITES} operations"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for WriteBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBatch").field("writes", &self.writes).finish()
    }
}
