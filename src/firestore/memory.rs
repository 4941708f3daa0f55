use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_channel::Sender;
use async_trait::async_trait;

use crate::firestore::error::{internal_error, not_found, FirestoreError, FirestoreResult};
use crate::firestore::model::{validate_collection_path, DocumentData, DocumentKey};
use crate::firestore::query::QueryConstraint;
use crate::firestore::snapshot::{
    DocumentChange, DocumentChangeType, DocumentSnapshot, QuerySnapshot, SnapshotMetadata,
};
use crate::firestore::store::{DocumentStore, SnapshotReceiver, WriteOperation};
use crate::firestore::value::{apply_field_update, merge_into};
use crate::util::DEFAULT_CHUNK_SIZE;

type Collections = BTreeMap<String, BTreeMap<String, DocumentData>>;

/// Document store that keeps everything in process memory.
///
/// Useful for tests or demos where persistence/network access is not
/// required. Clones share the same documents and listeners.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    state: Arc<Mutex<StoreState>>,
    membership_limit: usize,
    local_echo: bool,
}

#[derive(Default)]
struct StoreState {
    documents: Collections,
    query_listeners: Vec<QueryListener>,
    document_listeners: Vec<DocumentListener>,
    pending_failure: Option<FirestoreError>,
}

struct QueryListener {
    collection: String,
    constraints: Vec<QueryConstraint>,
    last: BTreeMap<String, DocumentData>,
    sender: Sender<FirestoreResult<QuerySnapshot>>,
}

struct DocumentListener {
    key: DocumentKey,
    last: Option<DocumentData>,
    sender: Sender<FirestoreResult<DocumentSnapshot>>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            membership_limit: DEFAULT_CHUNK_SIZE,
            local_echo: false,
        }
    }

    /// Sets how many values a single `in` filter may carry.
    pub fn with_membership_limit(mut self, limit: usize) -> Self {
        self.membership_limit = limit;
        self
    }

    /// Delivers every listener snapshot twice: first as a stale local echo
    /// (cached or pending writes), then as the confirmed version.
    pub fn with_local_echo(mut self) -> Self {
        self.local_echo = true;
        self
    }

    pub fn membership_limit(&self) -> usize {
        self.membership_limit
    }

    /// Makes the next commit fail with `error` without applying anything.
    pub fn fail_next_commit(&self, error: FirestoreError) {
        if let Ok(mut state) = self.state.lock() {
            state.pending_failure = Some(error);
        }
    }

    /// Number of documents stored in `collection`.
    pub fn document_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .map(|state| state.documents.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Number of registered listeners, including ones whose receiver was
    /// dropped but that have not been pruned yet.
    pub fn listener_count(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.query_listeners.len() + state.document_listeners.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> FirestoreResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| internal_error("In-memory document store lock poisoned"))
    }

    fn validate_constraints(&self, constraints: &[QueryConstraint]) -> FirestoreResult<()> {
        constraints
            .iter()
            .try_for_each(|constraint| constraint.validate(self.membership_limit))
    }

    fn deliver_query(&self, listener: &QueryListener, changes: Vec<DocumentChange>, initial: bool) {
        if self.local_echo {
            let echo = if initial {
                SnapshotMetadata::new(true, false)
            } else {
                SnapshotMetadata::new(false, true)
            };
            let stamped = changes
                .iter()
                .map(|change| DocumentChange::new(change.kind, change.doc.clone().with_metadata(echo)))
                .collect();
            let _ = listener.sender.try_send(Ok(QuerySnapshot::new(stamped, echo)));
        }
        let _ = listener
            .sender
            .try_send(Ok(QuerySnapshot::new(changes, SnapshotMetadata::default())));
    }

    fn deliver_document(&self, listener: &DocumentListener, initial: bool) {
        let snapshot = |metadata| DocumentSnapshot::new(listener.key.clone(), listener.last.clone(), metadata);
        if self.local_echo {
            let echo = if initial {
                SnapshotMetadata::new(true, false)
            } else {
                SnapshotMetadata::new(false, true)
            };
            let _ = listener.sender.try_send(Ok(snapshot(echo)));
        }
        let _ = listener.sender.try_send(Ok(snapshot(SnapshotMetadata::default())));
    }

    fn notify(&self, state: &mut StoreState) {
        state.prune_closed();

        let documents = &state.documents;
        for listener in state.query_listeners.iter_mut() {
            let current = matching_documents(documents, &listener.collection, &listener.constraints);
            let changes = diff_results(&listener.collection, &listener.last, &current);
            listener.last = current;
            if !changes.is_empty() {
                self.deliver_query(listener, changes, false);
            }
        }

        for listener in state.document_listeners.iter_mut() {
            let current = lookup(documents, &listener.key).cloned();
            if current != listener.last {
                listener.last = current;
                self.deliver_document(listener, false);
            }
        }
    }
}

impl StoreState {
    fn prune_closed(&mut self) {
        let before = self.query_listeners.len() + self.document_listeners.len();
        self.query_listeners.retain(|listener| !listener.sender.is_closed());
        self.document_listeners
            .retain(|listener| !listener.sender.is_closed());
        let pruned = before - self.query_listeners.len() - self.document_listeners.len();
        if pruned > 0 {
            log::warn!("dropped {pruned} listener(s) whose receivers went away");
        }
    }
}

fn lookup<'a>(documents: &'a Collections, key: &DocumentKey) -> Option<&'a DocumentData> {
    documents.get(key.collection()).and_then(|docs| docs.get(key.id()))
}

fn matching_documents(
    documents: &Collections,
    collection: &str,
    constraints: &[QueryConstraint],
) -> BTreeMap<String, DocumentData> {
    documents
        .get(collection)
        .map(|docs| {
            docs.iter()
                .filter(|(id, data)| constraints.iter().all(|constraint| constraint.matches(id, data)))
                .map(|(id, data)| (id.clone(), data.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn diff_results(
    collection: &str,
    previous: &BTreeMap<String, DocumentData>,
    current: &BTreeMap<String, DocumentData>,
) -> Vec<DocumentChange> {
    let change = |kind: DocumentChangeType, id: &str, data: &DocumentData| -> Option<DocumentChange> {
        let key = DocumentKey::new(collection, id).ok()?;
        Some(DocumentChange::new(
            kind,
            DocumentSnapshot::new(key, Some(data.clone()), SnapshotMetadata::default()),
        ))
    };

    let mut changes = Vec::new();
    for (id, data) in previous {
        if !current.contains_key(id) {
            changes.extend(change(DocumentChangeType::Removed, id, data));
        }
    }
    for (id, data) in current {
        match previous.get(id) {
            None => changes.extend(change(DocumentChangeType::Added, id, data)),
            Some(old) if old != data => changes.extend(change(DocumentChangeType::Modified, id, data)),
            Some(_) => {}
        }
    }
    changes
}

fn apply_write(documents: &mut Collections, write: WriteOperation) -> FirestoreResult<()> {
    match write {
        WriteOperation::Set { key, data, merge } => {
            let collection = documents.entry(key.collection().to_string()).or_default();
            if merge {
                let existing = collection.entry(key.id().to_string()).or_default();
                merge_into(existing, data);
            } else {
                collection.insert(key.id().to_string(), data);
            }
        }
        WriteOperation::Update { key, fields } => {
            let existing = documents
                .get_mut(key.collection())
                .and_then(|docs| docs.get_mut(key.id()))
                .ok_or_else(|| not_found(format!("No document to update: {key}")))?;
            for (path, update) in &fields {
                apply_field_update(existing, path, update)?;
            }
        }
        WriteOperation::Delete { key } => {
            if let Some(docs) = documents.get_mut(key.collection()) {
                docs.remove(key.id());
                if docs.is_empty() {
                    documents.remove(key.collection());
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let state = self.lock()?;
        let data = lookup(&state.documents, key).cloned();
        Ok(DocumentSnapshot::new(key.clone(), data, SnapshotMetadata::default()))
    }

    async fn run_query(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let collection = validate_collection_path(collection)?;
        self.validate_constraints(constraints)?;
        let state = self.lock()?;
        matching_documents(&state.documents, &collection, constraints)
            .into_iter()
            .map(|(id, data)| -> FirestoreResult<DocumentSnapshot> {
                let key = DocumentKey::new(&collection, &id)?;
                Ok(DocumentSnapshot::new(key, Some(data), SnapshotMetadata::default()))
            })
            .collect()
    }

    async fn commit(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()> {
        let mut state = self.lock()?;
        if let Some(error) = state.pending_failure.take() {
            return Err(error);
        }

        let mut staged = state.documents.clone();
        for write in writes {
            apply_write(&mut staged, write)?;
        }
        state.documents = staged;
        self.notify(&mut state);
        Ok(())
    }

    async fn listen_query(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> FirestoreResult<SnapshotReceiver<QuerySnapshot>> {
        let collection = validate_collection_path(collection)?;
        self.validate_constraints(constraints)?;
        let mut state = self.lock()?;
        state.prune_closed();

        let (sender, receiver) = async_channel::unbounded();
        let current = matching_documents(&state.documents, &collection, constraints);
        let initial = diff_results(&collection, &BTreeMap::new(), &current);
        let listener = QueryListener {
            collection,
            constraints: constraints.to_vec(),
            last: current,
            sender,
        };
        self.deliver_query(&listener, initial, true);
        state.query_listeners.push(listener);
        Ok(receiver)
    }

    async fn listen_document(
        &self,
        key: &DocumentKey,
    ) -> FirestoreResult<SnapshotReceiver<DocumentSnapshot>> {
        let mut state = self.lock()?;
        state.prune_closed();
        let (sender, receiver) = async_channel::unbounded();
        let listener = DocumentListener {
            key: key.clone(),
            last: lookup(&state.documents, key).cloned(),
            sender,
        };
        self.deliver_document(&listener, true);
        state.document_listeners.push(listener);
        Ok(receiver)
    }
}
