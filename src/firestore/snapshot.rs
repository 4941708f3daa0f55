use crate::firestore::model::{DocumentData, DocumentKey, DocumentWithId};

/// Metadata about the state of a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotMetadata {
    from_cache: bool,
    has_pending_writes: bool,
}

impl SnapshotMetadata {
    /// Creates metadata with the provided cache/pending-write flags.
    pub fn new(from_cache: bool, has_pending_writes: bool) -> Self {
        Self {
            from_cache,
            has_pending_writes,
        }
    }

    /// Indicates whether the snapshot was served from a local cache.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Indicates whether the snapshot contains uncommitted local mutations.
    pub fn has_pending_writes(&self) -> bool {
        self.has_pending_writes
    }

    /// A snapshot that is cached or still carries local writes is not yet
    /// confirmed by the backend.
    pub fn is_stale(&self) -> bool {
        self.from_cache || self.has_pending_writes
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: Option<DocumentData>,
    metadata: SnapshotMetadata,
}

impl DocumentSnapshot {
    pub fn new(key: DocumentKey, data: Option<DocumentData>, metadata: SnapshotMetadata) -> Self {
        Self {
            key,
            data,
            metadata,
        }
    }

    /// Returns whether the document exists on the backend.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref()
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    pub(crate) fn with_metadata(mut self, metadata: SnapshotMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    /// Consumes the snapshot, returning the data tagged with its id.
    pub fn into_document(self) -> Option<DocumentWithId> {
        let id = self.key.id().to_string();
        self.data.map(|data| DocumentWithId::new(id, data))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentChangeType {
    Added,
    Modified,
    Removed,
}

impl DocumentChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentChangeType::Added => "added",
            DocumentChangeType::Modified => "modified",
            DocumentChangeType::Removed => "removed",
        }
    }
}

/// One document entering, changing within or leaving a query result.
///
/// For removals the snapshot carries the last known data.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentChange {
    pub kind: DocumentChangeType,
    pub doc: DocumentSnapshot,
}

impl DocumentChange {
    pub fn new(kind: DocumentChangeType, doc: DocumentSnapshot) -> Self {
        Self { kind, doc }
    }
}

/// The changes a query listener observed between two deliveries.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySnapshot {
    changes: Vec<DocumentChange>,
    metadata: SnapshotMetadata,
}

impl QuerySnapshot {
    pub fn new(changes: Vec<DocumentChange>, metadata: SnapshotMetadata) -> Self {
        Self { changes, metadata }
    }

    pub fn doc_changes(&self) -> &[DocumentChange] {
        &self.changes
    }

    pub fn into_doc_changes(self) -> Vec<DocumentChange> {
        self.changes
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_flags() {
        let meta = SnapshotMetadata::new(true, false);
        assert!(meta.from_cache());
        assert!(!meta.has_pending_writes());
        assert!(meta.is_stale());
        assert!(!SnapshotMetadata::default().is_stale());
    }

    #[test]
    fn snapshot_reports_existence() {
        let key = DocumentKey::new("cities", "sf").unwrap();
        let snapshot = DocumentSnapshot::new(key, None, SnapshotMetadata::default());
        assert!(!snapshot.exists());
        assert!(snapshot.into_document().is_none());
    }
}
