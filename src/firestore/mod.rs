//! Document database helpers.
//!
//! [`Firestore`] wraps an injected [`DocumentStore`] and adds id-merged reads,
//! chunked bulk fetches, single-batch bulk writes and listener streams.

mod client;
pub mod error;
pub mod memory;
pub mod model;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod value;
mod watch;
mod write_batch;

pub use client::Firestore;
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use memory::InMemoryDocumentStore;
pub use model::{DocumentData, DocumentKey, DocumentWithId, ID_FIELD};
pub use query::{document_id, where_contains, where_equals, where_in, FieldRef, FilterOperator, QueryConstraint};
pub use snapshot::{DocumentChange, DocumentChangeType, DocumentSnapshot, QuerySnapshot, SnapshotMetadata};
pub use store::{DocumentStore, SnapshotReceiver, WriteOperation};
pub use value::FieldUpdate;
pub use watch::CollectionEvent;
pub use write_batch::{WriteBatch, MAX_BATCH_WRITES};
