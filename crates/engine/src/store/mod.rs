//! Durable document store abstraction.
//!
//! The engine treats its backing database as an injected capability: a
//! document store with per-document CRUD, filtered queries, atomic
//! multi-document batches, and push-based change subscriptions. Every
//! service receives an `Arc<dyn DocumentStore>` explicitly - there is no
//! process-wide store handle.
//!
//! # Collections
//!
//! - `users` - profile mirrors keyed by identity uid
//! - `shoppingLists` - list documents with membership and rules
//! - `shoppingItems` - item documents referencing their list via `listId`
//!
//! # Write semantics
//!
//! Mutations are expressed as [`Patch`]es of [`FieldWrite`]s. Two writes
//! matter for correctness under concurrency:
//!
//! - [`FieldWrite::ServerTimestamp`] - the store assigns the commit-time
//!   UTC timestamp; clients never write wall-clock values.
//! - [`FieldWrite::ArrayUnion`] - atomic set-union on an array field.
//!   Membership joins go through this primitive so two simultaneous
//!   joiners cannot clobber each other, which a read-modify-write of the
//!   whole document would.
//!
//! Multi-document writes (cascade delete) go through [`WriteBatch`] and
//! commit all-or-nothing.

pub mod memory;
pub mod timeout;

pub use memory::MemoryStore;
pub use timeout::TimeoutStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Collection names used by the engine.
pub mod collections {
    /// Profile mirrors keyed by identity uid.
    pub const USERS: &str = "users";
    /// Shared shopping lists.
    pub const LISTS: &str = "shoppingLists";
    /// Shopping items, one document per item.
    pub const ITEMS: &str = "shoppingItems";
}

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The targeted document does not exist.
    #[error("document not found")]
    NotFound,

    /// Transport or backend failure, including timeouts.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A stored document: its server-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id, unique within its collection.
    pub id: String,
    /// Field values as stored.
    pub fields: serde_json::Map<String, Value>,
}

/// A single field mutation within a [`Patch`].
#[derive(Debug, Clone)]
pub enum FieldWrite {
    /// Set the field to a concrete value.
    Set(Value),
    /// Set the field to the store's commit-time UTC timestamp (RFC 3339).
    ServerTimestamp,
    /// Atomic set-union on an array-valued field; elements already present
    /// are not duplicated. A missing or non-array field becomes a fresh
    /// array of the given elements.
    ArrayUnion(Vec<Value>),
    /// Remove the field.
    Remove,
}

/// Field mutations applied together to one document.
pub type Patch = BTreeMap<String, FieldWrite>;

/// Query filter over a collection.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Every document in the collection.
    All,
    /// Documents whose field equals the value.
    Eq(String, Value),
    /// Documents whose array-valued field contains the value.
    ArrayContains(String, Value),
}

impl Filter {
    /// Whether a document matches this filter.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Eq(field, value) => doc.fields.get(field) == Some(value),
            Self::ArrayContains(field, value) => doc
                .fields
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

/// One operation inside a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Create or replace a document.
    Set {
        collection: String,
        id: String,
        patch: Patch,
    },
    /// Patch an existing document; the batch fails if it is absent.
    Update {
        collection: String,
        id: String,
        patch: Patch,
    },
    /// Delete a document (no-op if already absent).
    Delete { collection: String, id: String },
}

/// A multi-document write committed all-or-nothing.
///
/// An interrupted or invalid batch must leave the store untouched; the
/// cascade delete of a list and its items depends on this.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Queue a create-or-replace write.
    pub fn set(&mut self, collection: &str, id: &str, patch: Patch) -> &mut Self {
        self.ops.push(BatchOp::Set {
            collection: collection.to_owned(),
            id: id.to_owned(),
            patch,
        });
        self
    }

    /// Queue a patch of an existing document.
    pub fn update(&mut self, collection: &str, id: &str, patch: Patch) -> &mut Self {
        self.ops.push(BatchOp::Update {
            collection: collection.to_owned(),
            id: id.to_owned(),
            patch,
        });
        self
    }

    /// Queue a delete.
    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(BatchOp::Delete {
            collection: collection.to_owned(),
            id: id.to_owned(),
        });
        self
    }

    /// Whether the batch holds no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// The queued operations, in submission order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consume the batch into its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// RAII hook that detaches a listener when the subscription is dropped.
struct Detach(Option<Box<dyn FnOnce() + Send>>);

impl Drop for Detach {
    fn drop(&mut self) {
        if let Some(detach) = self.0.take() {
            detach();
        }
    }
}

/// A live query handle.
///
/// Delivers the full matching snapshot immediately after registration and
/// again after every committed change to the collection. Dropping the
/// handle detaches the listener; no further snapshots are delivered.
/// Concurrent subscriptions to the same query are independent.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
    _detach: Detach,
}

impl Subscription {
    /// Build a subscription from a snapshot channel and a detach hook.
    ///
    /// Store implementations call this; consumers only ever [`next`].
    ///
    /// [`next`]: Subscription::next
    #[must_use]
    pub fn new(
        rx: mpsc::UnboundedReceiver<Vec<Document>>,
        detach: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            _detach: Detach(Some(Box::new(detach))),
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }
}

/// The durable store capability consumed by the engine.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` on transport failure; an absent document
    /// is `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create a document with a server-assigned id; returns the id.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` on transport failure.
    async fn create(&self, collection: &str, patch: Patch) -> Result<String, StoreError>;

    /// Create or replace a document at a caller-chosen id.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` on transport failure.
    async fn set(&self, collection: &str, id: &str, patch: Patch) -> Result<(), StoreError>;

    /// Patch an existing document.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the document is absent,
    /// `StoreError::Unavailable` on transport failure.
    async fn update(&self, collection: &str, id: &str, patch: Patch) -> Result<(), StoreError>;

    /// Delete a document (no-op if already absent).
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` on transport failure.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// All documents matching the filter.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` on transport failure.
    async fn query(&self, collection: &str, filter: Filter) -> Result<Vec<Document>, StoreError>;

    /// Live query: push the matching snapshot on every committed change.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if the listener cannot be established.
    async fn subscribe(&self, collection: &str, filter: Filter)
    -> Result<Subscription, StoreError>;

    /// Live single-document listen; snapshots hold zero or one document.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if the listener cannot be established.
    async fn watch_document(&self, collection: &str, id: &str)
    -> Result<Subscription, StoreError>;

    /// Commit a multi-document batch all-or-nothing.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if an `Update` targets a missing document
    /// (nothing is applied), `StoreError::Unavailable` on transport
    /// failure.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> Document {
        let Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        Document {
            id: "d1".to_owned(),
            fields,
        }
    }

    #[test]
    fn test_filter_eq() {
        let d = doc(json!({"listId": "l1", "name": "Milk"}));
        assert!(Filter::Eq("listId".to_owned(), json!("l1")).matches(&d));
        assert!(!Filter::Eq("listId".to_owned(), json!("l2")).matches(&d));
        assert!(!Filter::Eq("missing".to_owned(), json!("l1")).matches(&d));
    }

    #[test]
    fn test_filter_array_contains() {
        let d = doc(json!({"members": ["a", "b"]}));
        assert!(Filter::ArrayContains("members".to_owned(), json!("a")).matches(&d));
        assert!(!Filter::ArrayContains("members".to_owned(), json!("c")).matches(&d));
        // Non-array fields never match.
        let d = doc(json!({"members": "a"}));
        assert!(!Filter::ArrayContains("members".to_owned(), json!("a")).matches(&d));
    }

    #[test]
    fn test_write_batch_builder() {
        let mut batch = WriteBatch::new();
        assert!(batch.is_empty());
        batch
            .delete("shoppingItems", "i1")
            .delete("shoppingLists", "l1");
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch.ops().first(), Some(BatchOp::Delete { .. })));
    }
}
