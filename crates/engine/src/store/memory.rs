//! In-memory reference implementation of [`DocumentStore`].
//!
//! Backs the test suite and any embedding that wants a local, ephemeral
//! store. All mutations happen under a single write lock, so a committed
//! change and the snapshots fanned out to listeners are always consistent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use super::{
    BatchOp, Document, DocumentStore, FieldWrite, Filter, Patch, StoreError, Subscription,
    WriteBatch,
};

type Fields = Map<String, Value>;
type Collections = HashMap<String, HashMap<String, Fields>>;

/// What a registered listener observes.
#[derive(Debug, Clone)]
enum Scope {
    Query(Filter),
    Document(String),
}

struct Listener {
    id: u64,
    collection: String,
    scope: Scope,
    tx: mpsc::UnboundedSender<Vec<Document>>,
}

struct Inner {
    collections: RwLock<Collections>,
    listeners: Mutex<Vec<Listener>>,
    next_listener: AtomicU64,
}

/// An in-memory document store.
///
/// Cheaply cloneable; clones share the same underlying state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    /// Number of currently attached listeners (for tests).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    /// Register a listener; returns the handle plus a sender for the
    /// registration-time snapshot.
    fn register(
        &self,
        collection: &str,
        scope: Scope,
    ) -> (Subscription, mpsc::UnboundedSender<Vec<Document>>) {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let initial_tx = tx.clone();
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push(Listener {
                id,
                collection: collection.to_owned(),
                scope,
                tx,
            });
        }

        let inner = Arc::clone(&self.inner);
        let subscription = Subscription::new(rx, move || {
            if let Ok(mut listeners) = inner.listeners.lock() {
                listeners.retain(|listener| listener.id != id);
            }
        });
        (subscription, initial_tx)
    }

    /// Fan the current state of `collection` out to its listeners.
    ///
    /// Called while the write lock is still held so every listener sees
    /// the committed state, in commit order.
    fn notify(&self, collections: &Collections, collection: &str) {
        let Ok(mut listeners) = self.inner.listeners.lock() else {
            return;
        };
        listeners.retain(|listener| {
            if listener.collection != collection {
                return true;
            }
            let snapshot = match &listener.scope {
                Scope::Query(filter) => snapshot_query(collections, collection, filter),
                Scope::Document(id) => snapshot_document(collections, collection, id),
            };
            // A send failure means the subscription was dropped; prune it.
            listener.tx.send(snapshot).is_ok()
        });
    }
}

fn snapshot_query(collections: &Collections, collection: &str, filter: &Filter) -> Vec<Document> {
    collections
        .get(collection)
        .map(|docs| {
            docs.iter()
                .map(|(id, fields)| Document {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .filter(|doc| filter.matches(doc))
                .collect()
        })
        .unwrap_or_default()
}

fn snapshot_document(collections: &Collections, collection: &str, id: &str) -> Vec<Document> {
    collections
        .get(collection)
        .and_then(|docs| docs.get(id))
        .map(|fields| {
            vec![Document {
                id: id.to_owned(),
                fields: fields.clone(),
            }]
        })
        .unwrap_or_default()
}

/// Commit-time timestamp value, the realization of
/// [`FieldWrite::ServerTimestamp`].
fn server_timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn apply_patch(fields: &mut Fields, patch: &Patch, now: &Value) {
    for (name, write) in patch {
        match write {
            FieldWrite::Set(value) => {
                fields.insert(name.clone(), value.clone());
            }
            FieldWrite::ServerTimestamp => {
                fields.insert(name.clone(), now.clone());
            }
            FieldWrite::ArrayUnion(values) => {
                let entry = fields
                    .entry(name.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(existing) = entry {
                    for value in values {
                        if !existing.contains(value) {
                            existing.push(value.clone());
                        }
                    }
                } else {
                    *entry = Value::Array(values.clone());
                }
            }
            FieldWrite::Remove => {
                fields.remove(name);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_owned(),
                fields: fields.clone(),
            }))
    }

    async fn create(&self, collection: &str, patch: Patch) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.set(collection, &id, patch).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, patch: Patch) -> Result<(), StoreError> {
        let mut collections = self.inner.collections.write().await;
        let mut fields = Fields::new();
        apply_patch(&mut fields, &patch, &server_timestamp());
        collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), fields);
        self.notify(&collections, collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Patch) -> Result<(), StoreError> {
        let mut collections = self.inner.collections.write().await;
        let fields = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        apply_patch(fields, &patch, &server_timestamp());
        self.notify(&collections, collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.inner.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));
        if removed.is_some() {
            self.notify(&collections, collection);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, filter: Filter) -> Result<Vec<Document>, StoreError> {
        let collections = self.inner.collections.read().await;
        Ok(snapshot_query(&collections, collection, &filter))
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<Subscription, StoreError> {
        // Register and deliver the initial snapshot under the read lock so
        // no commit can slip between the two.
        let collections = self.inner.collections.read().await;
        let (subscription, tx) = self.register(collection, Scope::Query(filter.clone()));
        let _ = tx.send(snapshot_query(&collections, collection, &filter));
        Ok(subscription)
    }

    async fn watch_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Subscription, StoreError> {
        let collections = self.inner.collections.read().await;
        let (subscription, tx) = self.register(collection, Scope::Document(id.to_owned()));
        let _ = tx.send(snapshot_document(&collections, collection, id));
        Ok(subscription)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut collections = self.inner.collections.write().await;

        // Validate first: an update against a missing document fails the
        // whole batch before anything is applied.
        for op in batch.ops() {
            if let BatchOp::Update { collection, id, .. } = op {
                let exists = collections
                    .get(collection)
                    .is_some_and(|docs| docs.contains_key(id));
                if !exists {
                    return Err(StoreError::NotFound);
                }
            }
        }

        let now = server_timestamp();
        let mut touched: Vec<String> = Vec::new();
        for op in batch.into_ops() {
            match op {
                BatchOp::Set {
                    collection,
                    id,
                    patch,
                } => {
                    let mut fields = Fields::new();
                    apply_patch(&mut fields, &patch, &now);
                    collections
                        .entry(collection.clone())
                        .or_default()
                        .insert(id, fields);
                    push_touched(&mut touched, collection);
                }
                BatchOp::Update {
                    collection,
                    id,
                    patch,
                } => {
                    if let Some(fields) = collections
                        .get_mut(&collection)
                        .and_then(|docs| docs.get_mut(&id))
                    {
                        apply_patch(fields, &patch, &now);
                    }
                    push_touched(&mut touched, collection);
                }
                BatchOp::Delete { collection, id } => {
                    if let Some(docs) = collections.get_mut(&collection) {
                        docs.remove(&id);
                    }
                    push_touched(&mut touched, collection);
                }
            }
        }

        debug!(collections = ?touched, "Committed batch");
        for collection in &touched {
            self.notify(&collections, collection);
        }
        Ok(())
    }
}

fn push_touched(touched: &mut Vec<String>, collection: String) {
    if !touched.contains(&collection) {
        touched.push(collection);
    }
}
