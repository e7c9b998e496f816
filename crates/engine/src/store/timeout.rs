//! Bounded-timeout store decorator.

use std::time::Duration;

use async_trait::async_trait;

use super::{Document, DocumentStore, Filter, Patch, StoreError, Subscription, WriteBatch};

/// Wraps a store so every round-trip is bounded by a timeout.
///
/// Expiry surfaces as [`StoreError::Unavailable`]; callers decide whether
/// to retry. Subscription setup is bounded too, but delivery on an
/// established subscription is push-based and not subject to the bound.
pub struct TimeoutStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: DocumentStore> TimeoutStore<S> {
    /// Wrap `inner` with a per-call `timeout`.
    #[must_use]
    pub const fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                StoreError::Unavailable(format!(
                    "store call exceeded {}s",
                    self.timeout.as_secs_f64()
                ))
            })?
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for TimeoutStore<S> {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.bounded(self.inner.get(collection, id)).await
    }

    async fn create(&self, collection: &str, patch: Patch) -> Result<String, StoreError> {
        self.bounded(self.inner.create(collection, patch)).await
    }

    async fn set(&self, collection: &str, id: &str, patch: Patch) -> Result<(), StoreError> {
        self.bounded(self.inner.set(collection, id, patch)).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Patch) -> Result<(), StoreError> {
        self.bounded(self.inner.update(collection, id, patch)).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.bounded(self.inner.delete(collection, id)).await
    }

    async fn query(&self, collection: &str, filter: Filter) -> Result<Vec<Document>, StoreError> {
        self.bounded(self.inner.query(collection, filter)).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<Subscription, StoreError> {
        self.bounded(self.inner.subscribe(collection, filter)).await
    }

    async fn watch_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Subscription, StoreError> {
        self.bounded(self.inner.watch_document(collection, id)).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.bounded(self.inner.commit(batch)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct StallingStore;

    #[async_trait]
    impl DocumentStore for StallingStore {
        async fn get(&self, _: &str, _: &str) -> Result<Option<Document>, StoreError> {
            std::future::pending().await
        }
        async fn create(&self, _: &str, _: Patch) -> Result<String, StoreError> {
            std::future::pending().await
        }
        async fn set(&self, _: &str, _: &str, _: Patch) -> Result<(), StoreError> {
            std::future::pending().await
        }
        async fn update(&self, _: &str, _: &str, _: Patch) -> Result<(), StoreError> {
            std::future::pending().await
        }
        async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
            std::future::pending().await
        }
        async fn query(&self, _: &str, _: Filter) -> Result<Vec<Document>, StoreError> {
            std::future::pending().await
        }
        async fn subscribe(&self, _: &str, _: Filter) -> Result<Subscription, StoreError> {
            std::future::pending().await
        }
        async fn watch_document(&self, _: &str, _: &str) -> Result<Subscription, StoreError> {
            std::future::pending().await
        }
        async fn commit(&self, _: WriteBatch) -> Result<(), StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_unavailable() {
        let store = TimeoutStore::new(StallingStore, Duration::from_millis(10));
        let err = store.get("users", "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_fast_calls_pass_through() {
        let store = TimeoutStore::new(MemoryStore::new(), Duration::from_secs(5));
        assert!(store.get("users", "u1").await.unwrap().is_none());
    }
}
