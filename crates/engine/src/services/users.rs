//! Profile mirror of the identity provider.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument};

use splitlist_core::Uid;

use crate::error::{EngineError, Result};
use crate::identity::IdentityProvider;
use crate::models::User;
use crate::store::{DocumentStore, FieldWrite, Patch, collections};

/// Bounded cache for member-profile lookups.
const PROFILE_CACHE_CAPACITY: u64 = 1024;
const PROFILE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Partial profile update for the current identity.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name.
    pub display_name: Option<String>,
    /// New phone number.
    pub phone_number: Option<String>,
}

impl ProfileUpdate {
    fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.phone_number.is_none()
    }
}

/// Mirrors identity-provider profiles into the `users` collection and
/// resolves uids to profiles for read projections.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    cache: moka::future::Cache<Uid, User>,
}

impl UserDirectory {
    /// Create a directory over the given capabilities.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            cache: moka::future::Cache::builder()
                .max_capacity(PROFILE_CACHE_CAPACITY)
                .time_to_live(PROFILE_CACHE_TTL)
                .build(),
        }
    }

    /// Mirror the current identity's profile into the store.
    ///
    /// Creates the profile on first sign-in; refreshes `displayName` and
    /// `email` (and `updatedAt`) on subsequent ones.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unauthenticated` without a current identity,
    /// or a store error.
    #[instrument(skip(self))]
    pub async fn sync_profile(&self) -> Result<User> {
        let identity = self
            .identity
            .current()
            .ok_or(EngineError::Unauthenticated)?;
        let uid = identity.uid.clone();

        let existing = self.store.get(collections::USERS, uid.as_str()).await?;
        if existing.is_some() {
            let mut patch = Patch::new();
            patch.insert(
                "displayName".to_owned(),
                FieldWrite::Set(Value::String(identity.display_name)),
            );
            patch.insert(
                "email".to_owned(),
                FieldWrite::Set(Value::String(identity.email)),
            );
            patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);
            self.store
                .update(collections::USERS, uid.as_str(), patch)
                .await?;
            debug!(uid = %uid, "User profile updated");
        } else {
            let mut patch = Patch::new();
            patch.insert(
                "uid".to_owned(),
                FieldWrite::Set(Value::String(uid.as_str().to_owned())),
            );
            patch.insert(
                "displayName".to_owned(),
                FieldWrite::Set(Value::String(identity.display_name)),
            );
            patch.insert(
                "email".to_owned(),
                FieldWrite::Set(Value::String(identity.email)),
            );
            patch.insert(
                "phoneNumber".to_owned(),
                FieldWrite::Set(Value::String(identity.phone_number)),
            );
            patch.insert("createdAt".to_owned(), FieldWrite::ServerTimestamp);
            patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);
            self.store
                .set(collections::USERS, uid.as_str(), patch)
                .await?;
            debug!(uid = %uid, "User profile created");
        }

        self.cache.invalidate(&uid).await;
        let doc = self
            .store
            .get(collections::USERS, uid.as_str())
            .await?
            .ok_or(EngineError::NotFound)?;
        User::from_document(&doc)
    }

    /// Apply a partial profile update for the current identity.
    ///
    /// Always restamps `updatedAt`, even for an empty update.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unauthenticated` without a current identity,
    /// `EngineError::NotFound` if the profile was never mirrored.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<()> {
        let identity = self
            .identity
            .current()
            .ok_or(EngineError::Unauthenticated)?;

        if update.is_empty() {
            debug!(uid = %identity.uid, "Empty profile update");
        }
        let mut patch = Patch::new();
        if let Some(display_name) = update.display_name {
            patch.insert(
                "displayName".to_owned(),
                FieldWrite::Set(Value::String(display_name)),
            );
        }
        if let Some(phone_number) = update.phone_number {
            patch.insert(
                "phoneNumber".to_owned(),
                FieldWrite::Set(Value::String(phone_number)),
            );
        }
        patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);

        self.store
            .update(collections::USERS, identity.uid.as_str(), patch)
            .await?;
        self.cache.invalidate(&identity.uid).await;
        Ok(())
    }

    /// Resolve a uid to its profile, if mirrored.
    ///
    /// Lookups are cached briefly; the members projection calls this once
    /// per member per snapshot.
    ///
    /// # Errors
    ///
    /// Returns a store error; an absent profile is `Ok(None)`.
    pub async fn get(&self, uid: &Uid) -> Result<Option<User>> {
        if let Some(user) = self.cache.get(uid).await {
            return Ok(Some(user));
        }

        let Some(doc) = self.store.get(collections::USERS, uid.as_str()).await? else {
            return Ok(None);
        };
        let user = User::from_document(&doc)?;
        self.cache.insert(uid.clone(), user.clone()).await;
        Ok(Some(user))
    }
}
