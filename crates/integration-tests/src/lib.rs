//! Integration tests for Splitlist.
//!
//! Scenario tests drive the engine end-to-end against the in-memory
//! store: multiple identities, the invite-join protocol, cascade deletes,
//! and the live feeds.
//!
//! # Test Categories
//!
//! - `join_protocol` - Invite-token validation and concurrent joins
//! - `list_lifecycle` - Creation, rules updates, cascade delete
//! - `assignment_policy` - Assignment and bought-state permissions
//! - `live_feeds` - Item/member subscriptions and their ordering
//! - `invite_flow` - Deep links across the authentication boundary
//!
//! Each test builds one or more [`TestContext`]s. Contexts created with
//! [`TestContext::fork`] share the same store but carry their own identity,
//! which is how multi-actor scenarios (concurrent joiners, permission
//! checks) are expressed.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use splitlist_core::Uid;
use splitlist_engine::LinkConfig;
use splitlist_engine::identity::{Identity, LocalIdentity};
use splitlist_engine::invite::InviteCoordinator;
use splitlist_engine::services::{ItemService, ListService, UserDirectory};
use splitlist_engine::store::MemoryStore;

/// A full engine wired to an in-memory store and a local identity.
pub struct TestContext {
    /// The shared store.
    pub store: Arc<MemoryStore>,
    /// This context's identity; one signed-in user at a time.
    pub identity: Arc<LocalIdentity>,
    /// Profile mirror and lookups.
    pub users: UserDirectory,
    /// List operations.
    pub lists: Arc<ListService>,
    /// Item operations and live views.
    pub items: ItemService,
    /// Deep-link coordinator.
    pub coordinator: Arc<InviteCoordinator>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// A context over a fresh store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Another actor over the same store.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self::with_store(self.store.clone())
    }

    fn with_store(store: Arc<MemoryStore>) -> Self {
        let identity = Arc::new(LocalIdentity::new());
        let users = UserDirectory::new(store.clone(), identity.clone());
        let lists = Arc::new(ListService::new(
            store.clone(),
            identity.clone(),
            LinkConfig::default(),
        ));
        let items = ItemService::new(store.clone(), identity.clone(), users.clone());
        let coordinator = Arc::new(InviteCoordinator::new(
            identity.clone(),
            lists.clone(),
            LinkConfig::default(),
        ));
        Self {
            store,
            identity,
            users,
            lists,
            items,
            coordinator,
        }
    }

    /// Sign in as `uid` and mirror the profile so member projections can
    /// resolve it.
    pub async fn sign_in(&self, uid: &str, display_name: &str) {
        self.sign_in_unmirrored(uid, display_name);
        self.users
            .sync_profile()
            .await
            .expect("profile mirror should succeed");
    }

    /// Sign in without mirroring the profile (for testing lookup misses).
    pub fn sign_in_unmirrored(&self, uid: &str, display_name: &str) {
        self.identity.sign_in(Identity {
            uid: Uid::from(uid),
            display_name: display_name.to_owned(),
            email: format!("{uid}@example.com"),
            phone_number: String::new(),
        });
    }
}

/// Shorthand uid constructor for assertions.
#[must_use]
pub fn uid(value: &str) -> Uid {
    Uid::from(value)
}

/// Opt into log output for a test run (`RUST_LOG=debug cargo test`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
