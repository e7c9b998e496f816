//! List lifecycle, membership, and the invite-join protocol.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use splitlist_core::{InviteToken, ListId};

use crate::config::LinkConfig;
use crate::error::{EngineError, Result};
use crate::identity::{Identity, IdentityProvider};
use crate::invite::link;
use crate::models::{ListRules, ShoppingList, to_wire};
use crate::store::{
    Document, DocumentStore, FieldWrite, Filter, Patch, Subscription, WriteBatch, collections,
};

/// Partial update to a list; owner only.
#[derive(Debug, Clone, Default)]
pub struct ListUpdate {
    /// New list name.
    pub name: Option<String>,
    /// New assignment rules.
    pub rules: Option<ListRules>,
}

/// List operations: creation, rules, deletion, and the join protocol.
pub struct ListService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    link: LinkConfig,
}

impl ListService {
    /// Create a service over the given capabilities.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        link: LinkConfig,
    ) -> Self {
        Self {
            store,
            identity,
            link,
        }
    }

    fn require_identity(&self) -> Result<Identity> {
        self.identity.current().ok_or(EngineError::Unauthenticated)
    }

    /// Fetch and decode a list.
    ///
    /// # Errors
    ///
    /// `EngineError::NotFound` if the list does not exist.
    pub async fn get_list(&self, list_id: &ListId) -> Result<ShoppingList> {
        let doc = self
            .store
            .get(collections::LISTS, list_id.as_str())
            .await?
            .ok_or(EngineError::NotFound)?;
        ShoppingList::from_document(&doc)
    }

    /// Create a list owned by the current identity.
    ///
    /// Generates a fresh invite token and initializes the member set to
    /// the owner alone.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an identity; `InvalidInput` for a blank
    /// name.
    #[instrument(skip(self, name))]
    pub async fn create_list(&self, name: &str, rules: ListRules) -> Result<ListId> {
        let identity = self.require_identity()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput(
                "list name must not be blank".to_owned(),
            ));
        }

        let token = InviteToken::generate();
        let mut patch = Patch::new();
        patch.insert(
            "name".to_owned(),
            FieldWrite::Set(Value::String(name.to_owned())),
        );
        patch.insert(
            "ownerUid".to_owned(),
            FieldWrite::Set(Value::String(identity.uid.as_str().to_owned())),
        );
        patch.insert(
            "members".to_owned(),
            FieldWrite::Set(Value::Array(vec![Value::String(
                identity.uid.as_str().to_owned(),
            )])),
        );
        patch.insert(
            "inviteToken".to_owned(),
            FieldWrite::Set(Value::String(token.into_inner())),
        );
        patch.insert("rules".to_owned(), FieldWrite::Set(to_wire(&rules)?));
        patch.insert("createdAt".to_owned(), FieldWrite::ServerTimestamp);
        patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);

        let id = self.store.create(collections::LISTS, patch).await?;
        info!(list_id = %id, owner = %identity.uid, "Shopping list created");
        Ok(ListId::new(id))
    }

    /// Rename a list or change its rules. Owner only.
    ///
    /// Always restamps `updatedAt`.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-owners; `NotFound` for a missing list;
    /// `InvalidInput` for a blank name.
    #[instrument(skip(self, update))]
    pub async fn update_list(&self, list_id: &ListId, update: ListUpdate) -> Result<()> {
        let identity = self.require_identity()?;
        let list = self.get_list(list_id).await?;
        if !list.is_owner(&identity.uid) {
            return Err(EngineError::Forbidden);
        }

        let mut patch = Patch::new();
        if let Some(name) = update.name {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(EngineError::InvalidInput(
                    "list name must not be blank".to_owned(),
                ));
            }
            patch.insert("name".to_owned(), FieldWrite::Set(Value::String(name)));
        }
        if let Some(rules) = update.rules {
            patch.insert("rules".to_owned(), FieldWrite::Set(to_wire(&rules)?));
        }
        patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);

        self.store
            .update(collections::LISTS, list_id.as_str(), patch)
            .await?;
        Ok(())
    }

    /// Delete a list and every item that belongs to it. Owner only.
    ///
    /// The items and the list document go in one batch; an interrupted
    /// delete leaves either everything or nothing.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-owners; `NotFound` for a missing list.
    #[instrument(skip(self))]
    pub async fn delete_list(&self, list_id: &ListId) -> Result<()> {
        let identity = self.require_identity()?;
        let list = self.get_list(list_id).await?;
        if !list.is_owner(&identity.uid) {
            return Err(EngineError::Forbidden);
        }

        let items = self
            .store
            .query(
                collections::ITEMS,
                Filter::Eq(
                    "listId".to_owned(),
                    Value::String(list_id.as_str().to_owned()),
                ),
            )
            .await?;

        let mut batch = WriteBatch::new();
        for doc in &items {
            batch.delete(collections::ITEMS, &doc.id);
        }
        batch.delete(collections::LISTS, list_id.as_str());
        self.store.commit(batch).await?;

        info!(list_id = %list_id, item_count = items.len(), "Shopping list deleted");
        Ok(())
    }

    /// Join a list with its invite token.
    ///
    /// Preconditions, checked in order, each a distinct failure:
    /// 1. an authenticated identity (`Unauthenticated`)
    /// 2. the list exists (`NotFound`)
    /// 3. the token matches exactly (`InvalidToken`)
    /// 4. the caller is neither owner nor member (`AlreadyMember`)
    ///
    /// The member append is an atomic set-union: two concurrent joiners
    /// both land in the member set.
    #[instrument(skip(self, token))]
    pub async fn join_by_token(&self, list_id: &ListId, token: &str) -> Result<()> {
        let identity = self.require_identity()?;
        let list = self.get_list(list_id).await?;

        if !list.invite_token.matches(token) {
            warn!(list_id = %list_id, uid = %identity.uid, "Join rejected: invalid token");
            return Err(EngineError::InvalidToken);
        }
        if list.is_member(&identity.uid) {
            return Err(EngineError::AlreadyMember);
        }

        let mut patch = Patch::new();
        patch.insert(
            "members".to_owned(),
            FieldWrite::ArrayUnion(vec![Value::String(identity.uid.as_str().to_owned())]),
        );
        self.store
            .update(collections::LISTS, list_id.as_str(), patch)
            .await?;

        info!(list_id = %list_id, uid = %identity.uid, "Joined shopping list");
        Ok(())
    }

    /// Live view of the current identity's lists.
    ///
    /// Snapshots arrive most-recently-updated first.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an identity, or a store error at setup.
    pub async fn watch_lists(&self) -> Result<ListsFeed> {
        let identity = self.require_identity()?;
        let subscription = self
            .store
            .subscribe(
                collections::LISTS,
                Filter::ArrayContains(
                    "members".to_owned(),
                    Value::String(identity.uid.as_str().to_owned()),
                ),
            )
            .await?;
        Ok(ListsFeed {
            inner: subscription,
        })
    }

    /// Human-readable invite payload for out-of-band sharing.
    ///
    /// Contains the list name and both recognized URL forms.
    #[must_use]
    pub fn share_message(&self, list: &ShoppingList) -> String {
        let https_url = link::https_url(&self.link, &list.id, &list.invite_token);
        let app_url = link::custom_url(&self.link, &list.id, &list.invite_token);
        format!(
            "Join my shopping list \"{}\"!\n\nLink: {https_url}\n\nOr open directly in the app: {app_url}",
            list.name
        )
    }
}

/// Live view of the current user's lists, most recently updated first.
pub struct ListsFeed {
    inner: Subscription,
}

impl ListsFeed {
    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<Result<Vec<ShoppingList>>> {
        let docs = self.inner.next().await?;
        Some(decode_sorted(&docs))
    }
}

fn decode_sorted(docs: &[Document]) -> Result<Vec<ShoppingList>> {
    let mut lists = docs
        .iter()
        .map(ShoppingList::from_document)
        .collect::<Result<Vec<_>>>()?;
    lists.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(lists)
}
