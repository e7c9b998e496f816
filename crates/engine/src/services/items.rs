//! Item lifecycle and live projections.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use splitlist_core::{ItemId, ListId, Price, Uid};

use crate::error::{EngineError, Result};
use crate::identity::{Identity, IdentityProvider};
use crate::models::{ShoppingItem, ShoppingList, User, to_wire};
use crate::services::UserDirectory;
use crate::store::{
    Document, DocumentStore, FieldWrite, Filter, Patch, Subscription, collections,
};

/// Input for a new item. Numeric fields are lenient: an absent (or zero)
/// quantity defaults to 1, an absent price to 0.
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Item name; must be non-blank after trimming.
    pub name: String,
    /// How many to buy.
    pub quantity: Option<u32>,
    /// Planned price.
    pub estimated_price: Option<Price>,
}

/// Partial update to an item's descriptive fields.
///
/// Assignment, bought state, and the actual price have their own
/// operations and are not part of this update.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    /// New name.
    pub name: Option<String>,
    /// New quantity (zero treated as 1).
    pub quantity: Option<u32>,
    /// New planned price.
    pub estimated_price: Option<Price>,
}

/// Item operations and the live item/member views of a list.
#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    directory: UserDirectory,
}

impl ItemService {
    /// Create a service over the given capabilities.
    ///
    /// The [`UserDirectory`] resolves member uids for
    /// [`watch_members`](Self::watch_members).
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        directory: UserDirectory,
    ) -> Self {
        Self {
            store,
            identity,
            directory,
        }
    }

    fn require_identity(&self) -> Result<Identity> {
        self.identity.current().ok_or(EngineError::Unauthenticated)
    }

    async fn fetch_item(&self, item_id: &ItemId) -> Result<ShoppingItem> {
        let doc = self
            .store
            .get(collections::ITEMS, item_id.as_str())
            .await?
            .ok_or(EngineError::NotFound)?;
        ShoppingItem::from_document(&doc)
    }

    async fn fetch_list(&self, list_id: &ListId) -> Result<ShoppingList> {
        let doc = self
            .store
            .get(collections::LISTS, list_id.as_str())
            .await?
            .ok_or(EngineError::NotFound)?;
        ShoppingList::from_document(&doc)
    }

    /// Add an item to a list.
    ///
    /// List-level create is unrestricted: any authenticated caller may add
    /// to a list it can reference.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an identity; `NotFound` for a missing
    /// list; `InvalidInput` for a blank name.
    #[instrument(skip(self, new_item))]
    pub async fn add_item(&self, list_id: &ListId, new_item: NewItem) -> Result<ItemId> {
        let identity = self.require_identity()?;
        let name = new_item.name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput(
                "item name must not be blank".to_owned(),
            ));
        }
        // Items never dangle; the parent list must exist.
        self.fetch_list(list_id).await?;

        let quantity = new_item.quantity.filter(|q| *q >= 1).unwrap_or(1);
        let estimated = new_item.estimated_price.unwrap_or(Price::ZERO);

        let mut patch = Patch::new();
        patch.insert(
            "listId".to_owned(),
            FieldWrite::Set(Value::String(list_id.as_str().to_owned())),
        );
        patch.insert(
            "name".to_owned(),
            FieldWrite::Set(Value::String(name.to_owned())),
        );
        patch.insert(
            "quantity".to_owned(),
            FieldWrite::Set(Value::from(quantity)),
        );
        patch.insert(
            "estimatedPrice".to_owned(),
            FieldWrite::Set(to_wire(&estimated)?),
        );
        patch.insert("actualPrice".to_owned(), FieldWrite::Set(Value::Null));
        patch.insert("assignedTo".to_owned(), FieldWrite::Set(Value::Null));
        patch.insert("assignedToName".to_owned(), FieldWrite::Set(Value::Null));
        patch.insert("isBought".to_owned(), FieldWrite::Set(Value::Bool(false)));
        patch.insert(
            "createdBy".to_owned(),
            FieldWrite::Set(Value::String(identity.uid.as_str().to_owned())),
        );
        patch.insert("createdAt".to_owned(), FieldWrite::ServerTimestamp);
        patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);

        let id = self.store.create(collections::ITEMS, patch).await?;
        info!(item_id = %id, list_id = %list_id, "Shopping item created");
        Ok(ItemId::new(id))
    }

    /// Update an item's descriptive fields. Creator or list owner only.
    ///
    /// Partial: only supplied fields change. Always restamps `updatedAt`.
    ///
    /// # Errors
    ///
    /// `Forbidden` without edit permission; `NotFound` for a missing item;
    /// `InvalidInput` for a blank name.
    #[instrument(skip(self, update))]
    pub async fn update_item(&self, item_id: &ItemId, update: ItemUpdate) -> Result<()> {
        let identity = self.require_identity()?;
        let item = self.fetch_item(item_id).await?;
        let list = self.fetch_list(&item.list_id).await?;
        if !item.can_edit(&identity.uid, &list) {
            return Err(EngineError::Forbidden);
        }

        let mut patch = Patch::new();
        if let Some(name) = update.name {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(EngineError::InvalidInput(
                    "item name must not be blank".to_owned(),
                ));
            }
            patch.insert("name".to_owned(), FieldWrite::Set(Value::String(name)));
        }
        if let Some(quantity) = update.quantity {
            patch.insert(
                "quantity".to_owned(),
                FieldWrite::Set(Value::from(quantity.max(1))),
            );
        }
        if let Some(estimated) = update.estimated_price {
            patch.insert(
                "estimatedPrice".to_owned(),
                FieldWrite::Set(to_wire(&estimated)?),
            );
        }
        patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);

        self.store
            .update(collections::ITEMS, item_id.as_str(), patch)
            .await?;
        Ok(())
    }

    /// Delete an item. Creator or list owner only.
    ///
    /// # Errors
    ///
    /// `Forbidden` without edit permission; `NotFound` for a missing item.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: &ItemId) -> Result<()> {
        let identity = self.require_identity()?;
        let item = self.fetch_item(item_id).await?;
        let list = self.fetch_list(&item.list_id).await?;
        if !item.can_edit(&identity.uid, &list) {
            return Err(EngineError::Forbidden);
        }

        self.store
            .delete(collections::ITEMS, item_id.as_str())
            .await?;
        info!(item_id = %item_id, "Shopping item deleted");
        Ok(())
    }

    /// Assign an item to a member, or clear the assignment with `None`.
    ///
    /// Authorization follows the parent list's rules (see
    /// [`ShoppingList::may_assign`]). The assignee's display name is
    /// denormalized next to the uid; both are set or cleared together.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the list's rules do not allow the caller to
    /// assign; `NotFound` for a missing item.
    #[instrument(skip(self, target))]
    pub async fn assign(&self, item_id: &ItemId, target: Option<(Uid, String)>) -> Result<()> {
        let identity = self.require_identity()?;
        let item = self.fetch_item(item_id).await?;
        let list = self.fetch_list(&item.list_id).await?;
        if !list.may_assign(&identity.uid) {
            return Err(EngineError::Forbidden);
        }

        let mut patch = Patch::new();
        match target {
            Some((uid, display_name)) => {
                patch.insert(
                    "assignedTo".to_owned(),
                    FieldWrite::Set(Value::String(uid.as_str().to_owned())),
                );
                patch.insert(
                    "assignedToName".to_owned(),
                    FieldWrite::Set(Value::String(display_name)),
                );
                debug!(item_id = %item_id, assignee = %uid, "Item assigned");
            }
            None => {
                patch.insert("assignedTo".to_owned(), FieldWrite::Set(Value::Null));
                patch.insert("assignedToName".to_owned(), FieldWrite::Set(Value::Null));
                debug!(item_id = %item_id, "Assignment cleared");
            }
        }
        patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);

        self.store
            .update(collections::ITEMS, item_id.as_str(), patch)
            .await?;
        Ok(())
    }

    /// Set the bought state. Assignee only, unless the item is unassigned.
    ///
    /// A pure, idempotent toggle; the actual price is a separate
    /// operation.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the item is assigned to someone else; `NotFound`
    /// for a missing item.
    #[instrument(skip(self))]
    pub async fn set_bought(&self, item_id: &ItemId, is_bought: bool) -> Result<()> {
        let identity = self.require_identity()?;
        let item = self.fetch_item(item_id).await?;
        if !item.can_mark_bought(&identity.uid) {
            return Err(EngineError::Forbidden);
        }

        let mut patch = Patch::new();
        patch.insert(
            "isBought".to_owned(),
            FieldWrite::Set(Value::Bool(is_bought)),
        );
        patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);

        self.store
            .update(collections::ITEMS, item_id.as_str(), patch)
            .await?;
        Ok(())
    }

    /// Record (or clear) the price actually paid.
    ///
    /// Independent of [`set_bought`](Self::set_bought); the presentation
    /// layer calls both when a user supplies a price at the moment of
    /// marking bought.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an identity; `NotFound` for a missing
    /// item.
    #[instrument(skip(self))]
    pub async fn set_actual_price(&self, item_id: &ItemId, price: Option<Price>) -> Result<()> {
        self.require_identity()?;

        let mut patch = Patch::new();
        let value = match price {
            Some(price) => to_wire(&price)?,
            None => Value::Null,
        };
        patch.insert("actualPrice".to_owned(), FieldWrite::Set(value));
        patch.insert("updatedAt".to_owned(), FieldWrite::ServerTimestamp);

        self.store
            .update(collections::ITEMS, item_id.as_str(), patch)
            .await?;
        Ok(())
    }

    /// Live view of a list's items.
    ///
    /// Each snapshot is the full current set, ordered for display:
    /// unbought before bought, then alphabetical by name.
    ///
    /// # Errors
    ///
    /// A store error at subscription setup.
    pub async fn watch_items(&self, list_id: &ListId) -> Result<ItemsFeed> {
        let subscription = self
            .store
            .subscribe(
                collections::ITEMS,
                Filter::Eq(
                    "listId".to_owned(),
                    Value::String(list_id.as_str().to_owned()),
                ),
            )
            .await?;
        Ok(ItemsFeed {
            inner: subscription,
        })
    }

    /// Live view of a list's members, owner included, resolved to
    /// profiles.
    ///
    /// Uids whose profile lookup fails or is missing are silently omitted
    /// from the snapshot - a deliberate best-effort policy for this
    /// read-side projection.
    ///
    /// # Errors
    ///
    /// A store error at subscription setup.
    pub async fn watch_members(&self, list_id: &ListId) -> Result<MembersFeed> {
        let subscription = self
            .store
            .watch_document(collections::LISTS, list_id.as_str())
            .await?;
        Ok(MembersFeed {
            inner: subscription,
            directory: self.directory.clone(),
        })
    }
}

/// Live, display-ordered view of a list's items.
pub struct ItemsFeed {
    inner: Subscription,
}

impl ItemsFeed {
    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<Result<Vec<ShoppingItem>>> {
        let docs = self.inner.next().await?;
        Some(decode_ordered(&docs))
    }
}

fn decode_ordered(docs: &[Document]) -> Result<Vec<ShoppingItem>> {
    let mut items = docs
        .iter()
        .map(ShoppingItem::from_document)
        .collect::<Result<Vec<_>>>()?;
    items.sort_by(ShoppingItem::display_order);
    Ok(items)
}

/// Live view of a list's members as resolved profiles.
pub struct MembersFeed {
    inner: Subscription,
    directory: UserDirectory,
}

impl MembersFeed {
    /// Wait for the next member snapshot.
    ///
    /// Returns `None` once the store side has gone away. A deleted list
    /// yields an empty snapshot.
    pub async fn next(&mut self) -> Option<Result<Vec<User>>> {
        let docs = self.inner.next().await?;
        let Some(doc) = docs.first() else {
            return Some(Ok(Vec::new()));
        };
        let list = match ShoppingList::from_document(doc) {
            Ok(list) => list,
            Err(err) => return Some(Err(err)),
        };

        // Owner first, then members, deduplicated.
        let mut uids: Vec<Uid> = vec![list.owner_uid.clone()];
        for uid in &list.members {
            if !uids.contains(uid) {
                uids.push(uid.clone());
            }
        }

        let mut users = Vec::with_capacity(uids.len());
        for uid in &uids {
            match self.directory.get(uid).await {
                Ok(Some(user)) => users.push(user),
                Ok(None) => debug!(uid = %uid, "Member has no mirrored profile, omitting"),
                Err(err) => warn!(uid = %uid, error = %err, "Member lookup failed, omitting"),
            }
        }
        Some(Ok(users))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::identity::LocalIdentity;
    use crate::models::ListRules;
    use crate::services::ListService;
    use crate::store::MemoryStore;

    struct Harness {
        identity: Arc<LocalIdentity>,
        lists: ListService,
        items: ItemService,
    }

    fn harness() -> Harness {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let identity = Arc::new(LocalIdentity::new());
        let directory = UserDirectory::new(store.clone(), identity.clone());
        Harness {
            identity: identity.clone(),
            lists: ListService::new(store.clone(), identity.clone(), LinkConfig::default()),
            items: ItemService::new(store, identity, directory),
        }
    }

    fn identity_for(uid: &str) -> Identity {
        Identity {
            uid: Uid::from(uid),
            display_name: uid.to_uppercase(),
            email: format!("{uid}@example.com"),
            phone_number: String::new(),
        }
    }

    fn new_item(name: &str) -> NewItem {
        NewItem {
            name: name.to_owned(),
            quantity: None,
            estimated_price: None,
        }
    }

    async fn list_owned_by(h: &Harness, uid: &str) -> ListId {
        h.identity.sign_in(identity_for(uid));
        h.lists
            .create_list("Groceries", ListRules::default())
            .await
            .unwrap()
    }

    async fn fetch(h: &Harness, item_id: &ItemId) -> ShoppingItem {
        h.items.fetch_item(item_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_item_defaults() {
        let h = harness();
        let list_id = list_owned_by(&h, "a").await;

        let item_id = h
            .items
            .add_item(
                &list_id,
                NewItem {
                    name: "  Milk  ".to_owned(),
                    quantity: Some(0),
                    estimated_price: None,
                },
            )
            .await
            .unwrap();

        let item = fetch(&h, &item_id).await;
        assert_eq!(item.name, "Milk");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.estimated_price, Price::ZERO);
        assert!(!item.is_bought);
        assert!(item.assigned_to.is_none());
        assert_eq!(item.created_by, Uid::from("a"));
    }

    #[tokio::test]
    async fn test_add_item_rejects_blank_name() {
        let h = harness();
        let list_id = list_owned_by(&h, "a").await;
        assert!(matches!(
            h.items.add_item(&list_id, new_item("   ")).await,
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_add_item_to_missing_list() {
        let h = harness();
        h.identity.sign_in(identity_for("a"));
        assert!(matches!(
            h.items.add_item(&ListId::from("ghost"), new_item("Milk")).await,
            Err(EngineError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_item_permissions() {
        let h = harness();
        let list_id = list_owned_by(&h, "owner").await;
        let token = h.lists.get_list(&list_id).await.unwrap().invite_token;

        h.identity.sign_in(identity_for("creator"));
        h.lists
            .join_by_token(&list_id, token.as_str())
            .await
            .unwrap();
        let item_id = h.items.add_item(&list_id, new_item("Milk")).await.unwrap();

        // Another member is neither creator nor owner.
        h.identity.sign_in(identity_for("other"));
        h.lists
            .join_by_token(&list_id, token.as_str())
            .await
            .unwrap();
        let err = h
            .items
            .update_item(
                &item_id,
                ItemUpdate {
                    name: Some("Oat milk".to_owned()),
                    ..ItemUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden));

        // The list owner may edit any item.
        h.identity.sign_in(identity_for("owner"));
        h.items
            .update_item(
                &item_id,
                ItemUpdate {
                    quantity: Some(3),
                    ..ItemUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(fetch(&h, &item_id).await.quantity, 3);
    }

    #[tokio::test]
    async fn test_assign_and_clear() {
        let h = harness();
        let list_id = list_owned_by(&h, "owner").await;
        let item_id = h.items.add_item(&list_id, new_item("Milk")).await.unwrap();

        h.items
            .assign(&item_id, Some((Uid::from("owner"), "OWNER".to_owned())))
            .await
            .unwrap();
        let item = fetch(&h, &item_id).await;
        assert_eq!(item.assigned_to, Some(Uid::from("owner")));
        assert_eq!(item.assigned_to_name.as_deref(), Some("OWNER"));

        h.items.assign(&item_id, None).await.unwrap();
        let item = fetch(&h, &item_id).await;
        assert!(item.assigned_to.is_none());
        assert!(item.assigned_to_name.is_none());
    }

    #[tokio::test]
    async fn test_set_bought_is_idempotent() {
        let h = harness();
        let list_id = list_owned_by(&h, "a").await;
        let item_id = h.items.add_item(&list_id, new_item("Milk")).await.unwrap();

        h.items.set_bought(&item_id, true).await.unwrap();
        let once = fetch(&h, &item_id).await;
        h.items.set_bought(&item_id, true).await.unwrap();
        let twice = fetch(&h, &item_id).await;

        assert!(once.is_bought);
        assert!(twice.is_bought);
        assert_eq!(once.actual_price, twice.actual_price);
        assert_eq!(once.assigned_to, twice.assigned_to);
    }

    #[tokio::test]
    async fn test_set_bought_does_not_touch_actual_price() {
        let h = harness();
        let list_id = list_owned_by(&h, "a").await;
        let item_id = h.items.add_item(&list_id, new_item("Milk")).await.unwrap();

        h.items
            .set_actual_price(&item_id, Some(Price::parse_lenient("3.20")))
            .await
            .unwrap();
        h.items.set_bought(&item_id, true).await.unwrap();

        let item = fetch(&h, &item_id).await;
        assert_eq!(item.actual_price, Some(Price::parse_lenient("3.20")));
    }
}
