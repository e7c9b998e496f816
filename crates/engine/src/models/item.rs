//! Shopping items.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use splitlist_core::{ItemId, ListId, Price, Uid};

use crate::error::EngineError;
use crate::models::ShoppingList;
use crate::store::Document;

/// One item on a shopping list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    /// Document id.
    pub id: ItemId,
    /// The owning list. Items are never shared across lists.
    pub list_id: ListId,
    /// Item name.
    pub name: String,
    /// How many to buy; at least 1.
    pub quantity: u32,
    /// Planned price, 0 when unknown.
    pub estimated_price: Price,
    /// Price actually paid, usually recorded when the item is bought.
    #[serde(default)]
    pub actual_price: Option<Price>,
    /// Member responsible for buying, if assigned.
    #[serde(default)]
    pub assigned_to: Option<Uid>,
    /// Display name of the assignee, denormalized at assignment time.
    ///
    /// Goes stale if the assignee later renames themselves; nothing
    /// refreshes it retroactively.
    #[serde(default)]
    pub assigned_to_name: Option<String>,
    /// Whether the item has been bought.
    pub is_bought: bool,
    /// Member who created the item.
    pub created_by: Uid,
    /// Creation time (server-assigned).
    pub created_at: DateTime<Utc>,
    /// Last update (server-assigned).
    pub updated_at: DateTime<Utc>,
}

impl ShoppingItem {
    /// Whether `actor` may edit or delete this item: its creator or the
    /// list owner.
    #[must_use]
    pub fn can_edit(&self, actor: &Uid, list: &ShoppingList) -> bool {
        self.created_by == *actor || list.is_owner(actor)
    }

    /// Whether `actor` may toggle the bought state.
    ///
    /// Unassigned items are free-for-all; assigned items only by their
    /// assignee.
    #[must_use]
    pub fn can_mark_bought(&self, actor: &Uid) -> bool {
        self.assigned_to
            .as_ref()
            .is_none_or(|assignee| assignee == actor)
    }

    /// Display order: unbought before bought, then alphabetical by name.
    ///
    /// Applied to every delivered snapshot; the store itself does not
    /// order items.
    #[must_use]
    pub fn display_order(a: &Self, b: &Self) -> Ordering {
        a.is_bought
            .cmp(&b.is_bought)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    }

    /// Decode a stored item document.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DataCorruption` if required fields are missing
    /// or malformed.
    pub fn from_document(doc: &Document) -> Result<Self, EngineError> {
        super::decode_with_id(doc, "shopping item")
    }
}
