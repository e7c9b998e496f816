//! Shared shopping lists and their rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use splitlist_core::{InviteToken, ListId, Uid};

use crate::error::EngineError;
use crate::store::Document;

/// Who may assign items to members.
///
/// Two independent flags; nothing prevents both being set. Precedence is
/// defined by [`ShoppingList::may_assign`]: `only_host_assign` wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRules {
    /// Members may assign items (to themselves or others).
    pub self_assign: bool,
    /// Only the owner may assign, regardless of `self_assign`.
    pub only_host_assign: bool,
}

impl Default for ListRules {
    fn default() -> Self {
        Self {
            self_assign: true,
            only_host_assign: false,
        }
    }
}

/// A shared shopping list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    /// Document id.
    pub id: ListId,
    /// List name, set by the owner.
    pub name: String,
    /// Creator; never changes.
    pub owner_uid: Uid,
    /// Member uids. The owner holds full rights whether or not present.
    pub members: Vec<Uid>,
    /// The sole credential for joining; generated once at creation.
    pub invite_token: InviteToken,
    /// Assignment rules.
    #[serde(default)]
    pub rules: ListRules,
    /// Creation time (server-assigned).
    pub created_at: DateTime<Utc>,
    /// Last update (server-assigned).
    pub updated_at: DateTime<Utc>,
}

impl ShoppingList {
    /// Whether `uid` is the list owner.
    #[must_use]
    pub fn is_owner(&self, uid: &Uid) -> bool {
        self.owner_uid == *uid
    }

    /// Whether `uid` may act as a member.
    ///
    /// The owner counts as a member even when not physically stored in the
    /// member set.
    #[must_use]
    pub fn is_member(&self, uid: &Uid) -> bool {
        self.is_owner(uid) || self.members.contains(uid)
    }

    /// Assignment policy.
    ///
    /// `only_host_assign` restricts assignment to the owner regardless of
    /// `self_assign`; otherwise `self_assign` opens it to every member;
    /// otherwise owner only.
    #[must_use]
    pub fn may_assign(&self, uid: &Uid) -> bool {
        if self.rules.only_host_assign {
            self.is_owner(uid)
        } else if self.rules.self_assign {
            self.is_member(uid)
        } else {
            self.is_owner(uid)
        }
    }

    /// Decode a stored list document.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DataCorruption` if required fields are missing
    /// or malformed.
    pub fn from_document(doc: &Document) -> Result<Self, EngineError> {
        super::decode_with_id(doc, "shopping list")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list_with_rules(rules: ListRules) -> ShoppingList {
        ShoppingList {
            id: ListId::from("l1"),
            name: "Groceries".to_owned(),
            owner_uid: Uid::from("owner"),
            members: vec![Uid::from("owner"), Uid::from("member")],
            invite_token: InviteToken::from("tok"),
            rules,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_rules() {
        let rules = ListRules::default();
        assert!(rules.self_assign);
        assert!(!rules.only_host_assign);
    }

    #[test]
    fn test_owner_is_always_member() {
        let mut list = list_with_rules(ListRules::default());
        list.members.clear();
        assert!(list.is_member(&Uid::from("owner")));
        assert!(!list.is_member(&Uid::from("member")));
    }

    #[test]
    fn test_may_assign_precedence_matrix() {
        let owner = Uid::from("owner");
        let member = Uid::from("member");
        let stranger = Uid::from("stranger");

        // only_host_assign wins over self_assign in every combination.
        for self_assign in [false, true] {
            let list = list_with_rules(ListRules {
                self_assign,
                only_host_assign: true,
            });
            assert!(list.may_assign(&owner));
            assert!(!list.may_assign(&member));
        }

        // self_assign opens assignment to members, not strangers.
        let list = list_with_rules(ListRules {
            self_assign: true,
            only_host_assign: false,
        });
        assert!(list.may_assign(&owner));
        assert!(list.may_assign(&member));
        assert!(!list.may_assign(&stranger));

        // Both flags false: owner only.
        let list = list_with_rules(ListRules {
            self_assign: false,
            only_host_assign: false,
        });
        assert!(list.may_assign(&owner));
        assert!(!list.may_assign(&member));
    }

    #[test]
    fn test_from_document() {
        let doc = Document {
            id: "l9".to_owned(),
            fields: json!({
                "name": "Groceries",
                "ownerUid": "owner",
                "members": ["owner", "member"],
                "inviteToken": "tok",
                "rules": {"selfAssign": false, "onlyHostAssign": true},
                "createdAt": "2026-08-01T10:00:00Z",
                "updatedAt": "2026-08-02T11:30:00Z",
            })
            .as_object()
            .unwrap()
            .clone(),
        };

        let list = ShoppingList::from_document(&doc).unwrap();
        assert_eq!(list.id, ListId::from("l9"));
        assert!(list.rules.only_host_assign);
        assert!(list.invite_token.matches("tok"));
    }
}
