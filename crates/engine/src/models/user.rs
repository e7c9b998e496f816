//! User profile mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use splitlist_core::Uid;

use crate::error::EngineError;
use crate::store::Document;

/// A user profile mirrored from the identity provider.
///
/// Identity is `uid`; profile fields are refreshed on every successful
/// sign-in. Users are never deleted by this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable unique identifier from the identity provider.
    pub uid: Uid,
    /// Display name, possibly empty.
    pub display_name: String,
    /// Email address, possibly empty.
    pub email: String,
    /// Phone number, possibly empty.
    #[serde(default)]
    pub phone_number: String,
    /// First sign-in (server-assigned).
    pub created_at: DateTime<Utc>,
    /// Last profile refresh (server-assigned).
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Decode a stored profile document.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DataCorruption` if required fields are missing
    /// or malformed.
    pub fn from_document(doc: &Document) -> Result<Self, EngineError> {
        // Profiles store their uid as a field; the document id matches it.
        serde_json::from_value(serde_json::Value::Object(doc.fields.clone())).map_err(|e| {
            EngineError::DataCorruption(format!("invalid user document {}: {e}", doc.id))
        })
    }
}
