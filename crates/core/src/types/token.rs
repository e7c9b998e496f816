//! Invite token type.
//!
//! The sole credential for joining a shared list. Generated once at list
//! creation and compared with exact, case-sensitive string equality.

use core::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// An opaque invite token.
///
/// Tokens are 128-bit cryptographically random values encoded with
/// URL-safe base64 (no padding) so they can be embedded directly in
/// invite links. The value is stored on the list document and presented
/// by joiners; validation is exact string equality.
///
/// `Debug` redacts the value to keep tokens out of logs. Use [`as_str`]
/// when building share links.
///
/// [`as_str`]: InviteToken::as_str
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteToken(String);

impl InviteToken {
    /// Number of random bytes backing a generated token.
    pub const BYTE_LENGTH: usize = 16;

    /// Generate a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::BYTE_LENGTH];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap an existing token value (e.g. one parsed from an invite link).
    #[must_use]
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    /// Get the token value for use in invite links.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token and return its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Compare against a presented token value.
    ///
    /// Exact, case-sensitive string equality; there is no normalization.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        self.0 == presented
    }
}

impl fmt::Debug for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InviteToken").field(&"[REDACTED]").finish()
    }
}

impl From<String> for InviteToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for InviteToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
