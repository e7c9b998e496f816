//! In-process identity provider.

use tokio::sync::watch;
use tracing::debug;

use super::{Identity, IdentityProvider};

/// An identity provider driven directly by the embedding process.
///
/// Backs the test suite and shells that manage authentication themselves
/// and push the resulting identity into the engine.
pub struct LocalIdentity {
    tx: watch::Sender<Option<Identity>>,
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentity {
    /// Create a signed-out provider.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Establish `identity` as the current identity.
    pub fn sign_in(&self, identity: Identity) {
        debug!(uid = %identity.uid, "Identity signed in");
        self.tx.send_replace(Some(identity));
    }

    /// Clear the current identity.
    pub fn sign_out(&self) {
        debug!("Identity signed out");
        self.tx.send_replace(None);
    }
}

impl IdentityProvider for LocalIdentity {
    fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}
