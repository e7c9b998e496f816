//! Pending-invite coordination across the authentication boundary.
//!
//! A deep link can arrive before the user is signed in. The coordinator
//! holds the parsed `(listId, token)` pair, waits for an identity, then
//! consumes it through the join protocol. A sign-out while holding state
//! clears it, so no stale invite survives a logout/login cycle by a
//! different user.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use splitlist_core::ListId;

use crate::config::LinkConfig;
use crate::error::{EngineError, Result};
use crate::identity::IdentityProvider;
use crate::invite::InviteLink;
use crate::services::ListService;

/// Where a received invite currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteFlow {
    /// No invite in flight.
    Idle,
    /// A link has been received and is about to be routed.
    LinkReceived(InviteLink),
    /// Waiting for sign-in before the held invite can be consumed.
    AwaitingAuth(InviteLink),
    /// Join in progress.
    Consuming(InviteLink),
    /// Terminal: joined the list. Held state is cleared.
    Joined(ListId),
    /// Terminal: the join failed. Held state is cleared; the message is
    /// surfaced to the user by the presentation layer.
    Failed(String),
}

/// Reconciles "authenticate before join" for invite deep links.
///
/// Spawn [`run`](Self::run) once per session to react to identity
/// changes; observe progress through [`watch`](Self::watch).
pub struct InviteCoordinator {
    identity: Arc<dyn IdentityProvider>,
    lists: Arc<ListService>,
    link: LinkConfig,
    state: watch::Sender<InviteFlow>,
}

impl InviteCoordinator {
    /// Create a coordinator over the given capabilities.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        lists: Arc<ListService>,
        link: LinkConfig,
    ) -> Self {
        let (state, _rx) = watch::channel(InviteFlow::Idle);
        Self {
            identity,
            lists,
            link,
            state,
        }
    }

    /// Observe flow-state changes.
    pub fn watch(&self) -> watch::Receiver<InviteFlow> {
        self.state.subscribe()
    }

    /// The current flow state.
    #[must_use]
    pub fn state(&self) -> InviteFlow {
        self.state.borrow().clone()
    }

    /// Handle a deep-link URI from app launch or resume.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a URI that is not a well-formed invite link;
    /// the flow state is left untouched in that case.
    pub async fn handle_uri(&self, uri: &str) -> Result<()> {
        let Some(link) = InviteLink::parse(uri, &self.link) else {
            debug!(uri, "Ignoring non-invite link");
            return Err(EngineError::InvalidInput(
                "unrecognized invite link".to_owned(),
            ));
        };
        self.handle_link(link).await;
        Ok(())
    }

    /// Handle an already-parsed invite link.
    ///
    /// Consumes it immediately when an identity exists, otherwise holds
    /// it until the next sign-in.
    #[instrument(skip(self, link), fields(list_id = %link.list_id))]
    pub async fn handle_link(&self, link: InviteLink) {
        self.state.send_replace(InviteFlow::LinkReceived(link.clone()));
        if self.identity.current().is_some() {
            self.consume(link).await;
        } else {
            debug!("No identity yet, holding invite until sign-in");
            self.state.send_replace(InviteFlow::AwaitingAuth(link));
        }
    }

    async fn consume(&self, link: InviteLink) {
        self.state.send_replace(InviteFlow::Consuming(link.clone()));
        match self
            .lists
            .join_by_token(&link.list_id, link.token.as_str())
            .await
        {
            Ok(()) => {
                info!(list_id = %link.list_id, "Invite consumed");
                self.state.send_replace(InviteFlow::Joined(link.list_id));
            }
            Err(err) => {
                warn!(list_id = %link.list_id, error = %err, "Invite failed");
                self.state.send_replace(InviteFlow::Failed(err.to_string()));
            }
        }
    }

    /// React to authentication-state changes until the identity provider
    /// goes away.
    ///
    /// Sign-in consumes a held invite; sign-out clears any invite state.
    /// Typically spawned: `tokio::spawn(async move { coordinator.run().await })`.
    pub async fn run(&self) {
        let mut auth = self.identity.watch();
        // Catch a sign-in that happened before the runner started. Only
        // consumption; an initially signed-out session is not a sign-out
        // transition and must not clear a just-received invite.
        if auth.borrow_and_update().is_some() {
            self.consume_pending().await;
        }
        loop {
            if auth.changed().await.is_err() {
                break;
            }
            let signed_in = auth.borrow_and_update().is_some();
            if signed_in {
                self.consume_pending().await;
            } else {
                self.state.send_if_modified(|state| {
                    if matches!(state, InviteFlow::Idle) {
                        false
                    } else {
                        debug!("Clearing invite state on sign-out");
                        *state = InviteFlow::Idle;
                        true
                    }
                });
            }
        }
    }

    async fn consume_pending(&self) {
        let pending = match &*self.state.borrow() {
            InviteFlow::AwaitingAuth(link) => Some(link.clone()),
            _ => None,
        };
        if let Some(link) = pending {
            self.consume(link).await;
        }
    }
}
