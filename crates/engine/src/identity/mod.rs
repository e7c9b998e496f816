//! Identity provider abstraction.
//!
//! Authentication itself (sign-in UI, credential exchange, account
//! recovery) belongs to the embedding shell and its identity backend. The
//! engine only consumes two things: the currently authenticated identity,
//! and a way to observe sign-in/sign-out so pending work (e.g. a held
//! invite) can be re-evaluated.

pub mod local;

pub use local::LocalIdentity;

use tokio::sync::watch;

use splitlist_core::Uid;

/// A signed-in identity as reported by the identity provider.
///
/// The uid is the stable key; profile fields are mirrored into the `users`
/// collection by [`UserDirectory`](crate::services::UserDirectory) on each
/// sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable unique identifier.
    pub uid: Uid,
    /// Display name, possibly empty.
    pub display_name: String,
    /// Email address, possibly empty.
    pub email: String,
    /// Phone number, possibly empty.
    pub phone_number: String,
}

/// The identity capability consumed by the engine.
pub trait IdentityProvider: Send + Sync {
    /// The currently authenticated identity, if any.
    fn current(&self) -> Option<Identity>;

    /// Observe authentication-state changes.
    ///
    /// The receiver yields `None` while signed out and `Some` once an
    /// identity is established.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;
}
