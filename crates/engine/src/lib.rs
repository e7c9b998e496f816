//! Splitlist Engine - the collaborative shopping-list core.
//!
//! Owns the durable state and coordination logic of shared shopping lists:
//! membership and per-list assignment rules, the invite-token join
//! protocol, item lifecycle with estimated/actual prices, and the live
//! query contract the presentation layer renders from.
//!
//! # Architecture
//!
//! The engine is an embeddable library, not a server. Two capabilities are
//! injected rather than owned:
//!
//! - [`store::DocumentStore`] - a document database with per-document CRUD,
//!   filtered queries, atomic multi-document batches, and push-based change
//!   subscriptions. [`store::MemoryStore`] is the reference implementation.
//! - [`identity::IdentityProvider`] - the authentication authority. The
//!   engine only consumes "current identity" and observes sign-in/sign-out.
//!
//! Everything user-facing (rendering, dialogs, navigation, toasts) lives in
//! the embedding shell and calls into [`services`] and [`invite`].
//!
//! # Modules
//!
//! - [`config`] - Environment-driven configuration
//! - [`error`] - The engine failure taxonomy
//! - [`models`] - Shared lists, items, and user profiles
//! - [`store`] - Durable store abstraction and reference implementation
//! - [`identity`] - Identity provider abstraction
//! - [`services`] - List, item, and profile operations
//! - [`invite`] - Invite links and the deep-link join coordinator

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod identity;
pub mod invite;
pub mod models;
pub mod services;
pub mod store;

pub use config::{ConfigError, EngineConfig, LinkConfig};
pub use error::{EngineError, Result};
