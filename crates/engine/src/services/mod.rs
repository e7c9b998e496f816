//! Business logic services for the engine.
//!
//! # Services
//!
//! - `users` - Profile mirror of the identity provider
//! - `lists` - List lifecycle, membership, and the invite-join protocol
//! - `items` - Item lifecycle and live projections
//!
//! Each service receives its store and identity capabilities explicitly;
//! nothing here reaches for process-wide state.

pub mod items;
pub mod lists;
pub mod users;

pub use items::{ItemService, ItemUpdate, ItemsFeed, MembersFeed, NewItem};
pub use lists::{ListService, ListUpdate, ListsFeed};
pub use users::{ProfileUpdate, UserDirectory};
