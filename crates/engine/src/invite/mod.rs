//! Invite links and the deep-link join coordinator.
//!
//! An invite travels out-of-band as a URL naming a list and its token.
//! [`link`] parses and builds those URLs; [`coordinator`] holds a received
//! invite across the authentication boundary and consumes it once an
//! identity is established.

pub mod coordinator;
pub mod link;

pub use coordinator::{InviteCoordinator, InviteFlow};
pub use link::InviteLink;
