//! Splitlist Core - Shared types library.
//!
//! This crate provides common types used across all Splitlist components:
//! - `engine` - Shared-list membership, items, and the invite protocol
//! - embedding shells (mobile/desktop presentation layers)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access, no async
//! runtime. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and invite tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
