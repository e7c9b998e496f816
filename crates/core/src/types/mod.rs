//! Core types for Splitlist.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod token;

pub use id::*;
pub use price::{Price, PriceError};
pub use token::InviteToken;
