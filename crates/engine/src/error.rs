//! Engine failure taxonomy.
//!
//! Every operation returns `Result<T, EngineError>` instead of panicking;
//! the presentation layer is solely responsible for user-visible messaging.
//! The engine never retries on its own - retries, if desired, are a caller
//! policy layered on top (e.g. backoff around [`EngineError::StoreUnavailable`]).

use thiserror::Error;

use crate::store::StoreError;

/// Engine-level error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No authenticated identity where one is required.
    #[error("not authenticated")]
    Unauthenticated,

    /// Authenticated but lacking permission for the targeted operation.
    #[error("forbidden")]
    Forbidden,

    /// The referenced list, item, or user does not exist.
    #[error("not found")]
    NotFound,

    /// The presented invite token does not match the list's token.
    #[error("invalid invite token")]
    InvalidToken,

    /// Redundant join attempt by an existing member (or the owner).
    #[error("already a member")]
    AlreadyMember,

    /// A required input failed validation (e.g. a blank name).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The durable store is unreachable or timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored document could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::Unavailable(message) => Self::StoreUnavailable(message),
        }
    }
}

/// Result type alias for `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            EngineError::from(StoreError::NotFound),
            EngineError::NotFound
        ));
        assert!(matches!(
            EngineError::from(StoreError::Unavailable("down".to_owned())),
            EngineError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn test_display() {
        let err = EngineError::InvalidInput("list name must not be blank".to_owned());
        assert_eq!(err.to_string(), "invalid input: list name must not be blank");
    }
}
