//! Error types for marksync wire types.

use thiserror::Error;

/// Errors produced while building or parsing wire types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// Text is not a canonical collection id
    #[error("invalid collection id: {0:?}")]
    InvalidId(String),

    /// Text is not an RFC 3339 timestamp
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The operating system RNG failed
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TypesError::InvalidId("xyz".into());
        assert_eq!(err.to_string(), "invalid collection id: \"xyz\"");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypesError>();
    }
}
