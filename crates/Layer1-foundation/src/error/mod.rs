//! Error types for the quote cache
//!
//! Every fallible cache operation returns [`Result`]. Upstream failures of a
//! memoized operation are *not* represented here: they travel through the
//! memoizer as the wrapped operation's own error type.

use thiserror::Error;

use crate::cache::Coordinate;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Cache error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Accessor
    // ========================================================================
    #[error("Cache entry not found: {namespace}/{key}/{operation}")]
    NotFound {
        namespace: String,
        key: String,
        operation: String,
    },

    /// The store can no longer be trusted (a writer panicked mid-update).
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A background task ended abnormally (panicked or was aborted).
    #[error("Background task failed: {0}")]
    Task(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Build a `NotFound` for the given coordinate
    pub fn not_found(coord: &Coordinate) -> Self {
        Error::NotFound {
            namespace: coord.namespace.clone(),
            key: coord.key.clone(),
            operation: coord.operation.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Errors after which the cache must not be used again
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found(&Coordinate::new("iex", "MSFT", "quote"));
        assert!(err.is_not_found());
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Cache entry not found: iex/MSFT/quote");
    }

    #[test]
    fn test_store_unavailable_is_fatal() {
        let err = Error::StoreUnavailable("poisoned".into());
        assert!(err.is_fatal());
    }
}
