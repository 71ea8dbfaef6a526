//! Unified error types for the visitor counter.

use thiserror::Error;

/// Unified error type for the visitor counter service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Counter store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by a counter store while performing an increment.
///
/// The `Display` output of these variants is what callers of the HTTP
/// endpoint see in the `error` field of a 500 response.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or refused the operation.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    /// The store call did not complete within the configured bound.
    #[error("counter store timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// Incrementing would exceed the largest representable count.
    #[error("counter {key} would overflow")]
    Overflow {
        /// Counter key.
        key: String,
    },

    /// The stored value is not a non-negative integer.
    #[error("counter {key} holds an invalid value: {reason}")]
    Corrupt {
        /// Counter key.
        key: String,
        /// What was wrong with the value.
        reason: String,
    },

    /// SQLite backend error.
    #[error("sqlite error: {0}")]
    Backend(#[from] rusqlite::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_messages_are_human_readable() {
        let err = StoreError::Timeout { timeout_ms: 250 };
        assert_eq!(err.to_string(), "counter store timed out after 250ms");

        let err = StoreError::Overflow {
            key: "site_visits".to_string(),
        };
        assert_eq!(err.to_string(), "counter site_visits would overflow");
    }

    #[test]
    fn store_error_converts_into_service_error() {
        let err: ServiceError = StoreError::Unavailable("connection refused".to_string()).into();
        assert_eq!(
            err.to_string(),
            "store error: counter store unavailable: connection refused"
        );
    }
}
