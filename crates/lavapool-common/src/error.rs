use std::sync::Arc;

use thiserror::Error;

/// The single error type for all lavapool operations.
///
/// Every fallible lavapool API returns [`Result<T>`] (alias for
/// `Result<T, LavapoolError>`). Errors from lower layers (HTTP, JSON
/// decoding, consumer listeners) are mapped into variants of this enum so
/// callers only need to handle one error type.
#[derive(Error, Debug)]
pub enum LavapoolError {
    /// Invalid setup: duplicate listener registration, duplicate node
    /// identifier, or a listener table that failed to build. Fatal at
    /// configuration time, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Channel- or HTTP-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A well-formed HTTP 200 carried a body that did not decode. Never
    /// retried.
    #[error("JSON decode error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// An HTTP request exceeded its deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// The REST endpoint rejected a decodetrack request. Carries the
    /// server-reported status and error message; always surfaced to the
    /// caller, never retried.
    #[error("Failed to build track. Status: {status}, Error: {message}")]
    TrackBuild { status: u16, message: String },

    /// A consumer-supplied listener failed. Routed to the dispatch-error
    /// sink only, never propagated to the event source.
    #[error("Listener error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl LavapoolError {
    /// Wraps an arbitrary consumer error for routing through the
    /// dispatch-error sink.
    pub fn external(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        LavapoolError::External(Arc::new(error))
    }
}

pub type Result<T> = std::result::Result<T, LavapoolError>;
