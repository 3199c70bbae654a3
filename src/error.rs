//! Error types for ndjson-stream
//!
//! Every failure surfaces through the single error channel of the output
//! stream. There is no recoverable/fatal split: an error always terminates
//! the stream that carries it.

use crate::transport::ReadyState;
use thiserror::Error;

/// Result type alias for ndjson-stream operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ndjson-stream
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "method")
        key: Option<String>,
    },

    /// The transport failed; propagated verbatim
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A complete line was not valid JSON for the requested record type
    #[error("malformed line {line:?}: {source}")]
    Parse {
        /// The offending line, without its newline terminator
        line: String,
        /// The underlying parse failure
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Parse { .. } => "parse_error",
            Error::Transport(e) => e.error_code(),
        }
    }

    /// Shorthand for a configuration error tied to a key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Transport-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        /// The HTTP status code
        status: u16,
        /// The requested URL
        url: String,
    },

    /// An operation was attempted in the wrong readiness stage
    #[error("cannot {operation} while transport is {state}")]
    InvalidState {
        /// The operation that was attempted (e.g., "open", "send")
        operation: &'static str,
        /// The stage the transport was in
        state: ReadyState,
    },

    /// The request target could not be parsed
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// The parse failure
        #[source]
        source: url::ParseError,
    },

    /// Opaque failure raised by a custom transport
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            TransportError::Network(e) if e.is_timeout() => "timeout",
            TransportError::Network(_) => "network_error",
            TransportError::Status { .. } => "http_status",
            TransportError::InvalidState { .. } => "invalid_state",
            TransportError::InvalidUrl { .. } => "invalid_url",
            TransportError::Other(_) => "transport_error",
        }
    }
}
