//! Error types for the runners client.
//!
//! Classified API errors are not errors of the call: they arrive as
//! [`ApiError`](super::ApiError) values inside a parsed response. The types
//! here cover everything that prevents a response from being produced or
//! parsed at all.

use http::StatusCode;
use thiserror::Error;

/// A failure of the underlying transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established (refused, DNS, TLS handshake).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport gave up waiting.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Errors returned by [`RunnersClient`](super::RunnersClient) calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server URL or an operation URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A path parameter cannot be placed in a single path segment.
    #[error("invalid path parameter '{name}': {reason}")]
    InvalidPathParam {
        /// The parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A request editor rejected the request.
    #[error("request editor failed: {0}")]
    Editor(String),

    /// The transport failed before a response was available.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A JSON response for a declared status did not decode.
    #[error("failed to decode {status} response: {source}")]
    Decode {
        /// The response status.
        status: StatusCode,
        /// The decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// The call was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Whether the failure happened before anything was sent.
    pub fn is_request_construction(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::InvalidPathParam { .. } | Self::Encode(_) | Self::Editor(_)
        )
    }
}
