//! Wire models for the peripheral runners API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a structured API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    /// The resource already exists.
    AlreadyExists,
    /// The request was malformed.
    BadRequest,
    /// The server could not reach a backing service.
    ConnectionFailed,
    /// The caller is not allowed to perform the operation.
    Forbidden,
    /// The server failed internally.
    InternalError,
    /// An argument was rejected.
    InvalidArgument,
    /// The resource does not exist.
    NotFound,
    /// The server reported that nothing changed.
    ///
    /// Never produced by the client itself.
    Unchanged,
    /// The operation is not implemented by the server.
    Unimplemented,
    /// Anything else, including responses the client could not classify
    /// and kinds this client does not know.
    #[serde(other)]
    Other,
}

impl ErrorType {
    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "AlreadyExists",
            Self::BadRequest => "BadRequest",
            Self::ConnectionFailed => "ConnectionFailed",
            Self::Forbidden => "Forbidden",
            Self::InternalError => "InternalError",
            Self::InvalidArgument => "InvalidArgument",
            Self::NotFound => "NotFound",
            Self::Other => "Other",
            Self::Unchanged => "Unchanged",
            Self::Unimplemented => "Unimplemented",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured error returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// The error kind.
    pub err_type: ErrorType,
    /// Human-readable message.
    pub msg: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(err_type: ErrorType, msg: impl Into<String>) -> Self {
        Self {
            err_type,
            msg: msg.into(),
        }
    }

    /// An `Other` error wrapping a response body the client could not classify.
    pub fn unclassified(body: &[u8]) -> Self {
        Self::new(ErrorType::Other, String::from_utf8_lossy(body))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.err_type, self.msg)
    }
}

impl std::error::Error for ApiError {}

/// A GitLab runner registration managed by peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabRunner {
    /// Runner ID as assigned by GitLab. Empty before creation.
    pub id: String,
    /// URL of the GitLab instance the runner registers with.
    pub url: String,
    /// Runner registration token.
    pub token: String,
    /// When the token was obtained, if the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_obtained_at: Option<DateTime<Utc>>,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Container image jobs run in.
    pub image: String,
    /// Comma-separated list of tags.
    #[serde(default)]
    pub tag_list: String,
    /// Whether the runner picks up untagged jobs.
    #[serde(default)]
    pub run_untagged: bool,
}

// The token is a credential and stays out of logs.
impl fmt::Display for GitLabRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitLabRunner(id={}, url={})", self.id, self.url)
    }
}
