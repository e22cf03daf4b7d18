//! Response classification for the runners API.
//!
//! Every operation declares one success status and a set of statuses that
//! carry a structured [`ApiError`]. A response is classified by its status and
//! whether its content type is JSON, never by trying to decode it first.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use super::error::ClientError;
use super::models::{ApiError, GitLabRunner};

/// The declared outcomes of one API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Operation name, used in logs and error messages.
    pub name: &'static str,
    /// The status that carries the success payload.
    pub success: StatusCode,
    /// Statuses that carry a structured error payload.
    pub errors: &'static [StatusCode],
}

impl OperationSpec {
    /// Whether `status` is one of the structured error statuses.
    pub fn is_error_status(&self, status: StatusCode) -> bool {
        self.errors.contains(&status)
    }
}

/// `POST /gitlab-runners`
pub const CREATE: OperationSpec = OperationSpec {
    name: "create",
    success: StatusCode::CREATED,
    errors: &[StatusCode::BAD_REQUEST, StatusCode::INTERNAL_SERVER_ERROR],
};

/// `GET /gitlab-runners/list`
pub const LIST: OperationSpec = OperationSpec {
    name: "list",
    success: StatusCode::OK,
    errors: &[StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR],
};

/// `GET /gitlab-runners/{id}`
pub const READ: OperationSpec = OperationSpec {
    name: "read",
    success: StatusCode::OK,
    errors: &[StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR],
};

/// `PUT /gitlab-runners/{id}`
pub const UPDATE: OperationSpec = OperationSpec {
    name: "update",
    success: StatusCode::OK,
    errors: &[StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR],
};

/// `DELETE /gitlab-runners/{id}`
pub const DELETE: OperationSpec = OperationSpec {
    name: "delete",
    success: StatusCode::OK,
    errors: &[StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR],
};

/// The structured content of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// The success status with a JSON body.
    Success(T),
    /// A declared error status with a JSON body.
    Error(ApiError),
    /// Anything else. Only the raw body is available.
    Unclassified,
}

/// A parsed response of one operation.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    operation: OperationSpec,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    payload: Payload<T>,
}

/// Response of [`RunnersClient::create`](super::RunnersClient::create).
pub type CreateResponse = ApiResponse<GitLabRunner>;
/// Response of [`RunnersClient::list`](super::RunnersClient::list).
pub type ListResponse = ApiResponse<GitLabRunner>;
/// Response of [`RunnersClient::read`](super::RunnersClient::read).
pub type ReadResponse = ApiResponse<GitLabRunner>;
/// Response of [`RunnersClient::update`](super::RunnersClient::update).
pub type UpdateResponse = ApiResponse<GitLabRunner>;
/// Response of [`RunnersClient::delete`](super::RunnersClient::delete).
pub type DeleteResponse = ApiResponse<GitLabRunner>;

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("json"))
}

fn decode<D: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<D, ClientError> {
    serde_json::from_slice(body).map_err(|source| ClientError::Decode { status, source })
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Classify a fully read response.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the status and content type call for
    /// a JSON payload and the body does not decode into it.
    pub fn from_parts(
        operation: OperationSpec,
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Self, ClientError> {
        let payload = if !is_json(&headers) {
            Payload::Unclassified
        } else if status == operation.success {
            Payload::Success(decode(status, &body)?)
        } else if operation.is_error_status(status) {
            Payload::Error(decode(status, &body)?)
        } else {
            Payload::Unclassified
        };

        Ok(Self {
            operation,
            status,
            headers,
            body,
            payload,
        })
    }
}

impl<T> ApiResponse<T> {
    /// The operation this response belongs to.
    pub fn operation(&self) -> &OperationSpec {
        &self.operation
    }

    /// The HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status as text, e.g. `404 Not Found`.
    pub fn status_text(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {}", self.status.as_str(), reason),
            None => self.status.as_str().to_string(),
        }
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The structured payload.
    pub fn payload(&self) -> &Payload<T> {
        &self.payload
    }

    /// The success payload, if the response carried one.
    pub fn success(&self) -> Option<&T> {
        match &self.payload {
            Payload::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The structured error payload, if the response carried one.
    pub fn structured_error(&self) -> Option<&ApiError> {
        match &self.payload {
            Payload::Error(err) => Some(err),
            _ => None,
        }
    }

    /// The error this response represents, if any.
    ///
    /// `None` for the success status. The decoded payload for a declared error
    /// status. An `Other` error holding the raw body for everything else,
    /// including a declared error status whose body was not JSON.
    pub fn error(&self) -> Option<ApiError> {
        if self.status == self.operation.success {
            return None;
        }
        match &self.payload {
            Payload::Error(err) if self.operation.is_error_status(self.status) => Some(err.clone()),
            _ => Some(ApiError::unclassified(&self.body)),
        }
    }

    /// Consume the response, yielding the success payload or the error.
    ///
    /// A success status without a JSON payload is reported as an `Other`
    /// error holding the raw body.
    pub fn into_result(self) -> Result<T, ApiError> {
        if let Some(err) = self.error() {
            return Err(err);
        }
        match self.payload {
            Payload::Success(value) => Ok(value),
            _ => Err(ApiError::unclassified(&self.body)),
        }
    }
}
