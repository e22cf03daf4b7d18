//! Error types for the peripheral provider.

use thiserror::Error;

use crate::client::{ApiError, ClientError};
use crate::schema::Diagnostic;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The API call could not be made or its response could not be parsed.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// The API answered with an error.
    #[error("Unable to {operation} GitLabRunner, got status: {status_text}: {error}")]
    Api {
        /// The client operation that failed.
        operation: &'static str,
        /// HTTP status as text, e.g. `404 Not Found`.
        status_text: String,
        /// The classified error.
        error: ApiError,
    },

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Returns a reference to the error message for any variant.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Client(_err) => "client error (see Debug output)",
            Self::Api { error, .. } => &error.msg,
            Self::Unimplemented(msg) => msg,
        }
    }

    /// Short summary used when the error is shown to the user.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Configuration(_) => "Configuration Error",
            Self::UnknownResource(_) => "Unknown Resource Type",
            Self::Serialization(_) => "Serialization Error",
            Self::Client(_) => "Client Error",
            Self::Api { .. } => "API Error",
            Self::Unimplemented(_) => "Unimplemented",
        }
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(err: &ProviderError) -> Self {
        let detail = match err {
            ProviderError::Client(e) => format!("Unable to talk to client, got error: {}", e),
            ProviderError::Api {
                operation,
                status_text,
                error,
            } => format!(
                "Unable to {} GitLabRunner, got status: {}: {}",
                operation, status_text, error
            ),
            other => other.to_string(),
        };
        Diagnostic::error(err.summary()).with_detail(detail)
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        Diagnostic::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ErrorType, TransportError};
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::UnknownResource("custom_resource".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: custom_resource");

        let err = ProviderError::Unimplemented("feature not available".to_string());
        assert_eq!(format!("{}", err), "Unimplemented: feature not available");
    }

    #[test]
    fn test_api_error_display() {
        let err = ProviderError::Api {
            operation: "read",
            status_text: "404 Not Found".to_string(),
            error: ApiError::new(ErrorType::NotFound, "no such runner"),
        };
        assert_eq!(
            err.to_string(),
            "Unable to read GitLabRunner, got status: 404 Not Found: NotFound: no such runner"
        );
        assert_eq!(err.message(), "no such runner");
    }

    #[test]
    fn test_client_error_conversion() {
        let err: ProviderError =
            ClientError::Transport(TransportError::Connect("refused".to_string())).into();
        assert!(matches!(err, ProviderError::Client(_)));
        assert_eq!(err.to_string(), "Client error: connection failed: refused");
    }

    #[test]
    fn test_client_error_diagnostic() {
        let err = ProviderError::Client(ClientError::Cancelled);
        let diag = Diagnostic::from(&err);
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.summary, "Client Error");
        assert_eq!(
            diag.detail.as_deref(),
            Some("Unable to talk to client, got error: request cancelled")
        );
    }

    #[test]
    fn test_api_error_diagnostic() {
        let err = ProviderError::Api {
            operation: "create",
            status_text: "400 Bad Request".to_string(),
            error: ApiError::new(ErrorType::InvalidArgument, "bad url"),
        };
        let diag: Diagnostic = err.into();
        assert_eq!(diag.summary, "API Error");
        let detail = diag.detail.unwrap();
        assert!(detail.contains("400 Bad Request"));
        assert!(detail.contains("InvalidArgument"));
        assert!(detail.contains("bad url"));
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Configuration("invalid config".to_string());
        assert_eq!(err.message(), "invalid config");
        assert_eq!(err.summary(), "Configuration Error");

        let diag = Diagnostic::from(&err);
        assert_eq!(
            diag.detail.as_deref(),
            Some("Configuration error: invalid config")
        );
    }
}
