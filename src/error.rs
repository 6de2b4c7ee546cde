//! Error types for the Hetzner Cloud provider.

use thiserror::Error;

use crate::hcloud::{self, ApiError, ErrorCode};
use crate::schema::Diagnostic;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

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

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The API rejected a request.
    #[error("API error: {0}")]
    Api(ApiError),

    /// An action did not succeed.
    #[error("{0}")]
    Action(#[from] hcloud::ActionError),

    /// Validation produced error diagnostics.
    #[error("{} diagnostic(s): {}", .0.len(), summaries(.0))]
    Diagnostics(Vec<Diagnostic>),
}

fn summaries(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.summary.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::Unavailable(msg)
            | Self::Unimplemented(msg)
            | Self::InvalidRequest(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Api(err) => err.message.clone(),
            Self::Action(err) => err.message.clone(),
            Self::Diagnostics(diags) => summaries(diags),
        }
    }

    /// Convert the error into diagnostics for the host.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Api(err) => api_error_diagnostics(err),
            Self::Diagnostics(diags) => diags.clone(),
            Self::Action(err) => vec![Diagnostic::error("Action failed").with_detail(format!(
                "Action {} ({}) failed with {}: {}",
                err.action_id, err.command, err.code, err.message
            ))],
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<hcloud::Error> for ProviderError {
    fn from(err: hcloud::Error) -> Self {
        match err {
            hcloud::Error::Api(err) => err.into(),
            hcloud::Error::Action(err) => err.into(),
            hcloud::Error::Http(msg) => Self::Unavailable(msg),
            hcloud::Error::Decode(err) => Self::Serialization(err),
        }
    }
}

/// Map an API error to diagnostics.
///
/// `invalid_input` yields one diagnostic per rejected field, `not_found` a
/// single "not found" diagnostic, every other code a generic "API Error".
pub fn api_error_diagnostics(err: &ApiError) -> Vec<Diagnostic> {
    match &err.code {
        ErrorCode::InvalidInput if !err.invalid_fields.is_empty() => err
            .invalid_fields
            .iter()
            .map(|field| {
                Diagnostic::error("Invalid input")
                    .with_detail(format!(
                        "{}: {}",
                        field.name,
                        field.messages.join(", ")
                    ))
                    .with_attribute(field.name.clone())
            })
            .collect(),
        ErrorCode::InvalidInput => {
            vec![Diagnostic::error("Invalid input").with_detail(err.message.clone())]
        },
        ErrorCode::NotFound => {
            vec![Diagnostic::error("Resource not found").with_detail(err.message.clone())]
        },
        code => vec![Diagnostic::error("API Error")
            .with_detail(format!("{} (code: {})", err.message, code))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcloud::InvalidField;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("resource-123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: resource-123");

        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::UnknownResource("hcloud_server".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: hcloud_server");
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Configuration("missing token".to_string());
        assert_eq!(err.message(), "missing token");

        let err = ProviderError::from(ApiError::not_found("zone not found"));
        assert_eq!(err.message(), "zone not found");
    }

    #[test]
    fn test_from_client_error() {
        let err: ProviderError = hcloud::Error::Http("connection reset".to_string()).into();
        assert!(matches!(err, ProviderError::Unavailable(_)));

        let err: ProviderError = hcloud::Error::Api(ApiError::not_found("gone")).into();
        assert!(matches!(err, ProviderError::Api(ref e) if e.code == ErrorCode::NotFound));
    }

    #[test]
    fn test_invalid_input_diagnostics_per_field() {
        let mut err = ApiError::new(ErrorCode::InvalidInput, "invalid input");
        err.invalid_fields = vec![
            InvalidField {
                name: "name".to_string(),
                messages: vec!["is too long".to_string()],
            },
            InvalidField {
                name: "labels".to_string(),
                messages: vec!["invalid key".to_string(), "invalid value".to_string()],
            },
        ];

        let diags = api_error_diagnostics(&err);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].attribute.as_deref(), Some("name"));
        assert_eq!(
            diags[1].detail.as_deref(),
            Some("labels: invalid key, invalid value")
        );
    }

    #[test]
    fn test_not_found_and_generic_diagnostics() {
        let diags = api_error_diagnostics(&ApiError::not_found("zone not found"));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Resource not found");

        let diags = api_error_diagnostics(&ApiError::new(ErrorCode::Locked, "zone is locked"));
        assert_eq!(diags[0].summary, "API Error");
        assert_eq!(
            diags[0].detail.as_deref(),
            Some("zone is locked (code: locked)")
        );
        assert_eq!(diags[0].severity, DiagnosticSeverity::Error);
    }

    #[test]
    fn test_diagnostics_variant() {
        let err = ProviderError::Diagnostics(vec![
            Diagnostic::error("first"),
            Diagnostic::error("second"),
        ]);
        assert_eq!(format!("{}", err), "2 diagnostic(s): first; second");
        assert_eq!(err.to_diagnostics().len(), 2);
    }
}
