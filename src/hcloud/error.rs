//! Errors returned by the Hetzner Cloud API.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Error code reported in the `error.code` field of a failed API response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ErrorCode {
    /// The request was malformed or a field failed validation.
    InvalidInput,
    /// The resource does not exist.
    NotFound,
    /// The resource is locked by a running action.
    Locked,
    /// The resource changed while the request was processed.
    Conflict,
    /// Insufficient permissions for this request.
    Forbidden,
    /// The token is invalid or missing.
    Unauthorized,
    /// Too many requests in the current window.
    RateLimitExceeded,
    /// A unique field (for example a name) is already in use.
    UniquenessError,
    /// The resource is protected against this operation.
    Protected,
    /// Error in the Hetzner backend.
    ServiceError,
    /// Unexpected server failure.
    ServerError,
    /// The request timed out.
    Timeout,
    /// The requested resource is currently unavailable.
    ResourceUnavailable,
    /// The action failed.
    ActionFailed,
    /// The resource limit of the project is reached.
    ResourceLimitExceeded,
    /// Maintenance is in progress.
    Maintenance,
    /// Any code this crate does not know about.
    Other(String),
}

impl ErrorCode {
    /// The wire representation of the code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::Locked => "locked",
            Self::Conflict => "conflict",
            Self::Forbidden => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::UniquenessError => "uniqueness_error",
            Self::Protected => "protected",
            Self::ServiceError => "service_error",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::ResourceUnavailable => "resource_unavailable",
            Self::ActionFailed => "action_failed",
            Self::ResourceLimitExceeded => "resource_limit_exceeded",
            Self::Maintenance => "maintenance",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "invalid_input" | "json_error" => Self::InvalidInput,
            "not_found" => Self::NotFound,
            "locked" => Self::Locked,
            "conflict" => Self::Conflict,
            "forbidden" => Self::Forbidden,
            "unauthorized" => Self::Unauthorized,
            "rate_limit_exceeded" => Self::RateLimitExceeded,
            "uniqueness_error" => Self::UniquenessError,
            "protected" => Self::Protected,
            "service_error" => Self::ServiceError,
            "server_error" => Self::ServerError,
            "timeout" => Self::Timeout,
            "resource_unavailable" => Self::ResourceUnavailable,
            "action_failed" => Self::ActionFailed,
            "resource_limit_exceeded" => Self::ResourceLimitExceeded,
            "maintenance" => Self::Maintenance,
            _ => Self::Other(code),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field that failed validation in an `invalid_input` error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvalidField {
    /// Name of the request field.
    pub name: String,
    /// Validation messages for the field.
    #[serde(default)]
    pub messages: Vec<String>,
}

/// Error returned by the API, decoded from the `error` object of a response body.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} ({code})")]
pub struct ApiError {
    /// Machine readable error code.
    pub code: ErrorCode,
    /// Human readable message.
    pub message: String,
    /// Fields that failed validation, if the code is `invalid_input`.
    pub invalid_fields: Vec<InvalidField>,
    /// HTTP status of the response, when it came from the network.
    pub status: Option<u16>,
}

impl ApiError {
    /// Create an error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            invalid_fields: Vec::new(),
            status: None,
        }
    }

    /// Shorthand for a `not_found` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Set the HTTP status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true if the error has the given code.
    pub fn is(&self, code: &ErrorCode) -> bool {
        &self.code == code
    }

    /// Decode an error body of the form `{"error": {"code", "message", "details"}}`.
    ///
    /// Falls back to a `server_error` carrying the raw body when it does not match.
    pub fn from_body(status: u16, body: &serde_json::Value) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Body,
        }

        #[derive(Deserialize)]
        struct Body {
            code: ErrorCode,
            message: String,
            #[serde(default)]
            details: Option<Details>,
        }

        #[derive(Deserialize)]
        struct Details {
            #[serde(default)]
            fields: Vec<InvalidField>,
        }

        match serde_json::from_value::<Envelope>(body.clone()) {
            Ok(envelope) => Self {
                code: envelope.error.code,
                message: envelope.error.message,
                invalid_fields: envelope
                    .error
                    .details
                    .map(|d| d.fields)
                    .unwrap_or_default(),
                status: Some(status),
            },
            Err(_) => Self::new(
                ErrorCode::ServerError,
                format!("unexpected response (HTTP {}): {}", status, body),
            )
            .with_status(status),
        }
    }
}

/// An action finished with status `error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("action {action_id} ({command}) failed: {message} ({code})")]
pub struct ActionError {
    /// ID of the failed action.
    pub action_id: i64,
    /// Command the action was running.
    pub command: String,
    /// Error code reported by the action.
    pub code: String,
    /// Error message reported by the action.
    pub message: String,
}

/// Any failure talking to the API.
#[derive(Debug, Error)]
pub enum Error {
    /// The API answered with an error body.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// An action the request started did not succeed.
    #[error("{0}")]
    Action(#[from] ActionError),

    /// The request never produced an API response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Returns the API error if this is one.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if this is an API error with the given code.
    pub fn is_code(&self, code: &ErrorCode) -> bool {
        self.api().is_some_and(|err| err.is(code))
    }

    /// Returns true if the API reported `not_found`.
    pub fn is_not_found(&self) -> bool {
        self.is_code(&ErrorCode::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_code_round_trip() {
        let code = ErrorCode::from("locked".to_string());
        assert_eq!(code, ErrorCode::Locked);
        assert_eq!(code.as_str(), "locked");

        let unknown = ErrorCode::from("brand_new".to_string());
        assert_eq!(unknown, ErrorCode::Other("brand_new".to_string()));
        assert_eq!(unknown.to_string(), "brand_new");
    }

    #[test]
    fn test_from_body_invalid_input() {
        let body = json!({
            "error": {
                "code": "invalid_input",
                "message": "invalid input in field 'name'",
                "details": {
                    "fields": [{"name": "name", "messages": ["is too long"]}]
                }
            }
        });

        let err = ApiError::from_body(422, &body);
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.status, Some(422));
        assert_eq!(err.invalid_fields.len(), 1);
        assert_eq!(err.invalid_fields[0].name, "name");
        assert_eq!(err.invalid_fields[0].messages, vec!["is too long"]);
    }

    #[test]
    fn test_from_body_without_details() {
        let body = json!({"error": {"code": "not_found", "message": "primary_ip not found"}});
        let err = ApiError::from_body(404, &body);
        assert!(err.is(&ErrorCode::NotFound));
        assert!(err.invalid_fields.is_empty());
        assert_eq!(format!("{}", err), "primary_ip not found (not_found)");
    }

    #[test]
    fn test_from_body_unexpected_shape() {
        let err = ApiError::from_body(502, &json!("Bad Gateway"));
        assert_eq!(err.code, ErrorCode::ServerError);
        assert!(err.message.contains("HTTP 502"));
    }

    #[test]
    fn test_action_error_display() {
        let err = ActionError {
            action_id: 42,
            command: "assign_primary_ip".to_string(),
            code: "server_locked".to_string(),
            message: "server is locked".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "action 42 (assign_primary_ip) failed: server is locked (server_locked)"
        );
    }

    #[test]
    fn test_error_code_helpers() {
        let err = Error::from(ApiError::not_found("zone not found"));
        assert!(err.is_not_found());
        assert!(!err.is_code(&ErrorCode::Locked));

        let err = Error::Http("connection refused".to_string());
        assert!(err.api().is_none());
        assert!(!err.is_not_found());
    }
}
