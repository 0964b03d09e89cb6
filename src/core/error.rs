//! Core Error Types
//!
//! Closed error taxonomy shared by the dispatcher, executors, hooks and
//! collaborators. Every failure that reaches a caller is a `ServerError`
//! carried inside the `error` response variant.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core module result type
pub type GatewayResult<T> = Result<T, ServerError>;

/// Error class reported to callers as `errorType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    /// Malformed input, failed validation, unknown session on logout
    BadRequest,

    /// An authorize hook refused the request
    Unauthorized,

    /// No executor resolves for the requested name
    NotFound,

    /// Anything else, including collaborator failures
    InternalServer,
}

impl ErrorType {
    /// Returns the wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BadRequest",
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "NotFound",
            Self::InternalServer => "InternalServer",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::InternalServer => 500,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error payload of the `error` response variant
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ServerError {
    /// Human-readable description
    pub message: String,

    /// Error class
    pub error_type: ErrorType,

    /// Optional detail chain (the cause this error was derived from)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ServerError {
    /// Create an error of the given class
    pub fn new(message: impl Into<String>, error_type: ErrorType) -> Self {
        Self {
            message: message.into(),
            error_type,
            stack: None,
        }
    }

    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(msg, ErrorType::BadRequest)
    }

    /// Create an unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(msg, ErrorType::Unauthorized)
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(msg, ErrorType::NotFound)
    }

    /// Create an internal server error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(msg, ErrorType::InternalServer)
    }

    /// Attach a detail chain
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Downgrade a validate-hook failure to a bad request.
    ///
    /// The original message is kept in the new message and the original
    /// class is recorded in the stack.
    pub fn into_validation_failure(self) -> Self {
        let stack = match self.stack {
            Some(stack) => format!("{}: {}\n{}", self.error_type, self.message, stack),
            None => format!("{}: {}", self.error_type, self.message),
        };
        Self::bad_request(format!("Validation Failed. {}", self.message)).with_stack(stack)
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        self.error_type.status_code()
    }

    /// Whether the error was caused by the caller
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        Self::bad_request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServerError::bad_request("x").status_code(), 400);
        assert_eq!(ServerError::unauthorized("x").status_code(), 401);
        assert_eq!(ServerError::not_found("x").status_code(), 404);
        assert_eq!(ServerError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_validation_failure_keeps_cause() {
        let err = ServerError::internal("name is required").into_validation_failure();

        assert_eq!(err.error_type, ErrorType::BadRequest);
        assert_eq!(err.message, "Validation Failed. name is required");
        assert_eq!(err.stack.as_deref(), Some("InternalServer: name is required"));
    }

    #[test]
    fn test_wire_format() {
        let err = ServerError::not_found("No entity name found: \"foo\"");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["errorType"], "NotFound");
        assert_eq!(json["message"], "No entity name found: \"foo\"");
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn test_json_error_is_bad_request() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ServerError::from(parse_err);
        assert!(err.is_client_error());
        assert_eq!(err.error_type, ErrorType::BadRequest);
    }
}
