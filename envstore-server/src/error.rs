//! Error types and HTTP response conversion
//!
//! Every error leaves the service as the uniform error envelope:
//!
//! ```json
//! { "status": "error", "error": "build id does not exist" }
//! ```
//!
//! Input-shape problems use the `message` key (or a structured `error` list for
//! body validation), lookups that miss use `error`, and engine failures carry
//! their own status code and message which are passed through unchanged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::api::envelope::Status;

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration loaded but holds an unusable value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller is anonymous and the operation needs more than anonymous bindings grant
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but lacks the required permissions
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request parameters or body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body failed schema validation
    #[error("Validation failed with {} violation(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    /// Failure raised by the environment engine
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A single schema violation found while validating a request body
///
/// `loc` is the path to the offending value, e.g. `["dependencies", 2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Path to the offending field
    pub loc: Vec<Location>,
    /// Human-readable reason
    pub msg: String,
    /// Machine-readable violation type
    #[serde(rename = "type")]
    pub kind: String,
}

/// One segment of a [`FieldViolation`] path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    /// Object key
    Key(String),
    /// Array index
    Index(usize),
}

impl FieldViolation {
    /// Create a violation at the given path
    pub fn new(loc: Vec<Location>, kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// Violation for a required field that is absent
    pub fn missing(field: &str) -> Self {
        Self::new(
            vec![Location::Key(field.to_string())],
            "value_error.missing",
            "field required",
        )
    }
}

/// Domain failure raised by the environment engine
///
/// The engine decides the status code and message; the view layer forwards
/// them verbatim through [`EngineError::response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    /// HTTP status the engine attached to the failure
    pub status: StatusCode,
    /// Message shown to the caller
    pub message: String,
}

impl EngineError {
    /// Create an engine error with an explicit status
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Engine rejected the request as invalid for the current store state
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Engine could not find the entity it was asked to act on
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// The prebuilt response attached to this failure
    pub fn response(&self) -> Response {
        let body = ErrorEnvelope::message(self.message.clone());
        (self.status, Json(body)).into_response()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Engine error ({}): {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for EngineError {}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always `"error"`
    pub status: Status,

    /// Error description or structured detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,

    /// Explanatory message for input errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    /// Envelope carrying an `error` string
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            error: Some(serde_json::Value::String(error.into())),
            message: None,
        }
    }

    /// Envelope carrying a `message` string
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            error: None,
            message: Some(message.into()),
        }
    }

    /// Envelope carrying a structured `error` detail
    pub fn detail(detail: serde_json::Value) -> Self {
        Self {
            status: Status::Error,
            error: Some(detail),
            message: None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Error::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                internal()
            }

            Error::InvalidConfig(msg) => {
                tracing::error!("Invalid configuration: {}", msg);
                internal()
            }

            Error::Io(e) => {
                tracing::error!("I/O error: {}", e);
                internal()
            }

            Error::Unauthorized(msg) => {
                tracing::warn!("Rejected anonymous request: {}", msg);
                (StatusCode::UNAUTHORIZED, ErrorEnvelope::error(msg))
            }

            Error::Forbidden(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                (StatusCode::FORBIDDEN, ErrorEnvelope::error(msg))
            }

            Error::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorEnvelope::error(msg)),

            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorEnvelope::message(msg)),

            Error::Validation(violations) => {
                let detail = serde_json::to_value(&violations)
                    .unwrap_or_else(|_| serde_json::Value::Array(Vec::new()));
                (StatusCode::BAD_REQUEST, ErrorEnvelope::detail(detail))
            }

            Error::Engine(e) => {
                tracing::info!(
                    status = e.status.as_u16(),
                    "Engine rejected request: {}",
                    e.message
                );
                return e.response();
            }

            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, ErrorEnvelope) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorEnvelope::error("internal server error"),
    )
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_uses_error_key() {
        let response = Error::NotFound("build id does not exist".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "error": "build id does not exist"})
        );
    }

    #[tokio::test]
    async fn test_bad_request_uses_message_key() {
        let response = Error::BadRequest("build id not specified".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "message": "build id not specified"})
        );
    }

    #[tokio::test]
    async fn test_validation_lists_violations() {
        let response = Error::Validation(vec![
            FieldViolation::missing("name"),
            FieldViolation::new(
                vec![Location::Key("channels".into()), Location::Index(1)],
                "type_error.str",
                "str type expected",
            ),
        ])
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"][0]["loc"], json!(["name"]));
        assert_eq!(body["error"][0]["type"], "value_error.missing");
        assert_eq!(body["error"][1]["loc"], json!(["channels", 1]));
    }

    #[tokio::test]
    async fn test_engine_error_passes_through() {
        let err: Error = EngineError::new(StatusCode::CONFLICT, "build is running").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "message": "build is running"})
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = Error::Internal("lock poisoned at table scan".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "internal server error");
    }

    #[test]
    fn test_authorization_statuses() {
        assert_eq!(
            Error::Unauthorized("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::Forbidden("x".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
