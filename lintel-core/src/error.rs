// Error types for the Lintel engine

use crate::HttpStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Media type of every error body the engine writes.
pub const ERROR_MEDIA_TYPE: &str = "application/vnd.error+json";

/// Cache-Control value attached to every error response.
pub const ERROR_CACHE_CONTROL: &str = "no-cache, no-store, no-transform";

/// Client-facing message for every 5xx response.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Errors that terminate a request lifecycle.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Not Acceptable: {0}")]
    NotAcceptable(String),

    #[error("Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    #[error("Precondition Failed: {0}")]
    PreconditionFailed(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Authentication provider error: {0}")]
    AuthProvider(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// A resource-defined failure carrying its own status and error code.
    #[error("{status}: {message}")]
    Custom {
        status: u16,
        message: String,
        code: Option<ErrorCode>,
    },
}

impl Error {
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_) | Error::Deserialization(_) => HttpStatus::BadRequest.code(),
            Error::Unauthorized(_) => HttpStatus::Unauthorized.code(),
            Error::Forbidden(_) => HttpStatus::Forbidden.code(),
            Error::NotFound(_) => HttpStatus::NotFound.code(),
            Error::MethodNotAllowed(_) => HttpStatus::MethodNotAllowed.code(),
            Error::NotAcceptable(_) => HttpStatus::NotAcceptable.code(),
            Error::UnsupportedMediaType(_) => HttpStatus::UnsupportedMediaType.code(),
            Error::PreconditionFailed(_) => HttpStatus::PreconditionFailed.code(),
            Error::Custom { status, .. } => *status,
            Error::Serialization(_)
            | Error::Persistence(_)
            | Error::AuthProvider(_)
            | Error::Internal(_) => HttpStatus::InternalServerError.code(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// The message safe to show a client. Server errors never expose detail.
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            return INTERNAL_ERROR_MESSAGE.to_string();
        }
        match self {
            Error::BadRequest(m)
            | Error::Unauthorized(m)
            | Error::Forbidden(m)
            | Error::NotFound(m)
            | Error::MethodNotAllowed(m)
            | Error::NotAcceptable(m)
            | Error::UnsupportedMediaType(m)
            | Error::PreconditionFailed(m)
            | Error::Deserialization(m) => m.clone(),
            Error::Custom { message, .. } => message.clone(),
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Custom { code, .. } => code.clone(),
            _ => None,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let status = self.status_code();
        ErrorBody {
            status,
            error: crate::status::reason_for(status).to_string(),
            message: self.public_message(),
            code: self.code(),
        }
    }
}

/// Application-specific error code, either textual or numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl From<&str> for ErrorCode {
    fn from(value: &str) -> Self {
        ErrorCode::Text(value.to_string())
    }
}

impl From<i64> for ErrorCode {
    fn from(value: i64) -> Self {
        ErrorCode::Number(value)
    }
}

/// Body of an `application/vnd.error+json` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<ErrorCode>,
}

/// Failure reported by a persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("operation `{0}` is not supported by this repository")]
    Unsupported(&'static str),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("conflicting write: {0}")]
    Conflict(String),
}

pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;

/// Failure registering a route with the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error(
        "conflicting media types on {method} {path}: handlers `{existing}` and `{incoming}` both declare consumes={consumes} produces={produces}"
    )]
    DuplicateCapability {
        method: String,
        path: String,
        consumes: String,
        produces: String,
        existing: String,
        incoming: String,
    },

    #[error("invalid route pattern `{0}`")]
    InvalidPattern(String),

    #[error("invalid media type `{0}`")]
    InvalidMediaType(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::NotAcceptable("x".into()).status_code(), 406);
        assert_eq!(Error::UnsupportedMediaType("x".into()).status_code(), 415);
        assert_eq!(Error::Deserialization("x".into()).status_code(), 400);
        assert_eq!(
            Error::Persistence(PersistenceError::Storage("disk".into())).status_code(),
            500
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = Error::Persistence(PersistenceError::Storage("table users is locked".into()));
        let body = err.body();
        assert_eq!(body.status, 500);
        assert_eq!(body.error, "Internal Server Error");
        assert_eq!(body.message, INTERNAL_ERROR_MESSAGE);
        assert!(!body.message.contains("users"));
    }

    #[test]
    fn test_client_error_body() {
        let body = Error::Forbidden("role `admin` required".into()).body();
        assert_eq!(body.status, 403);
        assert_eq!(body.error, "Forbidden");
        assert_eq!(body.message, "role `admin` required");
        assert!(body.code.is_none());
    }

    #[test]
    fn test_error_body_code_serialization() {
        let err = Error::Custom {
            status: 422,
            message: "email already taken".into(),
            code: Some(ErrorCode::from("EMAIL_TAKEN")),
        };
        let json = serde_json::to_value(err.body()).unwrap();
        assert_eq!(json["code"], "EMAIL_TAKEN");
        assert_eq!(json["error"], "Unprocessable Entity");

        let numeric = ErrorBody {
            status: 409,
            error: "Conflict".into(),
            message: "stale".into(),
            code: Some(ErrorCode::Number(7)),
        };
        assert_eq!(serde_json::to_value(&numeric).unwrap()["code"], 7);
    }

    #[test]
    fn test_error_body_omits_missing_code() {
        let json = serde_json::to_string(&Error::NotFound("gone".into()).body()).unwrap();
        assert!(!json.contains("code"));
    }

    #[test]
    fn test_registration_error_names_both_handlers() {
        let err = RegistrationError::DuplicateCapability {
            method: "GET".into(),
            path: "/users".into(),
            consumes: "-".into(),
            produces: "application/json".into(),
            existing: "list_users".into(),
            incoming: "list_users_v2".into(),
        };
        let text = err.to_string();
        assert!(text.contains("list_users"));
        assert!(text.contains("list_users_v2"));
        assert!(text.contains("application/json"));
    }
}
