use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

/// Errors that end processing of a single submit request
///
/// Each variant maps to one HTTP status and one fixed message that is stored in
/// the audit record.
#[derive(Debug, Error)]
pub enum AppError {
    /// Anything other than POST on the submit path
    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),
    /// Transport failure or size limit while reading the body
    #[error("Could not read request body: {0}")]
    BodyRead(String),
    /// Classification result could not be encoded
    #[error("Error creating JSON response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::BodyRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client and recorded in `error_msg`
    pub fn audit_message(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "Method not allowed",
            Self::BodyRead(_) => "Could not read request body",
            Self::Serialization(_) => "Error creating JSON response",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::BodyRead(_) => "body_read_error",
            Self::Serialization(_) => "serialization_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.audit_message();

        match self {
            Self::MethodNotAllowed(_) => {
                (status, [(header::ALLOW, "POST")], message).into_response()
            }
            _ => (status, message).into_response(),
        }
    }
}

/// Errors raised by an audit sink
///
/// These never reach the client; the writer logs them and drops the record.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("insert timed out after {0:?}")]
    Timeout(Duration),
}
