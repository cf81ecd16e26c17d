//! Error responses of the HTTP API.
//!
//! Every failure leaves the server as the same envelope:
//! `{"type": "error", "error": {"type": <kind>, "message": <text>}}`.

use admiral_core::{Error, ErrorEnvelope, ErrorKind};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// An error on its way to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequestError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFoundError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ApiError, message)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.kind, self.message.clone())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::ApiError {
            tracing::error!(message = %self.message, "request failed");
        }
        let status = self.status();
        let body = match self.kind {
            // Internal details stay in the log.
            ErrorKind::ApiError => ErrorEnvelope::new(self.kind, "Internal server error"),
            _ => self.envelope(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::Storage(_) | Error::Codec(_) => Self::internal(err.to_string()),
            Error::InvalidRequest(_) | Error::NotFound(_) => {
                let envelope = err.to_envelope();
                Self::new(envelope.error.kind, envelope.error.message)
            }
        }
    }
}

impl From<admiral_core::IdError> for ApiError {
    fn from(err: admiral_core::IdError) -> Self {
        Self::invalid(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(ErrorKind::RequestTooLarge, rejection.body_text());
        }
        Self::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}
