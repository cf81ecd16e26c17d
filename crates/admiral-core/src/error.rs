//! # Error Module
//!
//! The crate error type and the wire error envelope.
//!
//! Every failing response of the API carries the same envelope:
//!
//! ```json
//! {"type": "error", "error": {"type": "not_found_error", "message": "..."}}
//! ```
//!
//! [`Error`] is what the registry returns; [`Error::kind`] decides which
//! [`ErrorKind`] (and therefore which HTTP status) the server answers with.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for admiral-core operations.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// CRATE ERROR
// =============================================================================

/// Errors produced by the registry and the storage layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The request is well-formed JSON but violates the contract.
    #[error("{0}")]
    InvalidRequest(String),

    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The underlying database failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidRequest`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// The wire error kind this error is reported as.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequestError,
            Self::NotFound(_) => ErrorKind::NotFoundError,
            Self::Storage(_) | Self::Codec(_) => ErrorKind::ApiError,
        }
    }

    /// Convert into the wire envelope.
    ///
    /// Internal failures are reported with a generic message so storage
    /// details never leak to callers.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let message = match self {
            Self::InvalidRequest(m) | Self::NotFound(m) => m.clone(),
            Self::Storage(_) | Self::Codec(_) => String::from("Internal server error"),
        };
        ErrorEnvelope::new(self.kind(), message)
    }
}

impl From<crate::ids::IdError> for Error {
    fn from(err: crate::ids::IdError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

// =============================================================================
// WIRE ERROR KINDS
// =============================================================================

/// The `error.type` values of the error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequestError,
    AuthenticationError,
    PermissionError,
    NotFoundError,
    RequestTooLarge,
    RateLimitError,
    ApiError,
    OverloadedError,
}

impl ErrorKind {
    /// All kinds, in status order.
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::InvalidRequestError,
        ErrorKind::AuthenticationError,
        ErrorKind::PermissionError,
        ErrorKind::NotFoundError,
        ErrorKind::RequestTooLarge,
        ErrorKind::RateLimitError,
        ErrorKind::ApiError,
        ErrorKind::OverloadedError,
    ];

    /// HTTP status code the kind is served with.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::InvalidRequestError => 400,
            Self::AuthenticationError => 401,
            Self::PermissionError => 403,
            Self::NotFoundError => 404,
            Self::RequestTooLarge => 413,
            Self::RateLimitError => 429,
            Self::ApiError => 500,
            Self::OverloadedError => 529,
        }
    }

    /// Wire name, e.g. `"not_found_error"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequestError => "invalid_request_error",
            Self::AuthenticationError => "authentication_error",
            Self::PermissionError => "permission_error",
            Self::NotFoundError => "not_found_error",
            Self::RequestTooLarge => "request_too_large",
            Self::RateLimitError => "rate_limit_error",
            Self::ApiError => "api_error",
            Self::OverloadedError => "overloaded_error",
        }
    }

    /// Look up a kind by its wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Constant marker for the envelope's top-level `type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorObject {
    #[default]
    Error,
}

/// Inner `error` object of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
}

/// The complete error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "type")]
    pub object: ErrorObject,
    pub error: ErrorDetail,
}

impl ErrorEnvelope {
    /// Build an envelope for the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            object: ErrorObject::Error,
            error: ErrorDetail {
                kind,
                message: message.into(),
            },
        }
    }

    /// HTTP status of this envelope.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.error.kind.status_code()
    }
}

// =============================================================================
// TESTS
// =============================================================================
