//! Error taxonomy shared by every layer.
//!
//! Repository and service methods return [`Error`] unchanged from the data
//! source; only the resolver combinator turns errors into transport-shaped
//! GraphQL errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes exposed through `extensions.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    DataError,
    /// The server does not know who the caller is
    Unauthenticated,
    /// The caller is known but lacks permission for the resource
    Forbidden,
    InternalServerError,
    BadRequest,
    /// Raised by the gateway when the forwarded token is no longer valid
    TokenExpired,
    GraphqlParseFailed,
    GraphqlValidationFailed,
    BadUserInput,
}

/// Codes whose message is an i18n phrase and is safe to show to users.
pub const TRANSLATABLE_CODES: &[ErrorCode] = &[
    ErrorCode::BadRequest,
    ErrorCode::DataError,
    ErrorCode::Forbidden,
    ErrorCode::TokenExpired,
    ErrorCode::Unauthenticated,
    ErrorCode::GraphqlParseFailed,
    ErrorCode::GraphqlValidationFailed,
    ErrorCode::BadUserInput,
];

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DataError => "DATA_ERROR",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::GraphqlParseFailed => "GRAPHQL_PARSE_FAILED",
            ErrorCode::GraphqlValidationFailed => "GRAPHQL_VALIDATION_FAILED",
            ErrorCode::BadUserInput => "BAD_USER_INPUT",
        }
    }

    /// Whether errors with this code get a localized message.
    pub fn is_translatable(&self) -> bool {
        TRANSLATABLE_CODES.contains(self)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error carrying a code and a message (usually an i18n phrase).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CustomError {
    pub code: ErrorCode,
    pub message: String,
}

impl CustomError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Custom(#[from] CustomError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unknown column `{column}` on `{table}`")]
    UnknownColumn { table: &'static str, column: String },

    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Shorthand for `Error::Custom(CustomError::new(code, message))`.
    pub fn custom(code: ErrorCode, message: impl Into<String>) -> Self {
        Error::Custom(CustomError::new(code, message))
    }

    /// The code reported to clients. Anything that is not a [`CustomError`]
    /// is an internal error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Custom(e) => e.code,
            _ => ErrorCode::InternalServerError,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
