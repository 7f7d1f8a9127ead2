//! Error types and result types for every layer of the stack.
//!
//! Errors are translated twice on their way to a caller:
//!
//! - [`DriverError`] is produced by storage backends and never leaves a repository.
//! - [`AppError`] is what repositories return. It carries no HTTP semantics.
//! - [`HttpError`] is what services return. It carries a status code and a message
//!   suitable for an API response.
//!
//! Use [`DriverResult<T>`], [`AppResult<T>`] and [`HttpResult<T>`] as the return types
//! of fallible operations at the respective layer.

use bson::error::Error as BsonError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Server error code reported by MongoDB for unique-constraint violations.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Server error code reported by MongoDB when a write targets an immutable field.
pub const IMMUTABLE_FIELD_CODE: i32 = 66;

/// Represents all faults a storage backend can report.
///
/// Backends map their native errors into this enum. Only repositories should inspect it.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The server rejected the operation with a numeric error code.
    #[error("Server error {code}: {message}")]
    Server {
        /// The server's error code (e.g. [`DUPLICATE_KEY_CODE`]).
        code: i32,
        /// The server's error message.
        message: String,
    },
    /// The backend could not reach the server or lost the connection.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The document has an invalid structure for the requested operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Any other error reported by the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DriverError {
    /// Returns `true` if this error is a unique-constraint violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, DriverError::Server { code, .. } if *code == DUPLICATE_KEY_CODE)
    }

    /// Returns the server error code, if the server reported one.
    pub fn code(&self) -> Option<i32> {
        match self {
            DriverError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A specialized `Result` type for storage backend operations.
pub type DriverResult<T> = Result<T, DriverError>;

impl From<BsonError> for DriverError {
    fn from(err: BsonError) -> Self {
        DriverError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DriverError {
    fn from(err: SerdeJsonError) -> Self {
        DriverError::Serialization(err.to_string())
    }
}

/// Internal application errors.
///
/// These are not meant to be shown to end users. Services translate them into
/// [`HttpError`]s before they reach a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A generic internal fault.
    #[error("Internal application error: {0}")]
    Internal(String),
    /// The database failed to perform the operation.
    #[error("Internal database error")]
    Database,
    /// A write violated a unique constraint.
    #[error("Duplicate key")]
    DuplicateKey,
}

/// A specialized `Result` type for repository operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<&DriverError> for AppError {
    fn from(err: &DriverError) -> Self {
        if err.is_duplicate_key() {
            AppError::DuplicateKey
        } else {
            AppError::Database
        }
    }
}

impl From<DriverError> for AppError {
    fn from(err: DriverError) -> Self {
        AppError::from(&err)
    }
}

/// Errors meant to be rendered in API responses.
///
/// Each variant exposes a human-readable [`message`](HttpError::message) and a numeric
/// [`status_code`](HttpError::status_code). Serializing them into a response body is left
/// to the HTTP layer; [`HttpErrorBody`] is provided for convenience.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// 500 Internal Server Error.
    #[error("Internal server error")]
    InternalServer,
    /// 400 Bad Request caused by an invalid input field.
    #[error("Validation error on field {field}")]
    Validation {
        /// The name of the offending field.
        field: String,
    },
    /// 401 Unauthorized.
    #[error("Unauthorized")]
    Unauthorized,
    /// 403 Forbidden.
    #[error("Forbidden")]
    Forbidden,
    /// 404 Not Found.
    #[error("{target} not found")]
    NotFound {
        /// What was looked for (e.g. "User").
        target: String,
    },
    /// 409 Conflict.
    #[error("Conflict")]
    Conflict,
}

impl HttpError {
    pub fn validation(field: impl Into<String>) -> Self {
        HttpError::Validation { field: field.into() }
    }

    pub fn not_found(target: impl Into<String>) -> Self {
        HttpError::NotFound { target: target.into() }
    }

    /// Returns the HTTP status code associated with this error.
    pub fn status_code(&self) -> u16 {
        match self {
            HttpError::InternalServer => 500,
            HttpError::Validation { .. } => 400,
            HttpError::Unauthorized => 401,
            HttpError::Forbidden => 403,
            HttpError::NotFound { .. } => 404,
            HttpError::Conflict => 409,
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns a serializable response body for this error.
    pub fn body(&self) -> HttpErrorBody {
        HttpErrorBody {
            message: self.message(),
            status_code: self.status_code(),
        }
    }
}

/// A specialized `Result` type for service operations.
pub type HttpResult<T> = Result<T, HttpError>;

impl From<&AppError> for HttpError {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::DuplicateKey => HttpError::Conflict,
            AppError::Database | AppError::Internal(_) => HttpError::InternalServer,
        }
    }
}

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        HttpError::from(&err)
    }
}

/// JSON-friendly rendering of an [`HttpError`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpErrorBody {
    pub message: String,
    pub status_code: u16,
}
