//! Error types for storage, input validation and API responses.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A failure of the backing store.
///
/// Repository operations return this for every storage-layer problem,
/// such as a constraint violation or a missing table. The underlying cause
/// is kept as the error source.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("schema initialization failed: {0}")]
    Migration(#[from] refinery::Error),
}

/// Result type for repository operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Invalid or missing user input, detected before the repository is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{} is required", capitalize(.field))]
    Missing { field: &'static str },

    #[error("{reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn missing_field(field: &'static str) -> Self {
        Self::Missing { field }
    }

    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending form field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Missing { field } | Self::Invalid { field, .. } => *field,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TaskNotFound,
    DatabaseError,
}

/// Structured error body for JSON responses.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `task_id` is shown as given, so an unparsable id can be reported too.
    pub fn task_not_found(task_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message() {
        let err = ValidationError::missing_field("title");
        assert_eq!(err.to_string(), "Title is required");
        assert_eq!(err.field(), "title");
    }

    #[test]
    fn api_error_serialization() {
        let json = serde_json::to_value(ApiError::task_not_found(42)).unwrap();
        assert_eq!(json["code"], "TASK_NOT_FOUND");
        assert_eq!(json["message"], "Task not found: 42");
        assert_eq!(json.as_object().map(|o| o.len()), Some(2));
    }

    #[test]
    fn invalid_value_uses_reason_as_message() {
        let err = ValidationError::invalid_value("priority", "Priority must be a whole number");
        assert_eq!(err.to_string(), "Priority must be a whole number");
        assert_eq!(err.field(), "priority");
    }

    #[test]
    fn not_found_accepts_raw_id() {
        let api = ApiError::task_not_found("abc");
        assert_eq!(api.message, "Task not found: abc");
    }

    #[test]
    fn storage_error_keeps_cause() {
        let err = StorageError::from(rusqlite::Error::InvalidQuery);
        assert!(std::error::Error::source(&err).is_some());
        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::DatabaseError);
    }
}
