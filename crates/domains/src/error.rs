//! # AppError
//!
//! Centralized error handling for the community board.
//! Ports report `StorageError`; the service layer wraps those into `AppError`
//! together with the operation name and the post identity.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a `FileStore` or `PostRepository` implementation.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The source path of a rename (or another required path) does not exist.
    #[error("path does not exist: {}", .0.display())]
    Missing(PathBuf),

    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persistence backend failure (connection, query, decode).
    #[error("persistence backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// The primary error type for all service operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Post)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Malformed instruction data; raised before any filesystem mutation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Filesystem or persistence failure. Not retried; files already written
    /// or renamed before the failure are left in place.
    #[error("{operation} failed for {id}: {source}")]
    Io {
        operation: &'static str,
        id: String,
        #[source]
        source: StorageError,
    },
}

impl AppError {
    pub fn post_not_found(id: impl ToString) -> Self {
        AppError::NotFound("Post".to_string(), id.to_string())
    }

    pub fn io(operation: &'static str, id: impl ToString, source: StorageError) -> Self {
        AppError::Io {
            operation,
            id: id.to_string(),
            source,
        }
    }
}

/// A specialized Result type for service logic.
pub type Result<T> = std::result::Result<T, AppError>;
