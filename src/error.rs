//! Error taxonomy shared by every storage backend.

use std::fmt;

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by blob store operations.
///
/// Every backend funnels its native failures into this one type, so
/// callers handle storage the same way regardless of where the bytes
/// live. Messages carry the operation name and the identifier's
/// textual form.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob exists for the identifier.
    #[error("{op} failed: blob not found for id {id}")]
    NotFound { op: &'static str, id: String },

    /// A non-overwriting create collided with an existing blob.
    #[error("{op} failed: blob already exists for id {id}")]
    AlreadyExists { op: &'static str, id: String },

    /// The backend cannot provide this operation at all.
    #[error("{backend} does not support {op}")]
    Unsupported {
        backend: &'static str,
        op: &'static str,
    },

    /// A native backend failure, wrapped with operation context.
    ///
    /// `target` is the identifier's textual form for single-blob
    /// operations, or the store's scope (root path, bucket) for bulk
    /// ones.
    #[error("{op} failed for {target}: {source}")]
    Backend {
        op: &'static str,
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A configuration was rejected before any backend was touched.
    #[error("invalid store config: {0}")]
    InvalidConfig(String),
}

impl StorageError {
    pub fn not_found(op: &'static str, id: impl fmt::Display) -> Self {
        StorageError::NotFound {
            op,
            id: id.to_string(),
        }
    }

    pub fn already_exists(op: &'static str, id: impl fmt::Display) -> Self {
        StorageError::AlreadyExists {
            op,
            id: id.to_string(),
        }
    }

    pub fn unsupported(backend: &'static str, op: &'static str) -> Self {
        StorageError::Unsupported { backend, op }
    }

    pub fn backend(
        op: &'static str,
        target: impl fmt::Display,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        StorageError::Backend {
            op,
            target: target.to_string(),
            source: source.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        StorageError::InvalidConfig(message.into())
    }

    /// Backend-style error for a byte range with `start` past `end`.
    pub(crate) fn invalid_range(op: &'static str, id: impl fmt::Display, start: u64, end: u64) -> Self {
        StorageError::backend(
            op,
            id,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid byte range {start}..{end}"),
            ),
        )
    }

    /// Whether this is the not-found case, used by idempotent deletes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_operation_and_id() {
        let err = StorageError::not_found("get_bytes", "4a1f");
        let msg = err.to_string();
        assert!(msg.contains("get_bytes"));
        assert!(msg.contains("4a1f"));

        let err = StorageError::already_exists("create", "4a1f");
        assert!(err.to_string().contains("already exists"));

        let err = StorageError::unsupported("SFTP storage", "get_range");
        assert_eq!(err.to_string(), "SFTP storage does not support get_range");
    }

    #[test]
    fn backend_errors_keep_their_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StorageError::backend("create", "4a1f", io);
        assert!(err.to_string().contains("create"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_found_is_detectable() {
        assert!(StorageError::not_found("delete", "x").is_not_found());
        assert!(!StorageError::invalid_config("bad").is_not_found());
    }
}
