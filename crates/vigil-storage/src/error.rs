//! Error types for spool storage

use thiserror::Error;

/// Errors that can occur in spool storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error while touching the spool directory
    #[error("I/O error: {0}")]
    Io(String),

    /// Underlying database error
    #[error("database error: {0}")]
    Database(String),

    /// Error while encoding or decoding a stored row
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Create a new database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing spool dir");
        let err: StorageError = io_err.into();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(err.to_string().contains("missing spool dir"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("nope{").unwrap_err();
        let err: StorageError = parse_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_database_error_display() {
        let err = StorageError::database("tree corrupted");
        assert!(err.to_string().contains("tree corrupted"));
    }
}
