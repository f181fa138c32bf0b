//! Error types for hashledger

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    /// A block could not be constructed from the given field values.
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Missing block field: {0}")]
    MissingField(&'static str),
    /// The value handed to the chain is not a block at all.
    #[error("Not a block: {0}")]
    NotABlock(String),
    #[error("Invalid block index. Expected {expected}, but got {got}")]
    IndexMismatch { expected: u64, got: u64 },
    #[error("Invalid previous block hash. Expected {expected}, but got {got}")]
    PreviousHashMismatch { expected: String, got: String },
    #[error("Corrupt chain at block {index}: {reason}")]
    CorruptChain { index: u64, reason: String },
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl ChainError {
    /// True for the errors raised when a block does not extend the chain tip.
    pub fn is_linkage(&self) -> bool {
        matches!(
            self,
            ChainError::IndexMismatch { .. } | ChainError::PreviousHashMismatch { .. }
        )
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linkage_classification() {
        assert!(ChainError::IndexMismatch { expected: 2, got: 5 }.is_linkage());
        assert!(ChainError::PreviousHashMismatch {
            expected: "aa".to_string(),
            got: "bb".to_string(),
        }
        .is_linkage());
        assert!(!ChainError::NotABlock("string".to_string()).is_linkage());
        assert!(!ChainError::InvalidBlock("bad".to_string()).is_linkage());
    }

    #[test]
    fn test_display_messages() {
        let err = ChainError::IndexMismatch { expected: 2, got: 5 };
        assert_eq!(err.to_string(), "Invalid block index. Expected 2, but got 5");
        assert_eq!(ChainError::MissingField("index").to_string(), "Missing block field: index");
    }
}
