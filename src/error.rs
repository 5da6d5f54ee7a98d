//! Error types for the Triad Matrix

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MatrixError {
    #[error("Triad not found: {0}")]
    TriadNotFound(String),
    #[error("Triad is sealed: {0}")]
    TriadSealed(String),
    #[error("Parent triad is not sealed: {0}")]
    ParentNotSealed(String),
    #[error("Child slot {slot} of triad {parent} is occupied")]
    SlotOccupied { parent: String, slot: u8 },
    #[error("Invalid child slot {0} (a triad has slots 0, 1 and 2)")]
    InvalidSlot(u8),
    #[error("Invalid depth: expected {expected}, got {requested}")]
    InvalidDepth { expected: u64, requested: u64 },
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Difficulty not met at depth {depth}")]
    DifficultyNotMet { depth: u64 },
    #[error("Insufficient commitment: {0}")]
    InsufficientCommitment(String),
    #[error("Commitment locked: {0}")]
    CommitmentLocked(String),
    #[error("Mining job not found: {0}")]
    JobNotFound(u64),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for MatrixError {
    fn from(err: std::io::Error) -> Self {
        MatrixError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for MatrixError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        MatrixError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for MatrixError {
    fn from(err: serde_json::Error) -> Self {
        MatrixError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for MatrixError {
    fn from(err: toml::de::Error) -> Self {
        MatrixError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, MatrixError>;
