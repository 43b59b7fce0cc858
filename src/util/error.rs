//! Error types for the bridge library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Missing or wrong magic line at start of a document
    #[error("Invalid document: expected '#usda' header")]
    InvalidHeader,

    /// Malformed statement in a document
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Invalid data structure in a document
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// Attribute not found by name
    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    /// Node/prim not found by name or path
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Type mismatch when reading or writing data
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Session was opened read-only and cannot be written
    #[error("Session is read-only")]
    ReadOnly,

    /// No document session is open
    #[error("No document is open")]
    NoDocument,

    /// Serialization to disk failed
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a parse error tagged with a line number.
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse { line, message: msg.into() }
    }
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
