//! Error types for mesh loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating a mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Unrecognized file extension.
    #[error("unknown mesh format: .{extension}")]
    UnknownFormat {
        /// The unrecognized extension.
        extension: String,
    },

    /// Malformed file content.
    #[error("invalid mesh content: {message}")]
    InvalidContent {
        /// Description of what was invalid.
        message: String,
    },

    /// Binary STL ended before the declared triangle count.
    #[error("truncated STL: expected {expected} triangles, got {got}")]
    Truncated {
        /// Declared triangle count.
        expected: u32,
        /// Triangles actually present.
        got: u32,
    },

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index} (mesh has {vertices})")]
    IndexOutOfRange {
        /// Triangle index.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices.
        vertices: usize,
    },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Float parsing error.
    #[error("float parsing error: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),

    /// Integer parsing error.
    #[error("integer parsing error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
}

impl MeshError {
    /// Create an `InvalidContent` error with the given message.
    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
