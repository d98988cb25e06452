//! Error types for STEP export.

use thiserror::Error;

/// Errors that can occur while writing a STEP file.
#[derive(Error, Debug)]
pub enum StepError {
    /// I/O error writing the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A face uses geometry that has no STEP mapping here.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Malformed topology (e.g., a face without loops).
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// The shape has no faces to export.
    #[error("Shape has no faces")]
    EmptyShape,
}
