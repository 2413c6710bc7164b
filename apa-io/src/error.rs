use std::io;
use thiserror::Error;

/// Error type for apa-io operations.
#[derive(Error, Debug)]
pub enum ApaIoError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Input file could not be opened.
    #[error("Can't read file: {0}")]
    FileReadError(String),

    /// A row of an interval file could not be parsed.
    #[error("Malformed interval row at {path}:{line}: {message}")]
    MalformedLine {
        path: String,
        line: usize,
        message: String,
    },

    /// Status marker holds something other than a known state.
    #[error("Unrecognised status marker {path}: {content:?}")]
    InvalidStatus { path: String, content: String },
}

/// Result type alias for apa-io operations.
pub type Result<T> = std::result::Result<T, ApaIoError>;
