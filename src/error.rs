//! Error types for greenkey

use thiserror::Error;

/// Result type alias for keying operations
pub type Result<T> = std::result::Result<T, KeyError>;

/// Fatal errors raised while setting up or running a keying pass
#[derive(Error, Debug)]
pub enum KeyError {
    /// Unsupported extension, missing file, mismatched media pairing, bad parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A required frame could not be read or written
    #[error("Stream I/O error: {0}")]
    StreamIo(String),

    /// No decoder or encoder exists for the requested path
    #[error("Codec unavailable: {0}")]
    CodecUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyError {
    pub fn config(msg: impl Into<String>) -> Self {
        KeyError::Configuration(msg.into())
    }

    pub fn stream(msg: impl Into<String>) -> Self {
        KeyError::StreamIo(msg.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        KeyError::CodecUnavailable(msg.into())
    }

    /// Check if this error was raised before any frame was touched
    pub fn is_configuration(&self) -> bool {
        matches!(self, KeyError::Configuration(_))
    }
}
