//! Error types for Nexus.
//!
//! Library crates use [`NexusError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Nexus operations.
#[derive(Debug, thiserror::Error)]
pub enum NexusError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Text, HTML, or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Bookmark persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Browser automation channel error (launch, open, timeout).
    #[error("channel error: {0}")]
    Channel(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NexusError>;

impl NexusError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = NexusError::config("delay_min_ms exceeds delay_max_ms");
        assert_eq!(
            err.to_string(),
            "config error: delay_min_ms exceeds delay_max_ms"
        );

        let err = NexusError::Channel("osascript exited with status 1".into());
        assert!(err.to_string().starts_with("channel error"));
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = NexusError::io("/tmp/bookmarks.json", source);
        assert!(err.to_string().contains("bookmarks.json"));
    }
}
