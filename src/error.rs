//! Error types for the retrotype crate.

use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The main error type for the retrotype crate.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parser related errors.
    #[error("Parser error: {0}")]
    Parser(String),

    /// Invalid argument errors.
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// The traced execution did not complete; its observations were discarded.
    #[error("Trace incomplete: {0}")]
    Trace(String),

    /// Malformed trace event stream.
    #[error("Trace decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Other miscellaneous errors.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a new parser error.
    pub fn parser_error(msg: impl Into<String>) -> Self {
        Self::Parser(msg.into())
    }

    /// Creates a new argument error.
    pub fn argument_error(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    /// Creates a new trace error.
    pub fn trace_error(msg: impl Into<String>) -> Self {
        Self::Trace(msg.into())
    }

    /// Whether this error only affects a single unit and the batch may continue.
    pub fn is_unit_scoped(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Parser(_) | Self::Trace(_) | Self::Decode(_))
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_scoped_errors() {
        assert!(Error::parser_error("bad").is_unit_scoped());
        assert!(Error::trace_error("raised").is_unit_scoped());
        assert!(!Error::argument_error("no paths").is_unit_scoped());
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::trace_error("boom").to_string(), "Trace incomplete: boom");
        assert_eq!(Error::from("x").to_string(), "x");
    }
}
