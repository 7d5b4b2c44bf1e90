//! Error types for branch trees and their codecs.
//!
//! Every fallible operation in this crate returns [`Result`]. Each [`Error`]
//! variant maps onto one of the coarse [`ErrorCode`] categories so callers
//! that only care about the kind of failure can match on [`Error::code`].
//!
//! ## Error Categories
//!
//! - **I/O**: reading or writing a buffer or file failed
//! - **Syntax**: the text parser gave up on a document (with source position)
//! - **Type**: an operation was applied to the wrong kind of branch, or an
//!   array received an element of the wrong type
//! - **Element count**: an array held fewer elements than the caller asked for
//!
//! Parse-time problems that the lenient parser recovers from are not errors;
//! they are reported as [`Diagnostic`]s and logged through `tracing`.
//!
//! ## Examples
//!
//! ```rust
//! use acm::{from_str, ErrorCode};
//!
//! let err = from_str("object cfg { int32 x 42").unwrap_err();
//! assert_eq!(err.code(), ErrorCode::IoRead);
//! ```

use std::fmt;
use thiserror::Error;

/// Coarse error categories shared by every [`Error`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Read failure, including malformed input.
    IoRead,
    /// Write failure.
    IoWrite,
    /// A buffer could not be reserved.
    AllocationFailure,
    InvalidArgument,
    /// Wrong branch kind for the requested operation, or an array element
    /// type mismatch.
    InvalidType,
    /// An array is shorter than the caller expected.
    InvalidElementCount,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::IoRead => "read failure",
            ErrorCode::IoWrite => "write failure",
            ErrorCode::AllocationFailure => "allocation failure",
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::InvalidType => "invalid type",
            ErrorCode::InvalidElementCount => "invalid element count",
        };
        f.write_str(name)
    }
}

/// A recoverable problem found while lexing, parsing or decoding.
///
/// Diagnostics carry the source label given in
/// [`ParseOptions::source`](crate::ParseOptions) plus a 1-based position. The
/// binary decoder has no line structure and reports the byte offset as
/// `column` with `line` set to 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: &str, line: usize, column: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            path: path.to_string(),
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.path, self.line, self.column, self.message
        )
    }
}

/// Represents all possible errors produced by this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Reading a buffer or file failed
    #[error("Read error: {0}")]
    IoRead(String),

    /// Writing a buffer or file failed
    #[error("Write error: {0}")]
    IoWrite(String),

    /// A buffer reservation failed
    #[error("Allocation failure: {0}")]
    Allocation(String),

    /// The text parser could not produce a tree
    #[error("Syntax error in {path} at line {line}, column {col}: {msg}")]
    Syntax {
        path: String,
        line: usize,
        col: usize,
        msg: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not valid for this branch type
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// Array holds fewer elements than requested
    #[error("Invalid element count: expected {expected}, found {found}")]
    InvalidElementCount { expected: usize, found: usize },

    /// Root object name does not match the expected object type
    #[error("Unexpected root: expected \"{expected}\", found \"{found}\"")]
    UnexpectedRoot { expected: String, found: String },

    /// A tree invariant was violated while writing
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the coarse category of this error.
    ///
    /// ```rust
    /// use acm::{Error, ErrorCode};
    ///
    /// assert_eq!(Error::invalid_type("not an object").code(), ErrorCode::InvalidType);
    /// ```
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::IoRead(_) | Error::Syntax { .. } => ErrorCode::IoRead,
            Error::IoWrite(_) => ErrorCode::IoWrite,
            Error::Allocation(_) => ErrorCode::AllocationFailure,
            Error::InvalidArgument(_) | Error::UnexpectedRoot { .. } | Error::Internal(_) => {
                ErrorCode::InvalidArgument
            }
            Error::InvalidType(_) => ErrorCode::InvalidType,
            Error::InvalidElementCount { .. } => ErrorCode::InvalidElementCount,
        }
    }

    pub fn io_read<T: fmt::Display>(msg: T) -> Self {
        Error::IoRead(msg.to_string())
    }

    pub fn io_write<T: fmt::Display>(msg: T) -> Self {
        Error::IoWrite(msg.to_string())
    }

    pub fn allocation<T: fmt::Display>(msg: T) -> Self {
        Error::Allocation(msg.to_string())
    }

    pub fn invalid_argument<T: fmt::Display>(msg: T) -> Self {
        Error::InvalidArgument(msg.to_string())
    }

    pub fn invalid_type<T: fmt::Display>(msg: T) -> Self {
        Error::InvalidType(msg.to_string())
    }

    pub fn internal<T: fmt::Display>(msg: T) -> Self {
        Error::Internal(msg.to_string())
    }

    /// Creates a syntax error from a parser diagnostic.
    pub fn syntax(diagnostic: &Diagnostic) -> Self {
        Error::Syntax {
            path: diagnostic.path.clone(),
            line: diagnostic.line,
            col: diagnostic.column,
            msg: diagnostic.message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Error::io_read("x").code(), ErrorCode::IoRead);
        assert_eq!(Error::io_write("x").code(), ErrorCode::IoWrite);
        assert_eq!(Error::allocation("x").code(), ErrorCode::AllocationFailure);
        assert_eq!(
            Error::InvalidElementCount {
                expected: 3,
                found: 1
            }
            .code(),
            ErrorCode::InvalidElementCount
        );
        assert_eq!(Error::internal("x").code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_syntax_message_has_position() {
        let diag = Diagnostic::new("cfg.acm", 3, 7, "No closing bracket");
        let err = Error::syntax(&diag);
        let msg = err.to_string();
        assert!(msg.contains("cfg.acm"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains("column 7"));
        assert_eq!(diag.to_string(), "cfg.acm:3:7: No closing bracket");
    }
}
