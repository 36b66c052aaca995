use std::fmt;

use crate::ast::SourceLocation;

/// Errors raised by the CHC encoding.
///
/// Invariant violations abort the analysis of the current source unit;
/// the driver reports them and moves on rather than panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChcError {
    /// An internal invariant of the encoder was violated.
    Invariant(String),
    /// A source construct the encoding does not support.
    Unsupported(SourceLocation, String),
}

impl ChcError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        ChcError::Invariant(msg.into())
    }
}

impl fmt::Display for ChcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChcError::Invariant(msg) => write!(f, "internal encoder invariant violated: {msg}"),
            ChcError::Unsupported(loc, msg) => {
                write!(f, "unsupported construct at {}..{}: {msg}", loc.start, loc.end)
            }
        }
    }
}

impl std::error::Error for ChcError {}
