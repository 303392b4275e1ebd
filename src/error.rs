//! Pipeline error kinds shared by every stage.

use std::fmt;

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, unreadable or unwritable file.
    Io,
    /// Unexpected table or header shape.
    Format,
    /// A coverage value that doesn't match `pct%(num/den)`.
    Parse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Io => write!(f, "IOError"),
            ErrorKind::Format => write!(f, "FormatError"),
            ErrorKind::Parse => write!(f, "ParseError"),
        }
    }
}
