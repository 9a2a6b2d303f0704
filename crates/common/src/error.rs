//! Error related data structures to be shared and used.
//!
//! This module contains the [`Error`] enum, used to represent every error
//! kind that a reader, writer or catalog operation in the toolkit can
//! surface (see the error kinds enumerated in the top level design notes).

use std::fmt::{self, Display, Formatter};
use std::io;

/// Top level enum for error handling across the toolkit.
///
/// Codecs never retry and never attempt partial recovery: they surface one
/// of these variants to their immediate caller. `CustomError` is the escape
/// hatch for messages that don't warrant their own variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A read exceeded the declared size of its source.
    EndOfStream,
    /// Header magic or version did not match what the codec expected.
    BadMagic { expected: String, found: String },
    /// The magic matched but the version is not one this codec supports.
    UnsupportedVersion(String),
    /// Internal offsets are inconsistent (array count mismatch, name index
    /// out of range, child offset beyond file, ...).
    StructuralError(String),
    /// A semantic invariant was violated (duplicate identifier, struct
    /// depth exceeded, mismatched MDX row size, ...).
    ValidationError(String),
    /// A string could not be encoded under the language's codec.
    EncodingError(String),
    /// The requested `(resname, restype)` was not provided by any consulted
    /// source. Callers should treat this as the expected negative case.
    NotFound,
    /// An escape hatch for messages that don't fit another variant.
    CustomError(String),
}

impl Error {
    pub fn description(&self) -> String {
        match self {
            Error::EndOfStream => String::from("unexpected end of stream"),
            Error::BadMagic { expected, found } => {
                format!("bad magic: expected {expected:?}, found {found:?}")
            }
            Error::UnsupportedVersion(version) => {
                format!("unsupported version: {version}")
            }
            Error::StructuralError(message) => format!("structural error: {message}"),
            Error::ValidationError(message) => format!("validation error: {message}"),
            Error::EncodingError(message) => format!("encoding error: {message}"),
            Error::NotFound => String::from("resource not found"),
            Error::CustomError(message) => String::from(message),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => Error::EndOfStream,
            _ => Error::CustomError(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wraps_description() {
        let error = Error::ValidationError(String::from("duplicate struct id"));
        assert_eq!(error.to_string(), "validation error: duplicate struct id");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(Error::from(io_error), Error::EndOfStream);
    }
}
