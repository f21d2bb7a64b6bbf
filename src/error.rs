//! Crate-wide error type.
//!
//! Every failure is fatal to the call that raised it: decoders and encoders
//! never catch, retry or return a partially populated record.  The stream
//! cursor is left wherever the failing operation stopped.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed schema or request: bad array/string configuration, unknown
    /// sibling field, unsupported primitive type name, builder misuse.
    #[error("Configuration error in {target}: {reason}")]
    Configuration { target: String, reason: String },

    /// Fewer bytes are available at `position` than the operation needs.
    #[error("Buffer exhausted at offset {position}: {requested} byte(s) requested")]
    BufferExhausted { position: u64, requested: usize },

    /// A mapped or copied value does not fit the destination type.
    #[error("Cannot convert {from} value {value} to {to}")]
    TypeConversion {
        from:  &'static str,
        to:    &'static str,
        value: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn configuration(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Configuration { target: target.into(), reason: reason.into() }
    }

    pub(crate) fn conversion(from: &'static str, to: &'static str, value: impl ToString) -> Self {
        Error::TypeConversion { from, to, value: value.to_string() }
    }

    /// Translate a stream error, folding short reads and short writes into
    /// [`Error::BufferExhausted`].
    pub(crate) fn from_io(err: io::Error, position: u64, requested: usize) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::WriteZero => {
                Error::BufferExhausted { position, requested }
            }
            _ => Error::Io(err),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    pub fn is_buffer_exhausted(&self) -> bool {
        matches!(self, Error::BufferExhausted { .. })
    }

    pub fn is_type_conversion(&self) -> bool {
        matches!(self, Error::TypeConversion { .. })
    }
}
