//! Errors shared by the wire-level codecs in this crate.

use thiserror::Error;

/// Failure decoding or constructing a wire-level value.
#[derive(Debug, Error)]
pub enum WireError {
    /// A fixed-width field ran out of bytes before it was fully read.
    #[error("truncated wire field: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to decode the field.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },
    /// A length-prefixed value exceeded an implementation-defined ceiling.
    #[error("wire value length {length} exceeds maximum {maximum}")]
    TooLong {
        /// Observed length.
        length: usize,
        /// Maximum permitted length.
        maximum: usize,
    },
    /// A byte string exceeded [`crate::pathname::PATH_MAX`].
    #[error("pathname length {length} exceeds PATH_MAX ({max})")]
    PathTooLong {
        /// Observed length.
        length: usize,
        /// `PATH_MAX`.
        max: usize,
    },
    /// An attribute tag byte did not match any known [`crate::attr::FileType`].
    #[error("unknown filetype tag {0:#04x}")]
    UnknownFileType(u8),
}
