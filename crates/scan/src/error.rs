//! Errors surfaced by the scan/compare dialogue.

use thiserror::Error;

use cvsync_core::WireError;

/// Failure decoding or acting on a scan/compare command.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A wire field was truncated or otherwise malformed.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// An I/O error occurred on the underlying channel stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A command frame's byte length exceeded this crate's sanity ceiling.
    #[error("command frame of {length} bytes exceeds the {maximum}-byte ceiling")]
    FrameTooLong {
        /// The declared frame length.
        length: usize,
        /// The ceiling this crate enforces.
        maximum: usize,
    },
    /// An opcode byte did not match any defined scan or compare opcode.
    #[error("unknown scan/compare opcode {0:#04x}")]
    UnknownOpcode(u8),
    /// `ADD`/`REMOVE`/`RCS_ATTIC`/`SETATTR`/`UPDATE` named a filetype the
    /// command's own shape doesn't allow (e.g. `UPDATE` naming `DIR`).
    #[error("opcode does not allow filetype {0:?}")]
    FiletypeNotAllowed(cvsync_core::FileType),
    /// An `Attic/` path manipulation was attempted on a path with no
    /// parent directory, or one already/never containing an `Attic`
    /// segment as required by the operation.
    #[error("path {0:?} cannot have its Attic segment inserted/removed")]
    InvalidAtticPath(String),
    /// A `SYMBOLS` count exceeded the 256-entry ceiling imposed by
    /// protocol minors below 24, and the caller did not fall back to a
    /// generic update.
    #[error("symbol count {count} exceeds the legacy 256-entry ceiling")]
    SymbolCountOverflow {
        /// The actual count that overflowed.
        count: usize,
    },
}
