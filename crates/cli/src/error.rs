//! Errors surfaced by the `cvsync` client crate.

use std::io;

use thiserror::Error;

/// Failure scanning or applying the local mirror tree.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// An I/O error touching the destination tree.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A wire-level attribute or pathname was malformed.
    #[error(transparent)]
    Wire(#[from] cvsync_core::WireError),
    /// A compare record named an Attic path this crate could not resolve.
    #[error(transparent)]
    Scan(#[from] cvsync_scan::ScanError),
    /// A local RCS file failed to parse during an `UPDATE_RCS` exchange.
    #[error(transparent)]
    Rcs(#[from] cvsync_rcs::ParseError),
}

/// Failure running one `cvsync` client invocation end to end.
#[derive(Debug, Error)]
pub enum CliError {
    /// The destination tree could not be read or written.
    #[error(transparent)]
    Apply(#[from] ApplyError),
    /// A socket or filesystem I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Protocol negotiation with the server failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] cvsync_protocol::ProtocolError),
    /// The mux channel failed.
    #[error("transport error: {0}")]
    Transport(#[from] cvsync_transport::MuxError),
    /// The scan/compare dialogue failed.
    #[error("scan error: {0}")]
    Scan(#[from] cvsync_scan::ScanError),
    /// The refuse file could not be compiled.
    #[error("refuse file error: {0}")]
    Filter(#[from] cvsync_filters::FilterError),
    /// The server did not grant the requested collection.
    #[error("server refused collection {name:?}")]
    CollectionRefused {
        /// The collection name requested.
        name: String,
    },
    /// A command-line argument could not be parsed into the value it
    /// names (the umask override, for instance).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
