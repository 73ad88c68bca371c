//! Errors surfaced by the daemon crate.

use std::io;

use thiserror::Error;

/// Failure parsing a `cvsyncd.conf`-style configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A directive referenced an unknown keyword.
    #[error("line {line}: unknown directive {keyword:?}")]
    UnknownDirective {
        /// 1-based line number.
        line: usize,
        /// The offending keyword.
        keyword: String,
    },
    /// A directive was missing its required argument.
    #[error("line {line}: {directive} requires an argument")]
    MissingArgument {
        /// 1-based line number.
        line: usize,
        /// The directive that needed an argument.
        directive: String,
    },
    /// A numeric argument failed to parse.
    #[error("line {line}: {directive} argument {value:?} is not a valid number")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// The directive.
        directive: String,
        /// The offending text.
        value: String,
    },
    /// A `collection { ... }` block was not terminated with `}`.
    #[error("line {line}: unterminated collection block")]
    UnterminatedBlock {
        /// Line the block opened on.
        line: usize,
    },
    /// A `release` directive named something other than `list`/`rcs`.
    #[error("line {line}: unknown release kind {value:?}")]
    UnknownRelease {
        /// 1-based line number.
        line: usize,
        /// The offending text.
        value: String,
    },
    /// A collection's mandatory `prefix` directive was never given.
    #[error("collection {name:?} is missing a prefix directive")]
    MissingPrefix {
        /// The collection's name.
        name: String,
    },
    /// A collection's `super` directive named a collection that either
    /// doesn't exist or appears later in the file.
    #[error("collection {name:?} has unknown super collection {parent:?}")]
    UnknownSuper {
        /// The collection's name.
        name: String,
        /// The unresolved parent name.
        parent: String,
    },
}

/// Failure in the daemon's accept loop or a single session.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The listening socket failed.
    #[error("listener error: {0}")]
    Io(#[from] io::Error),
    /// The ACL file failed to parse.
    #[error("ACL file error: {0}")]
    Acl(#[from] cvsync_access::AccessError),
    /// The configuration file failed to parse.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Protocol negotiation failed for this session.
    #[error("protocol error: {0}")]
    Protocol(#[from] cvsync_protocol::ProtocolError),
    /// The mux channel failed.
    #[error("transport error: {0}")]
    Transport(#[from] cvsync_transport::MuxError),
    /// The scan/compare dialogue failed.
    #[error("scan error: {0}")]
    Scan(#[from] cvsync_scan::ScanError),
    /// An RCS file on disk failed to parse during `UPDATE_RCS`.
    #[error("RCS parse error: {0}")]
    Rcs(#[from] cvsync_rcs::ParseError),
    /// The client requested a collection this server doesn't serve.
    #[error("unknown collection {0:?}")]
    UnknownCollection(String),
}
