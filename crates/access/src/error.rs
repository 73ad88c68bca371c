//! Errors raised while parsing an ACL file.

use thiserror::Error;

/// A malformed ACL file line.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The line's leading verb was not one of `allow`/`permit`/`always`/
    /// `deny`/`reject`.
    #[error("line {line}: unknown ACL verb {verb:?}")]
    UnknownVerb {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        verb: String,
    },
    /// A line had a verb with no following pattern.
    #[error("line {line}: missing pattern after verb")]
    MissingPattern {
        /// 1-based line number.
        line: usize,
    },
    /// The address, prefix length, or hostname pattern failed to parse.
    #[error("line {line}: invalid address/hostname {pattern:?}")]
    InvalidPattern {
        /// 1-based line number.
        line: usize,
        /// The offending pattern text.
        pattern: String,
    },
    /// `access_parse_number`'s `,max` suffix was not a valid count, or
    /// exceeded the 1000 ceiling the source enforces.
    #[error("line {line}: {value:?} is not a valid count (restricted to 1000)")]
    InvalidMax {
        /// 1-based line number.
        line: usize,
        /// The offending text.
        value: String,
    },
    /// A hostname pattern's glob syntax was invalid.
    #[error("line {line}: invalid hostname pattern: {source}")]
    InvalidHostnamePattern {
        /// 1-based line number.
        line: usize,
        /// The underlying `globset` error.
        #[source]
        source: globset::Error,
    },
}
