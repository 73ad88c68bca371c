//! Errors raised while parsing an RCS file.

use thiserror::Error;

/// A grammar violation or structural inconsistency encountered while
/// parsing an RCS `,v` file.
///
/// Per `spec.md` §4.2, any grammar violation aborts parsing outright and
/// discards whatever partial state had been built; there is no per-field
/// recovery inside a single file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input did not end with the trailing newline the grammar requires.
    #[error("rcs file does not end with a newline")]
    MissingTrailingNewline,
    /// End of input was reached while a token was still expected.
    #[error("unexpected end of input while expecting {expected}")]
    UnexpectedEof {
        /// What the parser was looking for.
        expected: &'static str,
    },
    /// A keyword token did not match any of the admin/delta/deltatext
    /// grammar's expected keywords at this position.
    #[error("expected keyword {expected:?} at byte offset {offset}")]
    ExpectedKeyword {
        /// The keyword the grammar required here.
        expected: &'static str,
        /// Byte offset into the input where the mismatch occurred.
        offset: usize,
    },
    /// A `num` token violated [`crate::num::RcsNum`]'s constraints.
    #[error("invalid revision number at byte offset {offset}")]
    InvalidNum {
        /// Byte offset into the input where the invalid token starts.
        offset: usize,
    },
    /// An `@...@` quoted string was never terminated before EOF.
    #[error("unterminated string literal starting at byte offset {offset}")]
    UnterminatedString {
        /// Byte offset of the opening `@`.
        offset: usize,
    },
    /// A `next` reference did not resolve to any revision in `delta`.
    #[error("revision {child} names unresolved next-revision {target}")]
    UnresolvedNext {
        /// The revision whose `next` field failed to resolve.
        child: String,
        /// The unresolved target revision number.
        target: String,
    },
    /// The file declared more revisions than the implementation-level
    /// ceiling this crate enforces (`spec.md` §9 open question: the
    /// deltatext count is a 32-bit field, but revision count is otherwise
    /// unbounded in the source; this crate rejects anything over
    /// `MAX_REVISIONS`).
    #[error("revision count {count} exceeds the implementation ceiling {max}")]
    TooManyRevisions {
        /// Observed revision count.
        count: usize,
        /// The enforced ceiling.
        max: usize,
    },
    /// A deltatext entry named a revision number with no matching `delta`
    /// entry.
    #[error("deltatext names unknown revision {0}")]
    UnknownDeltatextRevision(String),
}
