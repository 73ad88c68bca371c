//! Errors raised while compiling a refuse file's patterns.

use thiserror::Error;

/// Failure compiling one line of a refuse file into a matcher.
#[derive(Debug, Error)]
pub enum FilterError {
    /// `globset` rejected a pattern as malformed.
    #[error("invalid refuse pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern, verbatim.
        pattern: String,
        /// The underlying `globset` error.
        #[source]
        source: globset::Error,
    },
}
