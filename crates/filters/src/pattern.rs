//! Single-pattern matching, mirroring POSIX `fnmatch(pattern, name, 0)`.
//!
//! `refuse.c` calls `fnmatch` with no flags: `*` and `?` cross `/`
//! boundaries (no `FNM_PATHNAME`), and a backslash escapes the following
//! character (no `FNM_NOESCAPE`). `globset::GlobBuilder` models this when
//! `literal_separator` is left `false`.

use globset::{Glob, GlobMatcher};

use crate::error::FilterError;

/// One compiled refuse pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    matcher: GlobMatcher,
}

impl Pattern {
    /// Compiles a single refuse-file pattern line.
    pub fn compile(pattern: &str) -> Result<Self, FilterError> {
        let glob = Glob::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// The pattern's original source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if `name` matches this pattern.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }

    /// Compiles a pattern truncated at `len` bytes, used to re-check a
    /// directory-bearing pattern's prefix (`p/q` truncated to `p`) against
    /// a directory name. Returns `None` if the truncated text is empty.
    #[must_use]
    pub fn truncated_prefix(&self, len: usize) -> Option<Pattern> {
        if len == 0 {
            return None;
        }
        Pattern::compile(&self.source[..len]).ok()
    }
}
