//! Refuse-file pattern lists: `refuse_open`/`refuse_parse`/`refuse_access`
//! from `examples/original_source/common/refuse.c`, ported to a `Vec` of
//! compiled [`Pattern`]s.

use crate::error::FilterError;
use crate::pattern::Pattern;

/// A compiled refuse file: an ordered list of patterns, any one of which
/// rejects a scan entry.
#[derive(Debug, Clone, Default)]
pub struct RefuseList {
    patterns: Vec<Pattern>,
}

impl RefuseList {
    /// An empty refuse list: `is_refused` always returns `false`, matching
    /// `refuse_access`'s early return when `ra == NULL || ra_size == 0`.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Parses a refuse file: one fnmatch pattern per line, blank lines
    /// ignored. `refuse_parse_pattern` reads a raw line with no comment or
    /// quoting syntax; this mirrors that.
    pub fn parse(contents: &str) -> Result<Self, FilterError> {
        let mut patterns = Vec::new();
        for line in contents.lines() {
            if line.is_empty() {
                continue;
            }
            patterns.push(Pattern::compile(line)?);
        }
        Ok(Self { patterns })
    }

    /// True if no patterns are loaded (a no-op refuse list).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Tests `name` (a scan entry's path relative to the collection root)
    /// against every pattern. `is_dir` additionally enables the
    /// directory-prefix sub-match: a pattern `p/q` also rejects a
    /// directory entry named exactly `p`, by truncating the pattern at
    /// each `/` (scanning from the right) and re-matching the truncated
    /// prefix against `name`.
    #[must_use]
    pub fn is_refused(&self, name: &str, is_dir: bool) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        for pattern in &self.patterns {
            if pattern.is_match(name) {
                return true;
            }
            if !is_dir {
                continue;
            }
            if directory_prefix_matches(pattern, name) {
                return true;
            }
        }
        false
    }
}

/// Tries every `/`-delimited prefix of `pattern`'s source text (from the
/// rightmost separator inward) against `name`.
fn directory_prefix_matches(pattern: &Pattern, name: &str) -> bool {
    let source = pattern.as_str();
    for (offset, byte) in source.bytes().enumerate().rev() {
        if byte != b'/' {
            continue;
        }
        if let Some(truncated) = pattern.truncated_prefix(offset) {
            if truncated.is_match(name) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_refuses_nothing() {
        let list = RefuseList::empty();
        assert!(!list.is_refused("anything", true));
    }

    #[test]
    fn directory_pattern_rejects_parent_directory() {
        let list = RefuseList::parse("p/q\n").unwrap();
        assert!(list.is_refused("p", true), "directory p should be rejected");
        assert!(!list.is_refused("p", false), "file p should not be rejected");
        assert!(list.is_refused("p/q", true));
    }

    #[test]
    fn star_tmp_pattern_matches_exact_suffix_only() {
        let list = RefuseList::parse("*.tmp\n").unwrap();
        assert!(list.is_refused("x.tmp", false));
        assert!(!list.is_refused("x.tmpz", false));
    }

    #[test]
    fn attic_directory_pattern_rejects_attic_walk() {
        let list = RefuseList::parse("Attic/*\nAttic\n").unwrap();
        assert!(list.is_refused("Attic", true));
        assert!(list.is_refused("Attic/x,v", false));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let list = RefuseList::parse("\n*.tmp\n\n").unwrap();
        assert_eq!(list.is_refused("x.tmp", false), true);
    }
}
