//! Pathname ordering used throughout the scan/compare dialogue.
//!
//! The comparator treats `/` as sorting before every other byte, so a
//! directory entry always orders immediately before any of its children:
//! `"foo" < "foo/bar" < "foob"`. This matches the RCS path comparison
//! semantics the original scanner relies on to keep `Attic/` entries and
//! their parent directory adjacent in sorted scan output.

use std::cmp::Ordering;
use std::fmt;

use crate::error::WireError;

/// Maximum byte length of a [`Pathname`], mirroring POSIX `PATH_MAX`.
pub const PATH_MAX: usize = 1024;

/// An owned, length-bounded byte sequence naming a file or directory.
///
/// Pathnames are not required to be valid UTF-8: RCS trees may legally
/// contain arbitrary bytes in filenames, so this type stores raw bytes and
/// only exposes a lossy display form.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Pathname(Vec<u8>);

impl Pathname {
    /// Builds a pathname from raw bytes, rejecting anything over [`PATH_MAX`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, WireError> {
        let bytes = bytes.into();
        if bytes.len() > PATH_MAX {
            return Err(WireError::PathTooLong {
                length: bytes.len(),
                max: PATH_MAX,
            });
        }
        Ok(Self(bytes))
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Appends a path segment, inserting a `/` separator if needed.
    pub fn join(&self, segment: &[u8]) -> Result<Self, WireError> {
        let mut bytes = self.0.clone();
        if !bytes.is_empty() && bytes.last() != Some(&b'/') {
            bytes.push(b'/');
        }
        bytes.extend_from_slice(segment);
        Self::new(bytes)
    }
}

impl fmt::Debug for Pathname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pathname({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Pathname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Orders two byte slices so that `/` sorts before any other byte.
///
/// Equivalent to comparing each slice byte-by-byte after remapping `/` to
/// `0x00` and every other byte `b` to `b.max(1)`, which keeps the relative
/// order of non-`/` bytes intact while guaranteeing `/` is minimal.
#[must_use]
pub fn compare_path_bytes(a: &[u8], b: &[u8]) -> Ordering {
    let rank = |byte: u8| -> u8 {
        if byte == b'/' {
            0
        } else {
            byte
        }
    };
    for (&x, &y) in a.iter().zip(b.iter()) {
        match rank(x).cmp(&rank(y)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

impl Ord for Pathname {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_path_bytes(&self.0, &other.0)
    }
}

impl PartialOrd for Pathname {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_sorts_before_other_bytes() {
        let mut names: Vec<Pathname> = ["foob", "foo/bar", "foo", "foo/"]
            .iter()
            .map(|s| Pathname::new(s.as_bytes()).unwrap())
            .collect();
        names.sort();
        let rendered: Vec<String> = names.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["foo", "foo/", "foo/bar", "foob"]);
    }

    #[test]
    fn rejects_overlong_paths() {
        let bytes = vec![b'a'; PATH_MAX + 1];
        assert!(matches!(
            Pathname::new(bytes),
            Err(WireError::PathTooLong { .. })
        ));
    }

    #[test]
    fn join_inserts_separator() {
        let base = Pathname::new(*b"a/b").unwrap();
        let joined = base.join(b"c").unwrap();
        assert_eq!(joined.as_bytes(), b"a/b/c");
    }
}
