//! `RcsNum`: a dotted revision number, e.g. `1.2.3.4`.
//!
//! Grounded in `examples/original_source/common/rcslib.c`'s `rcsnum`/
//! `rcslib_str2num`/`rcslib_cmp_num`. The decoded integer vector is kept
//! alongside the original byte form so deltatext/delta framing can echo the
//! exact bytes the RCS file used, while comparison and lookup operate on the
//! decoded vector.

use std::cmp::Ordering;
use std::fmt;

use crate::error::ParseError;

/// Ceiling on any single dotted component (`RCSNUM_MAX`).
pub const RCSNUM_MAX: u32 = 10_000_000;

/// Ceiling on the number of dotted components (`RCSNUM_MAXLEVEL`).
pub const RCSNUM_MAXLEVEL: usize = 16;

/// A parsed RCS revision number: a dotted sequence of non-negative
/// integers, each bounded by [`RCSNUM_MAX`], with at most
/// [`RCSNUM_MAXLEVEL`] components.
///
/// An even-length vector names a *branch*; an odd-length vector names a
/// *revision on a branch* (a 2-component vector is a trunk revision, itself
/// odd-length by this definition).
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct RcsNum {
    raw: Box<[u8]>,
    components: Vec<u32>,
}

impl RcsNum {
    /// Parses a dotted revision number from raw bytes.
    ///
    /// Mirrors `rcslib_str2num`: digits and `.` only, each component
    /// clamped to [`RCSNUM_MAX`], at most [`RCSNUM_MAXLEVEL`] components.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut components = vec![0u32];
        for &byte in bytes {
            match byte {
                b'.' => {
                    if components.len() == RCSNUM_MAXLEVEL {
                        return Err(ParseError::InvalidNum { offset: 0 });
                    }
                    components.push(0);
                }
                b'0'..=b'9' => {
                    let slot = components.last_mut().expect("components is never empty");
                    *slot = slot
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(u32::from(byte - b'0')))
                        .filter(|&v| v <= RCSNUM_MAX)
                        .ok_or(ParseError::InvalidNum { offset: 0 })?;
                }
                _ => return Err(ParseError::InvalidNum { offset: 0 }),
            }
        }
        Ok(Self {
            raw: bytes.into(),
            components,
        })
    }

    /// The original byte form, exactly as it appeared in the file.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The decoded dotted components.
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.components
    }

    /// Number of dotted components (`n_level`).
    #[must_use]
    pub fn level(&self) -> usize {
        self.components.len()
    }

    /// True for an even-length vector: names a branch rather than a
    /// revision.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.level() % 2 == 0
    }

    /// True for a 2-component vector: a revision directly on the main
    /// trunk.
    #[must_use]
    pub fn is_trunk(&self) -> bool {
        self.level() == 2
    }

    /// Builds an `RcsNum` from already-decoded components, synthesizing a
    /// dotted byte form. Used when the parser or the `UPDATE_RCS` sub-
    /// dialogue needs to construct a revision number that did not come
    /// from source bytes (e.g. a branch-tail prefix).
    #[must_use]
    pub fn from_components(components: Vec<u32>) -> Self {
        let raw = components
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self {
            raw: raw.into_bytes().into_boxed_slice(),
            components,
        }
    }
}

impl fmt::Debug for RcsNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RcsNum({})", self)
    }
}

impl fmt::Display for RcsNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.raw))
    }
}

/// Orders two revision numbers per `spec.md` §4.2 / `rcslib_cmp_num`:
///
/// - Differing level: the shorter vector is less.
/// - Equal level == 2 (trunk): the *greater* vector is less (descending).
/// - Equal level, otherwise (branch): the *lesser* vector is less (ascending).
impl Ord for RcsNum {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.level() != other.level() {
            return self.level().cmp(&other.level());
        }
        if self.is_trunk() {
            other.components.cmp(&self.components)
        } else {
            self.components.cmp(&other.components)
        }
    }
}

impl PartialOrd for RcsNum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
