//! The parsed in-memory representation of an RCS `,v` file.

use crate::date::RcsDate;
use crate::num::RcsNum;
use crate::value::{RcsId, RcsStr, RcsSym};

/// A `locks` entry: `{id, num}`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lock<'a> {
    /// The lock owner's identifier.
    pub id: RcsId<'a>,
    /// The locked revision.
    pub num: RcsNum,
}

/// A `symbols` entry: `{sym, num}`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Symbol<'a> {
    /// The symbolic tag name.
    pub sym: RcsSym<'a>,
    /// The revision or branch it names.
    pub num: RcsNum,
}

/// The admin block preceding an RCS file's per-revision metadata.
#[derive(Clone, Debug)]
pub struct Admin<'a> {
    /// The head revision, if the file has any revisions.
    pub head: Option<RcsNum>,
    /// The default branch, if one is set.
    pub branch: Option<RcsNum>,
    /// `access` list, sorted by identifier bytes.
    pub access: Vec<RcsId<'a>>,
    /// `symbols` list, sorted by symbol bytes.
    pub symbols: Vec<Symbol<'a>>,
    /// `locks` list, sorted by identifier then revision number.
    pub locks: Vec<Lock<'a>>,
    /// Whether `strict` locking was declared.
    pub strict: bool,
    /// The `comment` leader string, if declared.
    pub comment: Option<RcsStr<'a>>,
    /// The `expand` keyword-substitution mode, if declared.
    pub expand: Option<RcsStr<'a>>,
}

/// One revision's delta metadata plus, once the deltatext phase has run,
/// its log message and full text.
#[derive(Clone, Debug)]
pub struct Revision<'a> {
    /// This revision's number.
    pub num: RcsNum,
    /// Commit date.
    pub date: RcsDate<'a>,
    /// Commit author.
    pub author: RcsId<'a>,
    /// RCS state tag (e.g. `Exp`, `dead`).
    pub state: Option<RcsId<'a>>,
    /// Branch tip revisions rooted at this revision.
    pub branches: Vec<RcsNum>,
    /// The next revision in this delta's chain, if any.
    pub next: Option<RcsNum>,
    /// Commit log message. Populated during the deltatext phase.
    pub log: Option<RcsStr<'a>>,
    /// Full revision text (trunk: literal; branches: RCS diff format).
    /// Populated during the deltatext phase.
    pub text: Option<RcsStr<'a>>,
    /// Index into the owning [`RcsFile::delta`] of the revision named by
    /// `next`, resolved in the parser's second pass.
    pub next_index: Option<usize>,
    /// Indices into the owning [`RcsFile::delta`] of the revisions named by
    /// `branches`, resolved alongside `next_index` (`spec.md` §9's "Cyclic
    /// refs in the revision graph" design note).
    pub branch_indices: Vec<usize>,
    /// True once the deltatext phase has filled in `log`/`text` for this
    /// revision (`RLIB_REVISION_DELTATEXT`).
    pub deltatext_present: bool,
}

/// A fully parsed RCS file, borrowing every string payload from the
/// `&'a [u8]` it was parsed from.
///
/// Invariants (`spec.md` §3):
/// - `delta` is sorted by descending [`RcsNum`] ordering.
/// - Every non-empty `next` in a revision resolves to another entry in
///   `delta`, with `next_index` populated.
/// - Every revision has `deltatext_present` set once parsing completes.
/// - `admin.access` is sorted by identifier bytes; `admin.symbols` by
///   symbol bytes; `admin.locks` by identifier then revision number.
#[derive(Clone, Debug)]
pub struct RcsFile<'a> {
    /// The admin header.
    pub admin: Admin<'a>,
    /// Revisions, ordered per the invariant above.
    pub delta: Vec<Revision<'a>>,
    /// The file's `desc` string.
    pub desc: RcsStr<'a>,
}

impl<'a> RcsFile<'a> {
    /// Finds a revision's position in `delta` by its index, used after
    /// `next_index` resolution to walk the delta chain.
    #[must_use]
    pub fn revision_at(&self, index: usize) -> Option<&Revision<'a>> {
        self.delta.get(index)
    }
}
