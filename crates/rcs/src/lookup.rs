//! Revision and symbol lookup over a parsed [`RcsFile`].
//!
//! `spec.md` §4.2 describes a deliberately simplified lookup compared to
//! `rcslib_lookup_symbol`'s branch-tail pointer walk (documented in
//! `DESIGN.md`): exact symbolic match, `HEAD`/`.` aliasing the admin head,
//! direct numeric parse, and longest-prefix branch-tail resolution for a
//! dotted number ending in a trailing `.`.

use crate::file::RcsFile;
use crate::num::RcsNum;

/// Looks up a revision by number, choosing a linear scan for small delta
/// sets and a binary search (relying on `delta`'s descending-trunk /
/// ascending-branch sort) once the set is large enough that the scan cost
/// matters.
///
/// `spec.md` §9 pins the crossover at 100 revisions.
#[must_use]
pub fn lookup_revision<'a, 'b>(file: &'b RcsFile<'a>, num: &RcsNum) -> Option<&'b RcsNum>
where
    'a: 'b,
{
    const LINEAR_SCAN_CEILING: usize = 100;

    if file.delta.len() < LINEAR_SCAN_CEILING {
        file.delta.iter().find(|rev| &rev.num == num).map(|rev| &rev.num)
    } else {
        file.delta
            .binary_search_by(|rev| rev.num.cmp(num))
            .ok()
            .map(|index| &file.delta[index].num)
    }
}

/// Resolves a revision or symbolic name to a concrete [`RcsNum`].
///
/// Resolution order, per `spec.md` §4.2:
/// 1. `HEAD` or `.` resolves to `admin.head`.
/// 2. An exact match against a declared `symbols` entry.
/// 3. A bare numeric revision, parsed directly and confirmed present in
///    `delta`.
/// 4. A branch number ending in a trailing `.` (e.g. `1.2.`), resolved to
///    the highest existing revision on that branch.
#[must_use]
pub fn lookup_symbol(file: &RcsFile<'_>, name: &[u8]) -> Option<RcsNum> {
    if name == b"HEAD" || name == b"." {
        return file.admin.head.clone();
    }

    if let Some(symbol) = file.admin.symbols.iter().find(|s| s.sym.as_bytes() == name) {
        return Some(symbol.num.clone());
    }

    if let Some(stripped) = name.strip_suffix(b".") {
        let branch = RcsNum::parse(stripped).ok()?;
        // Compare by raw components rather than `RcsNum`'s `Ord`: that
        // impl inverts trunk ordering so ascending sorts read head-first,
        // which would pick the *lowest* trunk revision here instead of
        // the highest.
        return file
            .delta
            .iter()
            .map(|rev| &rev.num)
            .filter(|num| on_branch(num, &branch))
            .max_by(|a, b| a.components().cmp(b.components()))
            .cloned();
    }

    let num = RcsNum::parse(name).ok()?;
    lookup_revision(file, &num).cloned()
}

/// True if `num` is a revision on the branch named by `branch` (i.e. `num`
/// has exactly one more component than `branch` and agrees on the shared
/// prefix), mirroring the branch-tail comparison `rcslib_lookup_symbol`
/// performs before its magic-zero special case.
fn on_branch(num: &RcsNum, branch: &RcsNum) -> bool {
    let num_components = num.components();
    let branch_components = branch.components();
    num_components.len() == branch_components.len() + 1
        && num_components[..branch_components.len()] == branch_components[..]
}
