//! The comparator's reconciliation logic: turning one incoming
//! [`ScanCommand`] into the [`CompareCommand`]s sent back (`spec.md` §4.4,
//! "Server response").
//!
//! The daemon's on-disk directory walker is out of scope (`spec.md` §1);
//! [`LocalLookup`] is the seam it plugs into here, so reconciliation can be
//! implemented and tested without touching a real filesystem.

use cvsync_checksums::Algorithm;
use cvsync_core::attr::{CvsyncAttr, FileType};
use cvsync_rcs::RcsNum;

use crate::command::{CompareCommand, ScanCommand};
use crate::record::EntryRecord;
use crate::update_rcs::RevisionDigest;

/// What the local (server-side) tree holds for a path the scanner named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalEntry {
    /// The server has no entry at this path.
    Missing,
    /// The server holds an entry with these attributes.
    Present(CvsyncAttr),
}

/// The seam the daemon's directory walker implements so [`reconcile`] can
/// consult the server's local tree without this crate touching a
/// filesystem directly.
pub trait LocalLookup {
    /// Looks up the local attributes for `name` (relative to the
    /// collection's prefix), if any.
    fn entry(&self, name: &[u8]) -> LocalEntry;

    /// For an RCS-bearing `name`, returns `(delta digests, deltatext
    /// digests)` computed over the local copy, or `None` if the server
    /// has no local copy at all.
    fn rcs_digests(&self, name: &[u8], algorithm: Algorithm) -> Option<(Vec<RevisionDigest>, Vec<RevisionDigest>)>;
}

/// Turns one command the scanner sent into the `CompareCommand`s the
/// comparator sends back.
///
/// - `ADD` (client has an entry the server doesn't know about) produces a
///   `REMOVE`, telling the client to drop it.
/// - `REMOVE` (client is missing an entry) produces an `ADD` carrying the
///   server's attributes for it, if the server still has it; otherwise
///   nothing, since both sides already agree it's gone.
/// - `RCS_ATTIC` (an RCS file moved across the `Attic/` boundary locally)
///   has no matching `CompareOpcode`, so it is modeled as a `REMOVE` of the
///   old entry followed by an `ADD` of the new one, when the server still
///   has the file; otherwise a bare `REMOVE`.
/// - `SETATTR` is echoed back unchanged: an attribute-only change the
///   client already knows the new values for.
/// - `UPDATE` escalates to `UPDATE_RCS` for RCS filetypes (opening the
///   digest sub-dialogue in [`crate::update_rcs`]) and stays a generic
///   `UPDATE` otherwise.
/// - `END` closes the stream with a bare `UPDATE_END`.
#[must_use]
pub fn reconcile(command: &ScanCommand, local: &dyn LocalLookup) -> Vec<CompareCommand> {
    match command {
        ScanCommand::Add(record) => vec![CompareCommand::Remove(record.clone())],
        ScanCommand::Remove(record) => match local.entry(&record.name) {
            LocalEntry::Present(attr) => vec![CompareCommand::Add(EntryRecord::with_attr(
                record.filetype,
                record.name.clone(),
                attr,
            ))],
            LocalEntry::Missing => Vec::new(),
        },
        ScanCommand::RcsAttic(record) => match local.entry(&record.name) {
            LocalEntry::Present(attr) => vec![
                CompareCommand::Remove(record.clone()),
                CompareCommand::Add(EntryRecord::with_attr(
                    record.filetype,
                    record.name.clone(),
                    attr,
                )),
            ],
            LocalEntry::Missing => vec![CompareCommand::Remove(record.clone())],
        },
        ScanCommand::SetAttr(record) => vec![CompareCommand::SetAttr(record.clone())],
        ScanCommand::Update(record) => {
            if record.filetype.is_rcs() {
                vec![CompareCommand::UpdateRcs(record.clone())]
            } else {
                vec![CompareCommand::Update(record.clone())]
            }
        }
        ScanCommand::End => vec![CompareCommand::UpdateEnd],
    }
}

/// Given the local server's digest lists and the peer's digest lists from
/// an `UPDATE_RCS` sub-dialogue, returns the revisions the peer needs
/// shipped in full: present locally but absent from, or hashed
/// differently in, the peer's list.
///
/// Revisions the peer has that the server doesn't are not reported here —
/// removing a revision the mirror no longer needs locally is outside this
/// crate's scope (`spec.md` treats `UPDATE_RCS` as additive: the peer only
/// ever gains revisions it's missing or that changed).
#[must_use]
pub fn diff_revisions(local: &[RevisionDigest], peer: &[RevisionDigest]) -> Vec<RcsNum> {
    local
        .iter()
        .filter(|local_rev| {
            !peer
                .iter()
                .any(|peer_rev| peer_rev.num == local_rev.num && peer_rev.hash == local_rev.hash)
        })
        .map(|rev| rev.num.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTree {
        attr: Option<CvsyncAttr>,
    }

    impl LocalLookup for FakeTree {
        fn entry(&self, _name: &[u8]) -> LocalEntry {
            match &self.attr {
                Some(attr) => LocalEntry::Present(attr.clone()),
                None => LocalEntry::Missing,
            }
        }

        fn rcs_digests(&self, _name: &[u8], _algorithm: Algorithm) -> Option<(Vec<RevisionDigest>, Vec<RevisionDigest>)> {
            None
        }
    }

    #[test]
    fn add_produces_remove() {
        let local = FakeTree { attr: None };
        let command = ScanCommand::Add(EntryRecord::bare(FileType::File, b"x".to_vec()));
        let replies = reconcile(&command, &local);
        assert_eq!(
            replies,
            vec![CompareCommand::Remove(EntryRecord::bare(
                FileType::File,
                b"x".to_vec()
            ))]
        );
    }

    #[test]
    fn remove_with_local_copy_produces_add() {
        let attr = CvsyncAttr::File {
            mtime: 1,
            size: 2,
            mode: 0o644,
        };
        let local = FakeTree {
            attr: Some(attr.clone()),
        };
        let command = ScanCommand::Remove(EntryRecord::bare(FileType::File, b"x".to_vec()));
        let replies = reconcile(&command, &local);
        assert_eq!(
            replies,
            vec![CompareCommand::Add(EntryRecord::with_attr(
                FileType::File,
                b"x".to_vec(),
                attr
            ))]
        );
    }

    #[test]
    fn remove_with_no_local_copy_produces_nothing() {
        let local = FakeTree { attr: None };
        let command = ScanCommand::Remove(EntryRecord::bare(FileType::File, b"x".to_vec()));
        assert!(reconcile(&command, &local).is_empty());
    }

    #[test]
    fn rcs_update_escalates_to_update_rcs() {
        let local = FakeTree { attr: None };
        let record = EntryRecord::with_attr(
            FileType::Rcs,
            b"a,v".to_vec(),
            CvsyncAttr::Rcs { mtime: 1, mode: 0o444 },
        );
        let command = ScanCommand::Update(record.clone());
        assert_eq!(reconcile(&command, &local), vec![CompareCommand::UpdateRcs(record)]);
    }

    #[test]
    fn plain_file_update_stays_generic() {
        let local = FakeTree { attr: None };
        let record = EntryRecord::with_attr(
            FileType::File,
            b"a".to_vec(),
            CvsyncAttr::File {
                mtime: 1,
                size: 2,
                mode: 0o644,
            },
        );
        let command = ScanCommand::Update(record.clone());
        assert_eq!(reconcile(&command, &local), vec![CompareCommand::Update(record)]);
    }

    #[test]
    fn end_closes_with_update_end() {
        let local = FakeTree { attr: None };
        assert_eq!(reconcile(&ScanCommand::End, &local), vec![CompareCommand::UpdateEnd]);
    }

    #[test]
    fn diff_revisions_reports_missing_and_mismatched() {
        let num1 = RcsNum::parse(b"1.1").unwrap();
        let num2 = RcsNum::parse(b"1.2").unwrap();
        let local = vec![
            RevisionDigest {
                num: num1.clone(),
                hash: vec![1, 2, 3],
            },
            RevisionDigest {
                num: num2.clone(),
                hash: vec![4, 5, 6],
            },
        ];
        let peer = vec![RevisionDigest {
            num: num1.clone(),
            hash: vec![1, 2, 3],
        }];
        assert_eq!(diff_revisions(&local, &peer), vec![num2]);
    }

    #[test]
    fn diff_revisions_is_empty_when_all_match() {
        let num = RcsNum::parse(b"1.1").unwrap();
        let digests = vec![RevisionDigest {
            num: num.clone(),
            hash: vec![9],
        }];
        assert!(diff_revisions(&digests, &digests).is_empty());
    }
}
