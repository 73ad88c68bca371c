//! The server-side [`cvsync_scan::LocalLookup`] implementation: answers the
//! comparator's queries against a real collection tree on disk.
//!
//! The on-disk directory *walk* that produces the client's scan events is
//! out of scope (`spec.md` §1); this module is the comparator's
//! counterpart — point lookups against the server's own tree, consulted
//! once per record the client names (`spec.md` §4.4 "Server response").

use std::fs::{self, File};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use cvsync_checksums::Algorithm;
use cvsync_core::attr::CvsyncAttr;
use cvsync_core::Collection;
use cvsync_scan::update_rcs::{collect_delta_digests, collect_deltatext_digests};
use cvsync_scan::{LocalEntry, LocalLookup, RevisionDigest};

/// Resolves scan-dialogue entry names against one collection's effective
/// prefix and answers [`LocalLookup`] queries from real filesystem state.
pub struct FsLocalLookup<'a> {
    collection: &'a Collection,
}

impl<'a> FsLocalLookup<'a> {
    /// Builds a lookup rooted at `collection`'s effective prefix.
    #[must_use]
    pub fn new(collection: &'a Collection) -> Self {
        Self { collection }
    }

    fn resolve(&self, name: &[u8]) -> PathBuf {
        let prefix = self.collection.effective_prefix();
        let mut path = PathBuf::from(String::from_utf8_lossy(prefix.as_bytes()).into_owned());
        path.push(String::from_utf8_lossy(name).into_owned());
        path
    }

    /// Reads and mmaps the RCS file at `path`, parsing it into delta and
    /// deltatext digest lists under `algorithm`.
    ///
    /// The mapping is dropped before this function returns; digests are
    /// computed eagerly rather than handing back anything borrowing from
    /// the map, since [`cvsync_scan::update_rcs`]'s digest lists are
    /// already owned values.
    fn rcs_digests_at(path: &Path, algorithm: Algorithm) -> Option<(Vec<RevisionDigest>, Vec<RevisionDigest>)> {
        let file = File::open(path).ok()?;
        // SAFETY: the file is opened read-only for the duration of this
        // call and not concurrently truncated by this process; a
        // concurrent external truncation could raise SIGBUS on access,
        // the standard caveat `memmap2::Mmap::map`'s own documentation
        // names and which this workspace accepts as out of scope (no
        // external collaborator modifies served collections mid-session).
        #[allow(unsafe_code)]
        let mmap = unsafe { memmap2::Mmap::map(&file).ok()? };
        let parsed = cvsync_rcs::parse(&mmap).ok()?;
        Some((
            collect_delta_digests(&parsed, algorithm),
            collect_deltatext_digests(&parsed, algorithm),
        ))
    }

    /// Reads an entry's raw bytes in full, for shipping as a generic
    /// [`cvsync_scan::content::ContentPayload::FileBody`].
    pub fn read_file(&self, name: &[u8]) -> std::io::Result<Vec<u8>> {
        fs::read(self.resolve(name))
    }
}

impl LocalLookup for FsLocalLookup<'_> {
    fn entry(&self, name: &[u8]) -> LocalEntry {
        let path = self.resolve(name);
        let Ok(meta) = fs::symlink_metadata(&path) else {
            return LocalEntry::Missing;
        };
        let mode = meta.permissions().mode() as u16;
        let attr = if meta.file_type().is_symlink() {
            let target = fs::read_link(&path).map(|p| p.into_os_string().into_encoded_bytes()).unwrap_or_default();
            CvsyncAttr::Symlink { target }
        } else if meta.is_dir() {
            CvsyncAttr::Dir { mode }
        } else {
            let is_rcs = name.ends_with(b",v");
            if is_rcs {
                CvsyncAttr::Rcs {
                    mtime: meta.mtime(),
                    mode,
                }
            } else {
                CvsyncAttr::File {
                    mtime: meta.mtime(),
                    size: meta.size(),
                    mode,
                }
            }
        };
        LocalEntry::Present(attr)
    }

    fn rcs_digests(&self, name: &[u8], algorithm: Algorithm) -> Option<(Vec<RevisionDigest>, Vec<RevisionDigest>)> {
        let path = self.resolve(name);
        Self::rcs_digests_at(&path, algorithm)
    }
}

