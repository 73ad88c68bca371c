//! Applies one [`CompareCommand`] reply to the local destination tree.
//!
//! Grounded in `crates/daemon/src/local.rs`'s [`FsLocalLookup`] (the
//! server-side counterpart that *answers* these same queries) and
//! `examples/original_source/cvsyncd/proto.c`'s `filecmp_rcs` family for
//! the `UPDATE_RCS` merge itself. Where the daemon only ever reads the
//! local tree, this module is the one place in the workspace that writes
//! it.
//!
//! [`FsLocalLookup`]: crate::apply
use std::fs;
use std::io::{Read, Write};
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use cvsync_checksums::Algorithm;
use cvsync_core::attr::{CvsyncAttr, FileType};
use cvsync_rcs::{Admin, Lock, RcsDate, RcsFile, RcsId, RcsNum, RcsStr, Revision, Symbol};
use cvsync_scan::content::{ContentPayload, RevisionBody};
use cvsync_scan::update_rcs::{
    collect_delta_digests, collect_deltatext_digests, AdminSnapshot, RevisionDigest,
};
use cvsync_scan::{CompareCommand, EntryRecord};
use cvsync_transport::ChannelStream;

use crate::error::ApplyError;

/// Joins `destination` with a wire-supplied relative name. Names travel as
/// raw bytes; this workspace only targets Unix destinations (mirroring
/// `crates/cli/src/walk.rs`'s own `std::os::unix::fs` dependency), so the
/// bytes map onto an `OsStr` losslessly.
pub(crate) fn resolve(destination: &Path, name: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    destination.join(OsStr::from_bytes(name))
}

fn set_mode(path: &Path, mode: u16) -> std::io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(u32::from(mode)))
}

fn set_mtime(path: &Path, mtime: i64) -> std::io::Result<()> {
    let time = filetime::FileTime::from_unix_time(mtime, 0);
    filetime::set_file_mtime(path, time)
}

/// Doubles every `@` so the bytes are safe to wrap between a fresh pair of
/// `@` delimiters (the inverse of [`cvsync_rcs::RcsStr::decode`]); needed
/// because [`RevisionBody`] carries already-unescaped `log`/`text`/
/// `comment` bytes, while [`cvsync_rcs::write::encode`] emits
/// [`RcsStr::raw`] verbatim.
fn escape_at(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        out.push(b);
        if b == b'@' {
            out.push(b'@');
        }
    }
    out
}

/// Creates a directory (and any missing parents) and applies `attr`.
fn apply_dir(path: &Path, attr: &CvsyncAttr) -> Result<(), ApplyError> {
    fs::create_dir_all(path)?;
    if let CvsyncAttr::Dir { mode } = attr {
        set_mode(path, *mode)?;
    }
    Ok(())
}

/// Recreates a symlink, replacing anything already at `path`.
fn apply_symlink(path: &Path, attr: &CvsyncAttr) -> Result<(), ApplyError> {
    let CvsyncAttr::Symlink { target } = attr else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::symlink_metadata(path) {
        Ok(_) => fs::remove_file(path)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    symlink(OsStr::from_bytes(target), path)?;
    Ok(())
}

/// Writes a plain file's bytes and applies its attributes.
fn apply_file_body(path: &Path, bytes: &[u8], attr: &CvsyncAttr) -> Result<(), ApplyError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    match attr {
        CvsyncAttr::File { mtime, mode, .. } | CvsyncAttr::Rcs { mtime, mode } => {
            set_mode(path, *mode)?;
            set_mtime(path, *mtime)?;
        }
        CvsyncAttr::Dir { .. } | CvsyncAttr::Symlink { .. } => {}
    }
    Ok(())
}

/// Applies an `ADD`/`UPDATE` reply: directories and symlinks carry
/// everything in their attribute blob, everything else reads its body
/// from `content_io` (mirrors `crates/daemon/src/session.rs::
/// ship_generic_body`'s sender side).
pub fn apply_add_or_update<W: Write + Send + 'static>(
    destination: &Path,
    record: &EntryRecord,
    content_io: &mut ChannelStream<W>,
) -> Result<(), ApplyError> {
    let path = resolve(destination, &record.name);
    let attr = record
        .attr
        .clone()
        .unwrap_or_else(|| attr_default(record.filetype));

    match record.filetype {
        FileType::Dir => apply_dir(&path, &attr),
        FileType::Symlink => apply_symlink(&path, &attr),
        FileType::File | FileType::Rcs | FileType::RcsAttic => {
            let payload = ContentPayload::read(content_io)?;
            let ContentPayload::FileBody(bytes) = payload else {
                return Err(ApplyError::Scan(cvsync_scan::ScanError::FiletypeNotAllowed(
                    record.filetype,
                )));
            };
            apply_file_body(&path, &bytes, &attr)
        }
    }
}

fn attr_default(filetype: FileType) -> CvsyncAttr {
    match filetype {
        FileType::Dir => CvsyncAttr::Dir { mode: 0o755 },
        FileType::File => CvsyncAttr::File {
            mtime: 0,
            size: 0,
            mode: 0o644,
        },
        FileType::Rcs | FileType::RcsAttic => CvsyncAttr::Rcs {
            mtime: 0,
            mode: 0o444,
        },
        FileType::Symlink => CvsyncAttr::Symlink {
            target: Vec::new(),
        },
    }
}

/// Deletes the entry named by a `REMOVE` reply. Already-missing entries
/// are not an error: the client's own catalog may already have dropped
/// what the server also forgot.
pub fn apply_remove(destination: &Path, record: &EntryRecord) -> Result<(), ApplyError> {
    let path = resolve(destination, &record.name);
    let result = match record.filetype {
        FileType::Dir => fs::remove_dir_all(&path),
        FileType::File | FileType::Rcs | FileType::RcsAttic | FileType::Symlink => {
            fs::remove_file(&path)
        }
    };
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Applies a `SETATTR` reply: permissions and mtime only, no content
/// change.
pub fn apply_set_attr(destination: &Path, record: &EntryRecord) -> Result<(), ApplyError> {
    let path = resolve(destination, &record.name);
    let Some(attr) = &record.attr else {
        return Ok(());
    };
    match attr {
        CvsyncAttr::Dir { mode } => set_mode(&path, *mode)?,
        CvsyncAttr::File { mtime, mode, .. } | CvsyncAttr::Rcs { mtime, mode } => {
            set_mode(&path, *mode)?;
            set_mtime(&path, *mtime)?;
        }
        CvsyncAttr::Symlink { .. } => apply_symlink(&path, attr)?,
    }
    Ok(())
}

/// Reads the local copy of an RCS file at `path`, if any, returning its
/// [`AdminSnapshot`] and both digest lists so the scan-writer side can
/// ship them as the `UPDATE_RCS` sub-dialogue's opening frames. Absence of
/// a local copy is modeled as an all-empty [`AdminSnapshot`] with empty
/// digest lists, matching what the wire format expects (there is no
/// presence flag at this layer, unlike the server's `ContentPayload::
/// RcsRevisions::admin`).
pub fn local_rcs_snapshot(
    path: &Path,
    algorithm: Algorithm,
) -> Result<(AdminSnapshot, Vec<RevisionDigest>, Vec<RevisionDigest>), ApplyError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok((empty_admin_snapshot(), Vec::new(), Vec::new()))
        }
        Err(err) => return Err(err.into()),
    };
    let parsed = cvsync_rcs::parse(&bytes)?;
    Ok((
        AdminSnapshot::from_admin(&parsed.admin),
        collect_delta_digests(&parsed, algorithm),
        collect_deltatext_digests(&parsed, algorithm),
    ))
}

fn empty_admin_snapshot() -> AdminSnapshot {
    AdminSnapshot {
        head: None,
        branch: None,
        access: Vec::new(),
        symbols: Vec::new(),
        locks: Vec::new(),
        strict: false,
        comment: None,
        expand: None,
    }
}

/// Drives the client side of the `UPDATE_RCS` sub-dialogue once the reader
/// has seen `CompareCommand::UpdateRcs`: reads the server's reply on
/// `content_io`, merges it against whatever local copy exists, writes the
/// result, and reads the closing `UPDATE_END` off `scan_io`.
pub fn apply_update_rcs<W: Write + Send + 'static>(
    destination: &Path,
    record: &EntryRecord,
    scan_io: &mut ChannelStream<W>,
    content_io: &mut ChannelStream<W>,
) -> Result<(), ApplyError> {
    let path = resolve(destination, &record.name);
    let payload = ContentPayload::read(content_io)?;
    let ContentPayload::RcsRevisions { admin, revisions } = payload else {
        return Err(ApplyError::Scan(cvsync_scan::ScanError::FiletypeNotAllowed(
            record.filetype,
        )));
    };

    let local_bytes = fs::read(&path).ok();
    let local_file = match &local_bytes {
        Some(bytes) => Some(cvsync_rcs::parse(bytes)?),
        None => None,
    };

    write_merged_rcs(&path, local_file.as_ref(), admin.as_ref(), &revisions)?;

    if let Some(attr) = &record.attr {
        match attr {
            CvsyncAttr::Rcs { mtime, mode } => {
                set_mode(&path, *mode)?;
                set_mtime(&path, *mtime)?;
            }
            _ => {}
        }
    }

    // Drains the sub-dialogue's closing frame; its arrival (not its
    // content) is what matters, since every UPDATE_RCS reply is exactly
    // one content frame followed by one UPDATE_END.
    let _ = CompareCommand::read(scan_io)?;
    Ok(())
}

/// Builds the merged revision set — local revisions the server's reply
/// didn't supersede, plus every revision the server shipped — sorts it
/// into the order [`cvsync_rcs::write::encode`] expects, and writes the
/// result to `path`.
fn write_merged_rcs(
    path: &Path,
    local_file: Option<&RcsFile<'_>>,
    admin: Option<&AdminSnapshot>,
    revisions: &[RevisionBody],
) -> Result<(), ApplyError> {
    let Some(admin) = admin.cloned().or_else(|| local_file.map(|f| AdminSnapshot::from_admin(&f.admin))) else {
        // Neither side has a copy worth materializing.
        return Ok(());
    };

    let incoming_nums: Vec<RcsNum> = revisions.iter().map(|r| r.num.clone()).collect();
    let kept: Vec<Revision<'_>> = local_file
        .map(|file| {
            file.delta
                .iter()
                .filter(|rev| !incoming_nums.contains(&rev.num))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let date_bufs: Vec<Vec<u8>> = revisions.iter().map(|r| r.date.clone()).collect();
    let log_bufs: Vec<Option<Vec<u8>>> = revisions
        .iter()
        .map(|r| (!r.log.is_empty()).then(|| escape_at(&r.log)))
        .collect();
    let text_bufs: Vec<Option<Vec<u8>>> = revisions
        .iter()
        .map(|r| (!r.text.is_empty()).then(|| escape_at(&r.text)))
        .collect();

    let mut synthetic = Vec::with_capacity(revisions.len());
    for (i, body) in revisions.iter().enumerate() {
        synthetic.push(Revision {
            num: body.num.clone(),
            date: RcsDate::parse(&date_bufs[i])?,
            author: RcsId::new(&body.author),
            state: body.state.as_deref().map(RcsId::new),
            branches: body.branches.clone(),
            next: body.next.clone(),
            log: log_bufs[i].as_deref().map(RcsStr::from_raw),
            text: text_bufs[i].as_deref().map(RcsStr::from_raw),
            next_index: None,
            branch_indices: Vec::new(),
            deltatext_present: true,
        });
    }

    let mut delta: Vec<Revision<'_>> = kept.into_iter().chain(synthetic).collect();
    delta.sort_by(|a, b| a.num.cmp(&b.num));

    let comment_buf = admin.comment.as_ref().map(|c| escape_at(c));
    let expand_buf = admin.expand.as_ref().map(|e| escape_at(e));
    let synthetic_admin = Admin {
        head: admin.head.clone(),
        branch: admin.branch.clone(),
        access: admin.access.iter().map(|id| RcsId::new(id)).collect(),
        symbols: admin
            .symbols
            .iter()
            .map(|(sym, num)| Symbol {
                sym: RcsId::new(sym),
                num: num.clone(),
            })
            .collect(),
        locks: admin
            .locks
            .iter()
            .map(|(owner, num)| Lock {
                id: RcsId::new(owner),
                num: num.clone(),
            })
            .collect(),
        strict: admin.strict,
        comment: comment_buf.as_deref().map(RcsStr::from_raw),
        expand: expand_buf.as_deref().map(RcsStr::from_raw),
    };

    let desc = local_file.map(|f| f.desc).unwrap_or_else(|| RcsStr::from_raw(b""));
    let file = RcsFile {
        admin: synthetic_admin,
        delta,
        desc,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, cvsync_rcs::write::encode(&file))?;
    Ok(())
}

/// Reads the closing sentinel out of a `CompareCommand` stream the same
/// way [`apply_update_rcs`] does, exposed for session code that consumes
/// a bare `UPDATE_END` between collections rather than inside a sub-dialog.
pub fn drain_update_end<R: Read>(reader: &mut R) -> Result<(), ApplyError> {
    let _ = CompareCommand::read(reader)?;
    Ok(())
}
