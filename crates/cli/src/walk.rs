//! The scanner side of the scan/compare dialogue: walks the destination
//! mirror tree and turns it into the [`ScanCommand`] stream the comparator
//! reconciles against.
//!
//! The on-disk walk algorithm itself is explicitly out of scope upstream
//! (`spec.md` §1); this module picks a concrete, documented one (see
//! `DESIGN.md`): a persisted catalog of the tree's state as of the last
//! successful sync, diffed against what is physically present now, plus an
//! optional manifest of names known to exist in the collection but not yet
//! checked out locally (the bootstrap case a from-scratch destination can't
//! otherwise discover on its own).

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use cvsync_core::attr::{CvsyncAttr, FileType};
use cvsync_filters::RefuseList;
use cvsync_scan::frame::{read_frame, write_frame};
use cvsync_scan::{EntryRecord, ScanCommand, ScanError};

/// A name-keyed snapshot of the tree's attributes, used both for the
/// persisted catalog and for what the walker finds on disk right now.
pub type Snapshot = HashMap<Vec<u8>, (FileType, CvsyncAttr)>;

/// Loads the catalog persisted by a previous run, or an empty one if
/// `path` does not exist.
pub fn load_catalog(path: &Path) -> io::Result<Snapshot> {
    let mut file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::new()),
        Err(err) => return Err(err),
    };
    let mut snapshot = Snapshot::new();
    loop {
        match read_frame(&mut file) {
            Ok(body) => {
                let record = EntryRecord::decode(&body, true).map_err(to_io_error)?;
                if let Some(attr) = record.attr {
                    snapshot.insert(record.name, (record.filetype, attr));
                }
            }
            Err(ScanError::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(to_io_error(err)),
        }
    }
    Ok(snapshot)
}

/// Persists `snapshot` as the catalog for the next run.
pub fn save_catalog(path: &Path, snapshot: &Snapshot) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    for (name, (filetype, attr)) in snapshot {
        let record = EntryRecord::with_attr(*filetype, name.clone(), attr.clone());
        write_frame(&mut file, &record.encode()).map_err(to_io_error)?;
    }
    file.flush()
}

/// Parses a bootstrap manifest: one `name\tfiletype` pair per line, naming
/// entries the operator knows exist in the collection but that are not yet
/// present locally (`file`, `rcs`, `rcs_attic`, `dir`, `symlink`).
pub fn load_manifest(path: &Path) -> io::Result<Vec<(FileType, Vec<u8>)>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let mut out = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, kind)) = line.rsplit_once('\t') else {
            continue;
        };
        let filetype = match kind {
            "file" => FileType::File,
            "rcs" => FileType::Rcs,
            "rcs_attic" => FileType::RcsAttic,
            "dir" => FileType::Dir,
            "symlink" => FileType::Symlink,
            _ => continue,
        };
        out.push((filetype, name.as_bytes().to_vec()));
    }
    Ok(out)
}

/// Recursively walks `root`, collecting every entry's filetype and
/// attributes, skipping anything [`RefuseList::is_refused`] rejects.
pub fn scan_local_tree(root: &Path, refuse: &RefuseList) -> io::Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    walk_dir(root, &mut PathBuf::new(), refuse, &mut snapshot)?;
    Ok(snapshot)
}

fn walk_dir(root: &Path, relative: &mut PathBuf, refuse: &RefuseList, out: &mut Snapshot) -> io::Result<()> {
    let absolute = root.join(relative.as_path());
    let entries = match fs::read_dir(&absolute) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let name_str = file_name.to_string_lossy().into_owned();
        relative.push(&file_name);
        let rel_bytes = relative.as_os_str().as_encoded_bytes().to_vec();
        let meta = entry.metadata()?;

        let is_dir = meta.is_dir() && !meta.file_type().is_symlink();
        if refuse.is_refused(&name_str, is_dir) {
            relative.pop();
            continue;
        }

        let mode = meta.permissions().mode() as u16;
        if meta.file_type().is_symlink() {
            let target = fs::read_link(entry.path())?.into_os_string().into_encoded_bytes();
            out.insert(rel_bytes, (FileType::Symlink, CvsyncAttr::Symlink { target }));
        } else if is_dir {
            out.insert(rel_bytes, (FileType::Dir, CvsyncAttr::Dir { mode }));
            walk_dir(root, relative, refuse, out)?;
        } else if name_str.ends_with(",v") {
            out.insert(
                rel_bytes,
                (
                    FileType::Rcs,
                    CvsyncAttr::Rcs {
                        mtime: meta.mtime(),
                        mode,
                    },
                ),
            );
        } else {
            out.insert(
                rel_bytes,
                (
                    FileType::File,
                    CvsyncAttr::File {
                        mtime: meta.mtime(),
                        size: meta.size(),
                        mode,
                    },
                ),
            );
        }
        relative.pop();
    }
    Ok(())
}

/// True when a name's filetype moved across the RCS/Attic boundary between
/// two snapshots: an RCS file and its attic'd form share a logical name and
/// are reported as a `RCS_ATTIC` transition rather than a `REMOVE`/`ADD`
/// pair or a generic `UPDATE`.
fn crossed_attic_boundary(previous: FileType, current: FileType) -> bool {
    previous != current
        && matches!(previous, FileType::Rcs | FileType::RcsAttic)
        && matches!(current, FileType::Rcs | FileType::RcsAttic)
}

/// True when only permission bits differ between two attribute values of
/// the same filetype, the case the scanner reports as `SETATTR` rather
/// than a full `UPDATE`.
fn only_mode_differs(previous: &CvsyncAttr, current: &CvsyncAttr) -> bool {
    match (previous, current) {
        (CvsyncAttr::Dir { mode: a }, CvsyncAttr::Dir { mode: b }) => a != b,
        (
            CvsyncAttr::File { mtime: mt1, size: s1, mode: m1 },
            CvsyncAttr::File { mtime: mt2, size: s2, mode: m2 },
        ) => mt1 == mt2 && s1 == s2 && m1 != m2,
        (CvsyncAttr::Rcs { mtime: mt1, mode: m1 }, CvsyncAttr::Rcs { mtime: mt2, mode: m2 }) => {
            mt1 == mt2 && m1 != m2
        }
        _ => false,
    }
}

/// Diffs `current` (what is on disk now) against `catalog` (what was on
/// disk as of the last sync) plus `manifest` (names the operator knows
/// exist upstream but aren't checked out yet), producing the
/// [`ScanCommand`] stream for one collection's dialogue.
#[must_use]
pub fn build_scan_commands(
    current: &Snapshot,
    catalog: &Snapshot,
    manifest: &[(FileType, Vec<u8>)],
) -> Vec<ScanCommand> {
    let mut commands = Vec::new();

    for (name, (filetype, attr)) in current {
        match catalog.get(name) {
            None => {
                commands.push(ScanCommand::Add(EntryRecord::with_attr(
                    *filetype,
                    name.clone(),
                    attr.clone(),
                )));
            }
            Some((previous_filetype, _)) if crossed_attic_boundary(*previous_filetype, *filetype) => {
                commands.push(ScanCommand::RcsAttic(EntryRecord::with_attr(
                    *filetype,
                    name.clone(),
                    attr.clone(),
                )));
            }
            Some((_, previous)) if previous == attr => {}
            Some((_, previous)) if only_mode_differs(previous, attr) => {
                commands.push(ScanCommand::SetAttr(EntryRecord::with_attr(
                    *filetype,
                    name.clone(),
                    attr.clone(),
                )));
            }
            Some(_) => {
                commands.push(ScanCommand::Update(EntryRecord::with_attr(
                    *filetype,
                    name.clone(),
                    attr.clone(),
                )));
            }
        }
    }

    for (name, _) in catalog {
        if !current.contains_key(name) {
            let filetype = catalog[name].0;
            commands.push(ScanCommand::Remove(EntryRecord::bare(filetype, name.clone())));
        }
    }

    for (filetype, name) in manifest {
        if !current.contains_key(name) && !catalog.contains_key(name) {
            commands.push(ScanCommand::Remove(EntryRecord::bare(*filetype, name.clone())));
        }
    }

    commands.push(ScanCommand::End);
    commands
}

fn to_io_error(err: ScanError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_local_entry_produces_add() {
        let mut current = Snapshot::new();
        current.insert(b"x".to_vec(), (FileType::File, CvsyncAttr::File { mtime: 1, size: 2, mode: 0o644 }));
        let catalog = Snapshot::new();
        let commands = build_scan_commands(&current, &catalog, &[]);
        assert!(matches!(commands[0], ScanCommand::Add(_)));
        assert_eq!(commands.last(), Some(&ScanCommand::End));
    }

    #[test]
    fn missing_catalog_entry_produces_remove() {
        let current = Snapshot::new();
        let mut catalog = Snapshot::new();
        catalog.insert(b"x".to_vec(), (FileType::File, CvsyncAttr::File { mtime: 1, size: 2, mode: 0o644 }));
        let commands = build_scan_commands(&current, &catalog, &[]);
        assert!(matches!(commands[0], ScanCommand::Remove(_)));
    }

    #[test]
    fn manifest_entry_not_yet_present_produces_remove() {
        let current = Snapshot::new();
        let catalog = Snapshot::new();
        let manifest = vec![(FileType::Rcs, b"a/x,v".to_vec())];
        let commands = build_scan_commands(&current, &catalog, &manifest);
        assert!(matches!(commands[0], ScanCommand::Remove(_)));
    }

    #[test]
    fn unchanged_entry_produces_nothing() {
        let attr = CvsyncAttr::File { mtime: 1, size: 2, mode: 0o644 };
        let mut current = Snapshot::new();
        current.insert(b"x".to_vec(), (FileType::File, attr.clone()));
        let mut catalog = Snapshot::new();
        catalog.insert(b"x".to_vec(), (FileType::File, attr));
        let commands = build_scan_commands(&current, &catalog, &[]);
        assert_eq!(commands, vec![ScanCommand::End]);
    }

    #[test]
    fn attic_transition_produces_rcs_attic() {
        let attr = CvsyncAttr::Rcs { mtime: 1, mode: 0o444 };
        let mut current = Snapshot::new();
        current.insert(b"x,v".to_vec(), (FileType::RcsAttic, attr.clone()));
        let mut catalog = Snapshot::new();
        catalog.insert(b"x,v".to_vec(), (FileType::Rcs, attr));
        let commands = build_scan_commands(&current, &catalog, &[]);
        assert!(matches!(commands[0], ScanCommand::RcsAttic(_)));
    }

    #[test]
    fn mode_only_change_produces_setattr() {
        let mut current = Snapshot::new();
        current.insert(b"x".to_vec(), (FileType::File, CvsyncAttr::File { mtime: 1, size: 2, mode: 0o600 }));
        let mut catalog = Snapshot::new();
        catalog.insert(b"x".to_vec(), (FileType::File, CvsyncAttr::File { mtime: 1, size: 2, mode: 0o644 }));
        let commands = build_scan_commands(&current, &catalog, &[]);
        assert!(matches!(commands[0], ScanCommand::SetAttr(_)));
    }
}
