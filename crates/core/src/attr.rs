//! The `CvsyncAttr` per-entry attribute tuple used in the scan stream.
//!
//! Wire shapes (all multi-byte fields big-endian):
//!
//! | Filetype | Fields | Wire length |
//! |---|---|---|
//! | `DIR` | `mode: u16` | 2 |
//! | `FILE` | `mtime: i64`, `size: u64`, `mode: u16` | 18 |
//! | `RCS` / `RCS_ATTIC` | `mtime: i64`, `mode: u16` | 10 |
//! | `SYMLINK` | `target_len: u16`, `target` | 2 + target_len |
//!
//! `SYMLINK` carries no attribute payload in the original protocol beyond
//! identifying the filetype; this workspace attaches the link target so the
//! compare side can recreate it, since the scan dialogue has nowhere else to
//! carry that information. See `DESIGN.md` for the rationale.

use crate::error::WireError;
use crate::wire::{read_i64, read_u16, read_u16_prefixed, read_u64, write_i64, write_u16, write_u16_prefixed, write_u64};

/// The filetype tag prefixing every attribute blob in the scan/compare
/// dialogue.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FileType {
    /// A directory.
    Dir,
    /// A plain file (only meaningful for `list`-release collections).
    File,
    /// An RCS `,v` file.
    Rcs,
    /// An RCS `,v` file stored in an `Attic/` directory.
    RcsAttic,
    /// A symbolic link.
    Symlink,
}

impl FileType {
    /// The 1-byte wire tag for this filetype.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            FileType::Dir => 0x00,
            FileType::File => 0x01,
            FileType::Rcs => 0x02,
            FileType::RcsAttic => 0x03,
            FileType::Symlink => 0x04,
        }
    }

    /// Decodes a 1-byte wire tag into a filetype.
    pub fn from_tag(tag: u8) -> Result<Self, WireError> {
        Ok(match tag {
            0x00 => FileType::Dir,
            0x01 => FileType::File,
            0x02 => FileType::Rcs,
            0x03 => FileType::RcsAttic,
            0x04 => FileType::Symlink,
            other => return Err(WireError::UnknownFileType(other)),
        })
    }

    /// True for the two RCS-bearing filetypes.
    #[must_use]
    pub const fn is_rcs(self) -> bool {
        matches!(self, FileType::Rcs | FileType::RcsAttic)
    }
}

/// The per-entry attribute tuple carried after a filetype tag and name in
/// scan/compare records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CvsyncAttr {
    /// Directory attributes.
    Dir {
        /// POSIX permission bits.
        mode: u16,
    },
    /// Plain file attributes.
    File {
        /// Modification time, seconds since the epoch.
        mtime: i64,
        /// File size in bytes.
        size: u64,
        /// POSIX permission bits.
        mode: u16,
    },
    /// RCS file attributes (shared by `Rcs` and `RcsAttic` filetypes).
    Rcs {
        /// Modification time, seconds since the epoch.
        mtime: i64,
        /// POSIX permission bits.
        mode: u16,
    },
    /// Symbolic link target.
    Symlink {
        /// Link target bytes.
        target: Vec<u8>,
    },
}

impl CvsyncAttr {
    /// The filetype this attribute corresponds to. For RCS attributes the
    /// Attic/non-Attic distinction is carried by the caller's filetype tag,
    /// not by the attribute payload, so this returns the non-Attic variant.
    #[must_use]
    pub const fn default_filetype(&self) -> FileType {
        match self {
            CvsyncAttr::Dir { .. } => FileType::Dir,
            CvsyncAttr::File { .. } => FileType::File,
            CvsyncAttr::Rcs { .. } => FileType::Rcs,
            CvsyncAttr::Symlink { .. } => FileType::Symlink,
        }
    }

    /// Encodes the attribute blob (without the preceding filetype tag).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            CvsyncAttr::Dir { mode } => write_u16(&mut out, *mode),
            CvsyncAttr::File { mtime, size, mode } => {
                write_i64(&mut out, *mtime);
                write_u64(&mut out, *size);
                write_u16(&mut out, *mode);
            }
            CvsyncAttr::Rcs { mtime, mode } => {
                write_i64(&mut out, *mtime);
                write_u16(&mut out, *mode);
            }
            CvsyncAttr::Symlink { target } => {
                write_u16_prefixed(&mut out, target)
                    .expect("symlink targets are well within u16 bounds");
            }
        }
        out
    }

    /// Decodes an attribute blob given the filetype tag that preceded it.
    pub fn decode(filetype: FileType, buf: &[u8]) -> Result<Self, WireError> {
        Ok(match filetype {
            FileType::Dir => {
                let (mode, _) = read_u16(buf)?;
                CvsyncAttr::Dir { mode }
            }
            FileType::File => {
                let (mtime, rest) = read_i64(buf)?;
                let (size, rest) = read_u64(rest)?;
                let (mode, _) = read_u16(rest)?;
                CvsyncAttr::File { mtime, size, mode }
            }
            FileType::Rcs | FileType::RcsAttic => {
                let (mtime, rest) = read_i64(buf)?;
                let (mode, _) = read_u16(rest)?;
                CvsyncAttr::Rcs { mtime, mode }
            }
            FileType::Symlink => {
                let (target, _) = read_u16_prefixed(buf)?;
                CvsyncAttr::Symlink {
                    target: target.to_vec(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_round_trips() {
        let attr = CvsyncAttr::Dir { mode: 0o755 };
        let bytes = attr.encode();
        assert_eq!(bytes.len(), 2);
        assert_eq!(CvsyncAttr::decode(FileType::Dir, &bytes).unwrap(), attr);
    }

    #[test]
    fn file_round_trips() {
        let attr = CvsyncAttr::File {
            mtime: -5,
            size: 4096,
            mode: 0o644,
        };
        let bytes = attr.encode();
        assert_eq!(bytes.len(), 18);
        assert_eq!(CvsyncAttr::decode(FileType::File, &bytes).unwrap(), attr);
    }

    #[test]
    fn rcs_round_trips() {
        let attr = CvsyncAttr::Rcs {
            mtime: 1_700_000_000,
            mode: 0o444,
        };
        let bytes = attr.encode();
        assert_eq!(bytes.len(), 10);
        assert_eq!(CvsyncAttr::decode(FileType::Rcs, &bytes).unwrap(), attr);
        assert_eq!(
            CvsyncAttr::decode(FileType::RcsAttic, &bytes).unwrap(),
            attr
        );
    }

    #[test]
    fn unknown_tag_errors() {
        assert!(matches!(
            FileType::from_tag(0xFE),
            Err(WireError::UnknownFileType(0xFE))
        ));
    }
}
