//! `EntryRecord`: the `{filetype, name, attr?}` payload shared by every
//! scan/compare opcode that names an entry.
//!
//! Grounded in `filescan_rcs_fetch`'s per-tag decode (`ADD`/`REMOVE` carry
//! no attribute blob; `SETATTR`/`UPDATE`/`RCS_ATTIC` always do) and
//! `filescan_rcs_add`/`_remove`'s matching encode.

use cvsync_core::attr::{CvsyncAttr, FileType};
use cvsync_core::wire::{read_u16, read_u16_prefixed, write_u16_prefixed};

use crate::error::ScanError;

/// One entry named by a scan or compare command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryRecord {
    /// The entry's filetype.
    pub filetype: FileType,
    /// The entry's path, relative to the collection's prefix.
    pub name: Vec<u8>,
    /// The entry's attributes, present for every opcode except
    /// `ADD`/`REMOVE`.
    pub attr: Option<CvsyncAttr>,
}

impl EntryRecord {
    /// Builds a bare record (no attributes), for `ADD`/`REMOVE`.
    #[must_use]
    pub fn bare(filetype: FileType, name: Vec<u8>) -> Self {
        Self {
            filetype,
            name,
            attr: None,
        }
    }

    /// Builds a record carrying attributes, for `SETATTR`/`UPDATE`/
    /// `RCS_ATTIC`.
    #[must_use]
    pub fn with_attr(filetype: FileType, name: Vec<u8>, attr: CvsyncAttr) -> Self {
        Self {
            filetype,
            name,
            attr: Some(attr),
        }
    }

    /// Encodes `filetype, name_len, name[, attr]`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.filetype.tag());
        write_u16_prefixed(&mut out, &self.name).expect("scan paths are well within u16 bounds");
        if let Some(attr) = &self.attr {
            out.extend_from_slice(&attr.encode());
        }
        out
    }

    /// Decodes `filetype, name_len, name[, attr]`; `carries_attr` tells
    /// the decoder whether the opcode that contained this record declares
    /// an attribute blob should follow.
    pub fn decode(buf: &[u8], carries_attr: bool) -> Result<Self, ScanError> {
        if buf.is_empty() {
            return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
                needed: 1,
                available: 0,
            }));
        }
        let filetype = FileType::from_tag(buf[0])?;
        let (name, rest) = read_u16_prefixed(&buf[1..])?;
        let attr = if carries_attr {
            Some(CvsyncAttr::decode(filetype, rest)?)
        } else {
            None
        };
        Ok(Self {
            filetype,
            name: name.to_vec(),
            attr,
        })
    }
}

/// Reads just the leading `filetype, name_len` pair without consuming any
/// attribute bytes, used by callers that need to know the filetype before
/// deciding how many attribute bytes to expect.
pub fn peek_filetype(buf: &[u8]) -> Result<(FileType, &[u8]), ScanError> {
    if buf.is_empty() {
        return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
            needed: 1,
            available: 0,
        }));
    }
    let filetype = FileType::from_tag(buf[0])?;
    let (_, rest) = read_u16(&buf[1..])?;
    Ok((filetype, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_record_round_trips() {
        let record = EntryRecord::bare(FileType::Rcs, b"a/b.c,v".to_vec());
        let encoded = record.encode();
        let decoded = EntryRecord::decode(&encoded, false).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn attributed_record_round_trips() {
        let record = EntryRecord::with_attr(
            FileType::File,
            b"x".to_vec(),
            CvsyncAttr::File {
                mtime: 10,
                size: 20,
                mode: 0o644,
            },
        );
        let encoded = record.encode();
        let decoded = EntryRecord::decode(&encoded, true).unwrap();
        assert_eq!(decoded, record);
    }
}
