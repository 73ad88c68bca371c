//! The scan and compare commands themselves: one [`ScanOpcode`] or
//! [`CompareOpcode`] plus (for every opcode but `END`/bare `UPDATE_END`)
//! an [`EntryRecord`].

use std::io::{Read, Write};

use crate::error::ScanError;
use crate::frame::{read_frame, write_frame};
use crate::opcode::{CompareOpcode, ScanOpcode};
use crate::record::EntryRecord;

/// One command the scanner sends on sub-channel 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanCommand {
    /// A local entry the peer doesn't have.
    Add(EntryRecord),
    /// A local entry that no longer exists.
    Remove(EntryRecord),
    /// An RCS file moved between `Attic/` and non-`Attic/`.
    RcsAttic(EntryRecord),
    /// Attribute-only change.
    SetAttr(EntryRecord),
    /// Content (and possibly attribute) change.
    Update(EntryRecord),
    /// End of the scan stream.
    End,
}

impl ScanCommand {
    fn opcode(&self) -> ScanOpcode {
        match self {
            ScanCommand::Add(_) => ScanOpcode::Add,
            ScanCommand::Remove(_) => ScanOpcode::Remove,
            ScanCommand::RcsAttic(_) => ScanOpcode::RcsAttic,
            ScanCommand::SetAttr(_) => ScanOpcode::SetAttr,
            ScanCommand::Update(_) => ScanOpcode::Update,
            ScanCommand::End => ScanOpcode::End,
        }
    }

    /// Encodes this command's body (opcode byte plus any record).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.opcode().tag()];
        match self {
            ScanCommand::Add(record) | ScanCommand::Remove(record) => {
                out.extend_from_slice(&record.encode());
            }
            ScanCommand::RcsAttic(record) | ScanCommand::SetAttr(record) | ScanCommand::Update(record) => {
                out.extend_from_slice(&record.encode());
            }
            ScanCommand::End => {}
        }
        out
    }

    /// Decodes a command body.
    pub fn decode(body: &[u8]) -> Result<Self, ScanError> {
        if body.is_empty() {
            return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
                needed: 1,
                available: 0,
            }));
        }
        let opcode = ScanOpcode::from_tag(body[0])?;
        let rest = &body[1..];
        Ok(match opcode {
            ScanOpcode::Add => ScanCommand::Add(EntryRecord::decode(rest, false)?),
            ScanOpcode::Remove => ScanCommand::Remove(EntryRecord::decode(rest, false)?),
            ScanOpcode::RcsAttic => ScanCommand::RcsAttic(EntryRecord::decode(rest, true)?),
            ScanOpcode::SetAttr => ScanCommand::SetAttr(EntryRecord::decode(rest, true)?),
            ScanOpcode::Update => ScanCommand::Update(EntryRecord::decode(rest, true)?),
            ScanOpcode::End => ScanCommand::End,
        })
    }

    /// Writes this command as one length-prefixed frame.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ScanError> {
        write_frame(writer, &self.encode())
    }

    /// Reads one command frame.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ScanError> {
        let body = read_frame(reader)?;
        Self::decode(&body)
    }
}

/// One command the comparator sends back on sub-channel 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompareCommand {
    /// Ship a new entry (body follows on the content sub-channel).
    Add(EntryRecord),
    /// The client has an entry the server doesn't.
    Remove(EntryRecord),
    /// Attribute-only change.
    SetAttr(EntryRecord),
    /// Generic content update (body follows on the content sub-channel).
    Update(EntryRecord),
    /// Opens the `UPDATE_RCS` sub-dialogue for this entry.
    UpdateRcs(EntryRecord),
    /// Ends an `UPDATE_RCS` sub-dialogue, or (sent bare, with no prior
    /// `UpdateRcs`) the whole compare stream.
    UpdateEnd,
}

impl CompareCommand {
    fn opcode(&self) -> CompareOpcode {
        match self {
            CompareCommand::Add(_) => CompareOpcode::Add,
            CompareCommand::Remove(_) => CompareOpcode::Remove,
            CompareCommand::SetAttr(_) => CompareOpcode::SetAttr,
            CompareCommand::Update(_) => CompareOpcode::Update,
            CompareCommand::UpdateRcs(_) => CompareOpcode::UpdateRcs,
            CompareCommand::UpdateEnd => CompareOpcode::UpdateEnd,
        }
    }

    /// Encodes this command's body.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.opcode().tag()];
        match self {
            CompareCommand::Add(record) | CompareCommand::Remove(record) => {
                out.extend_from_slice(&record.encode());
            }
            CompareCommand::SetAttr(record) | CompareCommand::Update(record) | CompareCommand::UpdateRcs(record) => {
                out.extend_from_slice(&record.encode());
            }
            CompareCommand::UpdateEnd => {}
        }
        out
    }

    /// Decodes a command body.
    pub fn decode(body: &[u8]) -> Result<Self, ScanError> {
        if body.is_empty() {
            return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
                needed: 1,
                available: 0,
            }));
        }
        let opcode = CompareOpcode::from_tag(body[0])?;
        let rest = &body[1..];
        Ok(match opcode {
            CompareOpcode::Add => CompareCommand::Add(EntryRecord::decode(rest, false)?),
            CompareOpcode::Remove => CompareCommand::Remove(EntryRecord::decode(rest, false)?),
            CompareOpcode::SetAttr => CompareCommand::SetAttr(EntryRecord::decode(rest, true)?),
            CompareOpcode::Update => CompareCommand::Update(EntryRecord::decode(rest, true)?),
            CompareOpcode::UpdateRcs => CompareCommand::UpdateRcs(EntryRecord::decode(rest, true)?),
            CompareOpcode::UpdateEnd => CompareCommand::UpdateEnd,
        })
    }

    /// Writes this command as one length-prefixed frame.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ScanError> {
        write_frame(writer, &self.encode())
    }

    /// Reads one command frame.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ScanError> {
        let body = read_frame(reader)?;
        Self::decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvsync_core::attr::{CvsyncAttr, FileType};
    use std::io::Cursor;

    #[test]
    fn scan_add_round_trips_through_wire() {
        let command = ScanCommand::Add(EntryRecord::bare(FileType::Rcs, b"x,v".to_vec()));
        let mut buf = Vec::new();
        command.write(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(ScanCommand::read(&mut cursor).unwrap(), command);
    }

    #[test]
    fn compare_update_rcs_round_trips() {
        let command = CompareCommand::UpdateRcs(EntryRecord::with_attr(
            FileType::Rcs,
            b"a/b.c,v".to_vec(),
            CvsyncAttr::Rcs {
                mtime: 1,
                mode: 0o444,
            },
        ));
        let mut buf = Vec::new();
        command.write(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(CompareCommand::read(&mut cursor).unwrap(), command);
    }

    #[test]
    fn end_has_no_trailing_record() {
        let mut buf = Vec::new();
        ScanCommand::End.write(&mut buf).unwrap();
        assert_eq!(buf, vec![0, 1, ScanOpcode::End.tag()]);
    }
}
