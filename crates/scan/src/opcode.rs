//! The two opcode sets carried on sub-channel 0 (`spec.md` §4.4).

use crate::error::ScanError;

/// Opcodes the scanner (client) sends.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ScanOpcode {
    /// A local entry the peer doesn't have.
    Add,
    /// A local entry that no longer exists.
    Remove,
    /// An RCS file moved between `Attic/` and non-`Attic/`.
    RcsAttic,
    /// Attribute-only change (content identical).
    SetAttr,
    /// Content (and possibly attribute) change.
    Update,
    /// End of the scan stream.
    End,
}

impl ScanOpcode {
    /// The 1-byte wire tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            ScanOpcode::Add => 0x00,
            ScanOpcode::Remove => 0x01,
            ScanOpcode::RcsAttic => 0x02,
            ScanOpcode::SetAttr => 0x03,
            ScanOpcode::Update => 0x04,
            ScanOpcode::End => 0x05,
        }
    }

    /// Decodes a 1-byte wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, ScanError> {
        Ok(match tag {
            0x00 => ScanOpcode::Add,
            0x01 => ScanOpcode::Remove,
            0x02 => ScanOpcode::RcsAttic,
            0x03 => ScanOpcode::SetAttr,
            0x04 => ScanOpcode::Update,
            0x05 => ScanOpcode::End,
            other => return Err(ScanError::UnknownOpcode(other)),
        })
    }
}

/// Opcodes the comparator (server) sends back.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CompareOpcode {
    /// Ship a new entry the client doesn't have.
    Add,
    /// The client has an entry the server no longer does.
    Remove,
    /// Attribute-only change.
    SetAttr,
    /// Generic content update (non-RCS-aware path).
    Update,
    /// RCS-aware update: per-revision digests and deltas.
    UpdateRcs,
    /// Marks the end of an `UPDATE_RCS` sub-dialogue (or, bare, the end
    /// of the whole compare stream).
    UpdateEnd,
}

impl CompareOpcode {
    /// The 1-byte wire tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            CompareOpcode::Add => 0x00,
            CompareOpcode::Remove => 0x01,
            CompareOpcode::SetAttr => 0x02,
            CompareOpcode::Update => 0x03,
            CompareOpcode::UpdateRcs => 0x04,
            CompareOpcode::UpdateEnd => 0x05,
        }
    }

    /// Decodes a 1-byte wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, ScanError> {
        Ok(match tag {
            0x00 => CompareOpcode::Add,
            0x01 => CompareOpcode::Remove,
            0x02 => CompareOpcode::SetAttr,
            0x03 => CompareOpcode::Update,
            0x04 => CompareOpcode::UpdateRcs,
            0x05 => CompareOpcode::UpdateEnd,
            other => return Err(ScanError::UnknownOpcode(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_opcodes_round_trip() {
        for op in [
            ScanOpcode::Add,
            ScanOpcode::Remove,
            ScanOpcode::RcsAttic,
            ScanOpcode::SetAttr,
            ScanOpcode::Update,
            ScanOpcode::End,
        ] {
            assert_eq!(ScanOpcode::from_tag(op.tag()).unwrap(), op);
        }
    }

    #[test]
    fn compare_opcodes_round_trip() {
        for op in [
            CompareOpcode::Add,
            CompareOpcode::Remove,
            CompareOpcode::SetAttr,
            CompareOpcode::Update,
            CompareOpcode::UpdateRcs,
            CompareOpcode::UpdateEnd,
        ] {
            assert_eq!(CompareOpcode::from_tag(op.tag()).unwrap(), op);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(matches!(
            ScanOpcode::from_tag(0x7f),
            Err(ScanError::UnknownOpcode(0x7f))
        ));
    }
}
