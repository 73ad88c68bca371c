//! What travels on mux sub-channel 1: the bodies of `ADD`/`UPDATE`/
//! `UPDATE_RCS` commands exchanged on sub-channel 0 (`spec.md` §4.4,
//! "Post-setup flow").
//!
//! Sub-channel 0's command frames cap at `u16::MAX` bytes
//! ([`crate::frame::MAX_FRAME_LEN`]), which is far too small for a file
//! body or an RCS revision's full text, so this module frames its own
//! payloads with a 4-byte length instead.

use std::io::{Read, Write};

use cvsync_core::wire::{read_u32, write_u32};
use cvsync_rcs::RcsNum;

use crate::error::ScanError;
use crate::update_rcs::AdminSnapshot;

const TAG_FILE_BODY: u8 = 0;
const TAG_RCS_REVISIONS: u8 = 1;

fn write_len32_prefixed<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), ScanError> {
    let mut len = Vec::with_capacity(4);
    write_u32(&mut len, bytes.len() as u32);
    writer.write_all(&len)?;
    writer.write_all(bytes)?;
    Ok(())
}

fn read_len32_prefixed<R: Read>(reader: &mut R) -> Result<Vec<u8>, ScanError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let (len, _) = read_u32(&len_buf)?;
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;
    Ok(body)
}

fn encode_len32_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(out, bytes.len() as u32);
    out.extend_from_slice(bytes);
}

fn decode_len32_prefixed(buf: &[u8]) -> Result<(&[u8], &[u8]), ScanError> {
    let (len, rest) = read_u32(buf)?;
    let len = len as usize;
    if rest.len() < len {
        return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
            needed: len,
            available: rest.len(),
        }));
    }
    Ok(rest.split_at(len))
}

fn encode_optional_num(out: &mut Vec<u8>, num: Option<&RcsNum>) {
    match num {
        Some(num) => {
            out.push(1);
            encode_len32_prefixed(out, num.as_bytes());
        }
        None => out.push(0),
    }
}

fn decode_optional_num(buf: &[u8]) -> Result<(Option<RcsNum>, &[u8]), ScanError> {
    if buf.is_empty() {
        return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
            needed: 1,
            available: 0,
        }));
    }
    let present = buf[0] != 0;
    let rest = &buf[1..];
    if !present {
        return Ok((None, rest));
    }
    let (bytes, rest) = decode_len32_prefixed(rest)?;
    Ok((Some(RcsNum::parse(bytes)?), rest))
}

/// One revision shipped in full, for a new file or a mismatching delta
/// found during the `UPDATE_RCS` sub-dialogue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionBody {
    /// This revision's number.
    pub num: RcsNum,
    /// Raw `date` field bytes.
    pub date: Vec<u8>,
    /// Commit author.
    pub author: Vec<u8>,
    /// RCS state tag, if declared.
    pub state: Option<Vec<u8>>,
    /// Branch tip revisions rooted at this revision.
    pub branches: Vec<RcsNum>,
    /// The next revision in the delta chain, if any.
    pub next: Option<RcsNum>,
    /// Commit log message, un-escaped.
    pub log: Vec<u8>,
    /// Full revision text, un-escaped.
    pub text: Vec<u8>,
}

impl RevisionBody {
    /// Builds a shippable body from a parsed revision, un-escaping its log
    /// and text payloads. Panics if `revision` hasn't completed the
    /// deltatext phase (`deltatext_present`); callers only reach here for
    /// revisions [`cvsync_rcs::RcsFile::revision_at`] already resolved in
    /// full.
    #[must_use]
    pub fn from_revision(revision: &cvsync_rcs::Revision<'_>) -> Self {
        Self {
            num: revision.num.clone(),
            date: revision.date.raw().to_vec(),
            author: revision.author.as_bytes().to_vec(),
            state: revision.state.map(|s| s.as_bytes().to_vec()),
            branches: revision.branches.clone(),
            next: revision.next.clone(),
            log: revision
                .log
                .map(|s| s.decode().into_owned())
                .unwrap_or_default(),
            text: revision
                .text
                .map(|s| s.decode().into_owned())
                .unwrap_or_default(),
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        encode_len32_prefixed(out, self.num.as_bytes());
        encode_len32_prefixed(out, &self.date);
        encode_len32_prefixed(out, &self.author);
        match &self.state {
            Some(state) => {
                out.push(1);
                encode_len32_prefixed(out, state);
            }
            None => out.push(0),
        }
        write_u32(out, self.branches.len() as u32);
        for branch in &self.branches {
            encode_len32_prefixed(out, branch.as_bytes());
        }
        encode_optional_num(out, self.next.as_ref());
        encode_len32_prefixed(out, &self.log);
        encode_len32_prefixed(out, &self.text);
    }

    fn decode_from(buf: &[u8]) -> Result<(Self, &[u8]), ScanError> {
        let (num, rest) = decode_len32_prefixed(buf)?;
        let num = RcsNum::parse(num)?;
        let (date, rest) = decode_len32_prefixed(rest)?;
        let (author, rest) = decode_len32_prefixed(rest)?;
        if rest.is_empty() {
            return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
                needed: 1,
                available: 0,
            }));
        }
        let has_state = rest[0] != 0;
        let rest = &rest[1..];
        let (state, rest) = if has_state {
            let (state, rest) = decode_len32_prefixed(rest)?;
            (Some(state.to_vec()), rest)
        } else {
            (None, rest)
        };
        let (count, rest) = read_u32(rest)?;
        let mut branches = Vec::with_capacity(count as usize);
        let mut rest = rest;
        for _ in 0..count {
            let (branch, remainder) = decode_len32_prefixed(rest)?;
            branches.push(RcsNum::parse(branch)?);
            rest = remainder;
        }
        let (next, rest) = decode_optional_num(rest)?;
        let (log, rest) = decode_len32_prefixed(rest)?;
        let (text, rest) = decode_len32_prefixed(rest)?;
        Ok((
            Self {
                num,
                date: date.to_vec(),
                author: author.to_vec(),
                state,
                branches,
                next,
                log: log.to_vec(),
                text: text.to_vec(),
            },
            rest,
        ))
    }
}

/// A body shipped on the content sub-channel in response to an `ADD`,
/// `UPDATE`, or a mismatching revision found during `UPDATE_RCS`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentPayload {
    /// A plain file's (or a non-RCS-aware generic update's) full content.
    FileBody(Vec<u8>),
    /// The outcome of an `UPDATE_RCS` digest comparison: the sender's
    /// current admin header (`None` only if the sender has no local copy
    /// at all) plus the revisions that were missing or hashed differently,
    /// shipped in full so the peer can splice them into its local copy.
    /// Sent even when `revisions` is empty, so a reader never has to guess
    /// whether a frame is coming.
    RcsRevisions {
        /// The sender's current admin header, if it has a local copy.
        admin: Option<AdminSnapshot>,
        /// Full bodies of the revisions that differed.
        revisions: Vec<RevisionBody>,
    },
}

impl ContentPayload {
    /// Encodes this payload's tag and body.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            ContentPayload::FileBody(bytes) => {
                out.push(TAG_FILE_BODY);
                encode_len32_prefixed(&mut out, bytes);
            }
            ContentPayload::RcsRevisions { admin, revisions } => {
                out.push(TAG_RCS_REVISIONS);
                match admin {
                    Some(admin) => {
                        out.push(1);
                        encode_len32_prefixed(&mut out, &admin.encode());
                    }
                    None => out.push(0),
                }
                write_u32(&mut out, revisions.len() as u32);
                for revision in revisions {
                    revision.encode_into(&mut out);
                }
            }
        }
        out
    }

    /// Decodes a payload's tag and body.
    pub fn decode(buf: &[u8]) -> Result<Self, ScanError> {
        if buf.is_empty() {
            return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
                needed: 1,
                available: 0,
            }));
        }
        let rest = &buf[1..];
        match buf[0] {
            TAG_FILE_BODY => {
                let (bytes, _) = decode_len32_prefixed(rest)?;
                Ok(ContentPayload::FileBody(bytes.to_vec()))
            }
            TAG_RCS_REVISIONS => {
                if rest.is_empty() {
                    return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
                        needed: 1,
                        available: 0,
                    }));
                }
                let has_admin = rest[0] != 0;
                let rest = &rest[1..];
                let (admin, rest) = if has_admin {
                    let (bytes, rest) = decode_len32_prefixed(rest)?;
                    (Some(AdminSnapshot::decode(bytes)?), rest)
                } else {
                    (None, rest)
                };
                let (count, mut rest) = read_u32(rest)?;
                let mut revisions = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let (revision, remainder) = RevisionBody::decode_from(rest)?;
                    revisions.push(revision);
                    rest = remainder;
                }
                Ok(ContentPayload::RcsRevisions { admin, revisions })
            }
            other => Err(ScanError::UnknownOpcode(other)),
        }
    }

    /// Writes this payload on the content channel.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ScanError> {
        write_len32_prefixed(writer, &self.encode())
    }

    /// Reads one payload from the content channel.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ScanError> {
        let body = read_len32_prefixed(reader)?;
        Self::decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn file_body_round_trips() {
        let payload = ContentPayload::FileBody(b"hello world".to_vec());
        let mut buf = Vec::new();
        payload.write(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(ContentPayload::read(&mut cursor).unwrap(), payload);
    }

    #[test]
    fn rcs_revisions_round_trip() {
        let payload = ContentPayload::RcsRevisions {
            admin: Some(AdminSnapshot {
                head: Some(RcsNum::parse(b"1.2").unwrap()),
                branch: None,
                access: Vec::new(),
                symbols: Vec::new(),
                locks: Vec::new(),
                strict: false,
                comment: None,
                expand: None,
            }),
            revisions: vec![RevisionBody {
                num: RcsNum::parse(b"1.2").unwrap(),
                date: b"2024.01.02.03.04.05".to_vec(),
                author: b"alice".to_vec(),
                state: Some(b"Exp".to_vec()),
                branches: vec![RcsNum::parse(b"1.2.1.1").unwrap()],
                next: Some(RcsNum::parse(b"1.1").unwrap()),
                log: b"log message".to_vec(),
                text: b"revision text".to_vec(),
            }],
        };
        let mut buf = Vec::new();
        payload.write(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(ContentPayload::read(&mut cursor).unwrap(), payload);
    }

    #[test]
    fn empty_revision_list_round_trips() {
        let payload = ContentPayload::RcsRevisions {
            admin: None,
            revisions: Vec::new(),
        };
        let mut buf = Vec::new();
        payload.write(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(ContentPayload::read(&mut cursor).unwrap(), payload);
    }
}
