//! The `UPDATE_RCS` sub-dialogue (`spec.md` §4.4): once a `CompareCommand::
//! UpdateRcs` opens it, the peers exchange an [`AdminSnapshot`] of the RCS
//! file's header fields followed by a digest per delta revision and a digest
//! per deltatext, rather than shipping full revision text. A
//! `CompareCommand::UpdateEnd` (reused from [`crate::command`]) closes the
//! sub-dialogue whether or not any revision actually differed.
//!
//! Grounded in `examples/original_source/cvsyncd/proto.c`'s `filecmp_rcs`
//! family: the comparator walks the admin block and both delta lists,
//! comparing digests rather than bytes, and only falls through to shipping
//! full revision text (on the content sub-channel, out of this module's
//! scope) for the revisions whose digests disagree.

use std::io::{Read, Write};

use cvsync_checksums::{Algorithm, AnyDigest};
use cvsync_core::wire::{
    read_u16_prefixed, read_u32, write_u16_prefixed, write_u32,
};
use cvsync_rcs::{Admin, RcsFile, RcsNum, Revision};

use crate::error::ScanError;
use crate::frame::{read_frame, write_frame};

/// The 256-entry `symbols` ceiling imposed by protocol minors below 24
/// (`spec.md` §4.4's legacy-format note).
pub const LEGACY_SYMBOL_CEILING: usize = 256;

/// An owned copy of an RCS file's admin header, suitable for shipping over
/// the wire independent of the `&'a [u8]` the source [`RcsFile`] borrows
/// from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminSnapshot {
    /// The head revision, if any.
    pub head: Option<RcsNum>,
    /// The default branch, if set.
    pub branch: Option<RcsNum>,
    /// `access` list, sorted by identifier bytes.
    pub access: Vec<Vec<u8>>,
    /// `symbols` list as `(name, revision)` pairs, sorted by symbol bytes.
    pub symbols: Vec<(Vec<u8>, RcsNum)>,
    /// `locks` list as `(owner, revision)` pairs, sorted by owner then
    /// revision.
    pub locks: Vec<(Vec<u8>, RcsNum)>,
    /// Whether `strict` locking was declared.
    pub strict: bool,
    /// The `comment` leader string, if declared.
    pub comment: Option<Vec<u8>>,
    /// The `expand` keyword-substitution mode, if declared.
    pub expand: Option<Vec<u8>>,
}

impl AdminSnapshot {
    /// Copies the owned fields of a borrowed [`Admin`] block.
    #[must_use]
    pub fn from_admin(admin: &Admin<'_>) -> Self {
        Self {
            head: admin.head.clone(),
            branch: admin.branch.clone(),
            access: admin.access.iter().map(|id| id.as_bytes().to_vec()).collect(),
            symbols: admin
                .symbols
                .iter()
                .map(|s| (s.sym.as_bytes().to_vec(), s.num.clone()))
                .collect(),
            locks: admin
                .locks
                .iter()
                .map(|l| (l.id.as_bytes().to_vec(), l.num.clone()))
                .collect(),
            strict: admin.strict,
            comment: admin.comment.map(|c| c.decode().into_owned()),
            expand: admin.expand.map(|e| e.decode().into_owned()),
        }
    }

    /// Returns [`ScanError::SymbolCountOverflow`] if `symbols` exceeds
    /// [`LEGACY_SYMBOL_CEILING`] and the peer's protocol minor is below 24;
    /// the caller is expected to fall back to a generic (non-RCS-aware)
    /// update for that peer rather than attempt the compact encoding.
    pub fn check_symbol_ceiling(&self, protocol_minor: u8) -> Result<(), ScanError> {
        if protocol_minor < 24 && self.symbols.len() > LEGACY_SYMBOL_CEILING {
            return Err(ScanError::SymbolCountOverflow {
                count: self.symbols.len(),
            });
        }
        Ok(())
    }

    /// Encodes this snapshot's fields into one frame body.
    ///
    /// `spec.md` describes the admin fields as separate messages; this
    /// batches them into a single length-prefixed frame instead, since
    /// every field is small and always sent together (see `DESIGN.md`).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_optional_num(&mut out, self.head.as_ref());
        encode_optional_num(&mut out, self.branch.as_ref());

        write_u32(&mut out, self.access.len() as u32);
        for id in &self.access {
            write_u16_prefixed(&mut out, id).expect("access entries are well within u16 bounds");
        }

        write_u32(&mut out, self.symbols.len() as u32);
        for (name, num) in &self.symbols {
            write_u16_prefixed(&mut out, name).expect("symbol names are well within u16 bounds");
            write_u16_prefixed(&mut out, num.as_bytes())
                .expect("revision numbers are well within u16 bounds");
        }

        write_u32(&mut out, self.locks.len() as u32);
        for (owner, num) in &self.locks {
            write_u16_prefixed(&mut out, owner).expect("lock owners are well within u16 bounds");
            write_u16_prefixed(&mut out, num.as_bytes())
                .expect("revision numbers are well within u16 bounds");
        }

        out.push(u8::from(self.strict));
        encode_optional_bytes(&mut out, self.comment.as_deref());
        encode_optional_bytes(&mut out, self.expand.as_deref());
        out
    }

    /// Decodes a snapshot previously produced by [`Self::encode`].
    pub fn decode(mut buf: &[u8]) -> Result<Self, ScanError> {
        let head = decode_optional_num(&mut buf)?;
        let branch = decode_optional_num(&mut buf)?;

        let (count, rest) = read_u32(buf)?;
        buf = rest;
        let mut access = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (id, rest) = read_u16_prefixed(buf)?;
            access.push(id.to_vec());
            buf = rest;
        }

        let (count, rest) = read_u32(buf)?;
        buf = rest;
        let mut symbols = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (name, rest) = read_u16_prefixed(buf)?;
            buf = rest;
            let (num, rest) = read_u16_prefixed(buf)?;
            buf = rest;
            symbols.push((name.to_vec(), RcsNum::parse(num)?));
        }

        let (count, rest) = read_u32(buf)?;
        buf = rest;
        let mut locks = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (owner, rest) = read_u16_prefixed(buf)?;
            buf = rest;
            let (num, rest) = read_u16_prefixed(buf)?;
            buf = rest;
            locks.push((owner.to_vec(), RcsNum::parse(num)?));
        }

        if buf.is_empty() {
            return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
                needed: 1,
                available: 0,
            }));
        }
        let strict = buf[0] != 0;
        buf = &buf[1..];

        let comment = decode_optional_bytes(&mut buf)?;
        let expand = decode_optional_bytes(&mut buf)?;

        Ok(Self {
            head,
            branch,
            access,
            symbols,
            locks,
            strict,
            comment,
            expand,
        })
    }

    /// Writes this snapshot as one length-prefixed frame.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ScanError> {
        write_frame(writer, &self.encode())
    }

    /// Reads one admin snapshot frame.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ScanError> {
        let body = read_frame(reader)?;
        Self::decode(&body)
    }
}

fn encode_optional_num(out: &mut Vec<u8>, num: Option<&RcsNum>) {
    match num {
        Some(num) => {
            out.push(1);
            write_u16_prefixed(out, num.as_bytes())
                .expect("revision numbers are well within u16 bounds");
        }
        None => out.push(0),
    }
}

fn decode_optional_num(buf: &mut &[u8]) -> Result<Option<RcsNum>, ScanError> {
    if buf.is_empty() {
        return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
            needed: 1,
            available: 0,
        }));
    }
    let present = buf[0] != 0;
    *buf = &buf[1..];
    if !present {
        return Ok(None);
    }
    let (bytes, rest) = read_u16_prefixed(buf)?;
    *buf = rest;
    Ok(Some(RcsNum::parse(bytes)?))
}

fn encode_optional_bytes(out: &mut Vec<u8>, bytes: Option<&[u8]>) {
    match bytes {
        Some(bytes) => {
            out.push(1);
            write_u16_prefixed(out, bytes).expect("comment/expand fields are well within u16 bounds");
        }
        None => out.push(0),
    }
}

fn decode_optional_bytes(buf: &mut &[u8]) -> Result<Option<Vec<u8>>, ScanError> {
    if buf.is_empty() {
        return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
            needed: 1,
            available: 0,
        }));
    }
    let present = buf[0] != 0;
    *buf = &buf[1..];
    if !present {
        return Ok(None);
    }
    let (bytes, rest) = read_u16_prefixed(buf)?;
    *buf = rest;
    Ok(Some(bytes.to_vec()))
}

/// One revision's digest, naming the revision by number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionDigest {
    /// The revision this digest covers.
    pub num: RcsNum,
    /// The digest bytes, `algorithm.digest_length()` long.
    pub hash: Vec<u8>,
}

impl RevisionDigest {
    fn encode_into(&self, out: &mut Vec<u8>) {
        write_u16_prefixed(out, self.num.as_bytes())
            .expect("revision numbers are well within u16 bounds");
        out.push(self.hash.len() as u8);
        out.extend_from_slice(&self.hash);
    }

    fn decode_from(buf: &[u8]) -> Result<(Self, &[u8]), ScanError> {
        let (num, rest) = read_u16_prefixed(buf)?;
        if rest.is_empty() {
            return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
                needed: 1,
                available: 0,
            }));
        }
        let hash_len = rest[0] as usize;
        let rest = &rest[1..];
        if rest.len() < hash_len {
            return Err(ScanError::Wire(cvsync_core::WireError::Truncated {
                needed: hash_len,
                available: rest.len(),
            }));
        }
        let (hash, rest) = rest.split_at(hash_len);
        Ok((
            Self {
                num: RcsNum::parse(num)?,
                hash: hash.to_vec(),
            },
            rest,
        ))
    }
}

/// Hashes a revision's delta metadata: `date || author || state? ||
/// branches || next?`, concatenated in that order (`spec.md` §4.4's "cheap
/// per-revision comparison" design note).
#[must_use]
pub fn delta_hash(algorithm: Algorithm, revision: &Revision<'_>) -> Vec<u8> {
    let mut digest = AnyDigest::new(algorithm);
    digest.update(revision.date.raw());
    digest.update(revision.author.as_bytes());
    if let Some(state) = &revision.state {
        digest.update(state.as_bytes());
    }
    for branch in &revision.branches {
        digest.update(branch.as_bytes());
    }
    if let Some(next) = &revision.next {
        digest.update(next.as_bytes());
    }
    digest.finalize()
}

/// Hashes a revision's deltatext: `log || text`. Requires the deltatext
/// phase to have populated both fields.
#[must_use]
pub fn deltatext_hash(algorithm: Algorithm, revision: &Revision<'_>) -> Vec<u8> {
    let mut digest = AnyDigest::new(algorithm);
    if let Some(log) = &revision.log {
        digest.update(&log.decode());
    }
    if let Some(text) = &revision.text {
        digest.update(&text.decode());
    }
    digest.finalize()
}

/// Computes one [`RevisionDigest`] per delta entry, in `file.delta`'s
/// existing order.
#[must_use]
pub fn collect_delta_digests(file: &RcsFile<'_>, algorithm: Algorithm) -> Vec<RevisionDigest> {
    file.delta
        .iter()
        .map(|revision| RevisionDigest {
            num: revision.num.clone(),
            hash: delta_hash(algorithm, revision),
        })
        .collect()
}

/// Computes one [`RevisionDigest`] per deltatext entry, in `file.delta`'s
/// existing order.
#[must_use]
pub fn collect_deltatext_digests(file: &RcsFile<'_>, algorithm: Algorithm) -> Vec<RevisionDigest> {
    file.delta
        .iter()
        .map(|revision| RevisionDigest {
            num: revision.num.clone(),
            hash: deltatext_hash(algorithm, revision),
        })
        .collect()
}

/// Writes a count-prefixed list of [`RevisionDigest`]s as one frame.
pub fn write_digest_list<W: Write>(writer: &mut W, digests: &[RevisionDigest]) -> Result<(), ScanError> {
    let mut out = Vec::new();
    write_u32(&mut out, digests.len() as u32);
    for digest in digests {
        digest.encode_into(&mut out);
    }
    write_frame(writer, &out)
}

/// Reads a count-prefixed list of [`RevisionDigest`]s from one frame.
pub fn read_digest_list<R: Read>(reader: &mut R) -> Result<Vec<RevisionDigest>, ScanError> {
    let body = read_frame(reader)?;
    let (count, mut rest) = read_u32(&body)?;
    let mut digests = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (digest, remainder) = RevisionDigest::decode_from(rest)?;
        digests.push(digest);
        rest = remainder;
    }
    Ok(digests)
}
