//! Serializes a parsed [`RcsFile`] back to `rcsfile(5)` bytes.
//!
//! Used by the round-trip property test (`spec.md` §8.1.4) and by the
//! `UPDATE_RCS` reconciliation path in `crates/scan` when the client needs
//! to materialize a reconstructed RCS file on disk. Output is canonically
//! formatted rather than byte-identical to arbitrary source whitespace;
//! string payloads are re-emitted from their already-escaped raw bytes, so
//! no re-escaping is needed for content that came from a parsed file.

use crate::file::{Admin, Revision, RcsFile};
use crate::num::RcsNum;
use crate::value::{RcsId, RcsStr};

fn push_string(out: &mut Vec<u8>, s: RcsStr<'_>) {
    out.push(b'@');
    out.extend_from_slice(s.raw());
    out.push(b'@');
}

fn push_id(out: &mut Vec<u8>, id: RcsId<'_>) {
    out.extend_from_slice(id.as_bytes());
}

fn push_num(out: &mut Vec<u8>, num: &RcsNum) {
    out.extend_from_slice(num.as_bytes());
}

fn write_admin(out: &mut Vec<u8>, admin: &Admin<'_>) {
    out.extend_from_slice(b"head\t");
    if let Some(head) = &admin.head {
        push_num(out, head);
    }
    out.extend_from_slice(b";\n");

    if let Some(branch) = &admin.branch {
        out.extend_from_slice(b"branch\t");
        push_num(out, branch);
        out.extend_from_slice(b";\n");
    }

    out.extend_from_slice(b"access");
    for id in &admin.access {
        out.push(b' ');
        push_id(out, *id);
    }
    out.extend_from_slice(b";\n");

    out.extend_from_slice(b"symbols");
    for symbol in &admin.symbols {
        out.push(b'\t');
        push_id(out, symbol.sym);
        out.push(b':');
        push_num(out, &symbol.num);
        out.push(b';');
    }
    out.push(b'\n');

    out.extend_from_slice(b"locks");
    for lock in &admin.locks {
        out.push(b'\t');
        push_id(out, lock.id);
        out.push(b':');
        push_num(out, &lock.num);
        out.push(b';');
    }
    out.push(b'\n');
    if admin.strict {
        out.extend_from_slice(b"strict;\n");
    }

    if let Some(comment) = admin.comment {
        out.extend_from_slice(b"comment\t");
        push_string(out, comment);
        out.extend_from_slice(b";\n");
    }
    if let Some(expand) = admin.expand {
        out.extend_from_slice(b"expand\t");
        push_string(out, expand);
        out.extend_from_slice(b";\n");
    }
    out.push(b'\n');
}

fn write_delta_header(out: &mut Vec<u8>, rev: &Revision<'_>) {
    push_num(out, &rev.num);
    out.extend_from_slice(b"\ndate\t");
    out.extend_from_slice(rev.date.raw());
    out.extend_from_slice(b";\tauthor\t");
    push_id(out, rev.author);
    out.extend_from_slice(b";\tstate");
    if let Some(state) = rev.state {
        out.push(b' ');
        push_id(out, state);
    }
    out.extend_from_slice(b";\nbranches");
    for branch in &rev.branches {
        out.push(b' ');
        push_num(out, branch);
    }
    out.extend_from_slice(b";\nnext\t");
    if let Some(next) = &rev.next {
        push_num(out, next);
    }
    out.extend_from_slice(b";\n\n");
}

fn write_deltatext(out: &mut Vec<u8>, rev: &Revision<'_>) {
    push_num(out, &rev.num);
    out.extend_from_slice(b"\nlog\n");
    if let Some(log) = rev.log {
        push_string(out, log);
    }
    out.extend_from_slice(b"\ntext\n");
    if let Some(text) = rev.text {
        push_string(out, text);
    }
    out.extend_from_slice(b"\n\n");
}

/// Serializes `file` to its canonical `rcsfile(5)` byte representation.
///
/// `delta` is expected to already be in the descending order
/// [`crate::parse::parse`] produces; this function does not re-sort.
#[must_use]
pub fn encode(file: &RcsFile<'_>) -> Vec<u8> {
    let mut out = Vec::new();
    write_admin(&mut out, &file.admin);
    for rev in &file.delta {
        write_delta_header(&mut out, rev);
    }
    out.extend_from_slice(b"desc\n");
    push_string(&mut out, file.desc);
    out.extend_from_slice(b"\n\n");
    for rev in &file.delta {
        write_deltatext(&mut out, rev);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    const SAMPLE: &[u8] = b"head\t1.2;\naccess;\nsymbols;\nlocks;\n\n1.2\ndate\t2024.01.02.03.04.05;\tauthor alice;\tstate Exp;\nbranches;\nnext\t1.1;\n\n1.1\ndate\t2024.01.01.00.00.00;\tauthor alice;\tstate Exp;\nbranches;\nnext\t;\n\ndesc\n@initial import@\n\n1.2\nlog\n@second@\ntext\n@body two@\n\n1.1\nlog\n@first@\ntext\n@body one@\n";

    #[test]
    fn round_trips_through_reparse() {
        let parsed = parse(SAMPLE).unwrap();
        let encoded = encode(&parsed);
        let reparsed = parse(&encoded).unwrap();

        assert_eq!(parsed.delta.len(), reparsed.delta.len());
        for (a, b) in parsed.delta.iter().zip(reparsed.delta.iter()) {
            assert_eq!(a.num, b.num);
            assert_eq!(a.author.as_bytes(), b.author.as_bytes());
            assert_eq!(a.next, b.next);
            assert_eq!(
                a.text.map(|t| t.decode().into_owned()),
                b.text.map(|t| t.decode().into_owned())
            );
            assert_eq!(
                a.log.map(|t| t.decode().into_owned()),
                b.log.map(|t| t.decode().into_owned())
            );
        }
        assert_eq!(
            parsed.desc.decode().into_owned(),
            reparsed.desc.decode().into_owned()
        );
    }
}
