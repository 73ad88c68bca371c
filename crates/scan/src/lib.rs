//! The scan/compare command dialogue carried on mux sub-channel 0
//! (`spec.md` §4.4).
//!
//! # Overview
//!
//! Once the protocol layer hands a session's mux over, the client's scan
//! side and the server's compare side exchange a stream of framed
//! commands: `ADD`/`REMOVE`/`RCS_ATTIC`/`SETATTR`/`UPDATE`/`END` from the
//! scanner, mirrored by `ADD`/`REMOVE`/`SETATTR`/`UPDATE`/`UPDATE_RCS`/
//! `UPDATE_END` from the comparator. An `UPDATE` naming an RCS filetype may
//! escalate into the `UPDATE_RCS` sub-dialogue ([`update_rcs`]), which ships
//! admin fields and per-revision digests rather than file content; actual
//! bytes (new files, new revisions) travel on sub-channel 1 as
//! [`content::ContentPayload`].
//!
//! Grounded in `examples/original_source/common/filescan_rcs.c`
//! (scanner) and `examples/original_source/cvsyncd/proto.c`'s
//! `filecmp_rcs` family (comparator). The directory walk that produces the
//! scanner's first record is out of scope (`spec.md` §1); this crate picks
//! up once an [`EntryRecord`] already exists, and [`compare::LocalLookup`]
//! is the seam the daemon's own filesystem walker plugs into.
//!
//! # Design
//!
//! - [`opcode`] — the two mirrored opcode sets.
//! - [`record`] — `EntryRecord` (filetype + name + optional attributes)
//!   and the length-prefixed command frame shared by both directions.
//! - [`attic`] — inserting/removing the `Attic/` path segment.
//! - [`update_rcs`] — the admin/delta/deltatext digest sub-dialogue.
//! - [`content`] — what travels on the content sub-channel.
//! - [`compare`] — the comparator's reconciliation logic.
//!
//! # Invariants
//!
//! - `ADD`/`REMOVE` carry no attribute blob; `SETATTR`/`UPDATE`/`RCS_ATTIC`
//!   always do (`filescan_rcs_fetch`'s per-tag length check).
//! - An `UPDATE_RCS` exchange always ends with `UPDATE_END`, whether or
//!   not any revision actually differed.
//!
//! # Errors
//!
//! [`error::ScanError`] covers both wire malformation and the handful of
//! path/attribute invariant violations this crate itself can detect.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod attic;
pub mod command;
pub mod compare;
pub mod content;
pub mod error;
pub mod frame;
pub mod opcode;
pub mod record;
pub mod update_rcs;

pub use command::{CompareCommand, ScanCommand};
pub use compare::{LocalEntry, LocalLookup};
pub use content::{ContentPayload, RevisionBody};
pub use error::ScanError;
pub use opcode::{CompareOpcode, ScanOpcode};
pub use record::EntryRecord;
pub use update_rcs::{AdminSnapshot, RevisionDigest};
