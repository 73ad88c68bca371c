#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! ACL evaluation for the daemon's accept path: compiling an ACL file's
//! `(verb, pattern)` lines, matching a connecting peer against them in
//! order, and enforcing the per-rule and global connection caps.
//! Grounded in `examples/original_source/cvsyncd/access.c`.
//!
//! # Design
//!
//! [`parse::parse`] compiles ACL text into [`rule::AclRule`]s.
//! [`evaluate::evaluate`] matches a [`evaluate::Peer`] against the
//! compiled list, returning a [`evaluate::Decision`].
//! [`tracker::ConnectionTracker`] tracks currently-admitted connections so
//! repeated calls to [`tracker::ConnectionTracker::admit`] enforce the
//! caps `spec.md` §4.5 describes.
//!
//! # Invariants
//!
//! - Evaluating the same peer against the same rule list always yields
//!   the same [`evaluate::Decision`] (`spec.md` §8 invariant 7);
//!   [`tracker::ConnectionTracker`] additionally guarantees that the same
//!   sequence of admits/releases always yields the same counts.
//! - `ALWAYS` rules bypass both the per-rule and the global cap.

mod address;
mod error;
mod evaluate;
mod parse;
mod rule;
mod tracker;

pub use address::AddressMatcher;
pub use error::AccessError;
pub use evaluate::{evaluate, Decision, Peer};
pub use parse::parse;
pub use rule::{AclRule, Verb};
pub use tracker::{ConnectionHandle, ConnectionTracker, Refusal};
