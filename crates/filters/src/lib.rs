#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Compiles a refuse file (`spec.md` §6: "one fnmatch pattern per line")
//! into a list of matchers the scan walker consults per entry. Grounded in
//! `examples/original_source/common/refuse.c`'s `refuse_open`/
//! `refuse_parse`/`refuse_access`.
//!
//! # Design
//!
//! [`Pattern`] wraps a single compiled `globset` glob configured to match
//! POSIX `fnmatch(pattern, name, 0)` semantics: wildcards cross `/`
//! boundaries, since the source never passes `FNM_PATHNAME`. [`RefuseList`]
//! holds the compiled patterns in file order and implements
//! `refuse_access`'s directory-prefix sub-match for directory entries.
//!
//! # Invariants
//!
//! - An empty or absent refuse list rejects nothing (`spec.md` §8 invariant
//!   8's base case).
//! - A pattern `p/q` additionally rejects a directory named exactly `p`.

mod error;
mod pattern;
mod refuse;

pub use error::FilterError;
pub use pattern::Pattern;
pub use refuse::RefuseList;
