//! Zero-copy parser and revision-graph model for RCS `,v` files.
//!
//! Every string and identifier borrowed out of an [`RcsFile`] lives for as
//! long as the input buffer (intended to be a memory-mapped `,v` file); the
//! only owned allocation on the common path is [`num::RcsNum`]'s decoded
//! component vector, which every comparison and lookup needs.
//!
//! Grounded in `examples/original_source/common/rcslib.c` and
//! `rcslib.h`; deviations from that source are called out on the
//! functions that make them and recorded in `DESIGN.md`.

#![deny(unsafe_code)]
#![deny(missing_docs)]

pub mod date;
pub mod error;
pub mod file;
pub mod lex;
pub mod lookup;
pub mod num;
pub mod parse;
pub mod value;
pub mod write;

pub use date::RcsDate;
pub use error::ParseError;
pub use file::{Admin, Lock, RcsFile, Revision, Symbol};
pub use lookup::{lookup_revision, lookup_symbol};
pub use num::{RcsNum, RCSNUM_MAX, RCSNUM_MAXLEVEL};
pub use parse::parse;
pub use value::{RcsId, RcsStr, RcsSym};
pub use write::encode;
