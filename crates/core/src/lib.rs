#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cvsync_core` collects the data model shared by every other crate in the
//! workspace: pathname ordering, the wire-level `CvsyncAttr` attribute tuple,
//! the big-endian codec used by every framed message, and the `Collection`
//! configuration record that describes a served (or requested) RCS tree.
//!
//! # Design
//!
//! Nothing in this crate talks to a socket or the filesystem; it exists so
//! that [`transport`](../transport/index.html), [`protocol`](../protocol/index.html),
//! and [`scan`](../scan/index.html) agree on the same byte-level vocabulary
//! without depending on each other.
//!
//! # Invariants
//!
//! - [`Pathname`] orders `/` before every other byte, so a directory always
//!   sorts immediately before any of its children.
//! - [`CvsyncAttr`] encode/decode round-trips are exact: decoding the bytes
//!   produced by `encode` always yields the original value.
//! - [`Collection::umask`] is always masked to [`ALL_PERMS`] on construction.
//!
//! # Errors
//!
//! [`WireError`] reports malformed or truncated wire data. Higher layers
//! convert it into session-fatal protocol errors per the workspace's error
//! handling conventions.
//!
//! # Examples
//!
//! ```
//! use cvsync_core::Pathname;
//!
//! let mut names: Vec<Pathname> = ["foob", "foo/bar", "foo"]
//!     .iter()
//!     .map(|s| Pathname::new(s.as_bytes()).unwrap())
//!     .collect();
//! names.sort();
//! assert_eq!(
//!     names.iter().map(Pathname::as_bytes).collect::<Vec<_>>(),
//!     vec![b"foo".as_slice(), b"foo/bar".as_slice(), b"foob".as_slice()]
//! );
//! ```

pub mod attr;
pub mod collection;
pub mod error;
pub mod pathname;
pub mod wire;

pub use attr::{CvsyncAttr, FileType};
pub use collection::{Collection, ErrorMode, Release};
pub use error::WireError;
pub use pathname::{Pathname, PATH_MAX};
