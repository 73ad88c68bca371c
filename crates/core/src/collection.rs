//! The `Collection` configuration record.
//!
//! A collection is a named tree of files served by a server (or requested by
//! a client) under a single prefix and release type. Collections are
//! reference-counted: a config reload swaps the live configuration, but a
//! session already admitted under an older collection keeps that reference
//! alive until it finishes (`Arc<Collection>` at the call sites that hold
//! one across a session's lifetime).

use std::sync::Arc;

use crate::pathname::Pathname;

/// Bitmask a collection's `umask` is restricted to (`CVSYNC_ALLPERMS`).
pub const ALL_PERMS: u16 = 0o7777;

/// The kind of collection: an enumeration of other collections, or a tree
/// of RCS files.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Release {
    /// A `list` release: enumerates the collections a server offers.
    List,
    /// An `rcs` release: a tree of RCS `,v` files.
    Rcs,
}

impl Release {
    /// The wire name exchanged during the collection-list phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Release::List => "list",
            Release::Rcs => "rcs",
        }
    }

    /// Parses the wire name, returning `None` for anything else.
    #[must_use]
    pub fn parse(name: &[u8]) -> Option<Self> {
        match name {
            b"list" => Some(Release::List),
            b"rcs" => Some(Release::Rcs),
            _ => None,
        }
    }
}

/// How a session handles irrecoverable per-entry errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorMode {
    /// Abort the whole session on the first unrecoverable entry error.
    Abort,
    /// Log the entry and continue with the rest of the collection.
    Fixup,
}

/// A named, reference-counted collection configuration.
///
/// `Collection`s are created at config load time and never mutated in
/// place; a config reload constructs a new set and swaps it in, while
/// sessions already in flight keep their `Arc<Collection>` alive.
#[derive(Clone, Debug)]
pub struct Collection {
    /// The collection's name, as requested/advertised on the wire.
    pub name: Vec<u8>,
    /// Enumeration or RCS-tree release type.
    pub release: Release,
    /// Local filesystem prefix this collection is rooted at.
    pub prefix: Pathname,
    /// Remote prefix advertised to clients for `rcs` collections.
    pub rprefix: Option<Pathname>,
    /// Permission bits newly created entries are restricted to.
    pub umask: u16,
    /// Per-entry error handling policy.
    pub errormode: ErrorMode,
    /// Whether to follow symbolic links while scanning.
    pub symfollow: bool,
    /// Optional path to a persisted scan cache (`scanfile`).
    pub scan_path: Option<Pathname>,
    /// Optional path to a distfile describing collection contents.
    pub dist_path: Option<Pathname>,
    /// A parent collection this one inherits prefix/scan/dist paths from.
    pub super_collection: Option<Arc<Collection>>,
}

impl Collection {
    /// Builds a collection, masking `umask` to [`ALL_PERMS`] as the data
    /// model requires.
    #[must_use]
    pub fn new(name: Vec<u8>, release: Release, prefix: Pathname, umask: u16) -> Self {
        Self {
            name,
            release,
            prefix,
            rprefix: None,
            umask: umask & ALL_PERMS,
            errormode: ErrorMode::Abort,
            symfollow: false,
            scan_path: None,
            dist_path: None,
            super_collection: None,
        }
    }

    /// The effective prefix, resolving through a super-collection chain if
    /// present: a sub-collection's prefix is relative to its parent's.
    #[must_use]
    pub fn effective_prefix(&self) -> Pathname {
        match &self.super_collection {
            Some(parent) => parent
                .effective_prefix()
                .join(self.prefix.as_bytes())
                .unwrap_or_else(|_| self.prefix.clone()),
            None => self.prefix.clone(),
        }
    }
}
