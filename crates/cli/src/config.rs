//! Client-side configuration: the resolved shape of a `cvsync` invocation,
//! built from `crates/cli::Args` rather than a declarative file, since
//! `SPEC_FULL.md` §10 only asks the client for `clap` flags (target host,
//! port, collection name, destination directory) — unlike `cvsyncd`, which
//! reads a `collection { ... }` block per served tree
//! ([`crate::config`]'s daemon-side counterpart lives in
//! `crates/daemon/src/config.rs`).
//!
//! Each requested collection mirrors into its own subdirectory of the
//! destination root, named after the collection (`examples/original_source/
//! cvsync/main.c`'s single `-d DESTDIR` flag, generalized here to cover more
//! than one collection per invocation).

use std::path::PathBuf;

use cvsync_checksums::Algorithm;
use cvsync_compress::Codec;
use cvsync_core::collection::{Release, ALL_PERMS};

use crate::error::CliError;

/// One collection this invocation asks the server to serve, plus where its
/// mirror lives on disk.
#[derive(Clone, Debug)]
pub struct CollectionTarget {
    /// The collection's name, as known to the server.
    pub name: Vec<u8>,
    /// The release type requested.
    pub release: Release,
    /// The umask this client asks the server to apply; ANDed server-side
    /// with the collection's own configured minimum (`SPEC_FULL.md` §13).
    pub requested_umask: u16,
    /// The local directory this collection's mirror lives under.
    pub destination: PathBuf,
    /// Where the last-synced catalog for this collection is persisted.
    pub catalog_path: PathBuf,
    /// An optional bootstrap manifest naming entries not yet checked out.
    pub manifest_path: Option<PathBuf>,
}

/// A fully resolved client configuration, built once from [`crate::Args`]
/// and then threaded through [`crate::session::run`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server hostname or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Collections requested, in the order given on the command line.
    pub collections: Vec<CollectionTarget>,
    /// Digest algorithm this client prefers during hash negotiation.
    pub hash_preference: Algorithm,
    /// Compression codec this client prefers during compression
    /// negotiation.
    pub compress_preference: Codec,
    /// An optional refuse-file override applied to every requested
    /// collection, rather than each collection supplying its own.
    pub refuse_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Builds a [`CollectionTarget`] for `name`, rooting its destination,
    /// catalog, and manifest paths under `destination_root`.
    pub fn target_for(
        name: &str,
        release: Release,
        requested_umask: u16,
        destination_root: &std::path::Path,
    ) -> Result<CollectionTarget, CliError> {
        if name.is_empty() {
            return Err(CliError::CollectionRefused {
                name: name.to_string(),
            });
        }
        let destination = destination_root.join(name);
        let catalog_path = destination_root.join(format!(".{name}.catalog"));
        let manifest_path = destination_root.join(format!(".{name}.manifest"));
        let manifest_path = manifest_path.exists().then_some(manifest_path);
        Ok(CollectionTarget {
            name: name.as_bytes().to_vec(),
            release,
            requested_umask: requested_umask & ALL_PERMS,
            destination,
            catalog_path,
            manifest_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_for_roots_paths_under_destination() {
        let root = std::path::Path::new("/srv/mirror");
        let target = ClientConfig::target_for("example", Release::Rcs, 0o022, root).unwrap();
        assert_eq!(target.destination, PathBuf::from("/srv/mirror/example"));
        assert_eq!(target.catalog_path, PathBuf::from("/srv/mirror/.example.catalog"));
        assert_eq!(target.requested_umask, 0o022);
    }

    #[test]
    fn empty_name_is_refused() {
        let root = std::path::Path::new("/srv/mirror");
        assert!(matches!(
            ClientConfig::target_for("", Release::Rcs, 0, root),
            Err(CliError::CollectionRefused { .. })
        ));
    }
}
