#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cvsync_protocol` brings a freshly connected socket to the point where a
//! [`cvsync_transport::Mux`] can take over: version negotiation, hash
//! negotiation, the collection-list exchange, compression negotiation, and
//! channel setup. Grounded in `examples/original_source/cvsync/proto.c`
//! (client) and `examples/original_source/cvsyncd/proto.c` (server).
//!
//! # Design
//!
//! Every exchange in this crate follows the same shape: a blocking,
//! synchronous request/response over a length-prefixed message framing
//! ([`io::read_message`]/[`io::write_message`]), with a `negotiate_client`
//! and `negotiate_server` (or `exchange_client`/`exchange_server`)
//! function pair per concern. Callers run the five exchanges in order —
//! [`version`], [`hash`], [`collection`], [`compress`], [`channel`] — then
//! hand the resulting [`channel::Channels`] to
//! [`cvsync_transport::Mux::spawn`].
//!
//! # Invariants
//!
//! - Version negotiation always runs first; every later exchange assumes
//!   a [`version::ProtocolVersion`] has already been agreed.
//! - [`compress::negotiate_client`]/[`compress::negotiate_server`] return
//!   [`cvsync_compress::Codec::None`] without any wire exchange below
//!   protocol minor 22, and force it at exactly minor 22
//!   ([`version::ProtocolVersion::forces_no_compression`]).
//!
//! # Errors
//!
//! [`error::ProtocolError`] covers every failure mode in this crate: wire
//! truncation, version/hash/codec mismatches, and malformed collection
//! records.
//!
//! # See also
//!
//! `spec.md` §4.3 (Protocol layer) and §6 (External interfaces, default
//! port 7777).

pub mod channel;
pub mod collection;
pub mod compress;
pub mod error;
pub mod hash;
pub mod io;
pub mod version;

pub use channel::{establish_client, establish_server, Channels};
pub use collection::{exchange_client as collection_exchange_client, exchange_server as collection_exchange_server, CollectionGrant, CollectionRequest, ServerCollection};
pub use error::{ErrorReason, ProtocolError};
pub use version::{negotiate_client as version_negotiate_client, negotiate_server as version_negotiate_server, ProtocolVersion, CURRENT, MIN_MINOR};
