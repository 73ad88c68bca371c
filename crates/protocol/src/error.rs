//! Errors from the pre-mux negotiation phase, grounded in
//! `examples/original_source/cvsyncd/proto.c` and `cvsync/proto.c`'s
//! `protocol_exchange`/`hash_exchange`/`collectionlist_exchange`/
//! `channel_establish`/`compress_exchange` failure paths.

use thiserror::Error;

use cvsync_core::WireError;

/// The reason a peer gave (or was given) for refusing a session during
/// version negotiation (`spec.md` §4.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorReason {
    /// An ACL rule denied the peer outright.
    Denied,
    /// A per-rule or global connection cap was already saturated.
    Limited,
    /// The requested collection, hash algorithm, or other resource is not
    /// available.
    Unavail,
    /// No more specific reason applies.
    Unspec,
}

impl ErrorReason {
    /// Decodes the 1-byte wire reason code sent in place of a minor
    /// version when `major == CVSYNC_PROTO_ERROR`.
    #[must_use]
    pub const fn from_wire(code: u8) -> Self {
        match code {
            0 => ErrorReason::Denied,
            1 => ErrorReason::Limited,
            2 => ErrorReason::Unavail,
            _ => ErrorReason::Unspec,
        }
    }

    /// The wire reason code for this reason.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            ErrorReason::Denied => 0,
            ErrorReason::Limited => 1,
            ErrorReason::Unavail => 2,
            ErrorReason::Unspec => 3,
        }
    }
}

/// Failure negotiating a session before the mux takes over.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A wire field was truncated or otherwise malformed.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// An I/O error occurred on the underlying socket.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The peer's protocol major version was not `0`.
    #[error("unsupported protocol major version {0}")]
    UnsupportedMajor(u8),
    /// The peer's minor version fell below the minimum this build accepts.
    #[error("peer minor version {peer} is below the minimum accepted {minimum}")]
    MinorTooOld {
        /// The minor version the peer offered.
        peer: u8,
        /// The minimum minor version this build accepts.
        minimum: u8,
    },
    /// The peer refused the session with an explicit reason.
    #[error("peer refused session: {0:?}")]
    Refused(ErrorReason),
    /// The peer named a digest algorithm this build does not support, and
    /// did not fall back to MD5.
    #[error("peer offered unsupported hash algorithm {0:?}")]
    UnsupportedHash(String),
    /// A collection-list record's trailer did not match its declared
    /// release type.
    #[error("malformed collection record for release {release:?}")]
    MalformedCollectionRecord {
        /// The release type the record claimed.
        release: &'static str,
    },
    /// The collection-list exchange ended without the `(".", ".")`
    /// terminator record.
    #[error("collection list exchange did not terminate with the sentinel record")]
    MissingCollectionTerminator,
    /// A compression codec name neither side recognized.
    #[error("unsupported compression codec {0:?}")]
    UnsupportedCodec(String),
    /// The peer's final acknowledgement of a negotiated value did not echo
    /// what was just sent.
    #[error("peer's acknowledgement did not match the negotiated value")]
    AckMismatch,
    /// A channel-setup record named a channel index outside `N_CH`.
    #[error("channel setup record named channel {0}, expected {1}")]
    UnexpectedChannel(u8, usize),
}
