//! Protocol version negotiation, grounded in `examples/original_source/
//! cvsync/proto.c` and `cvsyncd/proto.c`'s `protocol_exchange`.
//!
//! Upstream's `protocol_compat_0_19`/`_20`/`_21` only apply the admission
//! decision (ACL allow/always/deny) for peer minor versions 20 and 21; a
//! peer offering minor >= 22 is accepted unconditionally by
//! `protocol_compat_0`, regardless of ACL status. That looks like the
//! historical compat shims growing ahead of the admission check rather than
//! a deliberate exemption, so this rewrite applies the admission decision
//! uniformly across every accepted minor version (see `DESIGN.md`).

use std::io::{Read, Write};

use crate::error::{ErrorReason, ProtocolError};
use crate::io::{read_message, write_message};

/// The sentinel major byte meaning "the minor byte is an [`ErrorReason`],
/// not a version component" (`CVSYNC_PROTO_ERROR`).
const ERROR_MAJOR: u8 = 0xff;

/// The protocol version this build speaks (`CVSYNC_PROTO_MAJOR`,
/// `CVSYNC_PROTO_MINOR`).
pub const CURRENT: ProtocolVersion = ProtocolVersion { major: 0, minor: 24 };

/// The oldest peer minor version this build still accepts.
pub const MIN_MINOR: u8 = 20;

/// A negotiated `(major, minor)` protocol version.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ProtocolVersion {
    /// Major version; only `0` is defined.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl ProtocolVersion {
    /// Compression is negotiable at all starting at minor 22
    /// (`compress_exchange`'s `proto < CVSYNC_PROTO(0, 22)` guard).
    #[must_use]
    pub const fn supports_compression_negotiation(self) -> bool {
        self.major == 0 && self.minor >= 22
    }

    /// The zlib MSS ceiling only applies once the negotiated minor is
    /// strictly greater than 22 (`channel_establish`'s
    /// `proto > CVSYNC_PROTO(0, 22)` guard) — minor 22 itself is forced to
    /// `CVSYNC_COMPRESS_NO` by [`Self::forces_no_compression`].
    #[must_use]
    pub const fn allows_zlib_mss(self) -> bool {
        self.major == 0 && self.minor > 22
    }

    /// Minor exactly 22 forces compression off regardless of what either
    /// side requested (`compress_exchange`'s
    /// `proto == CVSYNC_PROTO(0, 22)` special case).
    #[must_use]
    pub const fn forces_no_compression(self) -> bool {
        self.major == 0 && self.minor == 22
    }
}

fn encode(version: u8, minor: u8) -> [u8; 2] {
    [version, minor]
}

fn send_version<W: Write>(io: &mut W, major: u8, minor: u8) -> Result<(), ProtocolError> {
    write_message(io, &encode(major, minor))
}

fn recv_version<R: Read>(io: &mut R) -> Result<(u8, u8), ProtocolError> {
    let body = read_message(io)?;
    if body.len() != 2 {
        return Err(ProtocolError::Wire(cvsync_core::WireError::Truncated {
            needed: 2,
            available: body.len(),
        }));
    }
    Ok((body[0], body[1]))
}

/// Runs the client side of version negotiation: propose [`CURRENT`], accept
/// whatever minor the peer agrees to (never above our own), and send the
/// final acknowledgement.
pub fn negotiate_client<S: Read + Write>(io: &mut S) -> Result<ProtocolVersion, ProtocolError> {
    send_version(io, CURRENT.major, CURRENT.minor)?;
    let (peer_major, peer_minor) = recv_version(io)?;

    if peer_major == ERROR_MAJOR {
        let reason = ErrorReason::from_wire(peer_minor);
        send_version(io, ERROR_MAJOR, ErrorReason::Unspec.to_wire())?;
        return Err(ProtocolError::Refused(reason));
    }
    if peer_major != CURRENT.major {
        send_version(io, ERROR_MAJOR, ErrorReason::Unspec.to_wire())?;
        return Err(ProtocolError::UnsupportedMajor(peer_major));
    }
    if peer_minor < MIN_MINOR {
        send_version(io, ERROR_MAJOR, ErrorReason::Unspec.to_wire())?;
        return Err(ProtocolError::MinorTooOld {
            peer: peer_minor,
            minimum: MIN_MINOR,
        });
    }

    let agreed_minor = peer_minor.min(CURRENT.minor);
    send_version(io, CURRENT.major, agreed_minor)?;
    Ok(ProtocolVersion {
        major: CURRENT.major,
        minor: agreed_minor,
    })
}

/// Runs the server side of version negotiation.
///
/// `admission` is the ACL decision already reached for this peer
/// (`spec.md` §4.5); `Err(reason)` refuses the session with that reason
/// instead of negotiating a version.
pub fn negotiate_server<S: Read + Write>(
    io: &mut S,
    admission: Result<(), ErrorReason>,
) -> Result<ProtocolVersion, ProtocolError> {
    let (peer_major, peer_minor) = recv_version(io)?;

    if peer_major != 0 {
        send_version(io, ERROR_MAJOR, ErrorReason::Unspec.to_wire())?;
        return Err(ProtocolError::UnsupportedMajor(peer_major));
    }
    if peer_minor < MIN_MINOR {
        send_version(io, ERROR_MAJOR, ErrorReason::Unspec.to_wire())?;
        return Err(ProtocolError::MinorTooOld {
            peer: peer_minor,
            minimum: MIN_MINOR,
        });
    }
    if let Err(reason) = admission {
        send_version(io, ERROR_MAJOR, reason.to_wire())?;
        return Err(ProtocolError::Refused(reason));
    }

    let agreed_minor = peer_minor.min(CURRENT.minor);
    send_version(io, CURRENT.major, agreed_minor)?;

    let (ack_major, ack_minor) = recv_version(io)?;
    if ack_major != CURRENT.major || ack_minor != agreed_minor {
        return Err(ProtocolError::AckMismatch);
    }

    Ok(ProtocolVersion {
        major: CURRENT.major,
        minor: agreed_minor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A `Read + Write` pair backed by two independent byte buffers, so a
    /// single-threaded test can drive both sides of a handshake in lockstep.
    struct Pipe {
        inbound: Cursor<Vec<u8>>,
        outbound: Vec<u8>,
    }

    impl Read for Pipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inbound.read(buf)
        }
    }
    impl Write for Pipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.outbound.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn negotiates_down_to_peer_minor() {
        let mut server_inbox = Vec::new();
        write_message(&mut server_inbox, &encode(0, 21)).unwrap();
        // Pre-seed the server's final ack (peer's minor==21 agreed value).
        write_message(&mut server_inbox, &encode(0, 21)).unwrap();

        let mut server_io = Pipe {
            inbound: Cursor::new(server_inbox),
            outbound: Vec::new(),
        };
        let agreed = negotiate_server(&mut server_io, Ok(())).unwrap();
        assert_eq!(agreed, ProtocolVersion { major: 0, minor: 21 });
    }

    #[test]
    fn rejects_minor_below_minimum() {
        let mut inbox = Vec::new();
        write_message(&mut inbox, &encode(0, 5)).unwrap();
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let err = negotiate_server(&mut io, Ok(())).unwrap_err();
        assert!(matches!(err, ProtocolError::MinorTooOld { .. }));
    }

    #[test]
    fn denied_admission_sends_reason() {
        let mut inbox = Vec::new();
        write_message(&mut inbox, &encode(0, 24)).unwrap();
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let err = negotiate_server(&mut io, Err(ErrorReason::Limited)).unwrap_err();
        assert!(matches!(err, ProtocolError::Refused(ErrorReason::Limited)));
    }

    #[test]
    fn client_rejects_error_response() {
        let mut inbox = Vec::new();
        write_message(&mut inbox, &encode(ERROR_MAJOR, ErrorReason::Denied.to_wire())).unwrap();
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let err = negotiate_client(&mut io).unwrap_err();
        assert!(matches!(err, ProtocolError::Refused(ErrorReason::Denied)));
    }
}
