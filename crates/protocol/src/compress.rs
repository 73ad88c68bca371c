//! Compression negotiation, grounded in `compress_exchange`
//! (`cvsyncd/proto.c`; the client side in `cvsync/proto.c` mirrors it with
//! the send/recv order reversed is actually symmetric in upstream — both
//! ends run the same negotiation function against the socket).

use std::io::{Read, Write};

use cvsync_compress::Codec;

use crate::error::ProtocolError;
use crate::io::{read_message, write_message};
use crate::version::ProtocolVersion;

fn send_name<W: Write>(io: &mut W, codec: Codec) -> Result<(), ProtocolError> {
    write_message(io, codec.as_str().as_bytes())
}

fn recv_name<R: Read>(io: &mut R) -> Result<String, ProtocolError> {
    let body = read_message(io)?;
    String::from_utf8(body).map_err(|_| ProtocolError::UnsupportedCodec(String::new()))
}

/// Negotiates the compression codec for the about-to-be-created mux.
///
/// Below protocol minor 22 compression was never defined on the wire, so
/// this returns [`Codec::None`] without any exchange. At exactly minor 22
/// the exchange happens but the result is still forced to
/// [`Codec::None`] (`compress_exchange`'s `proto == CVSYNC_PROTO(0, 22)`
/// special case — apparently a transitional protocol revision).
pub fn negotiate_client<S: Read + Write>(
    io: &mut S,
    proto: ProtocolVersion,
    local_preference: Codec,
) -> Result<Codec, ProtocolError> {
    if !proto.supports_compression_negotiation() {
        return Ok(Codec::None);
    }

    send_name(io, local_preference)?;
    let name = recv_name(io)?;
    let chosen = Codec::parse(&name).ok_or(ProtocolError::UnsupportedCodec(name))?;
    Ok(chosen)
}

/// Server side: receives the client's preference, ANDs it with local
/// policy and the minor-22 special case, and replies with the final
/// choice.
pub fn negotiate_server<S: Read + Write>(
    io: &mut S,
    proto: ProtocolVersion,
    local_allows: bool,
) -> Result<Codec, ProtocolError> {
    if !proto.supports_compression_negotiation() {
        return Ok(Codec::None);
    }

    let name = recv_name(io)?;
    let mut chosen = Codec::parse(&name).ok_or(ProtocolError::UnsupportedCodec(name))?;
    if !local_allows {
        chosen = Codec::None;
    }
    if proto.forces_no_compression() {
        chosen = Codec::None;
    }

    send_name(io, chosen)?;
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

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
    fn below_minor_22_skips_negotiation_entirely() {
        let mut io = Pipe {
            inbound: Cursor::new(Vec::new()),
            outbound: Vec::new(),
        };
        let proto = ProtocolVersion { major: 0, minor: 21 };
        let codec = negotiate_client(&mut io, proto, Codec::Zlib).unwrap();
        assert_eq!(codec, Codec::None);
        assert!(io.outbound.is_empty());
    }

    #[test]
    fn minor_22_forces_no_compression_even_if_requested() {
        let mut inbox = Vec::new();
        write_message(&mut inbox, b"zlib").unwrap();
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let proto = ProtocolVersion { major: 0, minor: 22 };
        let codec = negotiate_server(&mut io, proto, true).unwrap();
        assert_eq!(codec, Codec::None);
    }

    #[test]
    fn local_policy_can_veto_zlib() {
        let mut inbox = Vec::new();
        write_message(&mut inbox, b"zlib").unwrap();
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let proto = ProtocolVersion { major: 0, minor: 24 };
        let codec = negotiate_server(&mut io, proto, false).unwrap();
        assert_eq!(codec, Codec::None);
    }
}
