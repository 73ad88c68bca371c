//! Hash-algorithm negotiation, grounded in `hash_exchange` in both
//! `cvsync/proto.c` (client) and `cvsyncd/proto.c` (server).

use std::io::{Read, Write};

use cvsync_checksums::Algorithm;

use crate::error::ProtocolError;
use crate::io::{read_message, write_message};

fn send_name<W: Write>(io: &mut W, algorithm: Algorithm) -> Result<(), ProtocolError> {
    write_message(io, algorithm.as_str().as_bytes())
}

fn recv_name<R: Read>(io: &mut R) -> Result<String, ProtocolError> {
    let body = read_message(io)?;
    String::from_utf8(body).map_err(|_| ProtocolError::UnsupportedHash(String::new()))
}

/// Client side: proposes `preferred`, then accepts whatever the server
/// settles on.
pub fn negotiate_client<S: Read + Write>(
    io: &mut S,
    preferred: Algorithm,
) -> Result<Algorithm, ProtocolError> {
    send_name(io, preferred)?;
    let name = recv_name(io)?;
    Algorithm::parse(&name).map_err(|_| ProtocolError::UnsupportedHash(name))
}

/// Server side: receives the client's preference, downgrades to MD5 if
/// unsupported or if local policy disagrees, and replies with the final
/// choice. `allowed` names the single algorithm the server's configuration
/// accepts (mirrors `cf->cf_hash`); anything else downgrades to MD5.
pub fn negotiate_server<S: Read + Write>(
    io: &mut S,
    allowed: Algorithm,
) -> Result<Algorithm, ProtocolError> {
    let name = recv_name(io)?;
    let requested = Algorithm::parse(&name).unwrap_or(Algorithm::Md5);
    let chosen = if requested == allowed {
        requested
    } else {
        Algorithm::Md5
    };
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
    fn server_downgrades_mismatched_request_to_md5() {
        let mut inbox = Vec::new();
        write_message(&mut inbox, b"sha1").unwrap();
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let chosen = negotiate_server(&mut io, Algorithm::Md5).unwrap();
        assert_eq!(chosen, Algorithm::Md5);
    }

    #[test]
    fn server_honors_matching_request() {
        let mut inbox = Vec::new();
        write_message(&mut inbox, b"sha1").unwrap();
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let chosen = negotiate_server(&mut io, Algorithm::Sha1).unwrap();
        assert_eq!(chosen, Algorithm::Sha1);
    }

    #[test]
    fn client_accepts_server_choice() {
        let mut inbox = Vec::new();
        write_message(&mut inbox, b"md5").unwrap();
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let chosen = negotiate_client(&mut io, Algorithm::Sha1).unwrap();
        assert_eq!(chosen, Algorithm::Md5);
    }
}
