//! Length-prefixed message framing over the raw pre-mux socket.
//!
//! Every pre-mux exchange (`spec.md` §4.3) is a 2-byte big-endian length
//! followed by that many bytes — the same shape upstream cvsync's
//! `sock_recv`/`sock_send` helpers move around a `GetWord`/`SetWord` length
//! prefix for.

use std::io::{Read, Write};

use crate::error::ProtocolError;

/// The largest message body this layer accepts, matching upstream's
/// `CVSYNC_MAXCMDLEN` generously sized for the longest collection record.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Reads one length-prefixed message body.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 2];
    reader.read_exact(&mut len_buf)?;
    let len = u16::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        return Err(ProtocolError::Wire(cvsync_core::WireError::TooLong {
            length: len,
            maximum: MAX_MESSAGE_LEN,
        }));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(body)
}

/// Writes one length-prefixed message body.
pub fn write_message<W: Write>(writer: &mut W, body: &[u8]) -> Result<(), ProtocolError> {
    if body.len() > u16::MAX as usize {
        return Err(ProtocolError::Wire(cvsync_core::WireError::TooLong {
            length: body.len(),
            maximum: u16::MAX as usize,
        }));
    }
    writer.write_all(&(body.len() as u16).to_be_bytes())?;
    writer.write_all(body)?;
    Ok(())
}
