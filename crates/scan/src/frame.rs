//! Length-prefixed command framing for sub-channel 0.
//!
//! Every scan/compare command begins with a 2-byte big-endian length of
//! the remainder (`spec.md` §4.4), exactly like the pre-mux exchanges in
//! `cvsync_protocol::io`, but over the mux's own sub-channel 0 stream
//! rather than the raw socket.

use std::io::{Read, Write};

use crate::error::ScanError;

/// The largest command body this crate accepts. The wire length prefix is
/// itself only 2 bytes, so this is simply `u16::MAX`; declared separately
/// so callers have a named ceiling to check against.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Reads one length-prefixed command body.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, ScanError> {
    let mut len_buf = [0u8; 2];
    reader.read_exact(&mut len_buf)?;
    let len = u16::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ScanError::FrameTooLong {
            length: len,
            maximum: MAX_FRAME_LEN,
        });
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(body)
}

/// Writes one length-prefixed command body.
pub fn write_frame<W: Write>(writer: &mut W, body: &[u8]) -> Result<(), ScanError> {
    if body.len() > u16::MAX as usize {
        return Err(ScanError::FrameTooLong {
            length: body.len(),
            maximum: u16::MAX as usize,
        });
    }
    writer.write_all(&(body.len() as u16).to_be_bytes())?;
    writer.write_all(body)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_body() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").unwrap();
        let mut cursor = Cursor::new(buf);
        let body = read_frame(&mut cursor).unwrap();
        assert_eq!(body, b"hello");
    }

    #[test]
    fn oversize_body_is_rejected_on_write() {
        let mut buf = Vec::new();
        let body = vec![0u8; MAX_FRAME_LEN + 1];
        assert!(matches!(
            write_frame(&mut buf, &body),
            Err(ScanError::FrameTooLong { .. })
        ));
    }
}
