//! Fixed big-endian encoders/decoders used by every framed message.
//!
//! Every multi-byte field on the wire — mux frame lengths, scan/compare
//! attribute blobs, protocol exchange records — is big-endian. This module
//! centralizes the handful of read/write helpers so no crate hand-rolls its
//! own byte order.

use crate::error::WireError;

/// Reads a big-endian `u16` from the front of `buf`.
pub fn read_u16(buf: &[u8]) -> Result<(u16, &[u8]), WireError> {
    if buf.len() < 2 {
        return Err(WireError::Truncated {
            needed: 2,
            available: buf.len(),
        });
    }
    let (head, rest) = buf.split_at(2);
    Ok((u16::from_be_bytes([head[0], head[1]]), rest))
}

/// Reads a big-endian `u32` from the front of `buf`.
pub fn read_u32(buf: &[u8]) -> Result<(u32, &[u8]), WireError> {
    if buf.len() < 4 {
        return Err(WireError::Truncated {
            needed: 4,
            available: buf.len(),
        });
    }
    let (head, rest) = buf.split_at(4);
    let array: [u8; 4] = head.try_into().expect("split_at(4) yields 4 bytes");
    Ok((u32::from_be_bytes(array), rest))
}

/// Reads a big-endian `u64` from the front of `buf`.
pub fn read_u64(buf: &[u8]) -> Result<(u64, &[u8]), WireError> {
    if buf.len() < 8 {
        return Err(WireError::Truncated {
            needed: 8,
            available: buf.len(),
        });
    }
    let (head, rest) = buf.split_at(8);
    let array: [u8; 8] = head.try_into().expect("split_at(8) yields 8 bytes");
    Ok((u64::from_be_bytes(array), rest))
}

/// Reads a big-endian `i64` from the front of `buf`.
pub fn read_i64(buf: &[u8]) -> Result<(i64, &[u8]), WireError> {
    let (value, rest) = read_u64(buf)?;
    Ok((value as i64, rest))
}

/// Reads a length-prefixed (1-byte length) byte string.
pub fn read_u8_prefixed(buf: &[u8]) -> Result<(&[u8], &[u8]), WireError> {
    let (len, rest) = if buf.is_empty() {
        return Err(WireError::Truncated {
            needed: 1,
            available: 0,
        });
    } else {
        (buf[0] as usize, &buf[1..])
    };
    if rest.len() < len {
        return Err(WireError::Truncated {
            needed: len,
            available: rest.len(),
        });
    }
    Ok(rest.split_at(len))
}

/// Reads a length-prefixed (2-byte big-endian length) byte string.
pub fn read_u16_prefixed(buf: &[u8]) -> Result<(&[u8], &[u8]), WireError> {
    let (len, rest) = read_u16(buf)?;
    let len = len as usize;
    if rest.len() < len {
        return Err(WireError::Truncated {
            needed: len,
            available: rest.len(),
        });
    }
    Ok(rest.split_at(len))
}

/// Appends a big-endian `u16` to `out`.
pub fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Appends a big-endian `u32` to `out`.
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Appends a big-endian `u64` to `out`.
pub fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Appends a big-endian `i64` to `out`.
pub fn write_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Appends a 1-byte length prefix followed by `bytes`.
///
/// Returns a [`WireError::TooLong`] rather than truncating silently.
pub fn write_u8_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), WireError> {
    if bytes.len() > u8::MAX as usize {
        return Err(WireError::TooLong {
            length: bytes.len(),
            maximum: u8::MAX as usize,
        });
    }
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    Ok(())
}

/// Appends a 2-byte big-endian length prefix followed by `bytes`.
pub fn write_u16_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), WireError> {
    if bytes.len() > u16::MAX as usize {
        return Err(WireError::TooLong {
            length: bytes.len(),
            maximum: u16::MAX as usize,
        });
    }
    write_u16(out, bytes.len() as u16);
    out.extend_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_u16_prefixed() {
        let mut buf = Vec::new();
        write_u16_prefixed(&mut buf, b"hello").unwrap();
        let (value, rest) = read_u16_prefixed(&buf).unwrap();
        assert_eq!(value, b"hello");
        assert!(rest.is_empty());
    }

    #[test]
    fn truncated_u32_errors() {
        assert!(matches!(
            read_u32(&[0, 1]),
            Err(WireError::Truncated {
                needed: 4,
                available: 2
            })
        ));
    }
}
