//! The three wire frames that make up the mux protocol.
//!
//! Every outgoing byte on the socket belongs to one frame: `DATA` (opcode
//! `0x00`), `RESET` (`0x01`), or `CLOSE` (`0x02`), each prefixed by the
//! opcode and a 1-byte channel number. See `spec.md` §4.1.

use std::io::{self, Read};

use crate::error::MuxError;

/// Number of sub-channels a mux carries in each direction.
pub const N_CH: usize = 2;

/// Uncompressed maximum segment size.
pub const MUX_MAX_MSS: u32 = 16_384;

/// Maximum on-the-wire segment size once zlib framing is active.
pub const MUX_MAX_MSS_ZLIB: u32 = 65_535;

/// A decoded mux command frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Frame {
    /// `DATA`: `length` bytes of (possibly compressed) body follow.
    Data {
        /// Sub-channel this frame belongs to.
        channel: u8,
        /// Frame body.
        body: Vec<u8>,
    },
    /// `RESET`: credit the peer is releasing back to the sender.
    Reset {
        /// Sub-channel this frame belongs to.
        channel: u8,
        /// Bytes of credit being released.
        credit: u32,
    },
    /// `CLOSE`: the peer is done reading from this channel.
    Close {
        /// Sub-channel this frame belongs to.
        channel: u8,
    },
}

const OP_DATA: u8 = 0x00;
const OP_RESET: u8 = 0x01;
const OP_CLOSE: u8 = 0x02;

impl Frame {
    /// Validates a channel number against [`N_CH`].
    pub fn check_channel(channel: u8) -> Result<(), MuxError> {
        if (channel as usize) < N_CH {
            Ok(())
        } else {
            Err(MuxError::InvalidChannel(channel))
        }
    }

    /// Encodes the frame's header and (for DATA) its length prefix. The
    /// DATA body itself is written separately by the caller to avoid an
    /// extra copy.
    #[must_use]
    pub fn encode_header(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8);
        match self {
            Frame::Data { channel, body } => {
                out.push(OP_DATA);
                out.push(*channel);
                out.extend_from_slice(&(body.len() as u16).to_be_bytes());
            }
            Frame::Reset { channel, credit } => {
                out.push(OP_RESET);
                out.push(*channel);
                out.extend_from_slice(&credit.to_be_bytes());
            }
            Frame::Close { channel } => {
                out.push(OP_CLOSE);
                out.push(*channel);
            }
        }
        out
    }

    /// Encodes the complete frame, body included.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.encode_header();
        if let Frame::Data { body, .. } = self {
            out.extend_from_slice(body);
        }
        out
    }

    /// Reads one frame from `reader`. The DATA body length is the
    /// on-the-wire length, i.e. post-compression if compression is active;
    /// the caller decompresses afterwards.
    pub fn read(reader: &mut impl Read) -> io::Result<Self> {
        let mut head = [0u8; 2];
        reader.read_exact(&mut head)?;
        let (opcode, channel) = (head[0], head[1]);
        match opcode {
            OP_DATA => {
                let mut len_buf = [0u8; 2];
                reader.read_exact(&mut len_buf)?;
                let len = u16::from_be_bytes(len_buf) as usize;
                let mut body = vec![0u8; len];
                reader.read_exact(&mut body)?;
                Ok(Frame::Data { channel, body })
            }
            OP_RESET => {
                let mut credit_buf = [0u8; 4];
                reader.read_exact(&mut credit_buf)?;
                Ok(Frame::Reset {
                    channel,
                    credit: u32::from_be_bytes(credit_buf),
                })
            }
            OP_CLOSE => Ok(Frame::Close { channel }),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown mux opcode {other:#04x}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frame_encodes_opcode_channel_length() {
        let frame = Frame::Data {
            channel: 1,
            body: vec![1, 2, 3],
        };
        let encoded = frame.encode();
        assert_eq!(encoded, vec![OP_DATA, 1, 0, 3, 1, 2, 3]);
    }

    #[test]
    fn reset_frame_encodes_credit() {
        let frame = Frame::Reset {
            channel: 0,
            credit: 4096,
        };
        assert_eq!(frame.encode(), vec![OP_RESET, 0, 0, 0, 0x10, 0x00]);
    }

    #[test]
    fn close_frame_has_no_payload() {
        let frame = Frame::Close { channel: 1 };
        assert_eq!(frame.encode(), vec![OP_CLOSE, 1]);
    }

    #[test]
    fn data_frame_round_trips_through_read() {
        let frame = Frame::Data {
            channel: 1,
            body: vec![9, 8, 7],
        };
        let encoded = frame.encode();
        let decoded = Frame::read(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn channel_bounds_are_checked() {
        assert!(Frame::check_channel(0).is_ok());
        assert!(Frame::check_channel(1).is_ok());
        assert!(matches!(
            Frame::check_channel(2),
            Err(MuxError::InvalidChannel(2))
        ));
    }
}
