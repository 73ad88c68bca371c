//! Channel setup, grounded in `channel_establish`
//! (`examples/original_source/cvsyncd/proto.c`, `cvsync/proto.c`).
//!
//! For each of [`N_CH`] sub-channels, one side sends the receive-buffer
//! parameters it wants the *other* side to send into, and the other side
//! echoes its own. The four bytes after the channel id are the only place
//! in this exchange that names a concrete mss/bufsize; `MUX_DEFAULT_MSS`
//! itself is not present in the filtered original source (only
//! `MUX_MAX_MSS`/`MUX_MAX_MSS_ZLIB` survive in the retrieval pack), so the
//! 4096-byte default below is this rewrite's own choice — see `DESIGN.md`.

use std::io::{Read, Write};

use cvsync_core::wire::{read_u16, read_u32, write_u16, write_u32};
use cvsync_transport::{ChannelConfig, N_CH, MUX_MAX_MSS_ZLIB};

use crate::error::ProtocolError;
use crate::io::{read_message, write_message};
use crate::version::ProtocolVersion;
use cvsync_compress::Codec;

/// Default maximum segment size offered when zlib's larger ceiling does
/// not apply.
pub const MUX_DEFAULT_MSS: u32 = 4096;

/// Default ring-buffer capacity offered for each channel.
pub const MUX_DEFAULT_BUFSIZE: u32 = 65_536;

/// The mss this side should advertise for its own receive buffers, per
/// `channel_establish`'s `(proto > (0,22)) && compression != NO` rule.
#[must_use]
pub fn local_mss(proto: ProtocolVersion, codec: Codec) -> u32 {
    if proto.allows_zlib_mss() && codec != Codec::None {
        MUX_MAX_MSS_ZLIB
    } else {
        MUX_DEFAULT_MSS
    }
}

fn encode_record(channel: u8, config: ChannelConfig) -> Vec<u8> {
    let mut out = Vec::with_capacity(7);
    out.push(channel);
    write_u16(&mut out, config.mss as u16);
    write_u32(&mut out, config.bufsize as u32);
    out
}

fn decode_record(body: &[u8], expected_channel: u8) -> Result<ChannelConfig, ProtocolError> {
    if body.len() != 7 {
        return Err(ProtocolError::Wire(cvsync_core::WireError::Truncated {
            needed: 7,
            available: body.len(),
        }));
    }
    let channel = body[0];
    if channel != expected_channel {
        return Err(ProtocolError::UnexpectedChannel(channel, N_CH));
    }
    let (mss, rest) = read_u16(&body[1..]).map_err(ProtocolError::Wire)?;
    let (bufsize, _) = read_u32(rest).map_err(ProtocolError::Wire)?;
    Ok(ChannelConfig {
        mss: mss as usize,
        bufsize: bufsize as usize,
    })
}

/// One side's view of the negotiated per-channel configuration, ready to
/// pass to [`cvsync_transport::Mux::spawn`].
pub struct Channels {
    /// Parameters for buffers this side reads *into* (what the peer
    /// should send).
    pub in_channels: [ChannelConfig; N_CH],
    /// Parameters the peer asked this side to send into (what the peer
    /// reads into).
    pub out_channels: [ChannelConfig; N_CH],
}

/// Client side: sends this side's receive-buffer parameters for every
/// channel, then reads back the peer's.
pub fn establish_client<S: Read + Write>(
    io: &mut S,
    local_mss: u32,
) -> Result<Channels, ProtocolError> {
    let mut in_channels = [ChannelConfig { mss: 0, bufsize: 0 }; N_CH];
    let mut out_channels = [ChannelConfig { mss: 0, bufsize: 0 }; N_CH];

    for i in 0..N_CH {
        let offer = ChannelConfig {
            mss: local_mss as usize,
            bufsize: MUX_DEFAULT_BUFSIZE as usize,
        };
        write_message(io, &encode_record(i as u8, offer))?;
        out_channels[i] = offer;

        let body = read_message(io)?;
        in_channels[i] = decode_record(&body, i as u8)?;
    }

    Ok(Channels {
        in_channels,
        out_channels,
    })
}

/// Server side: for each channel, reads the client's receive-buffer
/// parameters (this becomes the server's outbound ring for that channel)
/// and echoes the server's own.
pub fn establish_server<S: Read + Write>(
    io: &mut S,
    local_mss: u32,
) -> Result<Channels, ProtocolError> {
    let mut in_channels = [ChannelConfig { mss: 0, bufsize: 0 }; N_CH];
    let mut out_channels = [ChannelConfig { mss: 0, bufsize: 0 }; N_CH];

    for i in 0..N_CH {
        let body = read_message(io)?;
        out_channels[i] = decode_record(&body, i as u8)?;

        let offer = ChannelConfig {
            mss: local_mss as usize,
            bufsize: MUX_DEFAULT_BUFSIZE as usize,
        };
        write_message(io, &encode_record(i as u8, offer))?;
        in_channels[i] = offer;
    }

    Ok(Channels {
        in_channels,
        out_channels,
    })
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
    fn server_echoes_its_own_parameters_per_channel() {
        let mut inbox = Vec::new();
        for i in 0..N_CH {
            write_message(
                &mut inbox,
                &encode_record(
                    i as u8,
                    ChannelConfig {
                        mss: 4096,
                        bufsize: 65_536,
                    },
                ),
            )
            .unwrap();
        }
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let channels = establish_server(&mut io, MUX_DEFAULT_MSS).unwrap();
        assert_eq!(channels.out_channels[0].mss, 4096);
        assert_eq!(channels.in_channels[0].mss, MUX_DEFAULT_MSS as usize);
    }

    #[test]
    fn mismatched_channel_id_is_rejected() {
        let mut inbox = Vec::new();
        write_message(
            &mut inbox,
            &encode_record(
                1,
                ChannelConfig {
                    mss: 4096,
                    bufsize: 65_536,
                },
            ),
        )
        .unwrap();
        let mut io = Pipe {
            inbound: Cursor::new(inbox),
            outbound: Vec::new(),
        };
        let err = establish_server(&mut io, MUX_DEFAULT_MSS).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedChannel(1, _)));
    }

    #[test]
    fn zlib_mss_applies_only_above_minor_22_with_compression() {
        let proto = ProtocolVersion { major: 0, minor: 24 };
        assert_eq!(local_mss(proto, Codec::Zlib), MUX_MAX_MSS_ZLIB);
        assert_eq!(local_mss(proto, Codec::None), MUX_DEFAULT_MSS);

        let old = ProtocolVersion { major: 0, minor: 22 };
        assert_eq!(local_mss(old, Codec::Zlib), MUX_DEFAULT_MSS);
    }
}
