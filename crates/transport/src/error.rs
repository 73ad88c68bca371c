//! Errors surfaced by the mux channel.

use std::io;

use thiserror::Error;

/// Failure in the mux channel, fatal to the whole session.
///
/// Per `spec.md` §7, every transport error, protocol violation, or state
/// violation observed by either the sender path or the receiver thread is
/// treated as fatal: the buffer moves to [`crate::buf::BufState::Error`],
/// both condition variables are broadcast, and the socket is shut down.
#[derive(Debug, Error)]
pub enum MuxError {
    /// The underlying socket returned an I/O error.
    #[error("mux socket error: {0}")]
    Io(#[from] io::Error),
    /// A DATA frame's length was zero or exceeded the negotiated MSS.
    #[error("invalid data frame length {0}")]
    InvalidLength(u32),
    /// A frame named a channel number outside `0..N_CH`.
    #[error("invalid mux channel {0}")]
    InvalidChannel(u8),
    /// An opcode byte did not match DATA/RESET/CLOSE.
    #[error("invalid mux opcode {0:#04x}")]
    InvalidOpcode(u8),
    /// A RESET frame's credit exceeded the outstanding unacknowledged bytes.
    #[error("reset credit {credit} exceeds outstanding {outstanding} on channel {channel}")]
    CreditOverflow {
        /// The channel the RESET was for.
        channel: u8,
        /// The credit value carried by the frame.
        credit: u32,
        /// The outstanding unacknowledged byte count before applying it.
        outstanding: u32,
    },
    /// A RESET credit arrived for a channel whose outbound buffer is
    /// already closed. `spec.md`'s open questions leave this behavior
    /// unspecified in the source; this workspace treats it as an error.
    #[error("reset credit arrived on closed outbound channel {0}")]
    ResetAfterClose(u8),
    /// A send or receive was attempted after the mux entered the ERROR
    /// state (locally or via a peer-observed failure).
    #[error("mux is in the error state")]
    Aborted,
    /// A send or receive was attempted on a buffer already CLOSED in that
    /// direction.
    #[error("mux channel {0} is closed")]
    Closed(u8),
    /// The compression layer failed to encode or decode a frame.
    #[error("mux frame compression error: {0}")]
    Compress(#[from] cvsync_compress::CompressError),
}
