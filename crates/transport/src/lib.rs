//! Multiplexed, credit-windowed framing channel for cvsync.
//!
//! # Overview
//!
//! A cvsync session runs two logical channels (command and data) over one
//! TCP connection. This crate provides [`Mux`], the shared structure that
//! demultiplexes inbound frames on a dedicated receiver thread and
//! serializes outbound frames from however many caller threads call
//! [`Mux::send`].
//!
//! # Design
//!
//! Each sub-channel has an independent [`buf::MuxBuf`] ring buffer in each
//! direction. Flow control is credit-based: a sender may have at most
//! `capacity` bytes outstanding (sent but not yet credited back by a peer
//! `RESET`); a receiver periodically releases credit once it has drained at
//! least half its buffer. Optional zlib framing ([`cvsync_compress`]) wraps
//! each DATA segment's body; control frames (RESET/CLOSE) are never
//! compressed.
//!
//! # Invariants
//!
//! - A `MuxBuf`'s own mutex may be held while acquiring the mux's writer
//!   lock; the reverse ordering never happens.
//! - Every frame read error or protocol violation moves every buffer to the
//!   ERROR state and half-closes the transport.
//!
//! # Errors
//!
//! All fallible operations return [`error::MuxError`].
//!
//! # See also
//!
//! `spec.md` §3-4 (mux design) and
//! `examples/original_source/common/mux.c` (reference implementation).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod buf;
pub mod error;
pub mod frame;
pub mod mux;

pub use buf::{BufState, MuxBuf};
pub use error::MuxError;
pub use frame::{Frame, MUX_MAX_MSS, MUX_MAX_MSS_ZLIB, N_CH};
pub use mux::{ChannelConfig, ChannelStream, Mux};
