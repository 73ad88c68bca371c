#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cvsync_compress` wraps `flate2`'s raw `Compress`/`Decompress` streams
//! into the per-frame reset discipline the mux channel needs: each DATA
//! frame is an independent deflate stream terminated with `Z_FINISH`, and
//! both the compressor and decompressor are reset (not recreated) between
//! frames. This mirrors upstream cvsync's `mux_zlib.c`, which keeps a single
//! `z_stream` per direction for the lifetime of the mux and calls
//! `deflateReset`/`inflateReset` between segments rather than tearing the
//! stream down.
//!
//! # Design
//!
//! [`Codec`] names the two negotiable compression modes. [`FrameCompressor`]
//! and [`FrameDecompressor`] each own one `flate2` stream and expose a
//! `compress_frame`/`decompress_frame` method that performs one reset-then-run
//! cycle.
//!
//! # Invariants
//!
//! - A compressor/decompressor pair is reset after every frame; callers
//!   never need to construct a new stream mid-session.
//! - [`Codec::max_segment_size`] matches `spec.md`'s `MUX_MAX_MSS` (16,384,
//!   uncompressed) and `MUX_MAX_MSS_ZLIB` (65,535, on-the-wire) ceilings.
//!
//! # Errors
//!
//! [`CompressError`] wraps the underlying `flate2` status codes; any
//! non-`Ok`/`StreamEnd` result is treated as fatal to the mux, per
//! `spec.md`'s failure model.

use std::io;

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use thiserror::Error;

/// The compression mode negotiated for a mux session.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Codec {
    /// No compression; frames are carried verbatim.
    None,
    /// Per-frame zlib (DEFLATE) compression.
    Zlib,
}

impl Codec {
    /// The wire name exchanged during compression negotiation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Codec::None => "none",
            Codec::Zlib => "zlib",
        }
    }

    /// Parses a wire name, returning `None` for anything unrecognized.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Codec::None),
            "zlib" => Some(Codec::Zlib),
            _ => None,
        }
    }

    /// The maximum on-the-wire segment size for this codec:
    /// `MUX_MAX_MSS` (16,384) uncompressed, `MUX_MAX_MSS_ZLIB` (65,535)
    /// once zlib framing is in use.
    #[must_use]
    pub const fn max_segment_size(self) -> u32 {
        match self {
            Codec::None => 16_384,
            Codec::Zlib => 65_535,
        }
    }
}

/// Failure compressing or decompressing a mux frame.
#[derive(Debug, Error)]
pub enum CompressError {
    /// The underlying deflate/inflate stream reported a non-terminal error.
    #[error("compression stream error: {0}")]
    Stream(String),
    /// An I/O error occurred writing to an in-memory buffer (infallible in
    /// practice, surfaced for completeness).
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A per-direction DEFLATE stream reset between frames.
pub struct FrameCompressor {
    stream: Compress,
}

impl FrameCompressor {
    /// Creates a compressor at the default compression level, matching
    /// upstream cvsync's unconfigured `deflateInit`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stream: Compress::new(Compression::default(), false),
        }
    }

    /// Compresses `input` as one complete, `Z_FINISH`-terminated segment,
    /// resetting the stream first so no state leaks across frames.
    pub fn compress_frame(&mut self, input: &[u8]) -> Result<Vec<u8>, CompressError> {
        self.stream.reset();
        let mut out = Vec::with_capacity(input.len());
        let status = self
            .stream
            .compress_vec(input, &mut out, FlushCompress::Finish)
            .map_err(|e| CompressError::Stream(e.to_string()))?;
        match status {
            Status::StreamEnd | Status::Ok => Ok(out),
            Status::BufError => Err(CompressError::Stream("buffer error during compression".into())),
        }
    }
}

impl Default for FrameCompressor {
    fn default() -> Self {
        Self::new()
    }
}

/// A per-direction INFLATE stream reset between frames.
pub struct FrameDecompressor {
    stream: Decompress,
}

impl FrameDecompressor {
    /// Creates a decompressor ready for the first frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stream: Decompress::new(false),
        }
    }

    /// Decompresses one complete frame produced by
    /// [`FrameCompressor::compress_frame`], resetting the stream first.
    pub fn decompress_frame(&mut self, input: &[u8], expected_len: usize) -> Result<Vec<u8>, CompressError> {
        self.stream.reset(false);
        let mut out = Vec::with_capacity(expected_len);
        let status = self
            .stream
            .decompress_vec(input, &mut out, FlushDecompress::Finish)
            .map_err(|e| CompressError::Stream(e.to_string()))?;
        match status {
            Status::StreamEnd | Status::Ok => Ok(out),
            Status::BufError => Err(CompressError::Stream("buffer error during decompression".into())),
        }
    }
}

impl Default for FrameDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_deflate() {
        let mut compressor = FrameCompressor::new();
        let mut decompressor = FrameDecompressor::new();
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(8);

        for _ in 0..3 {
            let compressed = compressor.compress_frame(&payload).unwrap();
            let restored = decompressor
                .decompress_frame(&compressed, payload.len())
                .unwrap();
            assert_eq!(restored, payload);
        }
    }

    #[test]
    fn codec_names_round_trip() {
        assert_eq!(Codec::parse("zlib"), Some(Codec::Zlib));
        assert_eq!(Codec::parse("none"), Some(Codec::None));
        assert_eq!(Codec::parse("lzo"), None);
    }

    #[test]
    fn segment_ceilings_match_spec() {
        assert_eq!(Codec::None.max_segment_size(), 16_384);
        assert_eq!(Codec::Zlib.max_segment_size(), 65_535);
    }
}
