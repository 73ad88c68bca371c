//! `Mux`: the multiplexed, credit-windowed framing channel.
//!
//! One `Mux` owns `N_CH` sub-channels in each direction over a single
//! socket. A dedicated receiver thread demultiplexes incoming frames onto
//! the per-channel inbound [`MuxBuf`]s; senders serialize onto the socket
//! under the mux's own lock, which per `spec.md`'s locking discipline is
//! always acquired *while already holding* the relevant buffer's lock, never
//! the reverse. Grounded in `examples/original_source/common/mux.c`.

use std::io::{Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use cvsync_compress::{Codec, FrameCompressor, FrameDecompressor};

use crate::buf::{BufState, Inner, MuxBuf};
use crate::error::MuxError;
use crate::frame::{Frame, N_CH};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Per-channel buffer parameters negotiated during channel setup
/// (`spec.md` §4.3).
#[derive(Clone, Copy, Debug)]
pub struct ChannelConfig {
    /// Negotiated maximum segment size for this channel.
    pub mss: usize,
    /// Ring buffer capacity for this channel.
    pub bufsize: usize,
}

struct Writer<W> {
    sink: W,
    compressor: Option<FrameCompressor>,
}

#[derive(Default)]
struct Shutdown {
    in_closed: [bool; N_CH],
    out_closed: [bool; N_CH],
}

/// The multiplexed framing channel shared by a receiver thread and however
/// many caller threads invoke [`Mux::send`]/[`Mux::recv`].
pub struct Mux<W> {
    writer: Mutex<Writer<W>>,
    in_bufs: [Arc<MuxBuf>; N_CH],
    out_bufs: [Arc<MuxBuf>; N_CH],
    shutdown: Mutex<Shutdown>,
    done_cond: Condvar,
    receiver: Mutex<Option<JoinHandle<()>>>,
    shutdown_socket: Box<dyn Fn() + Send + Sync>,
}

impl<W> Mux<W>
where
    W: Write + Send + 'static,
{
    /// Builds the mux and spawns its receiver thread over `reader`.
    ///
    /// `shutdown_socket` is called once, from [`Mux::abort`], to half-close
    /// the underlying transport so any thread blocked in a read also wakes
    /// up; callers typically pass a closure wrapping
    /// `TcpStream::shutdown(Shutdown::Both)` on a cloned handle.
    pub fn spawn<R>(
        reader: R,
        writer: W,
        in_channels: [ChannelConfig; N_CH],
        out_channels: [ChannelConfig; N_CH],
        codec: Codec,
        shutdown_socket: impl Fn() + Send + Sync + 'static,
    ) -> Arc<Self>
    where
        R: Read + Send + 'static,
    {
        let in_bufs = std::array::from_fn(|i| Arc::new(MuxBuf::new(in_channels[i].bufsize, in_channels[i].mss)));
        let out_bufs = std::array::from_fn(|i| Arc::new(MuxBuf::new(out_channels[i].bufsize, out_channels[i].mss)));
        let compressor = matches!(codec, Codec::Zlib).then(FrameCompressor::new);

        let mux = Arc::new(Self {
            writer: Mutex::new(Writer {
                sink: writer,
                compressor,
            }),
            in_bufs,
            out_bufs,
            shutdown: Mutex::new(Shutdown::default()),
            done_cond: Condvar::new(),
            receiver: Mutex::new(None),
            shutdown_socket: Box::new(shutdown_socket),
        });

        let receiver_mux = Arc::clone(&mux);
        let handle = std::thread::spawn(move || receiver_loop(receiver_mux, reader, codec));
        *mux.receiver.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
        mux
    }

    /// Sends `data` on `channel`, buffering into full segments and
    /// blocking on peer credit as needed.
    pub fn send(&self, channel: usize, data: &[u8]) -> Result<(), MuxError> {
        Frame::check_channel(channel as u8)?;
        let buf = &self.out_bufs[channel];
        let mut offset = 0;
        while offset < data.len() {
            let mut inner = buf.lock();
            check_running(&inner, channel)?;
            let mss = inner.mss;
            let room = mss.saturating_sub(inner.length);
            if room == 0 {
                inner = self.flush_locked(channel, inner)?;
                continue;
            }
            let take = room.min(data.len() - offset);
            inner.push(&data[offset..offset + take]);
            offset += take;
            if inner.length >= mss {
                self.flush_locked(channel, inner)?;
            }
        }
        Ok(())
    }

    /// Flushes any partially-filled segment on `channel` to the socket.
    pub fn flush(&self, channel: usize) -> Result<(), MuxError> {
        Frame::check_channel(channel as u8)?;
        let buf = &self.out_bufs[channel];
        let inner = buf.lock();
        if inner.length > 0 {
            self.flush_locked(channel, inner)?;
        }
        Ok(())
    }

    /// Flushes `inner.length` bytes as one DATA segment, waiting for peer
    /// credit first if the in-flight byte count would exceed capacity.
    /// Returns the (possibly re-acquired) guard so callers can keep using
    /// it without re-locking.
    fn flush_locked<'a>(
        &self,
        channel: usize,
        mut inner: MutexGuard<'a, Inner>,
    ) -> Result<MutexGuard<'a, Inner>, MuxError> {
        let buf = &self.out_bufs[channel];
        loop {
            check_running(&inner, channel)?;
            let capacity = inner.capacity();
            if inner.rlength + inner.length <= capacity {
                break;
            }
            inner = buf.in_cond.wait(inner).unwrap_or_else(|p| p.into_inner());
        }

        let len = inner.length;
        let mut segment = vec![0u8; len];
        inner.pop(&mut segment);
        inner.rlength += len;

        if len == 0 {
            return Ok(inner);
        }

        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        let wire_body = match writer.compressor.as_mut() {
            Some(compressor) => compressor.compress_frame(&segment)?,
            None => segment,
        };
        let frame = Frame::Data {
            channel: channel as u8,
            body: wire_body,
        };
        if let Err(err) = writer.sink.write_all(&frame.encode()) {
            drop(writer);
            self.abort();
            return Err(MuxError::Io(err));
        }
        drop(writer);
        #[cfg(feature = "tracing")]
        debug!(channel, len, "flushed mux segment");
        Ok(inner)
    }

    /// Receives up to `dst.len()` bytes from `channel`, blocking until at
    /// least one byte is available. Returns `Ok(0)` once the channel has
    /// been cleanly closed and fully drained.
    pub fn recv(&self, channel: usize, dst: &mut [u8]) -> Result<usize, MuxError> {
        Frame::check_channel(channel as u8)?;
        let buf = &self.in_bufs[channel];
        let mut inner = buf.lock();
        loop {
            if inner.state == BufState::Error {
                return Err(MuxError::Aborted);
            }
            if inner.length > 0 {
                break;
            }
            if inner.state == BufState::Closed {
                return Ok(0);
            }
            inner = buf.out_cond.wait(inner).unwrap_or_else(|p| p.into_inner());
        }

        let n = inner.pop(dst);
        inner.rlength += n;
        let capacity = inner.capacity();
        let credit = if inner.rlength * 2 >= capacity {
            let credit = inner.rlength as u32;
            inner.rlength = 0;
            Some(credit)
        } else {
            None
        };
        drop(inner);

        if let Some(credit) = credit {
            self.send_control(Frame::Reset {
                channel: channel as u8,
                credit,
            })?;
        }
        Ok(n)
    }

    /// Stops reading `channel`: flushes residual credit via RESET, sends
    /// CLOSE, and marks the inbound buffer CLOSED.
    pub fn close_in(&self, channel: usize) -> Result<(), MuxError> {
        Frame::check_channel(channel as u8)?;
        let buf = &self.in_bufs[channel];
        let credit = {
            let inner = buf.lock();
            inner.rlength as u32
        };
        if credit > 0 {
            self.send_control(Frame::Reset {
                channel: channel as u8,
                credit,
            })?;
        }
        self.send_control(Frame::Close {
            channel: channel as u8,
        })?;
        buf.mark_closed();
        Ok(())
    }

    /// Flushes residual outbound data, then blocks until the peer's CLOSE
    /// has marked this channel's outbound buffer CLOSED (observed by the
    /// receiver thread), before marking the channel closed on our side.
    pub fn close_out(&self, channel: usize) -> Result<(), MuxError> {
        Frame::check_channel(channel as u8)?;
        self.flush(channel)?;
        let buf = &self.out_bufs[channel];
        let mut inner = buf.lock();
        loop {
            match inner.state {
                BufState::Closed => break,
                BufState::Error => return Err(MuxError::Aborted),
                _ => {}
            }
            inner = buf.in_cond.wait(inner).unwrap_or_else(|p| p.into_inner());
        }
        drop(inner);

        let mut shutdown = self.shutdown.lock().unwrap_or_else(|p| p.into_inner());
        shutdown.out_closed[channel] = true;
        drop(shutdown);
        self.done_cond.notify_all();
        Ok(())
    }

    /// Writes a RESET or CLOSE control frame directly (no compression, no
    /// buffering: control frames are not subject to flow control).
    fn send_control(&self, frame: Frame) -> Result<(), MuxError> {
        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(err) = writer.sink.write_all(&frame.encode()) {
            drop(writer);
            self.abort();
            return Err(MuxError::Io(err));
        }
        Ok(())
    }

    /// Aborts the mux: every buffer moves to the ERROR state, every
    /// blocked operation on either side wakes and observes the failure,
    /// and the transport is half-closed so a blocked socket read also
    /// returns.
    pub fn abort(&self) {
        #[cfg(feature = "tracing")]
        warn!("aborting mux");
        for buf in self.in_bufs.iter().chain(self.out_bufs.iter()) {
            buf.mark_error();
        }
        (self.shutdown_socket)();
        self.done_cond.notify_all();
    }

    /// Blocks until the receiver thread has exited.
    pub fn join(&self) {
        let handle = self
            .receiver
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

/// A `Read + Write` adapter over one of a [`Mux`]'s sub-channels, so
/// higher layers (the protocol's pre-mux framing, the scan/compare
/// dialogue) can drive a channel with ordinary I/O instead of calling
/// [`Mux::send`]/[`Mux::recv`] directly.
pub struct ChannelStream<W> {
    mux: Arc<Mux<W>>,
    channel: usize,
}

impl<W> ChannelStream<W> {
    /// Wraps `channel` of `mux` as a `Read + Write` stream.
    #[must_use]
    pub fn new(mux: Arc<Mux<W>>, channel: usize) -> Self {
        Self { mux, channel }
    }

    /// The channel number this stream reads and writes.
    #[must_use]
    pub fn channel(&self) -> usize {
        self.channel
    }
}

impl<W> Read for ChannelStream<W>
where
    W: Write + Send + 'static,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.mux
            .recv(self.channel, buf)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))
    }
}

impl<W> Write for ChannelStream<W>
where
    W: Write + Send + 'static,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.mux
            .send(self.channel, buf)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.mux
            .flush(self.channel)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))
    }
}

fn check_running(inner: &Inner, channel: usize) -> Result<(), MuxError> {
    match inner.state {
        BufState::Error => Err(MuxError::Aborted),
        BufState::Closed => Err(MuxError::Closed(channel as u8)),
        BufState::Init | BufState::Running => Ok(()),
    }
}

fn receiver_loop<R: Read, W: Write>(mux: Arc<Mux<W>>, mut reader: R, codec: Codec) {
    let mut decompressor = matches!(codec, Codec::Zlib).then(FrameDecompressor::new);
    loop {
        let frame = match Frame::read(&mut reader) {
            Ok(frame) => frame,
            Err(_) => {
                mux.abort();
                return;
            }
        };
        match frame {
            Frame::Data { channel, body } => {
                if Frame::check_channel(channel).is_err() {
                    mux.abort();
                    return;
                }
                if body.is_empty() {
                    mux.abort();
                    return;
                }
                let body = match decompressor.as_mut() {
                    Some(d) => match d.decompress_frame(&body, body.len() * 4) {
                        Ok(b) => b,
                        Err(_) => {
                            mux.abort();
                            return;
                        }
                    },
                    None => body,
                };
                let buf = &mux.in_bufs[channel as usize];
                let mut inner = buf.lock();
                if inner.length + body.len() > inner.capacity() {
                    drop(inner);
                    mux.abort();
                    return;
                }
                inner.push(&body);
                drop(inner);
                buf.out_cond.notify_all();
            }
            Frame::Reset { channel, credit } => {
                if Frame::check_channel(channel).is_err() {
                    mux.abort();
                    return;
                }
                let buf = &mux.out_bufs[channel as usize];
                let mut inner = buf.lock();
                if inner.state == BufState::Closed {
                    drop(inner);
                    mux.abort();
                    return;
                }
                if credit as usize > inner.rlength {
                    drop(inner);
                    mux.abort();
                    return;
                }
                inner.rlength -= credit as usize;
                drop(inner);
                buf.in_cond.notify_all();
            }
            Frame::Close { channel } => {
                if Frame::check_channel(channel).is_err() {
                    mux.abort();
                    return;
                }
                mux.out_bufs[channel as usize].mark_closed();
                let mut shutdown = mux.shutdown.lock().unwrap_or_else(|p| p.into_inner());
                shutdown.in_closed[channel as usize] = true;
                let both_in_closed = shutdown.in_closed.iter().all(|&closed| closed);
                if !both_in_closed {
                    continue;
                }
                while !shutdown.out_closed.iter().all(|&closed| closed) {
                    shutdown = mux
                        .done_cond
                        .wait(shutdown)
                        .unwrap_or_else(|p| p.into_inner());
                }
                return;
            }
        }
    }
}
