//! Full send -> recv -> close_in -> close_out round trip over a connected
//! socket pair, mirroring `spec.md` §7's shutdown sequence: each side must
//! call both `close_in` (so the peer's receiver observes CLOSE and unblocks
//! its own `close_out`) and `close_out` (which blocks until the peer's
//! `close_in` is observed) for every channel, or the receiver loop never
//! exits.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::thread;

use cvsync_compress::Codec;
use cvsync_transport::{ChannelConfig, ChannelStream, Mux, N_CH};

fn configs(bufsize: usize, mss: usize) -> [ChannelConfig; N_CH] {
    std::array::from_fn(|_| ChannelConfig { mss, bufsize })
}

fn spawn_side(sock: UnixStream, bufsize: usize, mss: usize) -> std::sync::Arc<Mux<UnixStream>> {
    let reader = sock.try_clone().unwrap();
    let shutdown_handle = sock.try_clone().unwrap();
    Mux::spawn(reader, sock, configs(bufsize, mss), configs(bufsize, mss), Codec::None, move || {
        let _ = shutdown_handle.shutdown(std::net::Shutdown::Both);
    })
}

#[test]
fn round_trip_send_recv_then_close() {
    let (client_sock, server_sock) = UnixStream::pair().unwrap();
    let client_mux = spawn_side(client_sock, 4096, 1024);
    let server_mux = spawn_side(server_sock, 4096, 1024);

    let server = {
        let server_mux = std::sync::Arc::clone(&server_mux);
        thread::spawn(move || {
            let mut scan = ChannelStream::new(std::sync::Arc::clone(&server_mux), 0);
            let mut content = ChannelStream::new(std::sync::Arc::clone(&server_mux), 1);

            let mut buf = [0u8; 5];
            scan.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"hello");
            content.write_all(b"reply on content").unwrap();
            content.flush().unwrap();

            server_mux.close_in(0).unwrap();
            server_mux.close_in(1).unwrap();
            server_mux.close_out(0).unwrap();
            server_mux.close_out(1).unwrap();
            server_mux.join();
        })
    };

    let mut scan = ChannelStream::new(std::sync::Arc::clone(&client_mux), 0);
    let mut content = ChannelStream::new(std::sync::Arc::clone(&client_mux), 1);

    scan.write_all(b"hello").unwrap();
    scan.flush().unwrap();

    let mut got = vec![0u8; "reply on content".len()];
    content.read_exact(&mut got).unwrap();
    assert_eq!(got, b"reply on content");

    client_mux.close_in(0).unwrap();
    client_mux.close_in(1).unwrap();
    client_mux.close_out(0).unwrap();
    client_mux.close_out(1).unwrap();
    client_mux.join();

    server.join().unwrap();
}

#[test]
fn large_transfer_respects_small_buffer_and_arrives_intact() {
    let (client_sock, server_sock) = UnixStream::pair().unwrap();
    // bufsize and mss much smaller than the payload, forcing several
    // flush/credit round trips through `Mux::send`'s blocking wait.
    let client_mux = spawn_side(client_sock, 256, 64);
    let server_mux = spawn_side(server_sock, 256, 64);

    let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let server = {
        let server_mux = std::sync::Arc::clone(&server_mux);
        thread::spawn(move || {
            let mut content = ChannelStream::new(std::sync::Arc::clone(&server_mux), 1);
            let mut received = vec![0u8; expected.len()];
            content.read_exact(&mut received).unwrap();
            assert_eq!(received, expected);

            server_mux.close_in(0).unwrap();
            server_mux.close_in(1).unwrap();
            server_mux.close_out(0).unwrap();
            server_mux.close_out(1).unwrap();
            server_mux.join();
        })
    };

    let mut content = ChannelStream::new(std::sync::Arc::clone(&client_mux), 1);
    content.write_all(&payload).unwrap();
    content.flush().unwrap();

    client_mux.close_in(0).unwrap();
    client_mux.close_in(1).unwrap();
    client_mux.close_out(0).unwrap();
    client_mux.close_out(1).unwrap();
    client_mux.join();

    server.join().unwrap();
}
