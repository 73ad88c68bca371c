//! Property tests for `MuxBuf`'s ring buffer accounting: round-trip
//! fidelity of push/pop, the capacity bound that backs credit flow
//! control, and the credit-plus-buffered invariant `Mux::flush_locked`
//! blocks on.

use cvsync_transport::MuxBuf;
use proptest::prelude::*;

const CAPACITY: usize = 64;

proptest! {
    /// Every byte pushed into a `MuxBuf` comes back out in the same order,
    /// however the writes and reads are chunked, as long as no write
    /// exceeds available room.
    #[test]
    fn push_pop_preserves_order(chunks in prop::collection::vec(1usize..=16, 1..20)) {
        let buf = MuxBuf::new(CAPACITY, CAPACITY);
        let mut written = Vec::new();
        let mut read_back = Vec::new();
        let mut next_byte = 0u8;

        for chunk_len in chunks {
            let mut inner = buf.lock();
            let room = inner.capacity() - inner.length;
            let take = chunk_len.min(room);
            if take == 0 {
                let mut out = vec![0u8; inner.length];
                let n = inner.pop(&mut out);
                read_back.extend_from_slice(&out[..n]);
                continue;
            }
            let data: Vec<u8> = (0..take).map(|i| next_byte.wrapping_add(i as u8)).collect();
            next_byte = next_byte.wrapping_add(take as u8);
            inner.push(&data);
            written.extend_from_slice(&data);

            let drain = inner.length / 2;
            if drain > 0 {
                let mut out = vec![0u8; drain];
                let n = inner.pop(&mut out);
                read_back.extend_from_slice(&out[..n]);
            }
        }
        let mut inner = buf.lock();
        let remaining = inner.length;
        let mut out = vec![0u8; remaining];
        let n = inner.pop(&mut out);
        read_back.extend_from_slice(&out[..n]);
        drop(inner);

        prop_assert_eq!(read_back, written);
    }

    /// `length` never exceeds the ring's capacity, regardless of how pushes
    /// and pops interleave.
    #[test]
    fn length_never_exceeds_capacity(chunks in prop::collection::vec(1usize..=16, 1..20)) {
        let buf = MuxBuf::new(CAPACITY, CAPACITY);
        for chunk_len in chunks {
            let mut inner = buf.lock();
            let room = inner.capacity() - inner.length;
            let take = chunk_len.min(room);
            if take > 0 {
                let data = vec![0u8; take];
                inner.push(&data);
            }
            prop_assert!(inner.length <= inner.capacity());
            let drain = inner.length / 3;
            if drain > 0 {
                let mut out = vec![0u8; drain];
                inner.pop(&mut out);
            }
            prop_assert!(inner.length <= inner.capacity());
        }
    }

    /// Models the credit accounting `Mux::flush_locked`/`Mux::recv` perform
    /// on a live socket: buffered bytes plus bytes already sent but not yet
    /// credited back by the peer must never exceed the ring's capacity.
    #[test]
    fn credit_plus_buffered_never_exceeds_capacity(pushes in prop::collection::vec(1usize..=20, 1..15)) {
        let buf = MuxBuf::new(CAPACITY, CAPACITY);
        for chunk_len in pushes {
            let mut inner = buf.lock();
            let capacity = inner.capacity();
            let room = capacity.saturating_sub(inner.length + inner.rlength);
            let take = chunk_len.min(room);
            if take > 0 {
                let data = vec![0u8; take];
                inner.push(&data);
            }

            // Flush: buffered bytes move to in-flight, as in flush_locked.
            let len = inner.length;
            let mut segment = vec![0u8; len];
            inner.pop(&mut segment);
            inner.rlength += len;
            prop_assert!(inner.rlength + inner.length <= capacity);

            // Credit: the peer acknowledges everything in flight, as in
            // recv's RESET grant.
            inner.rlength = 0;
            prop_assert!(inner.rlength + inner.length <= capacity);
        }
    }
}
