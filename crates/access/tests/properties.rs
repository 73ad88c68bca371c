//! Property test for ACL idempotence (`spec.md` §8 invariant 7).

use cvsync_access::{evaluate, parse, ConnectionTracker, Peer};
use proptest::prelude::*;

proptest! {
    /// The same peer address evaluated repeatedly against the same rule
    /// list always yields the same decision.
    #[test]
    fn evaluation_is_deterministic(
        octets in proptest::array::uniform4(0u8..=255u8),
        max in 1u32..=10,
    ) {
        let rules = parse(&format!("allow 10.0.0.0/8,{max}\ndeny 0.0.0.0/0\n")).unwrap();
        let addr = std::net::IpAddr::from(octets);
        let peer = Peer { addr, hostname: None };

        let first = evaluate(&rules, peer);
        for _ in 0..5 {
            prop_assert_eq!(evaluate(&rules, peer), first);
        }
    }

    /// Admitting and releasing the same number of `ALLOW` connections
    /// against a per-rule cap always leaves the tracker's active count
    /// at the same value, regardless of interleaving order.
    #[test]
    fn tracker_counts_are_order_independent(admits in 1usize..=5, max in 1u32..=5) {
        let rules = parse(&format!("allow 10.0.0.0/8,{max}\n")).unwrap();
        let peer = Peer {
            addr: "10.0.0.1".parse().unwrap(),
            hostname: None,
        };
        let decision = evaluate(&rules, peer);

        let mut tracker = ConnectionTracker::new(None);
        let mut handles = Vec::new();
        for _ in 0..admits {
            if let Ok(handle) = tracker.admit(decision, &rules) {
                handles.push(handle);
            }
        }
        let expected = admits.min(max as usize);
        prop_assert_eq!(tracker.global_active(), expected);

        for handle in handles {
            tracker.release(handle);
        }
        prop_assert_eq!(tracker.global_active(), 0);
    }
}
