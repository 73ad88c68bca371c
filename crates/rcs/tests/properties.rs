//! Property tests for revision-number ordering (`spec.md` §8 invariant 5).

use cvsync_rcs::RcsNum;
use proptest::prelude::*;

fn dotted(components: &[u32]) -> String {
    components
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn trunk_pair() -> impl Strategy<Value = (u32, u32)> {
    (0u32..=9_999, 0u32..=9_999).prop_filter("components differ", |(a, b)| a != b)
}

fn branch_pair() -> impl Strategy<Value = (u32, u32, u32, u32)> {
    (0u32..=100, 0u32..=100, 0u32..=9_999, 0u32..=9_999)
        .prop_filter("tail components differ", |(_, _, c, d)| c != d)
}

proptest! {
    /// For any two trunk revisions `a, b` with `a > b` component-wise, `a`
    /// sorts before `b` (our `Ord` inverts trunk comparison so ascending
    /// sort reads head-first, matching `delta`'s on-disk order).
    #[test]
    fn trunk_revisions_sort_by_descending_minor(seed in trunk_pair()) {
        let (x, y) = seed;
        let (hi, lo) = if x > y { (x, y) } else { (y, x) };
        let a = RcsNum::parse(dotted(&[1, hi]).as_bytes()).unwrap();
        let b = RcsNum::parse(dotted(&[1, lo]).as_bytes()).unwrap();
        prop_assert!(a < b);
    }

    /// For any two revisions on the same branch, the lesser component-wise
    /// number sorts first.
    #[test]
    fn branch_revisions_sort_by_ascending_minor(seed in branch_pair()) {
        let (major, branch, x, y) = seed;
        let (lo, hi) = if x < y { (x, y) } else { (y, x) };
        let a = RcsNum::parse(dotted(&[1, major, branch, lo]).as_bytes()).unwrap();
        let b = RcsNum::parse(dotted(&[1, major, branch, hi]).as_bytes()).unwrap();
        prop_assert!(a < b);
    }

    /// A shorter dotted vector always sorts before a longer one, regardless
    /// of component values.
    #[test]
    fn shorter_revision_always_sorts_first(
        trunk_minor in 0u32..=9_999,
        branch_tail in 0u32..=9_999,
    ) {
        let a = RcsNum::parse(dotted(&[1, trunk_minor]).as_bytes()).unwrap();
        let b = RcsNum::parse(dotted(&[1, trunk_minor, 2, branch_tail]).as_bytes()).unwrap();
        prop_assert!(a < b);
    }
}
