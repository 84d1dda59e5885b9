//! Property tests for the sorted-set ordering and expiry invariants in
//! spec.md §8: insertion order must never leak into iteration order, and
//! `SortedSet` must always read back in score-then-lexicographic order
//! regardless of what order members were added in.

use bytes::Bytes;
use proptest::prelude::*;
use redis_emu::server::clock::{Clock, ManualClock};
use redis_emu::storage::SortedSet;
use std::sync::Arc;

fn finite_score() -> impl Strategy<Value = f64> {
    (-1e9f64..1e9f64).prop_filter("finite", |s| s.is_finite())
}

fn member() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..8)
}

proptest! {
    /// However members are inserted, `iter()` always comes back sorted by
    /// score and, for ties, by member bytes.
    #[test]
    fn sorted_set_iterates_in_score_then_member_order(
        entries in prop::collection::vec((finite_score(), member()), 0..50)
    ) {
        let mut set = SortedSet::new();
        for (score, member) in &entries {
            set.add(*score, Bytes::from(member.clone()));
        }
        let observed: Vec<_> = set.iter().map(|e| (e.score, e.member.clone())).collect();
        let mut expected = observed.clone();
        expected.sort_by(|a, b| {
            a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.1.cmp(&b.1))
        });
        prop_assert_eq!(observed, expected);
    }

    /// Re-adding the same member just updates its score; the set never
    /// grows duplicate entries for one member.
    #[test]
    fn sorted_set_add_is_idempotent_per_member(
        member in member(),
        scores in prop::collection::vec(finite_score(), 1..10)
    ) {
        let mut set = SortedSet::new();
        for score in &scores {
            set.add(*score, Bytes::from(member.clone()));
        }
        prop_assert_eq!(set.len(), 1);
        prop_assert_eq!(set.get_score(&Bytes::from(member)), scores.last().copied());
    }

    /// A `ManualClock` only ever reports what it was last advanced to;
    /// advancing never moves it backwards relative to the sum of deltas.
    #[test]
    fn manual_clock_advances_monotonically(start in 0u64..1_000_000, deltas in prop::collection::vec(0u64..10_000, 0..20)) {
        let clock = Arc::new(ManualClock::new(start));
        let mut expected = start;
        for delta in deltas {
            clock.advance(delta);
            expected += delta;
            prop_assert_eq!(clock.now_ms(), expected);
        }
    }
}
