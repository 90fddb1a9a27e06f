//! Property-based tests for the timestamp oracle
//!
//! Whatever the wall clock does (stall, jump ahead, step backwards), the
//! oracle must keep issuing strictly increasing timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fedb_storage::{extract_logical, extract_physical, LocalOracle, Oracle, PhysicalClock};
use proptest::prelude::*;

struct ScriptedClock(AtomicU64);

impl PhysicalClock for ScriptedClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

proptest! {
    #[test]
    fn timestamps_strictly_increase(readings in prop::collection::vec(1u64..10_000, 1..200)) {
        let clock = Arc::new(ScriptedClock(AtomicU64::new(0)));
        let oracle = LocalOracle::with_clock(clock.clone());

        let mut last = 0u64;
        for ms in readings {
            clock.0.store(ms, Ordering::SeqCst);
            let ts = oracle.get_timestamp().unwrap();
            prop_assert!(ts > last, "{} not after {}", ts, last);
            prop_assert!(extract_physical(ts) >= ms);
            last = ts;
        }
    }

    #[test]
    fn advancing_clock_resets_logical(start in 1u64..1_000_000, repeats in 1usize..50) {
        let clock = Arc::new(ScriptedClock(AtomicU64::new(start)));
        let oracle = LocalOracle::with_clock(clock.clone());

        for i in 0..repeats {
            let ts = oracle.get_timestamp().unwrap();
            prop_assert_eq!(extract_physical(ts), start);
            prop_assert_eq!(extract_logical(ts), i as u64);
        }

        clock.0.store(start + 1, Ordering::SeqCst);
        let ts = oracle.get_timestamp().unwrap();
        prop_assert_eq!(extract_physical(ts), start + 1);
        prop_assert_eq!(extract_logical(ts), 0);
    }
}
