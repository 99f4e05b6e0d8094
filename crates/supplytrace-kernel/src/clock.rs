use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use supplytrace_types::{NodeId, Timestamp};
use tracing::warn;

/// Source of provenance timestamps.
///
/// `now` must be strictly increasing across calls on one clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Advance past a timestamp seen elsewhere (journal replay), so the
    /// next `now` sorts after it.
    fn observe(&self, seen: &Timestamp);
}

fn wall_clock_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Hybrid logical clock: wall-clock milliseconds plus a logical counter.
///
/// Stays close to wall-clock time but never goes backwards, even when the
/// wall clock does. Physical and logical parts share one atomic word
/// (48 + 16 bits) so concurrent callers never see a half-updated state.
pub struct HybridLogicalClock {
    state: AtomicU64,
    node_id: NodeId,
    max_drift_ms: u64,
}

const LOGICAL_BITS: u32 = 16;
const LOGICAL_MAX: u64 = (1 << LOGICAL_BITS) - 1;
const PHYSICAL_MAX: u64 = (1 << (64 - LOGICAL_BITS)) - 1;

fn pack(physical: u64, logical: u64) -> u64 {
    (physical.min(PHYSICAL_MAX) << LOGICAL_BITS) | logical.min(LOGICAL_MAX)
}

fn unpack(state: u64) -> (u64, u64) {
    (state >> LOGICAL_BITS, state & LOGICAL_MAX)
}

impl HybridLogicalClock {
    /// Default max drift: 1000ms.
    pub fn new(node_id: NodeId) -> Self {
        Self::with_max_drift(node_id, 1000)
    }

    pub fn with_max_drift(node_id: NodeId, max_drift_ms: u64) -> Self {
        Self {
            state: AtomicU64::new(pack(wall_clock_ms(), 0)),
            node_id,
            max_drift_ms,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }
}

impl Clock for HybridLogicalClock {
    fn now(&self) -> Timestamp {
        loop {
            let wall = wall_clock_ms().min(PHYSICAL_MAX);
            let prev = self.state.load(Ordering::Acquire);
            let (physical, logical) = unpack(prev);

            let (physical, logical) = if wall > physical {
                (wall, 0)
            } else if logical < LOGICAL_MAX {
                (physical, logical + 1)
            } else {
                // Counter exhausted within one millisecond: borrow the next one.
                (physical + 1, 0)
            };

            if self
                .state
                .compare_exchange(
                    prev,
                    pack(physical, logical),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return Timestamp::new(physical, logical as u32, self.node_id);
            }
        }
    }

    fn observe(&self, seen: &Timestamp) {
        let wall = wall_clock_ms();
        if seen.physical_ms > wall + self.max_drift_ms {
            // Recorded history wins over the local wall clock; keep going.
            warn!(
                drift_ms = seen.physical_ms - wall,
                max_drift_ms = self.max_drift_ms,
                "Observed timestamp is ahead of the wall clock"
            );
        }

        // The smallest state from which the next `now` sorts after `seen`.
        let floor = if u64::from(seen.logical) < LOGICAL_MAX {
            pack(seen.physical_ms, u64::from(seen.logical))
        } else {
            pack(seen.physical_ms.saturating_add(1), 0)
        };
        self.state.fetch_max(floor, Ordering::AcqRel);
    }
}

/// Clock driven by hand, for deterministic tests and tooling. Meant for
/// one thread at a time.
pub struct ManualClock {
    physical: AtomicU64,
    logical: AtomicU32,
    node_id: NodeId,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            physical: AtomicU64::new(start_ms),
            logical: AtomicU32::new(0),
            node_id: NodeId::default(),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.physical.fetch_add(ms, Ordering::SeqCst);
        self.logical.store(0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let logical = self.logical.fetch_add(1, Ordering::SeqCst) + 1;
        Timestamp::new(self.physical.load(Ordering::SeqCst), logical, self.node_id)
    }

    fn observe(&self, seen: &Timestamp) {
        if seen.physical_ms > self.physical.load(Ordering::SeqCst) {
            self.physical.store(seen.physical_ms, Ordering::SeqCst);
            self.logical.store(seen.logical, Ordering::SeqCst);
        } else if seen.physical_ms == self.physical.load(Ordering::SeqCst) {
            self.logical.fetch_max(seen.logical, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonically_increasing() {
        let hlc = HybridLogicalClock::new(NodeId(1));
        let mut prev = hlc.now();
        for _ in 0..1000 {
            let ts = hlc.now();
            assert!(ts > prev, "{ts} should be after {prev}");
            prev = ts;
        }
    }

    #[test]
    fn concurrent_timestamps_are_unique() {
        use std::sync::Arc;
        let hlc = Arc::new(HybridLogicalClock::new(NodeId(1)));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let hlc = hlc.clone();
                std::thread::spawn(move || (0..1000).map(|_| hlc.now()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<Timestamp> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let count = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), count);
    }

    #[test]
    fn concurrent_timestamps_keep_increasing_per_thread() {
        use std::sync::Arc;
        let hlc = Arc::new(HybridLogicalClock::new(NodeId(1)));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let hlc = hlc.clone();
                std::thread::spawn(move || (0..5000).map(|_| hlc.now()).collect::<Vec<_>>())
            })
            .collect();

        for handle in handles {
            let stamps = handle.join().unwrap();
            assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn observe_past_exhausted_counter_moves_to_next_millisecond() {
        let hlc = HybridLogicalClock::new(NodeId(1));
        let local = hlc.now();
        let seen = Timestamp::new(local.physical_ms + 60_000, u32::MAX, NodeId(1));

        hlc.observe(&seen);
        let next = hlc.now();
        assert!(next > seen);
        assert_eq!(next.physical_ms, seen.physical_ms + 1);
    }

    #[test]
    fn observe_moves_clock_past_future_timestamp() {
        let hlc = HybridLogicalClock::new(NodeId(1));
        let local = hlc.now();
        let seen = Timestamp::new(local.physical_ms + 60_000, 7, NodeId(1));

        hlc.observe(&seen);
        let next = hlc.now();
        assert!(next > seen);
    }

    #[test]
    fn observe_ignores_past_timestamps() {
        let hlc = HybridLogicalClock::new(NodeId(1));
        let first = hlc.now();
        hlc.observe(&Timestamp::new(1, 0, NodeId(1)));
        assert!(hlc.now() > first);
    }

    #[test]
    fn manual_clock_is_deterministic() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now(), Timestamp::new(1_000, 1, NodeId(1)));
        assert_eq!(clock.now(), Timestamp::new(1_000, 2, NodeId(1)));
        clock.advance(5);
        assert_eq!(clock.now(), Timestamp::new(1_005, 1, NodeId(1)));

        clock.observe(&Timestamp::new(2_000, 9, NodeId(1)));
        assert_eq!(clock.now(), Timestamp::new(2_000, 10, NodeId(1)));
    }
}
