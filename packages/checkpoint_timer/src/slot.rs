use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Snapshot of the data accumulated for one checkpoint within one execution context.
///
/// All times are in nanoseconds of thread processor time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CheckpointSlot {
    iterations: u64,
    total_elapsed: u64,
    last_timestamp: u64,
}

impl CheckpointSlot {
    #[cfg(test)]
    pub(crate) const fn new(iterations: u64, total_elapsed: u64, last_timestamp: u64) -> Self {
        Self {
            iterations,
            total_elapsed,
            last_timestamp,
        }
    }

    /// How many times the checkpoint was hit.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Time accumulated between the previous checkpoint hit in the context and each hit of
    /// this checkpoint, in nanoseconds.
    #[must_use]
    pub fn total_elapsed_nanos(&self) -> u64 {
        self.total_elapsed
    }

    /// Time accumulated between the previous checkpoint hit in the context and each hit of
    /// this checkpoint.
    #[must_use]
    pub fn total_elapsed(&self) -> Duration {
        Duration::from_nanos(self.total_elapsed)
    }

    /// Timestamp of the most recent hit of this checkpoint, in nanoseconds.
    #[must_use]
    pub fn last_timestamp_nanos(&self) -> u64 {
        self.last_timestamp
    }

    /// Whether the checkpoint was never hit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iterations == 0
    }

    /// Mean elapsed nanoseconds per hit, or `None` if the checkpoint was never hit.
    #[must_use]
    pub fn average_nanos(&self) -> Option<u64> {
        self.total_elapsed.checked_div(self.iterations)
    }
}

/// Combines the data of the same checkpoint from two execution contexts.
///
/// Iteration counts and elapsed times are summed. The last timestamp is meaningless across
/// contexts and is taken as the later of the two.
#[must_use]
pub fn merge(a: CheckpointSlot, b: CheckpointSlot) -> CheckpointSlot {
    CheckpointSlot {
        iterations: a.iterations.saturating_add(b.iterations),
        total_elapsed: a.total_elapsed.saturating_add(b.total_elapsed),
        last_timestamp: a.last_timestamp.max(b.last_timestamp),
    }
}

/// The live accumulator behind a [`CheckpointSlot`].
///
/// Each slot has exactly one writer (the thread that owns the context), so updates are plain
/// load-then-store sequences. Atomics keep a concurrently running report free of data races.
#[derive(Debug, Default)]
pub(crate) struct AtomicSlot {
    iterations: AtomicU64,
    total_elapsed: AtomicU64,
    last_timestamp: AtomicU64,
}

impl AtomicSlot {
    pub(crate) fn with_timestamp(timestamp: u64) -> Self {
        Self {
            last_timestamp: AtomicU64::new(timestamp),
            ..Self::default()
        }
    }

    #[inline]
    pub(crate) fn last_timestamp(&self) -> u64 {
        self.last_timestamp.load(Ordering::Relaxed)
    }

    /// Records one hit at `now`, attributing the time since `previous_timestamp` to this slot.
    #[inline]
    pub(crate) fn record(&self, now: u64, previous_timestamp: u64) {
        let iterations = self.iterations.load(Ordering::Relaxed);
        self.iterations
            .store(iterations.wrapping_add(1), Ordering::Relaxed);

        let total_elapsed = self.total_elapsed.load(Ordering::Relaxed);
        self.total_elapsed.store(
            total_elapsed.saturating_add(now.saturating_sub(previous_timestamp)),
            Ordering::Relaxed,
        );

        self.last_timestamp.store(now, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CheckpointSlot {
        CheckpointSlot {
            iterations: self.iterations.load(Ordering::Relaxed),
            total_elapsed: self.total_elapsed.load(Ordering::Relaxed),
            last_timestamp: self.last_timestamp.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn new_slot_is_empty() {
        let slot = AtomicSlot::default().snapshot();

        assert!(slot.is_empty());
        assert_eq!(slot.total_elapsed_nanos(), 0);
        assert_eq!(slot.average_nanos(), None);
    }

    #[test]
    fn record_accumulates_time_since_previous() {
        let slot = AtomicSlot::with_timestamp(1_000);

        slot.record(1_250, slot.last_timestamp());
        slot.record(1_400, 1_300);

        let snapshot = slot.snapshot();
        assert_eq!(snapshot.iterations(), 2);
        assert_eq!(snapshot.total_elapsed_nanos(), 350);
        assert_eq!(snapshot.last_timestamp_nanos(), 1_400);
        assert_eq!(snapshot.average_nanos(), Some(175));
    }

    #[test]
    fn record_never_decreases_total() {
        let slot = AtomicSlot::with_timestamp(500);

        // A clock that appears to go backwards contributes nothing.
        slot.record(400, 500);

        let snapshot = slot.snapshot();
        assert_eq!(snapshot.iterations(), 1);
        assert_eq!(snapshot.total_elapsed_nanos(), 0);
    }

    #[test]
    fn merge_sums_counts_and_durations() {
        let a = CheckpointSlot::new(10, 1_000, 50);
        let b = CheckpointSlot::new(30, 6_000, 70);

        let merged = merge(a, b);

        assert_eq!(merged.iterations(), 40);
        assert_eq!(merged.total_elapsed_nanos(), 7_000);
        assert_eq!(merged.last_timestamp_nanos(), 70);
    }

    #[test]
    fn merge_with_empty_is_identity_for_sums() {
        let a = CheckpointSlot::new(3, 300, 9);

        let merged = merge(a, CheckpointSlot::default());

        assert_eq!(merged, a);
    }

    #[test]
    fn total_elapsed_as_duration() {
        let slot = CheckpointSlot::new(1, 1_500_000, 0);

        assert_eq!(slot.total_elapsed(), Duration::from_micros(1_500));
    }

    static_assertions::assert_impl_all!(CheckpointSlot: Send, Sync, Copy);
    static_assertions::assert_impl_all!(AtomicSlot: Send, Sync);
}
