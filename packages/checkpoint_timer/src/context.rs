//! Execution contexts and the per-context checkpoint data.

use std::fmt;
use std::iter;
use std::num::NonZero;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::slot::AtomicSlot;
use crate::{CheckpointId, CheckpointSlot};

static NEXT_THREAD_CONTEXT: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static CURRENT_THREAD_CONTEXT: ContextId =
        ContextId(ContextKind::Thread(NEXT_THREAD_CONTEXT.fetch_add(1, Ordering::Relaxed)));
}

/// Identifies an execution context whose checkpoint history is tracked separately.
///
/// By default every thread is its own context, identified via [`ContextId::current_thread()`].
/// Callers that schedule work some other way (e.g. one logical context per pinned processor)
/// can key contexts with [`ContextId::custom()`]. A context must only be used by one thread of
/// control at a time.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ContextId(ContextKind);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum ContextKind {
    Thread(u64),
    Custom(u64),
}

impl ContextId {
    /// The context of the calling thread.
    ///
    /// Each thread is assigned a distinct identifier the first time it asks for one.
    #[must_use]
    #[inline]
    pub fn current_thread() -> Self {
        CURRENT_THREAD_CONTEXT.with(|id| *id)
    }

    /// A caller-defined context. Never equal to any thread context.
    #[must_use]
    pub const fn custom(value: u64) -> Self {
        Self(ContextKind::Custom(value))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ContextKind::Thread(value) => write!(f, "thread-{value}"),
            ContextKind::Custom(value) => write!(f, "custom-{value}"),
        }
    }
}

/// The checkpoint data of one execution context.
///
/// Only the thread currently acting as the context writes to the block. Reports read it
/// from other threads through [`ContextBlock::snapshot()`].
#[derive(Debug)]
pub(crate) struct ContextBlock {
    context: ContextId,
    ordinal: usize,
    created_at: u64,
    last_checkpoint_hit: AtomicUsize,
    slots: Box<[AtomicSlot]>,
}

impl ContextBlock {
    /// Creates the block for a newly registered context.
    ///
    /// Slot 0 starts out with the creation timestamp, so the first recorded checkpoint measures
    /// the time since the context was created.
    pub(crate) fn new(
        context: ContextId,
        ordinal: usize,
        checkpoint_count: NonZero<usize>,
        created_at: u64,
    ) -> Self {
        let slots = iter::once(AtomicSlot::with_timestamp(created_at))
            .chain(iter::repeat_with(AtomicSlot::default))
            .take(checkpoint_count.get())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            context,
            ordinal,
            created_at,
            last_checkpoint_hit: AtomicUsize::new(0),
            slots,
        }
    }

    pub(crate) fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Marks `checkpoint` as the most recent hit and returns the checkpoint hit before it.
    #[inline]
    pub(crate) fn advance(&self, checkpoint: CheckpointId) -> CheckpointId {
        CheckpointId::new(
            self.last_checkpoint_hit
                .swap(checkpoint.get(), Ordering::Relaxed),
        )
    }

    /// Records a hit of `checkpoint` at `now`, measured from the last hit of `previous`.
    ///
    /// The caller has validated `checkpoint` against the slot count.
    #[inline]
    pub(crate) fn record(&self, checkpoint: CheckpointId, previous: CheckpointId, now: u64) {
        let previous_timestamp = self
            .slots
            .get(previous.get())
            .map_or(self.created_at, AtomicSlot::last_timestamp);

        if let Some(slot) = self.slots.get(checkpoint.get()) {
            slot.record(now, previous_timestamp);
        }
    }

    pub(crate) fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            context: self.context,
            ordinal: self.ordinal,
            created_at: self.created_at,
            slots: self.slots.iter().map(AtomicSlot::snapshot).collect(),
        }
    }
}

/// Point-in-time copy of the checkpoint data of one execution context.
#[derive(Clone, Debug)]
pub struct ContextSnapshot {
    context: ContextId,
    ordinal: usize,
    created_at: u64,
    slots: Box<[CheckpointSlot]>,
}

impl ContextSnapshot {
    #[cfg(test)]
    pub(crate) fn fake(
        context: ContextId,
        ordinal: usize,
        created_at: u64,
        slots: Vec<CheckpointSlot>,
    ) -> Self {
        Self {
            context,
            ordinal,
            created_at,
            slots: slots.into_boxed_slice(),
        }
    }

    /// The execution context the data belongs to.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Position of the context in registration order, starting from 0.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Timestamp at which the context registered, in nanoseconds.
    #[must_use]
    pub fn created_at_nanos(&self) -> u64 {
        self.created_at
    }

    /// The data of every checkpoint, indexed by checkpoint identifier.
    #[must_use]
    pub fn slots(&self) -> &[CheckpointSlot] {
        &self.slots
    }

    /// The data of one checkpoint, or `None` if the identifier is out of range.
    #[must_use]
    pub fn slot(&self, checkpoint: CheckpointId) -> Option<&CheckpointSlot> {
        self.slots.get(checkpoint.get())
    }

    /// Whether no checkpoint was ever hit in this context.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(CheckpointSlot::is_empty)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;

    use new_zealand::nz;

    use super::*;

    #[test]
    fn current_thread_is_stable_within_thread() {
        assert_eq!(ContextId::current_thread(), ContextId::current_thread());
    }

    #[test]
    fn current_thread_differs_between_threads() {
        let here = ContextId::current_thread();
        let there = thread::spawn(ContextId::current_thread).join().unwrap();

        assert_ne!(here, there);
    }

    #[test]
    fn custom_never_equals_thread() {
        let thread_context = ContextId::current_thread();
        let ContextId(ContextKind::Thread(value)) = thread_context else {
            panic!("current_thread() must produce a thread context");
        };

        assert_ne!(ContextId::custom(value), thread_context);
    }

    #[test]
    fn display_names_kind() {
        assert_eq!(ContextId::custom(7).to_string(), "custom-7");
    }

    #[test]
    fn new_block_is_empty_and_seeded_with_creation_time() {
        let block = ContextBlock::new(ContextId::custom(1), 3, nz!(4), 1_000);
        let snapshot = block.snapshot();

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.ordinal(), 3);
        assert_eq!(snapshot.slots().len(), 4);
        assert_eq!(snapshot.created_at_nanos(), 1_000);
        assert_eq!(snapshot.slots()[0].last_timestamp_nanos(), 1_000);
    }

    #[test]
    fn advance_returns_previous_checkpoint() {
        let block = ContextBlock::new(ContextId::custom(1), 0, nz!(4), 0);

        assert_eq!(block.advance(CheckpointId::new(2)), CheckpointId::new(0));
        assert_eq!(block.advance(CheckpointId::new(3)), CheckpointId::new(2));
    }

    #[test]
    fn first_record_measures_from_creation() {
        let block = ContextBlock::new(ContextId::custom(1), 0, nz!(4), 1_000);

        let previous = block.advance(CheckpointId::new(2));
        block.record(CheckpointId::new(2), previous, 1_300);

        let snapshot = block.snapshot();
        let slot = snapshot.slot(CheckpointId::new(2)).unwrap();
        assert_eq!(slot.iterations(), 1);
        assert_eq!(slot.total_elapsed_nanos(), 300);
    }

    #[test]
    fn consecutive_records_measure_from_previous_checkpoint() {
        let block = ContextBlock::new(ContextId::custom(1), 0, nz!(4), 0);

        for (checkpoint, now) in [(1, 100), (2, 250), (1, 300), (2, 500)] {
            let checkpoint = CheckpointId::new(checkpoint);
            let previous = block.advance(checkpoint);
            block.record(checkpoint, previous, now);
        }

        let snapshot = block.snapshot();
        // 1: (100 - 0) + (300 - 250)
        assert_eq!(snapshot.slots()[1].total_elapsed_nanos(), 150);
        // 2: (250 - 100) + (500 - 300)
        assert_eq!(snapshot.slots()[2].total_elapsed_nanos(), 350);
    }

    #[test]
    fn slot_out_of_range_is_none() {
        let block = ContextBlock::new(ContextId::custom(1), 0, nz!(2), 0);

        assert!(block.snapshot().slot(CheckpointId::new(2)).is_none());
    }

    static_assertions::assert_impl_all!(ContextId: Send, Sync, Copy);
    static_assertions::assert_impl_all!(ContextBlock: Send, Sync);
    static_assertions::assert_impl_all!(ContextSnapshot: Send, Sync);
}
