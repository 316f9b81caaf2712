//! Registry mapping execution contexts to their checkpoint data.

use std::num::NonZero;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use foldhash::{HashMap, HashMapExt};
use parking_lot::RwLock;
use tracing::debug;

use crate::pal::{Platform, PlatformFacade};
use crate::{ContextBlock, ContextId, ContextSnapshot, Error, Result};

/// Upper bound on the map capacity reserved up front, regardless of the configured capacity.
const MAX_RESERVED_CONTEXTS: usize = 1024;

/// Registry for managing per-context checkpoint data.
///
/// Contexts register lazily on their first checkpoint. Registration order is preserved so that
/// reports list contexts in the order they were first seen.
///
/// In single-context mode every caller maps to the same block and no lock is taken once that
/// block exists. Otherwise blocks are looked up under a shared lock. The exclusive lock is only
/// taken when a previously unseen context registers, which happens once per context.
#[derive(Debug)]
pub(crate) struct Registry {
    checkpoint_count: NonZero<usize>,
    mode: Mode,
}

#[derive(Debug)]
enum Mode {
    Single(OnceLock<Arc<ContextBlock>>),
    Shared(SharedContexts),
}

#[derive(Debug)]
struct SharedContexts {
    max_contexts: usize,

    // Only modified under the write lock; readable without any lock.
    registered: AtomicUsize,

    contexts: RwLock<RegisteredContexts>,
}

#[derive(Debug)]
struct RegisteredContexts {
    by_context: HashMap<ContextId, Arc<ContextBlock>>,

    // Ordered by registration, ascending ordinal.
    in_order: Vec<Arc<ContextBlock>>,
}

impl Registry {
    /// Creates a registry that accepts up to `max_contexts` distinct contexts.
    ///
    /// A capacity of zero selects single-context mode.
    pub(crate) fn new(max_contexts: usize, checkpoint_count: NonZero<usize>) -> Self {
        let mode = if max_contexts == 0 {
            Mode::Single(OnceLock::new())
        } else {
            let reserved = max_contexts.min(MAX_RESERVED_CONTEXTS);

            Mode::Shared(SharedContexts {
                max_contexts,
                registered: AtomicUsize::new(0),
                contexts: RwLock::new(RegisteredContexts {
                    by_context: HashMap::with_capacity(reserved),
                    in_order: Vec::with_capacity(reserved),
                }),
            })
        };

        Self {
            checkpoint_count,
            mode,
        }
    }

    /// Returns the block of `context`, registering the context if it has not been seen before.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if registering the context would exceed the
    /// configured capacity.
    #[inline]
    pub(crate) fn resolve(
        &self,
        context: ContextId,
        platform: &PlatformFacade,
    ) -> Result<Arc<ContextBlock>> {
        match &self.mode {
            Mode::Single(block) => Ok(Arc::clone(block.get_or_init(|| {
                debug!(%context, "registered single execution context");
                Arc::new(self.create_block(context, 0, platform))
            }))),
            Mode::Shared(shared) => {
                if let Some(block) = shared.contexts.read().by_context.get(&context) {
                    return Ok(Arc::clone(block));
                }

                self.register(shared, context, platform)
            }
        }
    }

    #[cold]
    fn register(
        &self,
        shared: &SharedContexts,
        context: ContextId,
        platform: &PlatformFacade,
    ) -> Result<Arc<ContextBlock>> {
        let mut contexts = shared.contexts.write();

        // Someone may have registered the same context between our read and write lock.
        if let Some(block) = contexts.by_context.get(&context) {
            return Ok(Arc::clone(block));
        }

        let ordinal = shared.registered.load(Ordering::Relaxed);

        if ordinal >= shared.max_contexts {
            return Err(Error::CapacityExceeded {
                max_contexts: shared.max_contexts,
            });
        }

        let block = Arc::new(self.create_block(context, ordinal, platform));
        contexts.by_context.insert(context, Arc::clone(&block));
        contexts.in_order.push(Arc::clone(&block));
        shared.registered.fetch_add(1, Ordering::Release);

        debug!(%context, ordinal = block.ordinal(), "registered execution context");

        Ok(block)
    }

    fn create_block(
        &self,
        context: ContextId,
        ordinal: usize,
        platform: &PlatformFacade,
    ) -> ContextBlock {
        ContextBlock::new(
            context,
            ordinal,
            self.checkpoint_count,
            platform.thread_time_nanos(),
        )
    }

    /// The configured capacity, 0 in single-context mode.
    pub(crate) fn max_contexts(&self) -> usize {
        match &self.mode {
            Mode::Single(_) => 0,
            Mode::Shared(shared) => shared.max_contexts,
        }
    }

    pub(crate) fn registered_count(&self) -> usize {
        match &self.mode {
            Mode::Single(block) => usize::from(block.get().is_some()),
            Mode::Shared(shared) => shared.registered.load(Ordering::Acquire),
        }
    }

    /// Snapshots every registered context, in registration order.
    pub(crate) fn snapshots(&self) -> Vec<ContextSnapshot> {
        match &self.mode {
            Mode::Single(block) => block.get().map(|b| b.snapshot()).into_iter().collect(),
            Mode::Shared(shared) => shared
                .contexts
                .read()
                .in_order
                .iter()
                .map(|block| block.snapshot())
                .collect(),
        }
    }

    /// Snapshots one context, if it has registered.
    pub(crate) fn snapshot_of(&self, context: ContextId) -> Option<ContextSnapshot> {
        match &self.mode {
            Mode::Single(block) => block.get().map(|b| b.snapshot()),
            Mode::Shared(shared) => shared
                .contexts
                .read()
                .by_context
                .get(&context)
                .map(|block| block.snapshot()),
        }
    }

    /// Releases every registered context.
    ///
    /// The single-context block stays allocated until the registry itself is dropped.
    pub(crate) fn clear(&self) {
        if let Mode::Shared(shared) = &self.mode {
            let mut contexts = shared.contexts.write();
            contexts.by_context.clear();
            contexts.in_order.clear();
            shared.registered.store(0, Ordering::Release);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;

    use new_zealand::nz;

    use super::*;
    use crate::CheckpointId;
    use crate::pal::FakePlatform;

    fn fake_platform() -> PlatformFacade {
        PlatformFacade::fake(FakePlatform::with_step(10))
    }

    #[test]
    fn new_registry_is_empty() {
        let registry = Registry::new(4, nz!(10));

        assert_eq!(registry.registered_count(), 0);
        assert_eq!(registry.max_contexts(), 4);
        assert!(registry.snapshots().is_empty());
    }

    #[test]
    fn resolve_registers_once() {
        let registry = Registry::new(4, nz!(10));
        let platform = fake_platform();
        let context = ContextId::custom(1);

        let first = registry.resolve(context, &platform).unwrap();
        let second = registry.resolve(context, &platform).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.registered_count(), 1);
    }

    #[test]
    fn snapshots_follow_registration_order() {
        let registry = Registry::new(4, nz!(10));
        let platform = fake_platform();

        for value in [30, 10, 20] {
            registry.resolve(ContextId::custom(value), &platform).unwrap();
        }

        let contexts = registry
            .snapshots()
            .iter()
            .map(|snapshot| (snapshot.ordinal(), snapshot.context()))
            .collect::<Vec<_>>();

        assert_eq!(
            contexts,
            vec![
                (0, ContextId::custom(30)),
                (1, ContextId::custom(10)),
                (2, ContextId::custom(20)),
            ]
        );
    }

    #[test]
    fn capacity_is_enforced() {
        let registry = Registry::new(2, nz!(10));
        let platform = fake_platform();

        registry.resolve(ContextId::custom(1), &platform).unwrap();
        registry.resolve(ContextId::custom(2), &platform).unwrap();

        let result = registry.resolve(ContextId::custom(3), &platform);

        assert!(matches!(
            result,
            Err(Error::CapacityExceeded { max_contexts: 2 })
        ));
        assert_eq!(registry.registered_count(), 2);

        // Already registered contexts keep working.
        registry.resolve(ContextId::custom(1), &platform).unwrap();
    }

    #[test]
    fn single_mode_maps_everything_to_one_block() {
        let registry = Registry::new(0, nz!(10));
        let platform = fake_platform();

        let first = registry.resolve(ContextId::custom(1), &platform).unwrap();
        let second = registry.resolve(ContextId::custom(2), &platform).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.registered_count(), 1);
        assert_eq!(registry.max_contexts(), 0);

        let snapshots = registry.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].context(), ContextId::custom(1));
    }

    #[test]
    fn creation_timestamp_comes_from_platform() {
        let fake = FakePlatform::new();
        fake.set_time(5_000);
        let platform = PlatformFacade::fake(fake);
        let registry = Registry::new(4, nz!(10));

        registry.resolve(ContextId::custom(1), &platform).unwrap();

        let snapshot = registry.snapshot_of(ContextId::custom(1)).unwrap();
        assert_eq!(snapshot.created_at_nanos(), 5_000);
    }

    #[test]
    fn snapshot_of_unknown_context_is_none() {
        let registry = Registry::new(4, nz!(10));

        assert!(registry.snapshot_of(ContextId::custom(1)).is_none());
    }

    #[test]
    fn clear_releases_contexts() {
        let registry = Registry::new(4, nz!(10));
        let platform = fake_platform();
        let block = registry.resolve(ContextId::custom(1), &platform).unwrap();

        registry.clear();

        assert_eq!(registry.registered_count(), 0);
        assert!(registry.snapshots().is_empty());
        // Only our own reference remains.
        assert_eq!(Arc::strong_count(&block), 1);
    }

    #[cfg_attr(miri, ignore)] // Too slow under Miri.
    #[test]
    fn concurrent_registration_respects_capacity() {
        let registry = Arc::new(Registry::new(5, nz!(10)));
        let platform = fake_platform();

        let handles = (0..16_u64)
            .map(|value| {
                let registry = Arc::clone(&registry);
                let platform = platform.clone();
                thread::spawn(move || {
                    registry
                        .resolve(ContextId::custom(value), &platform)
                        .is_ok()
                })
            })
            .collect::<Vec<_>>();

        let accepted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|accepted| *accepted)
            .count();

        assert_eq!(accepted, 5);
        assert_eq!(registry.registered_count(), 5);

        let mut ordinals = registry
            .snapshots()
            .iter()
            .map(ContextSnapshot::ordinal)
            .collect::<Vec<_>>();
        ordinals.sort_unstable();
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn resolved_block_records() {
        let registry = Registry::new(4, nz!(10));
        let platform = fake_platform();
        let block = registry.resolve(ContextId::custom(1), &platform).unwrap();

        let checkpoint = CheckpointId::new(3);
        let previous = block.advance(checkpoint);
        block.record(checkpoint, previous, 100);

        let snapshot = registry.snapshot_of(ContextId::custom(1)).unwrap();
        assert_eq!(snapshot.slot(checkpoint).unwrap().iterations(), 1);
    }

    static_assertions::assert_impl_all!(Registry: Send, Sync);
}
