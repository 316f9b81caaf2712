use std::num::NonZero;

use new_zealand::nz;

use crate::Engine;
use crate::pal::PlatformFacade;

/// Number of execution contexts an engine accepts unless configured otherwise.
pub const DEFAULT_MAX_CONTEXTS: usize = 32;

/// Number of checkpoints tracked per context unless configured otherwise (identifiers 0 to 9).
pub const DEFAULT_CHECKPOINT_COUNT: NonZero<usize> = nz!(10);

/// Creates instances of [`Engine`].
///
/// Required parameters:
///
/// * (none)
///
/// Optional parameters:
///
/// * `max_contexts` - how many distinct execution contexts may register (default
///   [`DEFAULT_MAX_CONTEXTS`]). Zero selects single-context mode, in which every caller shares
///   one unsynchronized context.
/// * `locking` - whether slot updates and reports are serialized by a mutex (default `true`).
///   Locking is only needed if reports are produced while recording is still in progress.
/// * `checkpoint_count` - how many checkpoint identifiers are valid, starting from 0 (default
///   [`DEFAULT_CHECKPOINT_COUNT`]).
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use checkpoint_timer::Engine;
///
/// let engine = Engine::builder()
///     .max_contexts(8)
///     .locking(false)
///     .checkpoint_count(NonZero::new(16).unwrap())
///     .build();
///
/// assert_eq!(engine.max_contexts(), 8);
/// assert!(!engine.is_locking());
/// assert_eq!(engine.checkpoint_count(), 16);
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct EngineBuilder {
    pub(crate) max_contexts: usize,
    pub(crate) locking: bool,
    pub(crate) checkpoint_count: NonZero<usize>,
    pub(crate) platform: PlatformFacade,
}

impl EngineBuilder {
    pub(crate) fn new() -> Self {
        Self {
            max_contexts: DEFAULT_MAX_CONTEXTS,
            locking: true,
            checkpoint_count: DEFAULT_CHECKPOINT_COUNT,
            platform: PlatformFacade::real(),
        }
    }

    /// Sets how many distinct execution contexts may register.
    ///
    /// Zero selects single-context mode.
    pub fn max_contexts(self, max_contexts: usize) -> Self {
        Self {
            max_contexts,
            ..self
        }
    }

    /// Sets whether slot updates and report snapshots are serialized by a mutex.
    pub fn locking(self, locking: bool) -> Self {
        Self { locking, ..self }
    }

    /// Sets how many checkpoint identifiers are valid, starting from 0.
    pub fn checkpoint_count(self, checkpoint_count: NonZero<usize>) -> Self {
        Self {
            checkpoint_count,
            ..self
        }
    }

    #[cfg(test)]
    pub(crate) fn platform(self, platform: PlatformFacade) -> Self {
        Self { platform, ..self }
    }

    /// Builds the engine. The engine starts out active.
    #[must_use]
    pub fn build(self) -> Engine {
        Engine::new(self)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let builder = EngineBuilder::new();

        assert_eq!(builder.max_contexts, DEFAULT_MAX_CONTEXTS);
        assert!(builder.locking);
        assert_eq!(builder.checkpoint_count, DEFAULT_CHECKPOINT_COUNT);
        assert!(matches!(builder.platform, PlatformFacade::Real(_)));
    }

    #[test]
    fn setters_override_defaults() {
        let builder = EngineBuilder::new()
            .max_contexts(0)
            .locking(false)
            .checkpoint_count(nz!(3));

        assert_eq!(builder.max_contexts, 0);
        assert!(!builder.locking);
        assert_eq!(builder.checkpoint_count.get(), 3);
    }

    static_assertions::assert_impl_all!(EngineBuilder: Send, Sync, Clone);
}
