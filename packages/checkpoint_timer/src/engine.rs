use std::any::type_name;
use std::fmt;
use std::io::{self, Write};
use std::num::NonZero;
use std::sync::Once;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::pal::{Platform, PlatformFacade};
use crate::{
    CheckpointId, ContextId, ContextSnapshot, EngineBuilder, Error, Registry, Report,
    ReportOptions, Result, ScopedCheckpoint,
};

const STATE_ACTIVE: u8 = 0;
const STATE_INACTIVE: u8 = 1;
const STATE_DESTROYED: u8 = 2;

static CLOCK_NOTICE: Once = Once::new();

/// Records elapsed time and hit counts between numbered checkpoints, per execution context.
///
/// Create an engine via [`Engine::builder()`]. Share it by reference (or `Arc`) with all the
/// code that records checkpoints. For a lazily initialized engine with an explicit lifecycle,
/// see [`EngineCell`][crate::EngineCell].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use checkpoint_timer::{Engine, ReportOptions};
///
/// # fn main() -> checkpoint_timer::Result<()> {
/// let engine = Arc::new(Engine::builder().max_contexts(4).locking(false).build());
///
/// let workers = (0..4)
///     .map(|_| {
///         let engine = Arc::clone(&engine);
///         thread::spawn(move || -> checkpoint_timer::Result<()> {
///             engine.checkpoint(0)?;
///             for _ in 0..100 {
///                 engine.checkpoint(1)?;
///                 std::hint::black_box((0..100).sum::<u64>());
///                 engine.checkpoint(2)?;
///             }
///             Ok(())
///         })
///     })
///     .collect::<Vec<_>>();
///
/// for worker in workers {
///     worker.join().unwrap()?;
/// }
///
/// // Recording has finished, so reporting without locking is safe.
/// engine.report(&mut std::io::stdout(), &ReportOptions::all())?;
/// # Ok(())
/// # }
/// ```
///
/// # Thread safety
///
/// The engine is thread-safe. Each execution context must only be used by one thread at a time,
/// which is automatically the case for the default per-thread contexts.
pub struct Engine {
    state: AtomicU8,
    registry: Registry,

    // Present only in locking mode.
    update_lock: Option<Mutex<()>>,

    checkpoint_count: NonZero<usize>,
    platform: PlatformFacade,
}

impl Engine {
    /// Creates a builder for configuring a new engine.
    #[cfg_attr(test, mutants::skip)] // Gets replaced with itself by different name, bad mutation.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) fn new(builder: EngineBuilder) -> Self {
        let EngineBuilder {
            max_contexts,
            locking,
            checkpoint_count,
            platform,
        } = builder;

        if let Err(error) = platform.probe_thread_clock() {
            CLOCK_NOTICE.call_once(|| {
                warn!(
                    %error,
                    "per-thread processor time clock is unavailable; timestamps may be inconsistent across processors"
                );
            });
        }

        debug!(
            max_contexts,
            locking,
            checkpoint_count = checkpoint_count.get(),
            "checkpoint engine created"
        );

        Self {
            state: AtomicU8::new(STATE_ACTIVE),
            registry: Registry::new(max_contexts, checkpoint_count),
            update_lock: locking.then(|| Mutex::new(())),
            checkpoint_count,
            platform,
        }
    }

    /// Records a hit of checkpoint `id` in the calling thread's context.
    ///
    /// The time since the previous checkpoint hit in the same context (or since the context
    /// registered, for its first checkpoint) is attributed to checkpoint `id`.
    ///
    /// Does nothing while the engine is inactive.
    ///
    /// # Errors
    ///
    /// * [`Error::CapacityExceeded`] if this is the first checkpoint of the calling thread and
    ///   the engine already tracks its maximum number of contexts.
    /// * [`Error::CheckpointOutOfRange`] if `id` is not below the configured checkpoint count
    ///   (release builds only; debug builds panic).
    /// * [`Error::Destroyed`] if the engine has been destroyed.
    #[inline]
    pub fn checkpoint(&self, id: usize) -> Result<()> {
        self.record(ContextId::current_thread(), CheckpointId::new(id))
    }

    /// Records a hit of `checkpoint` in the given execution context.
    ///
    /// The caller must ensure that no other thread records in the same context at the same time.
    ///
    /// # Errors
    ///
    /// Same as [`checkpoint()`](Self::checkpoint).
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `checkpoint` is not below the configured checkpoint count.
    #[inline]
    pub fn record(&self, context: ContextId, checkpoint: CheckpointId) -> Result<()> {
        match self.state.load(Ordering::Relaxed) {
            STATE_ACTIVE => {}
            STATE_DESTROYED => return Err(Error::Destroyed),
            _ => return Ok(()),
        }

        debug_assert!(
            checkpoint.get() < self.checkpoint_count.get(),
            "checkpoint {checkpoint} is out of range 0..{}",
            self.checkpoint_count
        );

        if checkpoint.get() >= self.checkpoint_count.get() {
            return Err(Error::CheckpointOutOfRange {
                checkpoint: checkpoint.get(),
                checkpoint_count: self.checkpoint_count.get(),
            });
        }

        let block = self.registry.resolve(context, &self.platform)?;
        let previous = block.advance(checkpoint);

        let _guard = self.update_lock.as_ref().map(Mutex::lock);

        let now = self.platform.thread_time_nanos();
        block.record(checkpoint, previous, now);

        Ok(())
    }

    /// Starts recording checkpoints or pauses recording, without losing accumulated data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the engine has been destroyed.
    pub fn set_active(&self, active: bool) -> Result<()> {
        let target = if active { STATE_ACTIVE } else { STATE_INACTIVE };

        self.state
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |state| {
                (state != STATE_DESTROYED).then_some(target)
            })
            .map(|_| ())
            .map_err(|_| Error::Destroyed)
    }

    /// Whether checkpoints are currently being recorded.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.load(Ordering::Relaxed) == STATE_ACTIVE
    }

    /// Whether the engine has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.load(Ordering::Relaxed) == STATE_DESTROYED
    }

    /// Whether slot updates and reports are serialized by a mutex.
    #[must_use]
    pub fn is_locking(&self) -> bool {
        self.update_lock.is_some()
    }

    /// The configured context capacity, 0 in single-context mode.
    #[must_use]
    pub fn max_contexts(&self) -> usize {
        self.registry.max_contexts()
    }

    /// How many checkpoint identifiers are valid, starting from 0.
    #[must_use]
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoint_count.get()
    }

    /// How many execution contexts have registered so far.
    #[must_use]
    pub fn registered_contexts(&self) -> usize {
        self.registry.registered_count()
    }

    /// Starts a [`ScopedCheckpoint`] that records `start` now and `start + 1` when dropped.
    ///
    /// # Errors
    ///
    /// Returns the error of recording the start checkpoint, see
    /// [`checkpoint()`](Self::checkpoint).
    pub fn scoped(&self, start: usize) -> Result<ScopedCheckpoint<'_, Self>> {
        ScopedCheckpoint::new(self, start)
    }

    /// Starts a [`ScopedCheckpoint`] that records `start` now and `end` when dropped.
    ///
    /// # Errors
    ///
    /// Returns the error of recording the start checkpoint, see
    /// [`checkpoint()`](Self::checkpoint).
    pub fn scoped_with_end(&self, start: usize, end: usize) -> Result<ScopedCheckpoint<'_, Self>> {
        ScopedCheckpoint::with_end(self, start, end)
    }

    /// Copies the current data of one execution context, if it has registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the engine has been destroyed.
    pub fn context_snapshot(&self, context: ContextId) -> Result<Option<ContextSnapshot>> {
        self.ensure_not_destroyed()?;

        let _guard = self.update_lock.as_ref().map(Mutex::lock);
        Ok(self.registry.snapshot_of(context))
    }

    /// Aggregates the data of all execution contexts into a report.
    ///
    /// In locking mode, recording is blocked while the data is copied. Without locking, the
    /// caller must ensure recording has finished for the report to be consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the engine has been destroyed.
    pub fn to_report(&self) -> Result<Report> {
        self.ensure_not_destroyed()?;

        let snapshots = {
            let _guard = self.update_lock.as_ref().map(Mutex::lock);
            self.registry.snapshots()
        };

        Ok(Report::from_snapshots(
            self.registry.max_contexts(),
            self.registry.registered_count(),
            &snapshots,
        ))
    }

    /// Writes a report of all execution contexts to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the engine has been destroyed or [`Error::Io`] if
    /// writing fails.
    pub fn report(&self, destination: &mut impl Write, options: &ReportOptions) -> Result<()> {
        self.to_report()?.write_to(destination, options)
    }

    /// Prints a report with the default options to stdout.
    ///
    /// # Errors
    ///
    /// See [`report()`](Self::report).
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) -> Result<()> {
        self.report(&mut io::stdout().lock(), &ReportOptions::default())
    }

    /// Destroys the engine, releasing the data of all execution contexts.
    ///
    /// Afterwards, recording and reporting fail with [`Error::Destroyed`]. Call this only after
    /// all recording has finished.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the engine has already been destroyed.
    pub fn destroy(&self) -> Result<()> {
        if self.state.swap(STATE_DESTROYED, Ordering::Relaxed) == STATE_DESTROYED {
            return Err(Error::Destroyed);
        }

        let _guard = self.update_lock.as_ref().map(Mutex::lock);
        self.registry.clear();

        debug!("checkpoint engine destroyed");

        Ok(())
    }

    fn ensure_not_destroyed(&self) -> Result<()> {
        if self.is_destroyed() {
            Err(Error::Destroyed)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("active", &self.is_active())
            .field("destroyed", &self.is_destroyed())
            .field("locking", &self.is_locking())
            .field("max_contexts", &self.max_contexts())
            .field("registered_contexts", &self.registered_contexts())
            .field("checkpoint_count", &self.checkpoint_count)
            .finish_non_exhaustive()
    }
}
