//! Platform abstraction trait definitions.

use std::fmt::Debug;
use std::io;

/// Provides the timestamps used to measure time between checkpoints.
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Processor time consumed by the current thread, in nanoseconds.
    ///
    /// Successive calls on the same thread never go backwards.
    fn thread_time_nanos(&self) -> u64;

    /// Checks whether the per-thread processor time clock can be read on this system.
    ///
    /// A failure here is advisory: timestamps may be inconsistent across processors but
    /// recording still proceeds.
    fn probe_thread_clock(&self) -> io::Result<()>;
}
