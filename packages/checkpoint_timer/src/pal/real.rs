//! Real platform implementation using the per-thread processor time clock.

use std::io;

use cpu_time::ThreadTime;

use crate::pal::abstractions::Platform;

/// Real implementation of the platform abstraction using the `cpu_time` crate.
#[derive(Debug, Clone)]
pub(crate) struct RealPlatform;

impl Platform for RealPlatform {
    #[inline]
    fn thread_time_nanos(&self) -> u64 {
        // A clock failure has already been reported by `probe_thread_clock()` when the engine
        // was built, so here it only degrades to a zero timestamp.
        ThreadTime::try_now().map_or(0, |time| {
            u64::try_from(time.as_duration().as_nanos()).unwrap_or(u64::MAX)
        })
    }

    fn probe_thread_clock(&self) -> io::Result<()> {
        ThreadTime::try_now().map(|_| ())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[cfg_attr(miri, ignore)] // Miri cannot call into the platform clock.
    #[test]
    fn thread_time_does_not_go_backwards() {
        let platform = RealPlatform;

        let first = platform.thread_time_nanos();
        std::hint::black_box((0..10_000_u64).sum::<u64>());
        let second = platform.thread_time_nanos();

        assert!(second >= first);
    }

    #[cfg_attr(miri, ignore)] // Miri cannot call into the platform clock.
    #[test]
    fn thread_clock_is_available() {
        RealPlatform.probe_thread_clock().unwrap();
    }
}
