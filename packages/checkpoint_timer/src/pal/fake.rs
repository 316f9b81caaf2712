//! Fake platform implementation for testing.

use std::io;
use std::sync::{Arc, Mutex};

use crate::pal::abstractions::Platform;

const ERR_FAKE_STATE_POISONED: &str = "FakePlatform state lock should not be poisoned";

/// Internal state for the fake platform that can be shared between clones.
#[derive(Debug)]
struct FakePlatformState {
    now: u64,
    step: u64,
    probe_fails: bool,
}

/// Fake implementation of the platform abstraction for testing.
///
/// Every clock read returns the current fake time and then advances it by the configured step,
/// so a test can make consecutive checkpoints exactly `step` nanoseconds apart. Clones share
/// the same state, allowing tests to adjust the time after the engine has been built.
#[derive(Clone, Debug)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    /// Creates a new fake platform whose clock stands still at zero.
    pub(crate) fn new() -> Self {
        Self::with_step(0)
    }

    /// Creates a new fake platform whose clock advances by `step` after every read.
    pub(crate) fn with_step(step: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakePlatformState {
                now: 0,
                step,
                probe_fails: false,
            })),
        }
    }

    /// Sets the timestamp returned by the next clock read.
    pub(crate) fn set_time(&self, now: u64) {
        self.state.lock().expect(ERR_FAKE_STATE_POISONED).now = now;
    }

    /// Sets how far the clock advances after every read.
    pub(crate) fn set_step(&self, step: u64) {
        self.state.lock().expect(ERR_FAKE_STATE_POISONED).step = step;
    }

    /// Makes the clock probe report that the thread clock is unavailable.
    pub(crate) fn fail_probe(&self) {
        self.state.lock().expect(ERR_FAKE_STATE_POISONED).probe_fails = true;
    }
}

impl Platform for FakePlatform {
    fn thread_time_nanos(&self) -> u64 {
        let mut state = self.state.lock().expect(ERR_FAKE_STATE_POISONED);
        let now = state.now;
        state.now = now.saturating_add(state.step);
        now
    }

    fn probe_thread_clock(&self) -> io::Result<()> {
        if self.state.lock().expect(ERR_FAKE_STATE_POISONED).probe_fails {
            Err(io::Error::other("fake thread clock unavailable"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn initializes_with_zero_time() {
        let platform = FakePlatform::new();

        assert_eq!(platform.thread_time_nanos(), 0);
        assert_eq!(platform.thread_time_nanos(), 0);
    }

    #[test]
    fn advances_by_step_after_each_read() {
        let platform = FakePlatform::with_step(100);
        platform.set_time(1_000);

        assert_eq!(platform.thread_time_nanos(), 1_000);
        assert_eq!(platform.thread_time_nanos(), 1_100);

        platform.set_step(5);
        assert_eq!(platform.thread_time_nanos(), 1_200);
        assert_eq!(platform.thread_time_nanos(), 1_205);
    }

    #[test]
    fn shared_state_between_clones() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();

        platform1.set_time(42);
        assert_eq!(platform2.thread_time_nanos(), 42);

        platform2.fail_probe();
        platform1.probe_thread_clock().unwrap_err();
    }
}
