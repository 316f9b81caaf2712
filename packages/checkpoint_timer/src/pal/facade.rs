//! Platform facade for switching between real and fake implementations.

use std::io;

use crate::pal::abstractions::Platform;
#[cfg(test)]
use crate::pal::fake::FakePlatform;
use crate::pal::real::RealPlatform;

/// Facade that allows switching between real and fake platform implementations.
#[derive(Debug, Clone)]
pub(crate) enum PlatformFacade {
    /// Real platform implementation using the system clock.
    Real(RealPlatform),

    /// Fake platform implementation for testing.
    #[cfg(test)]
    Fake(FakePlatform),
}

impl PlatformFacade {
    /// Creates a new platform facade using the real implementation.
    pub(crate) fn real() -> Self {
        Self::Real(RealPlatform)
    }

    /// Creates a new platform facade using the fake implementation.
    #[cfg(test)]
    pub(crate) fn fake(fake_platform: FakePlatform) -> Self {
        Self::Fake(fake_platform)
    }
}

impl Platform for PlatformFacade {
    #[inline]
    fn thread_time_nanos(&self) -> u64 {
        match self {
            Self::Real(platform) => platform.thread_time_nanos(),
            #[cfg(test)]
            Self::Fake(platform) => platform.thread_time_nanos(),
        }
    }

    fn probe_thread_clock(&self) -> io::Result<()> {
        match self {
            Self::Real(platform) => platform.probe_thread_clock(),
            #[cfg(test)]
            Self::Fake(platform) => platform.probe_thread_clock(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn real_facade_wraps_real_platform() {
        let facade = PlatformFacade::real();
        assert!(matches!(facade, PlatformFacade::Real(_)));
    }

    #[test]
    fn fake_facade_delegates_to_fake() {
        let fake_platform = FakePlatform::new();
        fake_platform.set_time(300);
        let facade = PlatformFacade::fake(fake_platform);

        assert!(matches!(facade, PlatformFacade::Fake(_)));
        assert_eq!(facade.thread_time_nanos(), 300);
    }

    #[test]
    fn fake_facade_delegates_probe() {
        let fake_platform = FakePlatform::new();
        fake_platform.fail_probe();
        let facade = PlatformFacade::fake(fake_platform);

        facade.probe_thread_clock().unwrap_err();
    }
}
