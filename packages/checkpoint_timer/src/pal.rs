//! Platform abstraction layer for the checkpoint clock.
//!
//! The engine reads timestamps through this layer so tests can substitute a fake clock
//! with fully controlled timestamps instead of the real per-thread processor time clock.

mod abstractions;
mod facade;
#[cfg(test)]
mod fake;
mod real;

pub(crate) use abstractions::Platform;
pub(crate) use facade::PlatformFacade;
#[cfg(test)]
pub(crate) use fake::FakePlatform;
