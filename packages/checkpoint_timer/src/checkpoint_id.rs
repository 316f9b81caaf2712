use std::fmt;

/// Identifies one checkpoint within an execution context.
///
/// Checkpoint identifiers are small integers in the range `0..checkpoint_count`, where the
/// count is configured on the [`EngineBuilder`][crate::EngineBuilder]. The range is validated
/// when the identifier is used with an engine, not when it is created, so identifiers can be
/// defined as constants:
///
/// ```
/// use checkpoint_timer::CheckpointId;
///
/// const PARSE_DONE: CheckpointId = CheckpointId::new(2);
///
/// assert_eq!(PARSE_DONE.get(), 2);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CheckpointId(usize);

impl CheckpointId {
    /// Creates a checkpoint identifier from its numeric value.
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// The numeric value of the identifier, usable as a slot index.
    #[must_use]
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    /// The identifier that follows this one, used as the default end of a scoped checkpoint.
    ///
    /// Saturates at `usize::MAX`, which is never a valid slot index.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<usize> for CheckpointId {
    fn from(id: usize) -> Self {
        Self::new(id)
    }
}

impl From<CheckpointId> for usize {
    fn from(id: CheckpointId) -> Self {
        id.get()
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn next_increments() {
        assert_eq!(CheckpointId::new(4).next(), CheckpointId::new(5));
    }

    #[test]
    fn next_saturates() {
        assert_eq!(
            CheckpointId::new(usize::MAX).next(),
            CheckpointId::new(usize::MAX)
        );
    }

    #[test]
    fn converts_to_and_from_usize() {
        let id = CheckpointId::from(7_usize);

        assert_eq!(usize::from(id), 7);
        assert_eq!(id.to_string(), "7");
    }

    static_assertions::assert_impl_all!(CheckpointId: Send, Sync, Copy);
}
