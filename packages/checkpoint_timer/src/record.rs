use std::sync::Arc;

use crate::{Engine, Result};

/// Anything that can record a checkpoint for the calling thread.
///
/// Implemented by [`Engine`], `Arc<Engine>` and [`EngineCell`][crate::EngineCell], so that
/// [`ScopedCheckpoint`][crate::ScopedCheckpoint] and the [`checkpoint!`][crate::checkpoint]
/// macro work with whichever handle the caller holds.
pub trait RecordCheckpoint {
    /// Records a hit of checkpoint `id` in the calling thread's context.
    ///
    /// # Errors
    ///
    /// See [`Engine::checkpoint()`].
    fn checkpoint(&self, id: usize) -> Result<()>;
}

impl RecordCheckpoint for Engine {
    #[inline]
    fn checkpoint(&self, id: usize) -> Result<()> {
        Self::checkpoint(self, id)
    }
}

impl RecordCheckpoint for Arc<Engine> {
    #[inline]
    fn checkpoint(&self, id: usize) -> Result<()> {
        Engine::checkpoint(self, id)
    }
}

impl<R> RecordCheckpoint for &R
where
    R: RecordCheckpoint + ?Sized,
{
    #[inline]
    fn checkpoint(&self, id: usize) -> Result<()> {
        (**self).checkpoint(id)
    }
}
