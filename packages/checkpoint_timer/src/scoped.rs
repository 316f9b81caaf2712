use std::any::type_name;
use std::fmt;

use tracing::warn;

use crate::{CheckpointId, RecordCheckpoint, Result};

/// Records a start checkpoint when created and an end checkpoint when dropped.
///
/// The end checkpoint is recorded on every path out of the enclosing scope, including early
/// returns and error propagation via `?`. By default the end checkpoint is `start + 1`.
///
/// Errors from recording the end checkpoint cannot be returned from `drop()`; they are logged
/// as warnings instead.
///
/// # Example
///
/// ```
/// use checkpoint_timer::{Engine, ScopedCheckpoint};
///
/// fn parse(engine: &Engine, input: &str) -> Result<u32, Box<dyn std::error::Error>> {
///     // Checkpoint 2 now, checkpoint 3 whichever way we leave this function.
///     let _scope = ScopedCheckpoint::new(engine, 2)?;
///
///     Ok(input.trim().parse()?)
/// }
///
/// let engine = Engine::builder().build();
/// assert!(parse(&engine, "42").is_ok());
/// assert!(parse(&engine, "forty-two").is_err());
/// ```
#[must_use = "the end checkpoint is recorded when the guard is dropped"]
pub struct ScopedCheckpoint<'a, R>
where
    R: RecordCheckpoint + ?Sized,
{
    recorder: &'a R,
    end: usize,
}

impl<'a, R> ScopedCheckpoint<'a, R>
where
    R: RecordCheckpoint + ?Sized,
{
    /// Records `start` and returns a guard that records `start + 1` when dropped.
    ///
    /// # Errors
    ///
    /// Returns the error of recording `start`. No guard is created in that case.
    pub fn new(recorder: &'a R, start: usize) -> Result<Self> {
        Self::with_end(recorder, start, CheckpointId::new(start).next().get())
    }

    /// Records `start` and returns a guard that records `end` when dropped.
    ///
    /// # Errors
    ///
    /// Returns the error of recording `start`. No guard is created in that case.
    pub fn with_end(recorder: &'a R, start: usize, end: usize) -> Result<Self> {
        recorder.checkpoint(start)?;

        Ok(Self { recorder, end })
    }

    /// The checkpoint that is recorded when the guard is dropped.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }
}

impl<R> Drop for ScopedCheckpoint<'_, R>
where
    R: RecordCheckpoint + ?Sized,
{
    fn drop(&mut self) {
        if let Err(error) = self.recorder.checkpoint(self.end) {
            warn!(%error, end = self.end, "failed to record end of scoped checkpoint");
        }
    }
}

impl<R> fmt::Debug for ScopedCheckpoint<'_, R>
where
    R: RecordCheckpoint + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}
