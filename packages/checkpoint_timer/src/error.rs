use std::io;

use thiserror::Error;

/// Errors reported by the checkpoint engine.
///
/// Recording a checkpoint in steady state never fails. Errors surface from the cold paths:
/// first-time registration of a context, lifecycle transitions and writing reports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A previously unseen execution context tried to register but the engine already tracks
    /// as many contexts as it was configured for.
    #[error("cannot register another execution context: the engine is limited to {max_contexts} contexts")]
    CapacityExceeded {
        /// The configured context capacity of the engine.
        max_contexts: usize,
    },

    /// The checkpoint identifier is not below the configured checkpoint count.
    #[error("checkpoint {checkpoint} is out of range: the engine tracks checkpoints 0..{checkpoint_count}")]
    CheckpointOutOfRange {
        /// The offending checkpoint identifier.
        checkpoint: usize,

        /// The number of checkpoints the engine was configured with.
        checkpoint_count: usize,
    },

    /// The engine cell already holds an engine.
    #[error("the engine has already been initialized")]
    AlreadyInitialized,

    /// The engine cell was asked to destroy an engine it never created.
    #[error("the engine has not been initialized")]
    NotInitialized,

    /// The engine has been destroyed and its data released.
    #[error("the engine has been destroyed")]
    Destroyed,

    /// Writing a report to its destination failed.
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// A specialized `Result` type for checkpoint engine operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
