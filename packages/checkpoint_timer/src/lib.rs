#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Low-overhead recording of elapsed time and hit counts between numbered checkpoints.
//!
//! Instrumented code marks phase boundaries by calling [`Engine::checkpoint()`] with a small
//! integer identifier. For every execution context (by default, every thread) the engine tracks
//! how many times each checkpoint was hit and how much thread processor time elapsed between the
//! previous checkpoint hit in that context and this one. A [`Report`] later merges the per-context
//! data into summary statistics.
//!
//! The recording path is designed for code where conventional tracing would distort the
//! measurement: after a context has registered itself, recording a checkpoint performs no heap
//! allocation, takes only a shared registry lock and (if enabled) one short mutex.
//!
//! # Recording checkpoints
//!
//! ```
//! use checkpoint_timer::Engine;
//!
//! # fn main() -> checkpoint_timer::Result<()> {
//! let engine = Engine::builder().build();
//!
//! engine.checkpoint(0)?;
//!
//! for _ in 0..10 {
//!     engine.checkpoint(1)?;
//!     // Phase A - attributed to checkpoint 2.
//!     std::hint::black_box((0..100).sum::<u64>());
//!     engine.checkpoint(2)?;
//!     // Phase B - attributed to checkpoint 3.
//!     std::hint::black_box((0..1000).sum::<u64>());
//!     engine.checkpoint(3)?;
//! }
//!
//! engine.checkpoint(4)?;
//!
//! println!("{}", engine.to_report()?);
//! # Ok(())
//! # }
//! ```
//!
//! The time attributed to a checkpoint is the time since the previous checkpoint hit in the same
//! context, not since the previous hit of the same checkpoint. Checkpoints model the boundaries
//! between sequential phases of work.
//!
//! # Bracketing a scope
//!
//! [`ScopedCheckpoint`] records a checkpoint when created and another one when dropped, on every
//! exit path from the scope:
//!
//! ```
//! use checkpoint_timer::{Engine, ScopedCheckpoint};
//!
//! # fn main() -> checkpoint_timer::Result<()> {
//! let engine = Engine::builder().build();
//!
//! {
//!     // Records checkpoint 5 now and checkpoint 6 at the end of the scope.
//!     let _scope = ScopedCheckpoint::new(&engine, 5)?;
//!     std::hint::black_box((0..100).sum::<u64>());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Lifecycle management
//!
//! An [`Engine`] can be owned and passed around directly. When many call sites need the same
//! engine, an [`EngineCell`] (typically a `static`) tracks the lifecycle and lazily creates an
//! engine with the default configuration on first use:
//!
//! ```
//! use checkpoint_timer::{Engine, EngineCell, checkpoint};
//!
//! static PROFILER: EngineCell = EngineCell::new();
//!
//! # fn main() -> checkpoint_timer::Result<()> {
//! PROFILER.initialize(Engine::builder().max_contexts(8).locking(false))?;
//!
//! checkpoint!(PROFILER, 0)?;
//! checkpoint!(PROFILER, 1)?;
//!
//! PROFILER.instance()?.print_to_stdout()?;
//! PROFILER.destroy()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Locking mode
//!
//! With locking enabled (the default), slot updates and report snapshots are serialized by a
//! single mutex, so a report taken while other threads are still recording is internally
//! consistent. If reports are only produced after all recording has finished, disable locking
//! for maximum recording throughput.
//!
//! # Panic policy
//!
//! The recording path does not panic for arithmetic reasons. Checkpoint identifiers outside the
//! configured range trigger a debug assertion; release builds return
//! [`Error::CheckpointOutOfRange`] instead.

mod checkpoint_id;
mod context;
mod engine;
mod engine_builder;
mod engine_cell;
mod error;
mod pal;
mod record;
mod registry;
mod report;
mod scoped;
mod slot;
mod time_unit;

pub use checkpoint_id::*;
pub use context::{ContextId, ContextSnapshot};
pub(crate) use context::ContextBlock;
pub use engine::*;
pub use engine_builder::*;
pub use engine_cell::*;
pub use error::*;
pub use record::*;
pub(crate) use registry::Registry;
pub use report::*;
pub use scoped::*;
pub use slot::*;
pub use time_unit::*;

/// Records a checkpoint on an [`Engine`], `Arc<Engine>` or [`EngineCell`].
///
/// Shorthand for [`RecordCheckpoint::checkpoint()`], evaluating to its `Result`.
///
/// ```
/// use checkpoint_timer::{Engine, checkpoint};
///
/// let engine = Engine::builder().build();
/// checkpoint!(engine, 3).unwrap();
/// ```
#[macro_export]
macro_rules! checkpoint {
    ($target:expr, $id:expr) => {
        $crate::RecordCheckpoint::checkpoint(&$target, $id)
    };
}
