use std::mem;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::{Engine, EngineBuilder, Error, RecordCheckpoint, Result};

const ERR_POISONED_LOCK: &str = "poisoned lock - safe execution no longer possible";

/// Lifecycle stage of an [`EngineCell`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Lifecycle {
    /// No engine has been created yet.
    Uninitialized,

    /// An engine exists and accepts checkpoints.
    Initialized,

    /// The engine has been destroyed. This is a terminal stage.
    Destroyed,
}

#[derive(Debug)]
enum CellState {
    Uninitialized,
    Initialized(Arc<Engine>),
    Destroyed,
}

/// Holds at most one [`Engine`] over the lifetime of the cell, with an explicit lifecycle.
///
/// Typically used as a `static` shared by all instrumented code. The engine is created either
/// explicitly via [`initialize()`](Self::initialize) or lazily with the default configuration
/// on first use. After [`destroy()`](Self::destroy), the cell refuses all further use.
///
/// # Example
///
/// ```
/// use checkpoint_timer::{Engine, EngineCell, Lifecycle};
///
/// static PROFILER: EngineCell = EngineCell::new();
///
/// # fn main() -> checkpoint_timer::Result<()> {
/// assert_eq!(PROFILER.lifecycle(), Lifecycle::Uninitialized);
///
/// PROFILER.initialize(Engine::builder().max_contexts(4))?;
/// PROFILER.instance()?.checkpoint(0)?;
///
/// PROFILER.destroy()?;
/// assert_eq!(PROFILER.lifecycle(), Lifecycle::Destroyed);
/// assert!(PROFILER.instance().is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EngineCell {
    state: RwLock<CellState>,
}

impl EngineCell {
    /// Creates an empty cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RwLock::new(CellState::Uninitialized),
        }
    }

    /// Creates the engine of this cell from `builder`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] if an engine already exists (including one created
    /// lazily by [`instance()`](Self::instance)) or [`Error::Destroyed`] if the cell has been
    /// destroyed.
    pub fn initialize(&self, builder: EngineBuilder) -> Result<Arc<Engine>> {
        let mut state = self.state.write().expect(ERR_POISONED_LOCK);

        match &*state {
            CellState::Uninitialized => {
                let engine = Arc::new(builder.build());
                *state = CellState::Initialized(Arc::clone(&engine));
                Ok(engine)
            }
            CellState::Initialized(_) => Err(Error::AlreadyInitialized),
            CellState::Destroyed => Err(Error::Destroyed),
        }
    }

    /// Returns the engine of this cell, creating one with the default configuration if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the cell has been destroyed.
    pub fn instance(&self) -> Result<Arc<Engine>> {
        match &*self.state.read().expect(ERR_POISONED_LOCK) {
            CellState::Initialized(engine) => return Ok(Arc::clone(engine)),
            CellState::Destroyed => return Err(Error::Destroyed),
            CellState::Uninitialized => {}
        }

        self.initialize_default()
    }

    #[cold]
    fn initialize_default(&self) -> Result<Arc<Engine>> {
        let mut state = self.state.write().expect(ERR_POISONED_LOCK);

        // Another thread may have initialized the cell between our read and write lock.
        match &*state {
            CellState::Initialized(engine) => Ok(Arc::clone(engine)),
            CellState::Destroyed => Err(Error::Destroyed),
            CellState::Uninitialized => {
                debug!("lazily creating checkpoint engine with default configuration");

                let engine = Arc::new(Engine::builder().build());
                *state = CellState::Initialized(Arc::clone(&engine));
                Ok(engine)
            }
        }
    }

    /// Destroys the engine of this cell, releasing its data. The cell cannot be used afterwards.
    ///
    /// Handles to the engine obtained earlier observe the destruction: recording and reporting
    /// through them fails with [`Error::Destroyed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if no engine was ever created or [`Error::Destroyed`]
    /// if the cell has already been destroyed.
    pub fn destroy(&self) -> Result<()> {
        let mut state = self.state.write().expect(ERR_POISONED_LOCK);

        match mem::replace(&mut *state, CellState::Destroyed) {
            CellState::Initialized(engine) => engine.destroy(),
            CellState::Uninitialized => {
                *state = CellState::Uninitialized;
                Err(Error::NotInitialized)
            }
            CellState::Destroyed => Err(Error::Destroyed),
        }
    }

    /// The current lifecycle stage of the cell.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        match &*self.state.read().expect(ERR_POISONED_LOCK) {
            CellState::Uninitialized => Lifecycle::Uninitialized,
            CellState::Initialized(_) => Lifecycle::Initialized,
            CellState::Destroyed => Lifecycle::Destroyed,
        }
    }
}

impl Default for EngineCell {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordCheckpoint for EngineCell {
    #[inline]
    fn checkpoint(&self, id: usize) -> Result<()> {
        self.instance()?.checkpoint(id)
    }
}
