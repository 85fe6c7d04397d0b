//! A session engine shared between threads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use protocol::RenderSnapshot;

use super::{EngineError, SessionEngine};

/// Cloneable handle to one [`SessionEngine`].
///
/// Each call holds the lock for its whole duration, so concurrent callers
/// are serialized and never observe a half-applied transition.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<SessionEngine>>,
}

impl SharedEngine {
    pub fn new(engine: SessionEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Lock the engine. A poisoned lock is recovered: `execute` runs each
    /// transition on a copy of the state and stores it only on completion,
    /// so a panic leaves the previous state in place.
    fn lock(&self) -> MutexGuard<'_, SessionEngine> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn initialize(&self) -> Result<(), EngineError> {
        self.lock().initialize()
    }

    pub fn execute(&self, line: &str) -> RenderSnapshot {
        self.lock().execute(line)
    }

    pub fn set_debug_mode(&self, enabled: bool) {
        self.lock().set_debug_mode(enabled);
    }

    pub fn hop_depth(&self) -> usize {
        self.lock().hop_depth()
    }

    pub fn phase(&self) -> protocol::Phase {
        self.lock().phase()
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut SessionEngine) -> R) -> R {
        f(&mut *self.lock())
    }
}

impl From<SessionEngine> for SharedEngine {
    fn from(engine: SessionEngine) -> Self {
        Self::new(engine)
    }
}
