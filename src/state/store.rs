//! MediaStore - the single live MediaState instance
//!
//! Cloning a `MediaStore` yields another handle to the same state. Writes are
//! reserved to the event interpreter inside this crate; everything else reads.

use parking_lot::RwLock;
use std::sync::Arc;

use super::types::MediaState;

/// Shared handle to the current media state
#[derive(Clone, Default)]
pub struct MediaStore {
    inner: Arc<RwLock<MediaState>>,
}

impl MediaStore {
    /// Create a store holding the initial (disconnected, paused, no track) state
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> MediaState {
        self.inner.read().clone()
    }

    /// Run a read-only closure against the current state
    pub fn read<R>(&self, f: impl FnOnce(&MediaState) -> R) -> R {
        f(&self.inner.read())
    }

    /// Mutate the state in place
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut MediaState) -> R) -> R {
        f(&mut self.inner.write())
    }
}
