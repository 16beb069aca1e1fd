//! In-process store, cache and connector.
//!
//! Full implementations of the collaborator traits, for tests and local
//! development.

mod cache;
mod store;

use crate::{
    config::ConnectionConfig,
    store::{Connector, Store, StoreError},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

// re-exports
pub use cache::MemoryCache;
pub use store::MemoryStore;

///
/// MemoryConnector
///
/// Hands out one shared [`MemoryStore`] and counts how often it was asked.
///

#[derive(Debug)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
    connects: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryConnector {
    #[must_use]
    pub const fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            connects: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Successful connects so far.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make subsequent connects fail with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, _: &ConnectionConfig) -> Result<Arc<dyn Store>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connect refused".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::clone(&self.store) as Arc<dyn Store>)
    }
}
