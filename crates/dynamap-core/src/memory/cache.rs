use crate::cache::{Cache, CacheError};
use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

///
/// CacheEntry
///

#[derive(Debug)]
struct CacheEntry {
    payload: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

///
/// MemoryCache
///
/// In-process TTL cache. Each operation can be made to fail independently
/// to exercise the best-effort cache paths.
///

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    fail_gets: AtomicBool,
    fail_sets: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Store a payload with no expiry, bypassing fault injection.
    pub fn insert_raw(&self, key: &str, payload: Vec<u8>) {
        self.lock().insert(
            key.to_string(),
            CacheEntry {
                payload,
                expires_at: None,
            },
        );
    }

    /// Whether a live entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();

        self.lock().get(key).is_some_and(|entry| entry.is_live(now))
    }

    /// Live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();

        self.lock().values().filter(|entry| entry.is_live(now)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn injected(operation: &str) -> CacheError {
    CacheError::Unavailable(format!("injected {operation} failure"))
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(injected("get"));
        }

        let now = Instant::now();
        let mut entries = self.lock();
        let payload = entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.payload.clone());
        if payload.is_none() {
            entries.remove(key);
        }

        Ok(payload)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(injected("set"));
        }

        self.lock().insert(
            key.to_string(),
            CacheEntry {
                payload: value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }

        self.lock().remove(key);

        Ok(())
    }
}

///
/// TESTS
///
