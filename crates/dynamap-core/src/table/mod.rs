//! Table handles: cache-aware reads and writes against one store table.
//!
//! The store is authoritative. The side cache is written through after
//! successful store writes and invalidated after deletes; every cache
//! failure is absorbed here, logged and counted, and never surfaces to the
//! caller.

mod cache_key;
mod query;
mod records;

#[cfg(test)]
mod tests;

use crate::{
    cache::Cache,
    connection::{Connection, ConnectionInner},
    error::{Error, ErrorClass, ErrorOrigin},
    obs::{CacheEvent, CacheMetrics},
    record::Record,
    schema::RecordShape,
    serialize::{deserialize, serialize},
    store::{GetOptions, PutOptions, ScanRequest, Store},
    value::{Key, KeyValue, Row},
};
use std::{
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};
use tracing::{debug, warn};

// re-exports
pub use cache_key::{CACHE_KEY_LEN, cache_key};
pub use query::{Query, QueryIndex};
pub use records::{Fetched, Records};

///
/// TableInner
///

pub(crate) struct TableInner {
    pub(crate) name: String,
    pub(crate) shape: Arc<RecordShape>,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) cache: Option<Arc<dyn Cache>>,
    pub(crate) cache_ttl: Option<Duration>,
    pub(crate) cache_prefix: Option<String>,
    pub(crate) metrics: Arc<CacheMetrics>,
    pub(crate) connection: Weak<ConnectionInner>,
}

///
/// Table
///
/// Handle bound to one store table: its record shape, key schema, cache
/// and cache settings. Cheap to clone; clones share the binding.
///

#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl Table {
    pub(crate) fn new(inner: TableInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn shape(&self) -> &Arc<RecordShape> {
        &self.inner.shape
    }

    #[must_use]
    pub fn hash_key_name(&self) -> &str {
        self.inner.shape.hash_key()
    }

    #[must_use]
    pub fn range_key_name(&self) -> Option<&str> {
        self.inner.shape.range_key()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.inner.cache_ttl
    }

    /// Prefix fed into cache key derivation: the configured prefix, or the
    /// table name.
    #[must_use]
    pub fn cache_prefix(&self) -> &str {
        self.inner.cache_prefix.as_deref().unwrap_or(&self.inner.name)
    }

    #[must_use]
    pub fn has_cache(&self) -> bool {
        self.inner.cache.is_some()
    }

    /// The connection manager this handle was bound by.
    pub fn connection(&self) -> Result<Connection, Error> {
        self.inner
            .connection
            .upgrade()
            .map(Connection::from_inner)
            .ok_or_else(|| {
                Error::connection_unavailable(format!(
                    "connection manager for table '{}' has been dropped",
                    self.name()
                ))
            })
    }

    #[must_use]
    pub fn cache_key(&self, key: &Key) -> String {
        cache_key(self.cache_prefix(), key)
    }

    ///
    /// CREATE
    ///

    /// Build an unsaved record holding `key`. Touches neither store nor
    /// cache.
    pub fn create(&self, key: impl Into<Key>) -> Record {
        self.create_with(key, Row::new())
    }

    /// Build an unsaved record holding `key` and `attributes`. The key
    /// attributes win over same-named entries in `attributes`; a range
    /// component is ignored on a table without a range key.
    pub fn create_with(&self, key: impl Into<Key>, mut attributes: Row) -> Record {
        let key = key.into();

        attributes.insert(self.hash_key_name().to_string(), key.hash.into());
        if let (Some(name), Some(range)) = (self.range_key_name(), key.range) {
            attributes.insert(name.to_string(), range.into());
        }

        Record::from_parts(self.clone(), attributes, true)
    }

    ///
    /// READ
    ///

    /// Read-or-create lookup.
    ///
    /// The cache is consulted first; a hit is rebuilt into a persisted
    /// record without touching the store. On a miss the store is read and
    /// the row written back to the cache.
    ///
    /// **This never reports absence.** A key found in neither cache nor
    /// store yields a fresh unsaved placeholder record (`is_new() == true`)
    /// carrying the requested key, exactly as [`Table::create`] would. Use
    /// [`Table::get_item`] when absence must be observable.
    ///
    /// A hash-only key on a table that declares a range key cannot name a
    /// single row; it runs a query instead and yields
    /// [`Fetched::Matches`].
    pub fn get(&self, key: impl Into<Key>) -> Result<Fetched, Error> {
        let key = key.into();

        if let Some(record) = self.read_cache(&key) {
            return Ok(Fetched::Record(record));
        }

        if key.range.is_none() && self.range_key_name().is_some() {
            return self.query_hash(key.hash).map(Fetched::Matches);
        }

        match self.read_item(&key, &GetOptions::default())? {
            Some(record) => Ok(Fetched::Record(record)),
            None => {
                debug!(table = %self.name(), %key, "row not found; returning placeholder");

                Ok(Fetched::Record(self.create(key)))
            }
        }
    }

    /// Store read that reports a missing row as `NotFound`.
    ///
    /// The cache is not consulted, but a full (unprojected) read is written
    /// back to it. A projected read yields a partial record.
    pub fn get_item(&self, key: &Key, options: &GetOptions) -> Result<Record, Error> {
        self.read_item(key, options)?.ok_or_else(|| {
            Error::not_found(
                ErrorOrigin::Table,
                format!("row {key} not found in table '{}'", self.name()),
            )
        })
    }

    fn read_item(&self, key: &Key, options: &GetOptions) -> Result<Option<Record>, Error> {
        let Some(row) = self.store().get_item(self.name(), key, options)? else {
            return Ok(None);
        };
        if options.attributes.is_some() {
            return Ok(Some(Record::projected(self.clone(), row)));
        }

        let record = Record::from_parts(self.clone(), row, false);
        self.write_cache(&record, "read");

        Ok(Some(record))
    }

    ///
    /// WRITE
    ///

    /// Persist `record`. New records are written conditionally, persisted
    /// ones overwrite.
    ///
    /// Returns `Ok(false)` when the store rejects the write (a row with the
    /// same key already exists and overwrite was not requested); the record
    /// and the cache are left untouched. A partial record is rejected with a
    /// validation error before the store is touched.
    pub fn put(&self, record: &mut Record) -> Result<bool, Error> {
        let options = PutOptions {
            overwrite: !record.is_new(),
        };

        self.put_with(record, options)
    }

    pub fn put_with(&self, record: &mut Record, options: PutOptions) -> Result<bool, Error> {
        let key = record.key()?;

        if record.is_partial() {
            return Err(Error::new(
                ErrorClass::Validation,
                ErrorOrigin::Table,
                format!(
                    "row {key} of table '{}' was read with a projection and cannot be put",
                    self.name()
                ),
            ));
        }

        if !self.store().put_item(self.name(), record.raw(), options)? {
            debug!(table = %self.name(), %key, "conditional put rejected by store");
            return Ok(false);
        }

        record.mark_persisted();
        self.write_cache(record, "put");

        Ok(true)
    }

    /// Delete `record` from the store, mark it new again and invalidate its
    /// cache entry. Returns whether the store held the row.
    pub fn delete(&self, record: &mut Record) -> Result<bool, Error> {
        let key = record.key()?;
        let existed = self.store().delete_item(self.name(), &key)?;

        record.mark_new();
        self.invalidate_cache(&key);

        Ok(existed)
    }

    ///
    /// BULK
    ///

    /// Key-condition query. Results are lazy and bypass the cache.
    pub fn query(&self, query: Query) -> Result<Records, Error> {
        let request = query.into_request(self.name(), self.shape())?;
        let rows = self.store().query(self.name(), &request)?;

        Ok(Records::new(self.clone(), rows, request.attributes.is_some()))
    }

    /// Every row under one hash key.
    pub fn query_hash(&self, hash: impl Into<KeyValue>) -> Result<Records, Error> {
        self.query(Query::hash(hash))
    }

    /// Full table scan. Expensive on large tables.
    pub fn scan(&self, request: ScanRequest) -> Result<Records, Error> {
        let rows = self.store().scan(self.name(), &request)?;

        Ok(Records::new(self.clone(), rows, request.attributes.is_some()))
    }

    /// Every record in the table. Full scan.
    pub fn values(&self) -> Result<Records, Error> {
        self.scan(ScanRequest::new())
    }

    /// Every key in the table. Full scan, projected to the key attributes.
    pub fn keys(&self) -> Result<impl Iterator<Item = Result<Key, Error>> + use<>, Error> {
        let mut attributes = vec![self.hash_key_name().to_string()];
        if let Some(range) = self.range_key_name() {
            attributes.push(range.to_string());
        }

        let records = self.scan(ScanRequest::new().attributes(attributes))?;

        Ok(records.map(|record| record.and_then(|r| r.key())))
    }

    /// Every `(key, record)` pair in the table. Full scan.
    pub fn items(&self) -> Result<impl Iterator<Item = Result<(Key, Record), Error>> + use<>, Error> {
        let records = self.values()?;

        Ok(records.map(|record| {
            let record = record?;
            let key = record.key()?;

            Ok((key, record))
        }))
    }

    ///
    /// CACHE
    ///

    fn read_cache(&self, key: &Key) -> Option<Record> {
        let cache = self.inner.cache.as_ref()?;
        let cache_key = self.cache_key(key);

        let bytes = match cache.get(&cache_key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.inner.metrics.record(CacheEvent::Miss);
                debug!(table = %self.name(), %key, "cache miss");
                return None;
            }
            Err(err) => {
                self.inner.metrics.record(CacheEvent::Miss);
                warn!(table = %self.name(), %key, error = %err, "cache read failed; reading from store");
                return None;
            }
        };

        match deserialize::<Row>(&bytes) {
            Ok(row) => {
                self.inner.metrics.record(CacheEvent::Hit);
                debug!(table = %self.name(), %key, "cache hit");

                Some(Record::from_parts(self.clone(), row, false))
            }
            Err(err) => {
                self.inner.metrics.record(CacheEvent::DecodeFailure);
                warn!(table = %self.name(), %key, error = %err, "undecodable cache entry; reading from store");

                None
            }
        }
    }

    fn write_cache(&self, record: &Record, operation: &'static str) {
        let (Some(cache), Some(ttl)) = (self.inner.cache.as_ref(), self.inner.cache_ttl) else {
            return;
        };

        let written = record.key().and_then(|key| {
            let payload = serialize(record.raw())?;
            cache.set(&self.cache_key(&key), payload, ttl)?;

            Ok(())
        });

        match written {
            Ok(()) => self.inner.metrics.record(CacheEvent::Write),
            Err(err) => {
                self.inner.metrics.record(CacheEvent::WriteFailure);
                warn!(
                    table = %self.name(),
                    operation,
                    error = %err,
                    "cache write failed; store remains authoritative"
                );
            }
        }
    }

    fn invalidate_cache(&self, key: &Key) {
        let Some(cache) = self.inner.cache.as_ref() else {
            return;
        };

        match cache.delete(&self.cache_key(key)) {
            Ok(()) => self.inner.metrics.record(CacheEvent::Invalidation),
            Err(err) => {
                self.inner.metrics.record(CacheEvent::InvalidationFailure);
                warn!(
                    table = %self.name(),
                    %key,
                    error = %err,
                    "cache invalidation failed; entry may be stale until its ttl expires"
                );
            }
        }
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.inner.name)
            .field("hash_key", &self.hash_key_name())
            .field("range_key", &self.range_key_name())
            .field("cache", &self.has_cache())
            .field("cache_ttl", &self.inner.cache_ttl)
            .field("cache_prefix", &self.cache_prefix())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
