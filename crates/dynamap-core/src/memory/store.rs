use crate::{
    store::{GetOptions, PutOptions, QueryRequest, RowStream, ScanRequest, Store, StoreError},
    value::{Key, Row, Value},
};
use std::{
    cmp::Ordering as CmpOrdering,
    collections::{BTreeMap, HashMap},
    sync::{
        PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

///
/// MemoryTable
///

#[derive(Debug)]
struct MemoryTable {
    hash_key: String,
    range_key: Option<String>,
    rows: BTreeMap<Key, Row>,
}

impl MemoryTable {
    fn check_key(&self, table: &str, key: &Key) -> Result<(), StoreError> {
        match (&self.range_key, &key.range) {
            (Some(_), None) => Err(StoreError::InvalidRequest(format!(
                "table '{table}' requires a range key"
            ))),
            (None, Some(_)) => Err(StoreError::InvalidRequest(format!(
                "table '{table}' has no range key"
            ))),
            _ => Ok(()),
        }
    }

    fn key_of(&self, table: &str, row: &Row) -> Result<Key, StoreError> {
        row.key(&self.hash_key, self.range_key.as_deref())
            .map_err(|err| StoreError::InvalidRequest(format!("table '{table}': {err}")))
    }
}

///
/// MemoryStore
///
/// In-process store with one ordered map per table. Tables must be created
/// up front with their key schema, as in the real store.
///
/// Query and scan results are snapshotted when the call is made and
/// streamed lazily from the snapshot.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
    unavailable: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryStore::create_table`].
    #[must_use]
    pub fn with_table(self, name: &str, hash_key: &str, range_key: Option<&str>) -> Self {
        self.create_table(name, hash_key, range_key);
        self
    }

    /// Create (or recreate, dropping its rows) a table.
    pub fn create_table(&self, name: &str, hash_key: &str, range_key: Option<&str>) {
        self.write_tables().insert(
            name.to_string(),
            MemoryTable {
                hash_key: hash_key.to_string(),
                range_key: range_key.map(str::to_string),
                rows: BTreeMap::new(),
            },
        );
    }

    /// Simulate an outage: every operation fails with `Unavailable` while
    /// set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get_item` calls served.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of accepted `put_item` calls.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Rows currently held by `table`.
    #[must_use]
    pub fn len(&self, table: &str) -> usize {
        self.read_tables().get(table).map_or(0, |t| t.rows.len())
    }

    /// Direct row access, bypassing availability and counters.
    #[must_use]
    pub fn row(&self, table: &str, key: &Key) -> Option<Row> {
        self.read_tables()
            .get(table)
            .and_then(|t| t.rows.get(key).cloned())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }

        Ok(())
    }

    fn read_tables(&self) -> RwLockReadGuard<'_, HashMap<String, MemoryTable>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, HashMap<String, MemoryTable>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn project(row: Row, attributes: Option<&[String]>) -> Row {
    match attributes {
        Some(attributes) => row.project(attributes),
        None => row,
    }
}

fn stream(rows: Vec<Row>) -> RowStream {
    Box::new(rows.into_iter().map(Ok))
}

impl Store for MemoryStore {
    fn get_item(
        &self,
        table: &str,
        key: &Key,
        options: &GetOptions,
    ) -> Result<Option<Row>, StoreError> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        let tables = self.read_tables();
        let entry = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        entry.check_key(table, key)?;

        Ok(entry
            .rows
            .get(key)
            .cloned()
            .map(|row| project(row, options.attributes.as_deref())))
    }

    fn put_item(&self, table: &str, row: &Row, options: PutOptions) -> Result<bool, StoreError> {
        self.check_available()?;

        let mut tables = self.write_tables();
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let key = entry.key_of(table, row)?;

        if !options.overwrite && entry.rows.contains_key(&key) {
            return Ok(false);
        }
        entry.rows.insert(key, row.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);

        Ok(true)
    }

    fn delete_item(&self, table: &str, key: &Key) -> Result<bool, StoreError> {
        self.check_available()?;

        let mut tables = self.write_tables();
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        entry.check_key(table, key)?;

        Ok(entry.rows.remove(key).is_some())
    }

    fn query(&self, table: &str, request: &QueryRequest) -> Result<RowStream, StoreError> {
        self.check_available()?;

        let tables = self.read_tables();
        let entry = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        if request.index.is_none() && request.hash_key != entry.hash_key {
            return Err(StoreError::InvalidRequest(format!(
                "`{}` is not the hash key of table '{table}'",
                request.hash_key
            )));
        }

        let hash = Value::from(request.hash.clone());
        let mut rows: Vec<Row> = entry
            .rows
            .values()
            .filter(|row| row.get(&request.hash_key) == Some(&hash))
            .filter(|row| {
                request
                    .range
                    .as_ref()
                    .is_none_or(|(name, condition)| condition.matches(row.get(name)))
            })
            .filter(|row| {
                request
                    .filter
                    .iter()
                    .all(|(name, condition)| condition.matches(row.get(name)))
            })
            .cloned()
            .collect();

        // without a range condition, base-table queries keep range-key order
        let order_by = match (&request.range, &request.index) {
            (Some((name, _)), _) => Some(name.clone()),
            (None, None) => entry.range_key.clone(),
            (None, Some(_)) => None,
        };
        drop(tables);

        if let Some(name) = order_by {
            rows.sort_by(|a, b| compare_attribute(a, b, &name));
        }
        if request.reverse {
            rows.reverse();
        }
        if let Some(limit) = request.limit {
            rows.truncate(limit);
        }

        let attributes = request.attributes.as_deref();
        let rows = rows.into_iter().map(|row| project(row, attributes)).collect();

        Ok(stream(rows))
    }

    fn scan(&self, table: &str, request: &ScanRequest) -> Result<RowStream, StoreError> {
        self.check_available()?;

        let tables = self.read_tables();
        let entry = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let attributes = request.attributes.as_deref();
        let rows = entry
            .rows
            .values()
            .filter(|row| request.accepts(row))
            .take(request.limit.unwrap_or(usize::MAX))
            .map(|row| project(row.clone(), attributes))
            .collect();

        Ok(stream(rows))
    }
}

fn compare_attribute(a: &Row, b: &Row, name: &str) -> CmpOrdering {
    a.get(name).cmp(&b.get(name))
}

///
/// TESTS
///
