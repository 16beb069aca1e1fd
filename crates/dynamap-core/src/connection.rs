//! Connection manager: lazy store connection and table handle binding.

use crate::{
    cache::Cache,
    config::{ConnectionConfig, ConfigError, TableConfig},
    error::Error,
    obs::{CacheMetrics, CacheMetricsSnapshot},
    schema::{RecordShape, ShapeRegistry},
    store::{Connector, Store},
    table::{Table, TableInner},
};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard},
};
use tracing::debug;

///
/// ConnectionInner
///

pub(crate) struct ConnectionInner {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    cache: Option<Arc<dyn Cache>>,
    registry: RwLock<ShapeRegistry>,
    store: Mutex<Option<Arc<dyn Store>>>,
    tables: Mutex<HashMap<String, Table>>,
    metrics: Arc<CacheMetrics>,
}

///
/// Connection
///
/// Owns the store connection, the shape registry and the per-name table
/// handle cache. The store connection is established on first use and
/// released by [`Connection::reset`]. Cheap to clone; clones share state.
///

#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    pub fn builder(config: ConnectionConfig) -> ConnectionBuilder {
        ConnectionBuilder {
            config,
            connector: None,
            cache: None,
            registry: ShapeRegistry::new(),
        }
    }

    pub(crate) const fn from_inner(inner: Arc<ConnectionInner>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn cache(&self) -> Option<&Arc<dyn Cache>> {
        self.inner.cache.as_ref()
    }

    /// Read access to the shape registry.
    pub fn registry(&self) -> RwLockReadGuard<'_, ShapeRegistry> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a shape after construction. A handle already bound for that
    /// table name is dropped so the next lookup picks the new shape up.
    ///
    /// Lock order: the registry is released before the handle cache is
    /// taken; [`Connection::table`] takes the handle cache first.
    pub fn register(&self, shape: RecordShape) -> Option<Arc<RecordShape>> {
        let name = shape.table_name().to_string();
        let previous = self
            .inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(shape);
        self.lock_tables().remove(&name);

        previous
    }

    #[must_use]
    pub fn cache_metrics(&self) -> CacheMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    ///
    /// STORE
    ///

    /// The store connection, established through the connector on first
    /// use.
    pub fn store(&self) -> Result<Arc<dyn Store>, Error> {
        let mut slot = self
            .inner
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }

        let store = self.inner.connector.connect(&self.inner.config)?;
        debug!(endpoint = ?self.inner.config.endpoint, "store connection established");
        *slot = Some(Arc::clone(&store));

        Ok(store)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Release the store connection and every bound table handle.
    ///
    /// The side cache is left alone. Handles obtained before the reset keep
    /// working against the connection they were bound with.
    pub fn reset(&self) {
        let dropped = self
            .inner
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        let mut tables = self.lock_tables();
        let handles = tables.len();
        tables.clear();

        debug!(connected = dropped, handles, "connection reset");
    }

    ///
    /// TABLES
    ///

    /// Handle for `name`, bound with its registered shape (or the fallback)
    /// and cached until the next reset.
    ///
    /// The handle cache stays locked while binding, so a concurrent
    /// [`Connection::register`] either sees the new handle and drops it or
    /// lands before the shape is resolved.
    pub fn table(&self, name: &str) -> Result<Table, Error> {
        let mut tables = self.lock_tables();
        if let Some(table) = tables.get(name) {
            return Ok(table.clone());
        }

        let shape = self.registry().resolve(name);
        let table = self.bind(name, shape)?;
        tables.insert(name.to_string(), table.clone());

        Ok(table)
    }

    /// Handle for `name` bound with an explicit shape. Not cached.
    pub fn table_with(
        &self,
        name: &str,
        shape: impl Into<Arc<RecordShape>>,
    ) -> Result<Table, Error> {
        self.bind(name, shape.into())
    }

    /// Cache settings: table config over shape over connection default.
    fn bind(&self, name: &str, shape: Arc<RecordShape>) -> Result<Table, Error> {
        let store = self.store()?;
        let config = &self.inner.config;
        let table_config = config.table(name);

        let cache_ttl = table_config
            .and_then(TableConfig::cache_ttl)
            .or_else(|| shape.cache_ttl())
            .or_else(|| config.default_cache_ttl());
        let cache_prefix = table_config
            .and_then(|c| c.cache_prefix.clone())
            .or_else(|| shape.cache_prefix().map(str::to_string));

        debug!(table = name, ?cache_ttl, "binding table handle");

        Ok(Table::new(TableInner {
            name: name.to_string(),
            shape,
            store,
            cache: self.inner.cache.clone(),
            cache_ttl,
            cache_prefix,
            metrics: Arc::clone(&self.inner.metrics),
            connection: Arc::downgrade(&self.inner),
        }))
    }

    fn lock_tables(&self) -> MutexGuard<'_, HashMap<String, Table>> {
        self.inner
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.inner.config)
            .field("connected", &self.is_connected())
            .field("cache", &self.inner.cache.is_some())
            .field("shapes", &self.registry().len())
            .finish_non_exhaustive()
    }
}

///
/// ConnectionBuilder
///

pub struct ConnectionBuilder {
    config: ConnectionConfig,
    connector: Option<Arc<dyn Connector>>,
    cache: Option<Arc<dyn Cache>>,
    registry: ShapeRegistry,
}

impl ConnectionBuilder {
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn register(mut self, shape: RecordShape) -> Self {
        self.registry.register(shape);
        self
    }

    /// Shape for tables with no registration.
    #[must_use]
    pub fn fallback(mut self, shape: RecordShape) -> Self {
        self.registry = self.registry.with_fallback(shape);
        self
    }

    /// Validate the configuration and assemble the manager. Nothing is
    /// connected yet.
    pub fn build(self) -> Result<Connection, Error> {
        self.config.validate()?;
        let connector = self.connector.ok_or(ConfigError::MissingConnector)?;

        Ok(Connection::from_inner(Arc::new(ConnectionInner {
            config: self.config,
            connector,
            cache: self.cache,
            registry: RwLock::new(self.registry),
            store: Mutex::new(None),
            tables: Mutex::new(HashMap::new()),
            metrics: Arc::new(CacheMetrics::new()),
        })))
    }
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("config", &self.config)
            .field("connector", &self.connector.is_some())
            .field("cache", &self.cache.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}

///
/// TESTS
///
