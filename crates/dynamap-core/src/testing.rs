use crate::{
    config::{ConnectionConfig, Credentials},
    connection::{Connection, ConnectionBuilder},
    memory::{MemoryCache, MemoryConnector, MemoryStore},
    schema::RecordShape,
};
use std::{sync::Arc, time::Duration};

/// Memory store holding empty tables `(name, hash_key, range_key)`.
pub(crate) fn memory_store(tables: &[(&str, &str, Option<&str>)]) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for (name, hash_key, range_key) in tables {
        store.create_table(name, hash_key, *range_key);
    }

    Arc::new(store)
}

/// Cache-less connection over `store` with `shapes` registered.
pub(crate) fn connection_with(store: &Arc<MemoryStore>, shapes: Vec<RecordShape>) -> Connection {
    shapes
        .into_iter()
        .fold(builder(store), ConnectionBuilder::register)
        .build()
        .expect("test connection should build")
}

/// Connection over `store` with a write-through cache (60 s default ttl).
pub(crate) fn cached_connection_with(
    store: &Arc<MemoryStore>,
    cache: &Arc<MemoryCache>,
    shapes: Vec<RecordShape>,
) -> Connection {
    let builder = builder(store).cache(cache.clone());

    shapes
        .into_iter()
        .fold(builder, ConnectionBuilder::register)
        .build()
        .expect("test connection should build")
}

fn builder(store: &Arc<MemoryStore>) -> ConnectionBuilder {
    let config = ConnectionConfig::new(Credentials::new("test", "test"))
        .with_default_cache_ttl(Duration::from_secs(60));

    Connection::builder(config).connector(Arc::new(MemoryConnector::new(Arc::clone(store))))
}
