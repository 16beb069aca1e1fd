//! Shared fixtures for the scenario tests.
//!
//! Every harness runs against the in-memory store and cache so failures
//! can be injected per operation.

#![allow(dead_code)]

use dynamap::{
    core::memory::{MemoryCache, MemoryConnector, MemoryStore},
    design::prelude::*,
    prelude::*,
};
use std::{sync::Arc, time::Duration};

pub static STATUS: Enumeration = Enumeration::new("Status", &["ACTIVE", "INACTIVE"]);

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

pub fn users() -> RecordShape {
    RecordShape::builder("users")
        .hash_key("id")
        .field("name", Field::text())
        .field("status", Field::choice(&STATUS))
        .field("tier", Field::enumeration(&STATUS))
        .field("joined", Field::date())
        .build()
        .expect("users shape should build")
}

pub fn posts() -> RecordShape {
    RecordShape::builder("posts")
        .hash_key("id")
        .field("title", Field::text())
        .field("author", Field::foreign_key())
        .field("published", Field::datetime())
        .build()
        .expect("posts shape should build")
}

pub fn events() -> RecordShape {
    RecordShape::builder("events")
        .hash_key("user")
        .range_key("seq")
        .field("kind", Field::text())
        .build()
        .expect("events shape should build")
}

///
/// Harness
///

pub struct Harness {
    pub conn: Connection,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub connector: Arc<MemoryConnector>,
}

impl Harness {
    /// Users, posts and events behind a write-through cache.
    pub fn new() -> Self {
        Self::with_config(
            ConnectionConfig::new(Credentials::new("test", "test"))
                .with_default_cache_ttl(DEFAULT_TTL),
        )
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        let store = Arc::new(
            MemoryStore::new()
                .with_table("users", "id", None)
                .with_table("posts", "id", None)
                .with_table("events", "user", Some("seq"))
                .with_table("misc", "id", None),
        );
        let cache = Arc::new(MemoryCache::new());
        let connector = Arc::new(MemoryConnector::new(Arc::clone(&store)));

        let conn = Connection::builder(config)
            .connector(connector.clone())
            .cache(cache.clone())
            .register(users())
            .register(posts())
            .register(events())
            .build()
            .expect("connection should build");

        Self {
            conn,
            store,
            cache,
            connector,
        }
    }

    pub fn table(&self, name: &str) -> Table {
        self.conn.table(name).expect("table should bind")
    }

    /// Fetch a single record through `Table::get`.
    pub fn fetch(&self, table: &str, key: impl Into<Key>) -> Record {
        self.table(table)
            .get(key)
            .and_then(Fetched::into_record)
            .expect("get should produce a record")
    }

    pub fn save_user(&self, id: &str, name: &str) -> Record {
        let mut user = self.table("users").create(id);
        user.set("name", name).expect("name should set");
        assert!(user.put().expect("put should succeed"));

        user
    }
}

pub fn text(record: &mut Record, name: &str) -> Option<String> {
    record.get_as::<String>(name).expect("text field should read")
}
