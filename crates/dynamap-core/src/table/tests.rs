use super::*;
use crate::{
    config::{ConnectionConfig, Credentials},
    error::ErrorClass,
    field::{Field, TypedValue},
    memory::{MemoryCache, MemoryConnector, MemoryStore},
    store::Condition,
    testing::{cached_connection_with, connection_with, memory_store},
    value::Value,
};
use std::collections::BTreeSet;

fn users() -> RecordShape {
    RecordShape::builder("users")
        .hash_key("id")
        .field("name", Field::text())
        .field("visits", Field::integer())
        .build()
        .expect("users shape should build")
}

fn events() -> RecordShape {
    RecordShape::builder("events")
        .hash_key("user")
        .range_key("seq")
        .field("kind", Field::text())
        .build()
        .expect("events shape should build")
}

struct Fixture {
    conn: Connection,
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
}

impl Fixture {
    fn new() -> Self {
        let store = memory_store(&[("users", "id", None), ("events", "user", Some("seq"))]);
        let cache = Arc::new(MemoryCache::new());
        let conn = cached_connection_with(&store, &cache, vec![users(), events()]);

        Self { conn, store, cache }
    }

    fn users(&self) -> Table {
        self.conn.table("users").expect("users should bind")
    }

    fn events(&self) -> Table {
        self.conn.table("events").expect("events should bind")
    }

    fn saved_user(&self, id: &str, name: &str) -> Record {
        let mut record = self.users().create(id);
        record.set("name", name).expect("name should set");
        assert!(record.put().expect("put should succeed"));

        record
    }

    fn saved_event(&self, user: &str, seq: i64, kind: &str) {
        let mut record = self.events().create((user, seq));
        record.set("kind", kind).expect("kind should set");
        assert!(record.put().expect("put should succeed"));
    }
}

fn name_of(record: &mut Record) -> Option<String> {
    record.get_as::<String>("name").expect("name should read")
}

fn seqs(records: Records) -> Vec<i64> {
    records
        .map(|record| {
            record
                .expect("row should decode")
                .raw_get("seq")
                .and_then(Value::as_number)
                .expect("seq should be numeric")
        })
        .collect()
}

///
/// CREATE
///

#[test]
fn create_with_lets_key_attributes_win() {
    let fx = Fixture::new();
    let attributes = Row::new().with("id", "other").with("name", "Ann");

    let record = fx.users().create_with("u1", attributes);

    assert!(record.is_new());
    assert_eq!(record.raw_get("id"), Some(&Value::from("u1")));
    assert_eq!(record.raw_get("name"), Some(&Value::from("Ann")));
    assert_eq!(fx.store.len("users"), 0);
    assert!(fx.cache.is_empty());
}

#[test]
fn create_ignores_range_on_hash_only_tables() {
    let fx = Fixture::new();

    let record = fx.users().create(("u1", 5));

    assert_eq!(record.key().expect("key"), Key::hash("u1"));
    assert_eq!(record.raw().len(), 1);
}

///
/// READ
///

#[test]
fn get_returns_a_placeholder_for_missing_rows() {
    let fx = Fixture::new();

    let record = fx
        .users()
        .get("ghost")
        .and_then(Fetched::into_record)
        .expect("get should produce a record");

    assert!(record.is_new());
    assert_eq!(record.key().expect("key"), Key::hash("ghost"));
    assert_eq!(fx.store.len("users"), 0);
    assert!(fx.cache.is_empty());
    assert_eq!(fx.conn.cache_metrics().misses, 1);
}

#[test]
fn put_writes_through_and_get_is_served_from_cache() {
    let fx = Fixture::new();
    let saved = fx.saved_user("u1", "Ann");
    let cache_key = saved.cache_key().expect("cache key");

    assert!(fx.cache.contains(&cache_key));
    assert_eq!(cache_key, fx.users().cache_key(&Key::hash("u1")));

    let reads = fx.store.reads();
    let mut record = fx
        .users()
        .get("u1")
        .and_then(Fetched::into_record)
        .expect("get should produce a record");

    assert_eq!(fx.store.reads(), reads);
    assert!(!record.is_new());
    assert_eq!(name_of(&mut record), Some("Ann".to_string()));

    let metrics = fx.conn.cache_metrics();
    assert_eq!(metrics.hits, 1);
    assert_eq!(metrics.writes, 1);
}

#[test]
fn cache_miss_reads_the_store_and_populates_the_cache() {
    let fx = Fixture::new();
    let row = Row::new().with("id", "u1").with("name", "Ann");
    fx.store
        .put_item("users", &row, PutOptions::create_only())
        .expect("direct put should succeed");

    let mut record = fx
        .users()
        .get("u1")
        .and_then(Fetched::into_record)
        .expect("get should produce a record");
    assert!(!record.is_new());
    assert_eq!(name_of(&mut record), Some("Ann".to_string()));
    assert_eq!(fx.store.reads(), 1);
    assert!(fx.cache.contains(&fx.users().cache_key(&Key::hash("u1"))));

    fx.users().get("u1").expect("second get should succeed");
    assert_eq!(fx.store.reads(), 1);
}

#[test]
fn get_item_reports_absence_and_skips_caching_projections() {
    let fx = Fixture::new();
    let key = Key::hash("u1");

    let err = fx
        .users()
        .get_item(&key, &GetOptions::default())
        .expect_err("missing row should be reported");
    assert!(err.is_not_found());

    fx.saved_user("u1", "Ann");
    fx.cache.clear();

    let projected = fx
        .users()
        .get_item(&key, &GetOptions::default().attributes(["id"]))
        .expect("projected read should succeed");
    assert_eq!(projected.raw().len(), 1);
    assert!(fx.cache.is_empty());

    fx.users()
        .get_item(&key, &GetOptions::default().consistent())
        .expect("full read should succeed");
    assert!(fx.cache.contains(&fx.users().cache_key(&key)));
}

#[test]
fn hash_only_get_on_a_ranged_table_returns_matches() {
    let fx = Fixture::new();
    for seq in [3, 1, 2] {
        fx.saved_event("u1", seq, "click");
    }
    fx.saved_event("u2", 1, "view");

    let fetched = fx.events().get("u1").expect("get should succeed");
    assert!(!fetched.is_record());
    let matches = fetched.into_matches().expect("hash-only key should query");
    assert_eq!(seqs(matches), vec![1, 2, 3]);

    let err = fx
        .events()
        .get("u1")
        .and_then(Fetched::into_record)
        .expect_err("matches are not a single record");
    assert_eq!(err.class, ErrorClass::Validation);

    let single = fx
        .events()
        .get(("u1", 2))
        .and_then(Fetched::into_record)
        .expect("full key should name one row");
    assert_eq!(single.key().expect("key"), Key::ranged("u1", 2));
}

///
/// WRITE
///

#[test]
fn conflicting_create_returns_false_and_leaves_cache_alone() {
    let fx = Fixture::new();
    fx.saved_user("u1", "Ann");
    fx.cache.clear();

    let mut duplicate = fx.users().create("u1");
    duplicate.set("name", "Bob").expect("name should set");

    assert!(!duplicate.put().expect("conflict is not an error"));
    assert!(duplicate.is_new());
    assert!(fx.cache.is_empty());

    let stored = fx.store.row("users", &Key::hash("u1")).expect("row");
    assert_eq!(stored.get("name"), Some(&Value::from("Ann")));

    assert!(
        duplicate
            .put_with(PutOptions::overwrite())
            .expect("overwrite should succeed")
    );
    assert!(!duplicate.is_new());
}

#[test]
fn persisted_records_overwrite_on_put() {
    let fx = Fixture::new();
    let mut record = fx.saved_user("u1", "Ann");

    record.set("name", "Annie").expect("name should set");
    assert!(record.put().expect("overwrite should succeed"));

    let mut fetched = fx
        .users()
        .get("u1")
        .and_then(Fetched::into_record)
        .expect("get should produce a record");
    assert_eq!(name_of(&mut fetched), Some("Annie".to_string()));
    assert_eq!(fx.store.writes(), 2);
}

#[test]
fn projected_reads_cannot_be_put_back() {
    let fx = Fixture::new();
    let mut user = fx.saved_user("u1", "Ann");
    user.set("visits", 40).expect("visits should set");
    assert!(user.put().expect("overwrite should succeed"));
    fx.cache.clear();
    let key = Key::hash("u1");

    let mut projected = fx
        .users()
        .get_item(&key, &GetOptions::default().attributes(["id"]))
        .expect("projected read should succeed");
    assert!(projected.is_partial());
    assert!(!projected.is_new());

    let err = projected.put().expect_err("partial record should be rejected");
    assert_eq!(err.class, ErrorClass::Validation);
    let err = projected
        .put_with(PutOptions::overwrite())
        .expect_err("explicit overwrite should be rejected too");
    assert_eq!(err.class, ErrorClass::Validation);

    let stored = fx.store.row("users", &key).expect("row should survive");
    assert_eq!(stored.get("name"), Some(&Value::from("Ann")));
    assert_eq!(stored.get("visits"), Some(&Value::from(40)));
    assert!(fx.cache.is_empty());

    let mut scanned = fx
        .users()
        .scan(ScanRequest::new().attributes(["id", "name"]))
        .expect("scan should succeed")
        .next()
        .expect("one row")
        .expect("row should decode");
    assert!(scanned.is_partial());
    assert!(scanned.put().is_err());

    let full = fx
        .users()
        .scan(ScanRequest::new())
        .expect("scan should succeed")
        .next()
        .expect("one row")
        .expect("row should decode");
    assert!(!full.is_partial());

    // once the stored row is gone the projection is all there is
    assert!(scanned.delete_from_store().expect("delete should succeed"));
    assert!(!scanned.is_partial());
    assert!(scanned.put().expect("recreate should succeed"));
    assert_eq!(fx.store.row("users", &key).expect("row").len(), 2);
}

#[test]
fn delete_invalidates_and_marks_the_record_new() {
    let fx = Fixture::new();
    let mut record = fx.saved_user("u1", "Ann");
    let cache_key = record.cache_key().expect("cache key");

    assert!(record.delete_from_store().expect("delete should succeed"));

    assert!(record.is_new());
    assert!(!fx.cache.contains(&cache_key));
    assert_eq!(fx.store.len("users"), 0);
    assert_eq!(fx.conn.cache_metrics().invalidations, 1);

    assert!(!record.delete_from_store().expect("second delete should succeed"));

    let placeholder = fx
        .users()
        .get("u1")
        .and_then(Fetched::into_record)
        .expect("get should produce a record");
    assert!(placeholder.is_new());
}

///
/// CACHE FAILURES
///

#[test]
fn cache_write_failures_never_fail_the_put() {
    let fx = Fixture::new();
    fx.cache.set_fail_sets(true);

    let record = fx.saved_user("u1", "Ann");

    assert!(!record.is_new());
    assert!(fx.cache.is_empty());
    assert_eq!(fx.store.len("users"), 1);
    assert_eq!(fx.conn.cache_metrics().write_failures, 1);
}

#[test]
fn cache_read_failures_fall_back_to_the_store() {
    let fx = Fixture::new();
    fx.saved_user("u1", "Ann");
    fx.cache.set_fail_gets(true);

    let mut record = fx
        .users()
        .get("u1")
        .and_then(Fetched::into_record)
        .expect("get should fall back to the store");

    assert_eq!(name_of(&mut record), Some("Ann".to_string()));
    assert_eq!(fx.store.reads(), 1);
    assert_eq!(fx.conn.cache_metrics().misses, 1);
}

#[test]
fn cache_delete_failures_never_fail_the_delete() {
    let fx = Fixture::new();
    let mut record = fx.saved_user("u1", "Ann");
    fx.cache.set_fail_deletes(true);

    assert!(record.delete_from_store().expect("delete should succeed"));

    assert_eq!(fx.store.len("users"), 0);
    assert_eq!(fx.conn.cache_metrics().invalidation_failures, 1);
}

#[test]
fn undecodable_cache_entries_are_replaced_from_the_store() {
    let fx = Fixture::new();
    fx.saved_user("u1", "Ann");
    let cache_key = fx.users().cache_key(&Key::hash("u1"));
    fx.cache.insert_raw(&cache_key, vec![0xff, 0x00, 0x13]);

    let mut record = fx
        .users()
        .get("u1")
        .and_then(Fetched::into_record)
        .expect("get should fall back to the store");
    assert_eq!(name_of(&mut record), Some("Ann".to_string()));
    assert_eq!(fx.conn.cache_metrics().decode_failures, 1);

    let reads = fx.store.reads();
    fx.users().get("u1").expect("get should succeed");
    assert_eq!(fx.store.reads(), reads);
    assert_eq!(fx.conn.cache_metrics().hits, 1);
}

#[test]
fn no_ttl_means_no_cache_writes() {
    let store = memory_store(&[("users", "id", None)]);
    let cache = Arc::new(MemoryCache::new());
    let conn = Connection::builder(ConnectionConfig::new(Credentials::new("k", "s")))
        .connector(Arc::new(MemoryConnector::new(Arc::clone(&store))))
        .cache(cache.clone())
        .register(users())
        .build()
        .expect("connection should build");
    let table = conn.table("users").expect("users should bind");
    assert_eq!(table.cache_ttl(), None);

    let mut record = table.create("u1");
    assert!(record.put().expect("put should succeed"));
    table.get("u1").expect("get should succeed");

    assert!(cache.is_empty());
    let metrics = conn.cache_metrics();
    assert_eq!(metrics.writes, 0);
    assert_eq!(metrics.misses, 1);
}

#[test]
fn uncached_tables_go_straight_to_the_store() {
    let store = memory_store(&[("users", "id", None)]);
    let conn = connection_with(&store, vec![users()]);
    let table = conn.table("users").expect("users should bind");
    assert!(!table.has_cache());

    let mut record = table.create("u1");
    assert!(record.put().expect("put should succeed"));
    table.get("u1").expect("get should succeed");
    table.get("u1").expect("get should succeed");

    assert_eq!(store.reads(), 2);
    assert_eq!(conn.cache_metrics(), crate::obs::CacheMetricsSnapshot::default());
}

#[test]
fn store_outage_is_served_from_cache_for_cached_keys() {
    let fx = Fixture::new();
    fx.saved_user("u1", "Ann");
    fx.store.set_unavailable(true);

    let mut cached = fx
        .users()
        .get("u1")
        .and_then(Fetched::into_record)
        .expect("cached key should survive the outage");
    assert_eq!(name_of(&mut cached), Some("Ann".to_string()));

    let err = fx.users().get("u2").expect_err("uncached key needs the store");
    assert_eq!(err.class, ErrorClass::Unavailable);

    let err = cached.put().expect_err("writes need the store");
    assert_eq!(err.class, ErrorClass::Unavailable);
}

///
/// BULK
///

#[test]
fn query_supports_range_conditions_reverse_and_limit() {
    let fx = Fixture::new();
    for seq in 1..=5 {
        fx.saved_event("u1", seq, if seq % 2 == 0 { "view" } else { "click" });
    }

    let above_two = fx
        .events()
        .query(Query::hash("u1").range(Condition::Gt(Value::N(2))).reverse())
        .expect("query should succeed");
    assert_eq!(seqs(above_two), vec![5, 4, 3]);

    let first_two = fx
        .events()
        .query(Query::hash("u1").limit(2))
        .expect("query should succeed");
    assert_eq!(seqs(first_two), vec![1, 2]);

    let views = fx
        .events()
        .query(Query::hash("u1").filter("kind", Condition::Eq(Value::from("view"))))
        .expect("query should succeed");
    assert_eq!(seqs(views), vec![2, 4]);
}

#[test]
fn query_results_bypass_the_cache() {
    let fx = Fixture::new();
    fx.saved_event("u1", 1, "click");
    fx.cache.clear();

    let records: Vec<Record> = fx
        .events()
        .query_hash("u1")
        .expect("query should succeed")
        .collect::<Result<_, _>>()
        .expect("rows should decode");

    assert_eq!(records.len(), 1);
    assert!(!records[0].is_new());
    assert!(fx.cache.is_empty());
}

#[test]
fn range_conditions_need_a_range_key() {
    let fx = Fixture::new();

    let err = fx
        .users()
        .query(Query::hash("u1").range(Condition::Eq(Value::N(1))))
        .expect_err("users has no range key");

    assert!(err.is_validation());
}

#[test]
fn scans_keys_items_and_values_cover_the_table() {
    let fx = Fixture::new();
    fx.saved_user("u1", "Ann");
    fx.saved_user("u2", "Bob");
    fx.saved_user("u3", "Cy");

    let keys: BTreeSet<Key> = fx
        .users()
        .keys()
        .expect("keys should scan")
        .collect::<Result<_, _>>()
        .expect("keys should decode");
    let expected: BTreeSet<Key> = ["u1", "u2", "u3"].into_iter().map(Key::hash).collect();
    assert_eq!(keys, expected);

    let items: Vec<(Key, Record)> = fx
        .users()
        .items()
        .expect("items should scan")
        .collect::<Result<_, _>>()
        .expect("items should decode");
    assert_eq!(items.len(), 3);
    for (key, record) in &items {
        assert_eq!(&record.key().expect("key"), key);
    }

    assert_eq!(fx.users().values().expect("values should scan").count(), 3);

    let mut bobs: Vec<Record> = fx
        .users()
        .scan(ScanRequest::new().filter("name", Condition::BeginsWith("B".into())))
        .expect("scan should succeed")
        .collect::<Result<_, _>>()
        .expect("rows should decode");
    assert_eq!(bobs.len(), 1);
    assert_eq!(
        bobs[0].get("name").expect("name should read"),
        Some(TypedValue::Text("Bob".into()))
    );
}

#[test]
fn table_handles_compare_by_binding() {
    let fx = Fixture::new();

    assert_eq!(fx.users(), fx.users());
    assert_ne!(fx.users(), fx.events());
    assert_eq!(fx.users().cache_prefix(), "users");
    assert_eq!(fx.events().range_key_name(), Some("seq"));
}
