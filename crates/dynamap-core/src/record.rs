use crate::{
    connection::Connection,
    error::{Error, ErrorClass, ErrorOrigin},
    field::{Field, FieldError, ForeignRef, TryFromTyped, TypedValue},
    schema::RecordShape,
    store::PutOptions,
    table::Table,
    value::{Key, Row, Value},
};
use std::{fmt, sync::Arc};

///
/// Record
///
/// One row of a table: its raw attribute map plus persistence state.
///
/// Typed access goes through the fields declared on the table's shape;
/// the raw map holds wire values only, and an absent attribute means
/// "unset". `is_new` is true until the first successful put and becomes
/// true again after a delete.
///
/// A record read with an attribute projection is partial: it holds only
/// some of the stored row and cannot be put back.
///

#[derive(Clone)]
pub struct Record {
    row: Row,
    is_new: bool,
    partial: bool,
    table: Table,
}

impl Record {
    pub(crate) const fn from_parts(table: Table, row: Row, is_new: bool) -> Self {
        Self {
            row,
            is_new,
            partial: false,
            table,
        }
    }

    /// Persisted record holding a projection of the stored row.
    pub(crate) const fn projected(table: Table, row: Row) -> Self {
        Self {
            row,
            is_new: false,
            partial: true,
            table,
        }
    }

    ///
    /// STATE
    ///

    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.is_new
    }

    pub(crate) const fn mark_persisted(&mut self) {
        self.is_new = false;
    }

    /// The stored row is gone, so nothing of it can be lost by a put.
    pub(crate) const fn mark_new(&mut self) {
        self.is_new = true;
        self.partial = false;
    }

    /// Whether this record was read with an attribute projection.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.partial
    }

    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    #[must_use]
    pub fn shape(&self) -> &RecordShape {
        self.table.shape()
    }

    /// Connection manager of the owning table.
    pub fn connection(&self) -> Result<Connection, Error> {
        self.table.connection()
    }

    ///
    /// TYPED ACCESS
    ///

    /// Typed value of a declared field.
    ///
    /// An absent attribute resolves the field's default; a truthy default
    /// is written into the raw map, so it is persisted by the next put.
    /// Reading a foreign key fetches the referenced row.
    pub fn get(&mut self, name: &str) -> Result<Option<TypedValue>, Error> {
        let shape = Arc::clone(self.table.shape());

        self.declared(&shape, name)?.get(self)
    }

    /// Typed value of a declared field, extracted as `T`.
    pub fn get_as<T: TryFromTyped>(&mut self, name: &str) -> Result<Option<T>, Error> {
        let Some(typed) = self.get(name)? else {
            return Ok(None);
        };

        T::try_from_typed(typed).map(Some).map_err(|other| {
            Error::new(
                ErrorClass::TypeMismatch,
                ErrorOrigin::Record,
                format!(
                    "field `{name}` holds a {} value, not {}",
                    other.kind(),
                    std::any::type_name::<T>()
                ),
            )
        })
    }

    /// Assign a declared field. Key attributes and read-only fields are
    /// rejected.
    pub fn set(&mut self, name: &str, value: impl Into<TypedValue>) -> Result<(), Error> {
        self.set_opt(name, Some(value.into()))
    }

    /// Assign or, with `None`, unset a declared field. Key attributes are
    /// rejected whether or not the shape declares them.
    pub fn set_opt(&mut self, name: &str, value: Option<TypedValue>) -> Result<(), Error> {
        self.check_not_key(name, "set")?;
        let shape = Arc::clone(self.table.shape());

        self.declared(&shape, name)?.set(self, value)
    }

    /// Unset a declared field.
    pub fn clear(&mut self, name: &str) -> Result<(), Error> {
        self.set_opt(name, None)
    }

    /// Remove a declared field's attribute, returning its wire value.
    pub fn delete(&mut self, name: &str) -> Result<Option<Value>, Error> {
        self.check_not_key(name, "delete")?;
        let shape = Arc::clone(self.table.shape());

        self.declared(&shape, name)?.delete(self)
    }

    /// Decode a foreign-key attribute without fetching the referenced row.
    pub fn reference(&self, name: &str) -> Result<Option<ForeignRef>, Error> {
        match self.row.get(name) {
            None => Ok(None),
            Some(Value::S(json)) => ForeignRef::from_json_str(json).map(Some),
            Some(other) => Err(FieldError::WireMismatch {
                expected: "S",
                found: other.type_name(),
            }
            .into()),
        }
    }

    fn declared<'s>(&self, shape: &'s RecordShape, name: &str) -> Result<&'s Field, FieldError> {
        shape.field(name).ok_or_else(|| FieldError::UnknownField {
            table: self.table_name().to_string(),
            field: name.to_string(),
        })
    }

    ///
    /// RAW ACCESS
    ///

    #[must_use]
    pub const fn raw(&self) -> &Row {
        &self.row
    }

    pub(crate) const fn row_mut(&mut self) -> &mut Row {
        &mut self.row
    }

    #[must_use]
    pub fn into_row(self) -> Row {
        self.row
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.row.contains_key(name)
    }

    #[must_use]
    pub fn raw_get(&self, name: &str) -> Option<&Value> {
        self.row.get(name)
    }

    /// Store a wire value directly, bypassing field coercion. Key
    /// attributes stay protected.
    pub fn set_raw(&mut self, name: &str, value: impl Into<Value>) -> Result<Option<Value>, Error> {
        self.check_not_key(name, "set")?;

        Ok(self.row.insert(name.to_string(), value.into()))
    }

    /// Remove a wire value directly. Key attributes stay protected.
    pub fn remove_raw(&mut self, name: &str) -> Result<Option<Value>, Error> {
        self.check_not_key(name, "delete")?;

        Ok(self.row.remove(name))
    }

    /// Remove and return a raw attribute, or `default` when it is absent.
    pub fn pop(&mut self, name: &str, default: impl Into<Value>) -> Result<Value, Error> {
        Ok(self.remove_raw(name)?.unwrap_or_else(|| default.into()))
    }

    fn check_not_key(&self, name: &str, action: &'static str) -> Result<(), FieldError> {
        let shape = self.shape();
        let role = if name == shape.hash_key() {
            "hash"
        } else if shape.range_key() == Some(name) {
            "range"
        } else {
            return Ok(());
        };

        Err(FieldError::KeyAttribute {
            action,
            role,
            field: name.to_string(),
        })
    }

    ///
    /// KEYS
    ///

    /// Hash key alone, or `(hash, range)` when the table has a range key.
    pub fn key(&self) -> Result<Key, Error> {
        let shape = self.shape();

        self.row.key(shape.hash_key(), shape.range_key())
    }

    #[must_use]
    pub fn hash_key(&self) -> Option<&Value> {
        self.row.get(self.shape().hash_key())
    }

    #[must_use]
    pub fn range_key(&self) -> Option<&Value> {
        self.shape().range_key().and_then(|name| self.row.get(name))
    }

    /// Cache key of this record's row.
    pub fn cache_key(&self) -> Result<String, Error> {
        Ok(self.table.cache_key(&self.key()?))
    }

    ///
    /// PERSISTENCE
    ///

    /// Persist through the owning table. See [`Table::put`].
    pub fn put(&mut self) -> Result<bool, Error> {
        let table = self.table.clone();

        table.put(self)
    }

    pub fn put_with(&mut self, options: PutOptions) -> Result<bool, Error> {
        let table = self.table.clone();

        table.put_with(self, options)
    }

    /// Delete through the owning table. See [`Table::delete`].
    pub fn delete_from_store(&mut self) -> Result<bool, Error> {
        let table = self.table.clone();

        table.delete(self)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table_name())
            .field("is_new", &self.is_new)
            .field("partial", &self.partial)
            .field("row", &self.row)
            .finish()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.table_name() == other.table_name()
            && self.is_new == other.is_new
            && self.row == other.row
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use crate::{
        error::ErrorClass,
        field::{Field, ForeignRef},
        schema::RecordShape,
        testing::{connection_with, memory_store},
        value::{Key, Value},
    };

    fn ranged_shape() -> RecordShape {
        RecordShape::builder("events")
            .hash_key("account")
            .range_key("seq")
            .field("kind", Field::text())
            .field("owner", Field::foreign_key())
            .build()
            .expect("events shape should build")
    }

    #[test]
    fn key_is_hash_or_hash_and_range() {
        let store = memory_store(&[("events", "account", Some("seq")), ("users", "id", None)]);
        let conn = connection_with(&store, vec![ranged_shape()]);

        let event = conn.table("events").expect("table").create(Key::ranged("a1", 7));
        assert_eq!(event.key().expect("key"), Key::ranged("a1", 7));
        assert_eq!(event.hash_key(), Some(&Value::from("a1")));
        assert_eq!(event.range_key(), Some(&Value::from(7)));

        let user = conn.table("users").expect("table").create("u1");
        assert_eq!(user.key().expect("key"), Key::hash("u1"));
        assert_eq!(user.range_key(), None);
    }

    #[test]
    fn raw_writes_protect_key_attributes() {
        let store = memory_store(&[("events", "account", Some("seq"))]);
        let conn = connection_with(&store, vec![ranged_shape()]);
        let mut event = conn.table("events").expect("table").create(Key::ranged("a1", 7));

        let err = event
            .set_raw("account", "a2")
            .expect_err("hash key should be protected");
        assert_eq!(err.class, ErrorClass::AccessViolation);

        let err = event
            .remove_raw("seq")
            .expect_err("range key should be protected");
        assert_eq!(err.class, ErrorClass::AccessViolation);

        // typed writes to undeclared key attributes are still key writes
        let err = event
            .set("account", "a2")
            .expect_err("hash key should be protected");
        assert_eq!(err.class, ErrorClass::AccessViolation);
        let err = event
            .delete("seq")
            .expect_err("range key should be protected");
        assert_eq!(err.class, ErrorClass::AccessViolation);

        event.set_raw("note", "free-form").expect("undeclared attribute should be settable");
        assert!(event.contains("note"));
        assert_eq!(
            event.pop("note", "none").expect("pop should succeed"),
            Value::from("free-form")
        );
        assert_eq!(
            event.pop("note", "none").expect("pop should succeed"),
            Value::from("none")
        );
    }

    #[test]
    fn unknown_fields_are_not_found() {
        let store = memory_store(&[("events", "account", Some("seq"))]);
        let conn = connection_with(&store, vec![ranged_shape()]);
        let mut event = conn.table("events").expect("table").create(Key::ranged("a1", 7));

        let err = event.get("missing").expect_err("undeclared field should fail");
        assert!(err.is_not_found());
        assert!(err.message.contains("events"));

        let err = event.set("missing", "x").expect_err("undeclared field should fail");
        assert!(err.is_not_found());
    }

    #[test]
    fn get_as_reports_type_mismatch() {
        let store = memory_store(&[("events", "account", Some("seq"))]);
        let conn = connection_with(&store, vec![ranged_shape()]);
        let mut event = conn.table("events").expect("table").create(Key::ranged("a1", 7));
        event.set("kind", "login").expect("set should succeed");

        let kind: Option<String> = event.get_as("kind").expect("text should extract");
        assert_eq!(kind.as_deref(), Some("login"));

        let err = event
            .get_as::<i64>("kind")
            .expect_err("text is not an integer");
        assert_eq!(err.class, ErrorClass::TypeMismatch);
    }

    #[test]
    fn reference_decodes_without_fetching() {
        let store = memory_store(&[("events", "account", Some("seq"))]);
        let conn = connection_with(&store, vec![ranged_shape()]);
        let mut event = conn.table("events").expect("table").create(Key::ranged("a1", 7));

        assert_eq!(event.reference("owner").expect("absent is fine"), None);

        event
            .set("owner", ForeignRef::new("users", "u1"))
            .expect("reference should be assignable");

        // no users table exists in the store: decoding must not touch it
        let reference = event
            .reference("owner")
            .expect("stored reference should decode")
            .expect("reference should be present");
        assert_eq!(reference, ForeignRef::new("users", "u1"));
    }

    #[test]
    fn equality_ignores_handle_identity() {
        let store = memory_store(&[("users", "id", None)]);
        let conn = connection_with(&store, Vec::new());
        let table = conn.table("users").expect("table");

        assert_eq!(table.create("u1"), table.create("u1"));
        assert_ne!(table.create("u1"), table.create("u2"));
    }
}
