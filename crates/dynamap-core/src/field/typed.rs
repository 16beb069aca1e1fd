use crate::{
    enumeration::Member,
    error::Error,
    field::FieldError,
    record::Record,
    value::{Key, Value},
};
use serde_json::{Value as JsonValue, json};
use time::{Date, OffsetDateTime};

///
/// TypedValue
///
/// Application-level value produced by a field's coercion.
///
/// `Wire` carries a raw wire value through unchanged, for custom coercions
/// that have no richer representation.
///

#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    Text(String),
    Int(i64),
    Member(Member),
    Date(Date),
    DateTime(OffsetDateTime),
    Reference(ForeignRef),
    Record(Box<Record>),
    Wire(Value),
}

impl TypedValue {
    /// Truthiness used when deciding whether a resolved default is written
    /// back: empty text, zero and the ordinal-0 member are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty(),
            Self::Int(n) => *n != 0,
            Self::Member(m) => m.is_truthy(),
            Self::Date(_) | Self::DateTime(_) | Self::Reference(_) | Self::Record(_) => true,
            Self::Wire(Value::S(s)) => !s.is_empty(),
            Self::Wire(Value::N(n)) => *n != 0,
            Self::Wire(Value::SS(set)) => !set.is_empty(),
            Self::Wire(Value::NS(set)) => !set.is_empty(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Int(_) => "integer",
            Self::Member(_) => "member",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Reference(_) => "reference",
            Self::Record(_) => "record",
            Self::Wire(_) => "wire",
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_member(&self) -> Option<Member> {
        match self {
            Self::Member(m) => Some(*m),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_date(&self) -> Option<Date> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_datetime(&self) -> Option<OffsetDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Record(record) => Some(*record),
            _ => None,
        }
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for TypedValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for TypedValue {
    fn from(n: i32) -> Self {
        Self::Int(n.into())
    }
}

impl From<Member> for TypedValue {
    fn from(m: Member) -> Self {
        Self::Member(m)
    }
}

impl From<Date> for TypedValue {
    fn from(d: Date) -> Self {
        Self::Date(d)
    }
}

impl From<OffsetDateTime> for TypedValue {
    fn from(dt: OffsetDateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl From<ForeignRef> for TypedValue {
    fn from(r: ForeignRef) -> Self {
        Self::Reference(r)
    }
}

impl From<Record> for TypedValue {
    fn from(r: Record) -> Self {
        Self::Record(Box::new(r))
    }
}

impl From<Value> for TypedValue {
    fn from(v: Value) -> Self {
        Self::Wire(v)
    }
}

///
/// TryFromTyped
///
/// Extraction of a concrete Rust type from a [`TypedValue`]; on mismatch
/// the value is handed back untouched.
///

pub trait TryFromTyped: Sized {
    fn try_from_typed(value: TypedValue) -> Result<Self, TypedValue>;
}

macro_rules! impl_try_from_typed {
    ($ty:ty, $variant:ident) => {
        impl TryFromTyped for $ty {
            fn try_from_typed(value: TypedValue) -> Result<Self, TypedValue> {
                match value {
                    TypedValue::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    };
}

impl_try_from_typed!(String, Text);
impl_try_from_typed!(i64, Int);
impl_try_from_typed!(Member, Member);
impl_try_from_typed!(Date, Date);
impl_try_from_typed!(OffsetDateTime, DateTime);
impl_try_from_typed!(ForeignRef, Reference);
impl_try_from_typed!(Value, Wire);

impl TryFromTyped for Record {
    fn try_from_typed(value: TypedValue) -> Result<Self, TypedValue> {
        match value {
            TypedValue::Record(record) => Ok(*record),
            other => Err(other),
        }
    }
}

///
/// ForeignRef
///
/// Pointer to a row in another (or the same) table, persisted as
/// `{"table": ..., "key": ...}` JSON.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ForeignRef {
    pub table: String,
    pub key: Key,
}

impl ForeignRef {
    pub fn new(table: impl Into<String>, key: impl Into<Key>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn to_json_string(&self) -> String {
        json!({ "table": self.table, "key": self.key.to_json() }).to_string()
    }

    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        let json: JsonValue = serde_json::from_str(s).map_err(|e| FieldError::InvalidValue {
            expected: "foreign key JSON",
            found: e.to_string(),
        })?;

        let table = json
            .get("table")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| FieldError::InvalidValue {
                expected: "foreign key with a `table` string",
                found: json.to_string(),
            })?;
        let key = json.get("key").ok_or_else(|| FieldError::InvalidValue {
            expected: "foreign key with a `key`",
            found: json.to_string(),
        })?;

        Ok(Self {
            table: table.to_string(),
            key: Key::from_json(key)?,
        })
    }
}
