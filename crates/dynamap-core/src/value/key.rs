use crate::{
    error::{Error, ErrorClass, ErrorOrigin},
    value::Value,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

///
/// KeyValue
///
/// A hash or range key component. Key attributes are always scalar.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum KeyValue {
    #[display("{_0}")]
    S(String),
    #[display("{_0}")]
    N(i64),
}

impl KeyValue {
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::S(s) => JsonValue::String(s.clone()),
            Self::N(n) => JsonValue::from(*n),
        }
    }

    pub fn from_json(json: &JsonValue) -> Result<Self, Error> {
        match json {
            JsonValue::String(s) => Ok(Self::S(s.clone())),
            JsonValue::Number(n) => n.as_i64().map(Self::N).ok_or_else(|| {
                Error::new(
                    ErrorClass::Validation,
                    ErrorOrigin::Serialize,
                    format!("key component {n} is not an integral number"),
                )
            }),
            other => Err(Error::new(
                ErrorClass::Validation,
                ErrorOrigin::Serialize,
                format!("key component must be a string or number, found {other}"),
            )),
        }
    }
}

impl TryFrom<&Value> for KeyValue {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::S(s) => Ok(Self::S(s.clone())),
            Value::N(n) => Ok(Self::N(*n)),
            other => Err(Error::new(
                ErrorClass::TypeMismatch,
                ErrorOrigin::Record,
                format!("key attributes must be scalar, found {}", other.type_name()),
            )),
        }
    }
}

impl From<KeyValue> for Value {
    fn from(key: KeyValue) -> Self {
        match key {
            KeyValue::S(s) => Self::S(s),
            KeyValue::N(n) => Self::N(n),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        Self::S(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        Self::S(s)
    }
}

impl From<i64> for KeyValue {
    fn from(n: i64) -> Self {
        Self::N(n)
    }
}

impl From<i32> for KeyValue {
    fn from(n: i32) -> Self {
        Self::N(n.into())
    }
}

///
/// Key
///
/// Full primary key of one row: the hash key, plus the range key when the
/// table declares one.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Key {
    pub hash: KeyValue,
    pub range: Option<KeyValue>,
}

impl Key {
    pub fn hash(hash: impl Into<KeyValue>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
        }
    }

    pub fn ranged(hash: impl Into<KeyValue>, range: impl Into<KeyValue>) -> Self {
        Self {
            hash: hash.into(),
            range: Some(range.into()),
        }
    }

    /// JSON form: the bare hash key, or `[hash, range]`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match &self.range {
            None => self.hash.to_json(),
            Some(range) => JsonValue::Array(vec![self.hash.to_json(), range.to_json()]),
        }
    }

    pub fn from_json(json: &JsonValue) -> Result<Self, Error> {
        match json {
            JsonValue::Array(parts) => match parts.as_slice() {
                [hash] => Ok(Self {
                    hash: KeyValue::from_json(hash)?,
                    range: None,
                }),
                [hash, range] => Ok(Self {
                    hash: KeyValue::from_json(hash)?,
                    range: Some(KeyValue::from_json(range)?),
                }),
                _ => Err(Error::new(
                    ErrorClass::Validation,
                    ErrorOrigin::Serialize,
                    format!("key array must hold 1 or 2 components, found {}", parts.len()),
                )),
            },
            scalar => Ok(Self {
                hash: KeyValue::from_json(scalar)?,
                range: None,
            }),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            None => write!(f, "{}", self.hash),
            Some(range) => write!(f, "({}, {range})", self.hash),
        }
    }
}

impl From<KeyValue> for Key {
    fn from(hash: KeyValue) -> Self {
        Self { hash, range: None }
    }
}

impl From<&str> for Key {
    fn from(hash: &str) -> Self {
        Self::hash(hash)
    }
}

impl From<String> for Key {
    fn from(hash: String) -> Self {
        Self::hash(hash)
    }
}

impl From<i64> for Key {
    fn from(hash: i64) -> Self {
        Self::hash(hash)
    }
}

impl<H, R> From<(H, R)> for Key
where
    H: Into<KeyValue>,
    R: Into<KeyValue>,
{
    fn from((hash, range): (H, R)) -> Self {
        Self::ranged(hash, range)
    }
}
