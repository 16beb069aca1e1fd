//! Fields: the coercion protocol between wire values and typed values.
//!
//! A [`Field`] is a schema descriptor. It never holds a value; every value
//! lives in the owning record's row. Records of one shape share the same
//! descriptors.

mod kinds;
mod typed;


use crate::{
    enumeration::Enumeration,
    error::{Error, ErrorClass, ErrorOrigin},
    record::Record,
    value::Value,
};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

// re-exports
pub use kinds::{
    ChoiceCoercion, DateCoercion, DateTimeCoercion, EnumCoercion, ForeignKeyCoercion,
    IntegerCoercion, TextCoercion, date_from_ordinal, date_to_ordinal,
};
pub use typed::{ForeignRef, TryFromTyped, TypedValue};

///
/// FieldError
///

#[derive(Debug, ThisError)]
pub enum FieldError {
    #[error("table '{table}' declares no field `{field}`")]
    UnknownField { table: String, field: String },

    #[error("cannot {action} {role} key `{field}`")]
    KeyAttribute {
        action: &'static str,
        role: &'static str,
        field: String,
    },

    #[error("`{field}` is read-only")]
    ReadOnly { field: String },

    #[error("expected a wire {expected} value, found {found}")]
    WireMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("expected {expected}, found {found}")]
    InvalidValue {
        expected: &'static str,
        found: String,
    },
}

impl FieldError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownField { .. } => ErrorClass::NotFound,
            Self::KeyAttribute { .. } | Self::ReadOnly { .. } => ErrorClass::AccessViolation,
            Self::WireMismatch { .. } | Self::InvalidValue { .. } => ErrorClass::Validation,
        }
    }

    pub(crate) fn invalid(expected: &'static str, found: &TypedValue) -> Self {
        Self::InvalidValue {
            expected,
            found: found.kind().to_string(),
        }
    }
}

impl From<FieldError> for Error {
    fn from(err: FieldError) -> Self {
        Self::new(err.class(), ErrorOrigin::Field, err.to_string())
    }
}

///
/// Coercion
///
/// Bidirectional conversion between a wire value and a typed value.
/// Implement this to add a field type; the record layer never switches on
/// concrete field types.
///

pub trait Coercion: Send + Sync {
    /// Short name used in diagnostics (`text`, `date`, ...).
    fn name(&self) -> &'static str;

    /// Wire tag this coercion stores (`S` or `N`).
    fn wire_kind(&self) -> &'static str;

    /// Convert a stored value. A value equal to the type's empty sentinel
    /// yields `Ok(None)`.
    fn to_typed(&self, record: &Record, wire: &Value) -> Result<Option<TypedValue>, Error>;

    /// Convert a typed value for storage; fails with a validation error
    /// when the input cannot be coerced.
    fn from_typed(&self, record: &Record, typed: TypedValue) -> Result<Value, Error>;
}

/// Default producer, invoked with the record being read.
pub type DefaultFn = Arc<dyn Fn(&Record) -> Option<Value> + Send + Sync>;

///
/// FieldDefault
///
/// Resolved when a field is read and its attribute is absent. Defaults are
/// expressed in wire form and pass through `to_typed` like stored values.
///

#[derive(Clone, Default)]
pub enum FieldDefault {
    #[default]
    None,
    Fixed(Value),
    With(DefaultFn),
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Fixed(value) => write!(f, "Fixed({value:?})"),
            Self::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

///
/// FieldSpec
///
/// An unnamed field declaration. The record shape builder binds it to its
/// attribute name, producing a [`Field`].
///

#[derive(Clone)]
pub struct FieldSpec {
    coercion: Arc<dyn Coercion>,
    default: FieldDefault,
    readonly: bool,
}

impl FieldSpec {
    pub fn new(coercion: impl Coercion + 'static) -> Self {
        Self {
            coercion: Arc::new(coercion),
            default: FieldDefault::None,
            readonly: false,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Fixed(value.into());
        self
    }

    #[must_use]
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn(&Record) -> Option<Value> + Send + Sync + 'static,
    {
        self.default = FieldDefault::With(Arc::new(producer));
        self
    }

    #[must_use]
    pub const fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub(crate) fn bind(self, name: impl Into<String>) -> Field {
        Field {
            name: name.into(),
            coercion: self.coercion,
            default: self.default,
            readonly: self.readonly,
        }
    }
}

///
/// Field
///
/// A field bound to its attribute name on one record shape.
///

#[derive(Clone)]
pub struct Field {
    name: String,
    coercion: Arc<dyn Coercion>,
    default: FieldDefault,
    readonly: bool,
}

impl Field {
    #[must_use]
    pub fn text() -> FieldSpec {
        FieldSpec::new(TextCoercion)
    }

    #[must_use]
    pub fn integer() -> FieldSpec {
        FieldSpec::new(IntegerCoercion)
    }

    /// String-backed enumeration field; stores the member name.
    #[must_use]
    pub fn choice(enumeration: &'static Enumeration) -> FieldSpec {
        FieldSpec::new(ChoiceCoercion::new(enumeration))
    }

    /// Number-backed enumeration field; stores the member ordinal.
    #[must_use]
    pub fn enumeration(enumeration: &'static Enumeration) -> FieldSpec {
        FieldSpec::new(EnumCoercion::new(enumeration))
    }

    #[must_use]
    pub fn date() -> FieldSpec {
        FieldSpec::new(DateCoercion)
    }

    #[must_use]
    pub fn datetime() -> FieldSpec {
        FieldSpec::new(DateTimeCoercion)
    }

    /// Reference to a row of another table. Reading it fetches that row.
    #[must_use]
    pub fn foreign_key() -> FieldSpec {
        FieldSpec::new(ForeignKeyCoercion)
    }

    #[must_use]
    pub fn custom(coercion: impl Coercion + 'static) -> FieldSpec {
        FieldSpec::new(coercion)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_readonly(&self) -> bool {
        self.readonly
    }

    #[must_use]
    pub const fn default(&self) -> &FieldDefault {
        &self.default
    }

    #[must_use]
    pub fn coercion(&self) -> &dyn Coercion {
        self.coercion.as_ref()
    }

    /// Read the typed value.
    ///
    /// When the attribute is absent the default is resolved and coerced; a
    /// truthy result is also written into the record's row so the default
    /// is persisted with the record on its next put.
    pub fn get(&self, record: &mut Record) -> Result<Option<TypedValue>, Error> {
        if let Some(wire) = record.raw().get(&self.name) {
            return self.coercion.to_typed(record, wire);
        }

        let resolved = match &self.default {
            FieldDefault::None => return Ok(None),
            FieldDefault::Fixed(value) => value.clone(),
            FieldDefault::With(producer) => match producer(record) {
                Some(value) => value,
                None => return Ok(None),
            },
        };

        let typed = self.coercion.to_typed(record, &resolved)?;
        if let Some(value) = typed.as_ref().filter(|v| v.is_truthy()) {
            let wire = self.coercion.from_typed(record, value.clone())?;
            record.row_mut().insert(self.name.clone(), wire);
        }

        Ok(typed)
    }

    /// Write a typed value; `None` removes the attribute.
    pub fn set(&self, record: &mut Record, value: Option<TypedValue>) -> Result<(), Error> {
        self.check_writable(record, "set")?;

        match value {
            None => {
                record.row_mut().remove(&self.name);
            }
            Some(typed) => {
                let wire = self.coercion.from_typed(record, typed)?;
                record.row_mut().insert(self.name.clone(), wire);
            }
        }

        Ok(())
    }

    /// Remove the attribute, returning the wire value it held.
    pub fn delete(&self, record: &mut Record) -> Result<Option<Value>, Error> {
        self.check_writable(record, "delete")?;

        Ok(record.row_mut().remove(&self.name))
    }

    fn check_writable(&self, record: &Record, action: &'static str) -> Result<(), FieldError> {
        let shape = record.shape();

        if self.name == shape.hash_key() {
            return Err(FieldError::KeyAttribute {
                action,
                role: "hash",
                field: self.name.clone(),
            });
        }
        if shape.range_key() == Some(self.name.as_str()) {
            return Err(FieldError::KeyAttribute {
                action,
                role: "range",
                field: self.name.clone(),
            });
        }
        if self.readonly {
            return Err(FieldError::ReadOnly {
                field: self.name.clone(),
            });
        }

        Ok(())
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("coercion", &self.coercion.name())
            .field("wire_kind", &self.coercion.wire_kind())
            .field("default", &self.default)
            .field("readonly", &self.readonly)
            .finish()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("coercion", &self.coercion.name())
            .field("default", &self.default)
            .field("readonly", &self.readonly)
            .finish()
    }
}
