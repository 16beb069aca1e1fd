use crate::{
    error::{Error, ErrorClass, ErrorOrigin},
    field::{Field, FieldSpec},
};
use std::time::Duration;
use thiserror::Error as ThisError;

/// Hash key attribute assumed for tables that have no declared shape.
pub const FALLBACK_HASH_KEY: &str = "id";

///
/// SchemaError
///

#[derive(Debug, ThisError)]
pub enum SchemaError {
    #[error("shape for table '{table}' declares field `{field}` twice")]
    DuplicateField { table: String, field: String },

    #[error("shape for table '{0}' has no hash key")]
    MissingHashKey(String),

    #[error("shape for table '{0}' uses the same attribute as hash and range key")]
    KeyCollision(String),

    #[error("shape for table '{table}': {message}")]
    InvalidOption { table: String, message: String },
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::new(ErrorClass::Validation, ErrorOrigin::Schema, err.to_string())
    }
}

///
/// RecordShape
///
/// Declared fields and key schema of one kind of row, plus the cache
/// settings that travel with it.
///

#[derive(Debug)]
pub struct RecordShape {
    table_name: String,
    hash_key: String,
    range_key: Option<String>,
    fields: Vec<Field>,
    cache_ttl: Option<Duration>,
    cache_prefix: Option<String>,
}

impl RecordShape {
    pub fn builder(table_name: impl Into<String>) -> RecordShapeBuilder {
        RecordShapeBuilder {
            table_name: table_name.into(),
            hash_key: None,
            range_key: None,
            fields: Vec::new(),
            cache_ttl: None,
            cache_prefix: None,
        }
    }

    /// Shape used for tables nobody registered: no declared fields, hash
    /// key [`FALLBACK_HASH_KEY`], no range key.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            table_name: String::new(),
            hash_key: FALLBACK_HASH_KEY.to_string(),
            range_key: None,
            fields: Vec::new(),
            cache_ttl: None,
            cache_prefix: None,
        }
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[must_use]
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    #[must_use]
    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }

    /// Whether `name` is one of the key attributes.
    #[must_use]
    pub fn is_key(&self, name: &str) -> bool {
        name == self.hash_key || self.range_key() == Some(name)
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    #[must_use]
    pub const fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl
    }

    #[must_use]
    pub fn cache_prefix(&self) -> Option<&str> {
        self.cache_prefix.as_deref()
    }
}

///
/// RecordShapeBuilder
///
/// Binds each field to its attribute name as it is declared.
///

#[derive(Debug)]
pub struct RecordShapeBuilder {
    table_name: String,
    hash_key: Option<String>,
    range_key: Option<String>,
    fields: Vec<(String, FieldSpec)>,
    cache_ttl: Option<Duration>,
    cache_prefix: Option<String>,
}

impl RecordShapeBuilder {
    #[must_use]
    pub fn hash_key(mut self, name: impl Into<String>) -> Self {
        self.hash_key = Some(name.into());
        self
    }

    #[must_use]
    pub fn range_key(mut self, name: impl Into<String>) -> Self {
        self.range_key = Some(name.into());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = Some(prefix.into());
        self
    }

    pub fn build(self) -> Result<RecordShape, Error> {
        let table = self.table_name;
        let hash_key = self
            .hash_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SchemaError::MissingHashKey(table.clone()))?;

        if self.range_key.as_deref() == Some(hash_key.as_str()) {
            return Err(SchemaError::KeyCollision(table).into());
        }
        if self.cache_prefix.as_deref() == Some("") {
            return Err(SchemaError::InvalidOption {
                table,
                message: "cache prefix must not be empty".to_string(),
            }
            .into());
        }
        if self.cache_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(SchemaError::InvalidOption {
                table,
                message: "cache ttl must be greater than zero".to_string(),
            }
            .into());
        }

        let mut fields: Vec<Field> = Vec::with_capacity(self.fields.len());
        for (name, spec) in self.fields {
            if fields.iter().any(|f| f.name() == name) {
                return Err(SchemaError::DuplicateField { table, field: name }.into());
            }
            fields.push(spec.bind(name));
        }

        Ok(RecordShape {
            table_name: table,
            hash_key,
            range_key: self.range_key,
            fields,
            cache_ttl: self.cache_ttl,
            cache_prefix: self.cache_prefix,
        })
    }
}
