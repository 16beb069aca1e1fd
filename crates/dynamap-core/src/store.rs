//! The store collaborator: the authoritative wide-column key/value store.
//!
//! Only the contract lives here. Wire protocol, retries and connection
//! management belong to implementations; [`crate::memory::MemoryStore`] is
//! the in-process one.

use crate::{
    config::ConnectionConfig,
    error::{Error, ErrorClass, ErrorOrigin},
    value::{Key, KeyValue, Row, Value},
};
use std::sync::Arc;
use thiserror::Error as ThisError;

/// Lazy, single-pass sequence of rows. Implementations may fetch further
/// pages while it is being consumed.
pub type RowStream = Box<dyn Iterator<Item = Result<Row, StoreError>> + Send>;

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::TableNotFound(_) => ErrorClass::NotFound,
            Self::InvalidRequest(_) => ErrorClass::Validation,
            Self::Unavailable(_) => ErrorClass::Unavailable,
            Self::Backend(_) => ErrorClass::Internal,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::new(err.class(), ErrorOrigin::Store, err.to_string())
    }
}

///
/// Store
///
/// Primitive operations of the underlying store. The store owns each
/// table's key schema; callers address rows by [`Key`].
///

pub trait Store: Send + Sync {
    /// Read one row. `Ok(None)` is the store's not-found condition.
    fn get_item(&self, table: &str, key: &Key, options: &GetOptions)
    -> Result<Option<Row>, StoreError>;

    /// Write one row. `Ok(false)` reports a rejected conditional write.
    fn put_item(&self, table: &str, row: &Row, options: PutOptions) -> Result<bool, StoreError>;

    /// Delete one row. `Ok(false)` when no row had that key.
    fn delete_item(&self, table: &str, key: &Key) -> Result<bool, StoreError>;

    fn query(&self, table: &str, request: &QueryRequest) -> Result<RowStream, StoreError>;

    fn scan(&self, table: &str, request: &ScanRequest) -> Result<RowStream, StoreError>;
}

///
/// Connector
///
/// Establishes a store connection. Called lazily by the connection manager
/// on first use and again after each reset.
///

pub trait Connector: Send + Sync {
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Store>, StoreError>;
}

///
/// GetOptions
///

#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    pub consistent: bool,
    pub attributes: Option<Vec<String>>,
}

impl GetOptions {
    #[must_use]
    pub const fn consistent(mut self) -> Self {
        self.consistent = true;
        self
    }

    #[must_use]
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }
}

///
/// PutOptions
///
/// With `overwrite == false` the write only succeeds when no row with the
/// same key exists yet.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PutOptions {
    pub overwrite: bool,
}

impl PutOptions {
    #[must_use]
    pub const fn overwrite() -> Self {
        Self { overwrite: true }
    }

    #[must_use]
    pub const fn create_only() -> Self {
        Self { overwrite: false }
    }
}

///
/// Condition
///
/// Comparison applied to one attribute by queries and scans.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Le(Value),
    Gt(Value),
    Ge(Value),
    Between(Value, Value),
    BeginsWith(String),
    Contains(Value),
    Exists,
    NotExists,
}

impl Condition {
    /// Evaluate against an attribute, `None` when the row lacks it.
    ///
    /// Ordering comparisons only hold between values of the same wire type.
    #[must_use]
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return matches!(self, Self::NotExists | Self::Ne(_));
        };

        let same_type = |other: &Value| actual.type_name() == other.type_name();

        match self {
            Self::Eq(v) => actual == v,
            Self::Ne(v) => actual != v,
            Self::Lt(v) => same_type(v) && actual < v,
            Self::Le(v) => same_type(v) && actual <= v,
            Self::Gt(v) => same_type(v) && actual > v,
            Self::Ge(v) => same_type(v) && actual >= v,
            Self::Between(lo, hi) => same_type(lo) && same_type(hi) && lo <= actual && actual <= hi,
            Self::BeginsWith(prefix) => actual.as_str().is_some_and(|s| s.starts_with(prefix)),
            Self::Contains(needle) => actual.contains(needle),
            Self::Exists => true,
            Self::NotExists => false,
        }
    }
}

///
/// QueryRequest
///
/// Key-condition read against the table or one of its indexes. Key
/// attribute names are resolved by the table handle before this reaches
/// the store.
///

#[derive(Clone, Debug)]
pub struct QueryRequest {
    pub hash_key: String,
    pub hash: KeyValue,
    pub range: Option<(String, Condition)>,
    pub index: Option<String>,
    pub filter: Vec<(String, Condition)>,
    pub limit: Option<usize>,
    pub reverse: bool,
    pub consistent: bool,
    pub attributes: Option<Vec<String>>,
}

///
/// ScanRequest
///
/// Full-table read with optional attribute filters. Potentially expensive.
///

#[derive(Clone, Debug, Default)]
pub struct ScanRequest {
    pub filter: Vec<(String, Condition)>,
    pub attributes: Option<Vec<String>>,
    pub limit: Option<usize>,
}

impl ScanRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, attribute: impl Into<String>, condition: Condition) -> Self {
        self.filter.push((attribute.into(), condition));
        self
    }

    #[must_use]
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a row passes every filter condition.
    #[must_use]
    pub fn accepts(&self, row: &Row) -> bool {
        self.filter
            .iter()
            .all(|(name, condition)| condition.matches(row.get(name)))
    }
}

///
/// TESTS
///
