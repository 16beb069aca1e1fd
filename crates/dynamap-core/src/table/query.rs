use crate::{
    error::{Error, ErrorClass, ErrorOrigin},
    schema::RecordShape,
    store::{Condition, QueryRequest},
    value::KeyValue,
};

///
/// QueryIndex
///
/// Secondary index addressed by a query, with the key attributes it is
/// keyed on.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryIndex {
    pub name: String,
    pub hash_key: String,
    pub range_key: Option<String>,
}

impl QueryIndex {
    pub fn new(name: impl Into<String>, hash_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash_key: hash_key.into(),
            range_key: None,
        }
    }

    #[must_use]
    pub fn range_key(mut self, name: impl Into<String>) -> Self {
        self.range_key = Some(name.into());
        self
    }
}

///
/// Query
///
/// Key-condition query against a table. Attribute names are left to the
/// table: the hash condition applies to the table's (or index's) hash key
/// and the range condition to its range key.
///

#[derive(Clone, Debug)]
pub struct Query {
    hash: KeyValue,
    range: Option<Condition>,
    index: Option<QueryIndex>,
    filter: Vec<(String, Condition)>,
    limit: Option<usize>,
    reverse: bool,
    consistent: bool,
    attributes: Option<Vec<String>>,
}

impl Query {
    /// Match every row whose hash key equals `hash`.
    pub fn hash(hash: impl Into<KeyValue>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
            index: None,
            filter: Vec::new(),
            limit: None,
            reverse: false,
            consistent: false,
            attributes: None,
        }
    }

    #[must_use]
    pub fn range(mut self, condition: Condition) -> Self {
        self.range = Some(condition);
        self
    }

    #[must_use]
    pub fn index(mut self, index: QueryIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Post-key filter on a non-key attribute.
    #[must_use]
    pub fn filter(mut self, attribute: impl Into<String>, condition: Condition) -> Self {
        self.filter.push((attribute.into(), condition));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Descending range-key order.
    #[must_use]
    pub const fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

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

    /// Resolve key attribute names against `shape` (or the index).
    pub(crate) fn into_request(
        self,
        table: &str,
        shape: &RecordShape,
    ) -> Result<QueryRequest, Error> {
        let (hash_key, range_key, index) = match self.index {
            Some(index) => (index.hash_key, index.range_key, Some(index.name)),
            None => (
                shape.hash_key().to_string(),
                shape.range_key().map(str::to_string),
                None,
            ),
        };

        let range = match (self.range, range_key) {
            (None, _) => None,
            (Some(condition), Some(name)) => Some((name, condition)),
            (Some(_), None) => {
                return Err(Error::new(
                    ErrorClass::Validation,
                    ErrorOrigin::Table,
                    format!("range condition given but table '{table}' has no range key"),
                ));
            }
        };

        Ok(QueryRequest {
            hash_key,
            hash: self.hash,
            range,
            index,
            filter: self.filter,
            limit: self.limit,
            reverse: self.reverse,
            consistent: self.consistent,
            attributes: self.attributes,
        })
    }
}
