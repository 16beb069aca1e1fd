use crate::{
    error::{Error, ErrorOrigin},
    value::{Key, KeyValue, Value},
};
use derive_more::{Deref, DerefMut, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Row
///
/// Flat attribute map as stored by the store and mirrored into the cache.
///

#[derive(
    Clone, Debug, Default, Deref, DerefMut, Deserialize, Eq, IntoIterator, PartialEq, Serialize,
)]
#[into_iterator(owned, ref)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Extract the key of this row given the table's key attribute names.
    pub fn key(&self, hash_key: &str, range_key: Option<&str>) -> Result<Key, Error> {
        let hash = self.key_component(hash_key)?;
        let range = match range_key {
            Some(name) => Some(self.key_component(name)?),
            None => None,
        };

        Ok(Key { hash, range })
    }

    /// Copy of this row restricted to the named attributes.
    #[must_use]
    pub fn project(&self, attributes: &[String]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(name, _)| attributes.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }

    fn key_component(&self, name: &str) -> Result<KeyValue, Error> {
        let value = self.0.get(name).ok_or_else(|| {
            Error::not_found(ErrorOrigin::Record, format!("key attribute `{name}` is missing"))
        })?;

        KeyValue::try_from(value)
    }
}

impl From<BTreeMap<String, Value>> for Row {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
