mod key;
mod row;


use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

// re-exports
pub use key::{Key, KeyValue};
pub use row::Row;

///
/// Value
///
/// One attribute as the store holds it. The store only knows strings,
/// numbers and the set variants of both; everything richer is layered on
/// top by fields.
///
/// There is no null variant: an attribute that is unset is
/// absent from its row.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Value {
    S(String),
    N(i64),
    SS(BTreeSet<String>),
    NS(BTreeSet<i64>),
}

impl Value {
    /// Wire tag as the store names it.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::SS(_) => "SS",
            Self::NS(_) => "NS",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<i64> {
        match self {
            Self::N(n) => Some(*n),
            _ => None,
        }
    }

    /// Membership test used by `contains` conditions.
    ///
    /// Strings match on substring, sets on element membership.
    #[must_use]
    pub fn contains(&self, needle: &Self) -> bool {
        match (self, needle) {
            (Self::S(hay), Self::S(n)) => hay.contains(n.as_str()),
            (Self::SS(set), Self::S(n)) => set.contains(n),
            (Self::NS(set), Self::N(n)) => set.contains(n),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => f.write_str(s),
            Self::N(n) => write!(f, "{n}"),
            Self::SS(set) => {
                let items: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Self::NS(set) => {
                let items: Vec<String> = set.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::S(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::S(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::N(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::N(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::N(n.into())
    }
}

impl From<BTreeSet<String>> for Value {
    fn from(set: BTreeSet<String>) -> Self {
        Self::SS(set)
    }
}

impl From<BTreeSet<i64>> for Value {
    fn from(set: BTreeSet<i64>) -> Self {
        Self::NS(set)
    }
}
