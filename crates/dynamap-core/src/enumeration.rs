//! Closed, ordered enumerations usable as field values.
//!
//! Declaration order is part of the contract: a member's ordinal is its
//! position in the declaration and is what integer-backed fields persist.
//! New members must only ever be appended.

use crate::{
    error::{Error, ErrorClass, ErrorOrigin},
    value::Value,
};
use std::{
    borrow::Cow,
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ptr,
};
use thiserror::Error as ThisError;

///
/// EnumerationError
///

#[derive(Debug, ThisError)]
pub enum EnumerationError {
    #[error("'{key}' is not a member of {enumeration}")]
    NotFound {
        enumeration: &'static str,
        key: String,
    },

    #[error("{enumeration} cannot be looked up by a value of type {found}")]
    NotCastable {
        enumeration: &'static str,
        found: &'static str,
    },

    #[error("{enumeration} declares member '{member}' more than once")]
    DuplicateMember {
        enumeration: &'static str,
        member: &'static str,
    },
}

impl EnumerationError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::NotCastable { .. } => ErrorClass::TypeMismatch,
            Self::DuplicateMember { .. } => ErrorClass::Validation,
        }
    }
}

impl From<EnumerationError> for Error {
    fn from(err: EnumerationError) -> Self {
        Self::new(err.class(), ErrorOrigin::Enumeration, err.to_string())
    }
}

///
/// Enumeration
///
/// Fixed ordinal table of named members.
///
/// Declare statically with [`Enumeration::new`], or member by member with
/// [`Enumeration::builder`] (typically inside a `LazyLock`). Members are
/// only handed out from a `&'static` enumeration so they can be copied
/// freely and compared by identity.
///

#[derive(Debug)]
pub struct Enumeration {
    name: &'static str,
    members: Cow<'static, [&'static str]>,
}

impl Enumeration {
    /// Declare an enumeration from its member names, in ordinal order.
    ///
    /// Duplicate names are not checked here; lookups by name resolve to the
    /// first declaration. Use the builder to have duplicates rejected.
    #[must_use]
    pub const fn new(name: &'static str, members: &'static [&'static str]) -> Self {
        Self {
            name,
            members: Cow::Borrowed(members),
        }
    }

    #[must_use]
    pub const fn builder(name: &'static str) -> EnumerationBuilder {
        EnumerationBuilder {
            name,
            members: Vec::new(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate members in declaration order.
    pub fn iter(&'static self) -> impl Iterator<Item = Member> {
        (0..self.members.len()).map(move |ordinal| Member {
            enumeration: self,
            ordinal: ordinal_u32(ordinal),
        })
    }

    /// Look up a member by name, ordinal, or member identity.
    pub fn get<'a>(&'static self, key: impl Into<EnumKey<'a>>) -> Result<Member, EnumerationError> {
        match key.into() {
            EnumKey::Name(name) => self.by_name(name),
            EnumKey::Ordinal(ordinal) => self.by_ordinal(ordinal),
            EnumKey::Member(member) => {
                if ptr::eq(member.enumeration, self) {
                    Ok(member)
                } else {
                    Err(self.not_found(member.to_string()))
                }
            }
        }
    }

    /// Look up a member from its wire form: `S` by name, `N` by ordinal.
    pub fn cast(&'static self, value: &Value) -> Result<Member, EnumerationError> {
        match value {
            Value::S(name) => self.by_name(name),
            Value::N(ordinal) => self.by_ordinal(*ordinal),
            other => Err(EnumerationError::NotCastable {
                enumeration: self.name,
                found: other.type_name(),
            }),
        }
    }

    fn by_name(&'static self, name: &str) -> Result<Member, EnumerationError> {
        self.members
            .iter()
            .position(|m| *m == name)
            .map(|ordinal| Member {
                enumeration: self,
                ordinal: ordinal_u32(ordinal),
            })
            .ok_or_else(|| self.not_found(name))
    }

    fn by_ordinal(&'static self, ordinal: i64) -> Result<Member, EnumerationError> {
        usize::try_from(ordinal)
            .ok()
            .filter(|idx| *idx < self.members.len())
            .map(|idx| Member {
                enumeration: self,
                ordinal: ordinal_u32(idx),
            })
            .ok_or_else(|| self.not_found(ordinal.to_string()))
    }

    fn not_found(&self, key: impl Into<String>) -> EnumerationError {
        EnumerationError::NotFound {
            enumeration: self.name,
            key: key.into(),
        }
    }
}

#[expect(clippy::cast_possible_truncation)]
const fn ordinal_u32(ordinal: usize) -> u32 {
    ordinal as u32
}

///
/// EnumerationBuilder
///
/// Declares members one at a time; each `declare` takes the next ordinal.
///

#[derive(Debug)]
pub struct EnumerationBuilder {
    name: &'static str,
    members: Vec<&'static str>,
}

impl EnumerationBuilder {
    #[must_use]
    pub fn declare(mut self, member: &'static str) -> Self {
        self.members.push(member);
        self
    }

    pub fn build(self) -> Result<Enumeration, Error> {
        for (idx, member) in self.members.iter().enumerate() {
            if self.members[..idx].contains(member) {
                return Err(EnumerationError::DuplicateMember {
                    enumeration: self.name,
                    member: *member,
                }
                .into());
            }
        }

        Ok(Enumeration {
            name: self.name,
            members: Cow::Owned(self.members),
        })
    }
}

///
/// EnumKey
///
/// Anything a member can be looked up by.
///

#[derive(Clone, Copy, Debug)]
pub enum EnumKey<'a> {
    Name(&'a str),
    Ordinal(i64),
    Member(Member),
}

impl<'a> From<&'a str> for EnumKey<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for EnumKey<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

impl From<i64> for EnumKey<'_> {
    fn from(ordinal: i64) -> Self {
        Self::Ordinal(ordinal)
    }
}

impl From<i32> for EnumKey<'_> {
    fn from(ordinal: i32) -> Self {
        Self::Ordinal(ordinal.into())
    }
}

impl From<u32> for EnumKey<'_> {
    fn from(ordinal: u32) -> Self {
        Self::Ordinal(ordinal.into())
    }
}

impl From<Member> for EnumKey<'_> {
    fn from(member: Member) -> Self {
        Self::Member(member)
    }
}

///
/// Member
///
/// One declared value of an [`Enumeration`]. Compares equal to its own
/// name and to its own ordinal.
///

#[derive(Clone, Copy)]
pub struct Member {
    enumeration: &'static Enumeration,
    ordinal: u32,
}

impl Member {
    #[must_use]
    pub const fn ordinal(self) -> u32 {
        self.ordinal
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.enumeration.members[self.ordinal as usize]
    }

    #[must_use]
    pub const fn enumeration(self) -> &'static Enumeration {
        self.enumeration
    }

    /// Ordinal zero is falsy, matching how defaults are materialized.
    #[must_use]
    pub const fn is_truthy(self) -> bool {
        self.ordinal != 0
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.enumeration.name, self.name())
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.enumeration, other.enumeration) && self.ordinal == other.ordinal
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.enumeration.name.hash(state);
        self.ordinal.hash(state);
    }
}

impl PartialOrd for Member {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Enumeration name, then ordinal; same-named enumerations are told apart
/// by address so the order agrees with equality.
impl Ord for Member {
    fn cmp(&self, other: &Self) -> Ordering {
        self.enumeration
            .name
            .cmp(other.enumeration.name)
            .then(self.ordinal.cmp(&other.ordinal))
            .then_with(|| ptr::from_ref(self.enumeration).cmp(&ptr::from_ref(other.enumeration)))
    }
}

impl PartialEq<str> for Member {
    fn eq(&self, other: &str) -> bool {
        self.name() == other
    }
}

impl PartialEq<&str> for Member {
    fn eq(&self, other: &&str) -> bool {
        self.name() == *other
    }
}

impl PartialEq<u32> for Member {
    fn eq(&self, other: &u32) -> bool {
        self.ordinal == *other
    }
}

impl PartialEq<i64> for Member {
    fn eq(&self, other: &i64) -> bool {
        i64::from(self.ordinal) == *other
    }
}

impl From<Member> for u32 {
    fn from(member: Member) -> Self {
        member.ordinal
    }
}

impl From<Member> for i64 {
    fn from(member: Member) -> Self {
        member.ordinal.into()
    }
}

///
/// TESTS
///
