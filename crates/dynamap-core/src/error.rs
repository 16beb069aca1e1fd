use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured runtime error with a stable classification.
/// Every module-level error converts into this type; callers branch on
/// `class`, never on message text.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a not-found error for a specific origin.
    pub(crate) fn not_found(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, origin, message)
    }

    /// Construct a connection-origin unavailable error.
    pub(crate) fn connection_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unavailable, ErrorOrigin::Connection, message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.class, ErrorClass::Validation)
    }

    #[must_use]
    pub const fn is_access_violation(&self) -> bool {
        matches!(self.class, ErrorClass::AccessViolation)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    NotFound,
    Validation,
    AccessViolation,
    TypeMismatch,
    Conflict,
    Unavailable,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::AccessViolation => "access_violation",
            Self::TypeMismatch => "type_mismatch",
            Self::Conflict => "conflict",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Which subsystem raised the error.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Enumeration,
    Field,
    Record,
    Schema,
    Table,
    Store,
    Cache,
    Serialize,
    Connection,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Enumeration => "enumeration",
            Self::Field => "field",
            Self::Record => "record",
            Self::Schema => "schema",
            Self::Table => "table",
            Self::Store => "store",
            Self::Cache => "cache",
            Self::Serialize => "serialize",
            Self::Connection => "connection",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
