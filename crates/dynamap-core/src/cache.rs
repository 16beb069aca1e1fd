//! The side cache collaborator.
//!
//! The cache is an optimization only. Nothing here is atomic or consistent
//! with the store beyond best effort; table handles absorb every failure
//! coming out of it.

use crate::error::{Error, ErrorClass, ErrorOrigin};
use std::time::Duration;
use thiserror::Error as ThisError;

///
/// CacheError
///

#[derive(Debug, ThisError)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::Unavailable(_) => ErrorClass::Unavailable,
            Self::Backend(_) => ErrorClass::Internal,
        }
    }
}

impl From<CacheError> for Error {
    fn from(err: CacheError) -> Self {
        Self::new(err.class(), ErrorOrigin::Cache, err.to_string())
    }
}

///
/// Cache
///
/// Byte cache addressed by opaque string keys, with per-entry TTL.
///

pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    fn delete(&self, key: &str) -> Result<(), CacheError>;
}
