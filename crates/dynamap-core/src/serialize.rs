//! CBOR serialization for cache payloads.
//!
//! The cache is shared with other processes, so every decode is bounded
//! and a malformed payload can never take the caller down.

use crate::error::{Error, ErrorClass, ErrorOrigin};
use serde::{Serialize, de::DeserializeOwned};
use serde_cbor::{from_slice, to_vec};
use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error as ThisError;

/// Upper bound on a decodable payload; matches the store's item size ceiling.
pub const MAX_CACHE_PAYLOAD_BYTES: usize = 400 * 1024;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("deserialize error: {0}")]
    Deserialize(String),

    #[error("deserialize size limit exceeded: {len} bytes (limit {max_bytes})")]
    DeserializeSizeLimitExceeded { len: usize, max_bytes: usize },
}

impl From<SerializeError> for Error {
    fn from(err: SerializeError) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Serialize, err.to_string())
    }
}

/// Serialize a value into CBOR bytes.
pub fn serialize<T>(t: &T) -> Result<Vec<u8>, SerializeError>
where
    T: Serialize,
{
    to_vec(t).map_err(|e| SerializeError::Serialize(e.to_string()))
}

/// Deserialize CBOR bytes produced by [`serialize`].
///
/// Input size is bounded before decode, and a panic inside the decoder is
/// reported as a deserialize error.
pub fn deserialize<T>(bytes: &[u8]) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    if bytes.len() > MAX_CACHE_PAYLOAD_BYTES {
        return Err(SerializeError::DeserializeSizeLimitExceeded {
            len: bytes.len(),
            max_bytes: MAX_CACHE_PAYLOAD_BYTES,
        });
    }

    let result = catch_unwind(AssertUnwindSafe(|| from_slice(bytes)));

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(SerializeError::Deserialize(err.to_string())),
        Err(_) => Err(SerializeError::Deserialize(
            "panic during CBOR deserialization".into(),
        )),
    }
}

///
/// TESTS
///
