//! Core runtime for dynamap: typed record shapes over a wide-column
//! key/value store, with a write-through side cache kept coherent on every
//! mutation.
//!
//! Callers declare [`schema::RecordShape`]s once, register them with a
//! [`connection::Connection`], and read and write [`record::Record`]s
//! through [`table::Table`] handles. Fields coerce between the store's wire
//! values and typed values on every access.

// public exports are one module level down
pub mod cache;
pub mod config;
pub mod connection;
pub mod enumeration;
pub mod error;
pub mod field;
pub mod memory;
pub mod obs;
pub mod record;
pub mod schema;
pub mod serialize;
pub mod store;
pub mod table;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod testing;

pub use error::Error;

///
/// Prelude
///
/// Vocabulary for declaring shapes and working with records. Collaborator
/// traits and in-memory implementations stay in their modules.
///

pub mod prelude {
    pub use crate::{
        config::{ConnectionConfig, Credentials, TableConfig},
        connection::Connection,
        enumeration::{Enumeration, Member},
        error::{Error, ErrorClass},
        field::{Field, ForeignRef, TypedValue},
        record::Record,
        schema::RecordShape,
        table::{Fetched, Query, Table},
        value::{Key, Row, Value},
    };
}
