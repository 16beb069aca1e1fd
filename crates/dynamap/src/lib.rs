//! ## Crate layout
//! - `core`: the runtime. Enumerations, wire values, fields, record shapes,
//!   records, table handles, the connection manager, store and cache
//!   collaborator traits, in-memory collaborators, config and metrics.
//!
//! The `prelude` module mirrors the surface used when reading and writing
//! records; `design::prelude` exposes what shape declarations need.

pub use dynamap_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use core::{Error, connection::Connection};

///
/// Runtime Prelude
///

pub mod prelude {
    pub use crate::core::{
        config::{ConnectionConfig, Credentials, TableConfig},
        connection::{Connection, ConnectionBuilder},
        error::{Error, ErrorClass, ErrorOrigin},
        field::{ForeignRef, TypedValue},
        obs::CacheMetricsSnapshot,
        record::Record,
        store::{Condition, GetOptions, PutOptions, ScanRequest},
        table::{Fetched, Query, QueryIndex, Records, Table},
        value::{Key, KeyValue, Row, Value},
    };
    pub use serde::{Deserialize, Serialize};
}

//
// Design Prelude
// For shape declarations and custom field types.
//

/// Shape-declaration helpers (separate from the runtime prelude).
pub mod design {
    pub mod prelude {
        pub use crate::core::{
            enumeration::{Enumeration, Member},
            field::{Coercion, Field, FieldError, FieldSpec, TypedValue},
            record::Record,
            schema::{RecordShape, ShapeRegistry},
            value::Value,
        };
    }
}
