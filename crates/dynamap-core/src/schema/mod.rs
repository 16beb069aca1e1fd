//! Record shapes and the table-name registry that binds them.

mod registry;
mod shape;

pub use registry::ShapeRegistry;
pub use shape::{FALLBACK_HASH_KEY, RecordShape, RecordShapeBuilder, SchemaError};
