use crate::schema::RecordShape;
use std::{collections::HashMap, sync::Arc};

///
/// ShapeRegistry
///
/// Table name to record shape. Populated explicitly at initialisation;
/// shapes are never unregistered except by [`ShapeRegistry::clear`] at
/// teardown. Unregistered names resolve to the fallback shape.
///

#[derive(Debug)]
pub struct ShapeRegistry {
    shapes: HashMap<String, Arc<RecordShape>>,
    fallback: Arc<RecordShape>,
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self {
            shapes: HashMap::new(),
            fallback: Arc::new(RecordShape::fallback()),
        }
    }
}

impl ShapeRegistry {
    /// Create an empty registry with the stock fallback shape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the shape handed out for unregistered tables.
    #[must_use]
    pub fn with_fallback(mut self, fallback: RecordShape) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    /// Register a shape under its own table name.
    ///
    /// Re-registering a name replaces the earlier shape (last one wins) and
    /// returns it.
    pub fn register(&mut self, shape: RecordShape) -> Option<Arc<RecordShape>> {
        let name = shape.table_name().to_string();

        self.register_as(name, Arc::new(shape))
    }

    /// Register a shared shape under an explicit table name.
    pub fn register_as(
        &mut self,
        table_name: impl Into<String>,
        shape: Arc<RecordShape>,
    ) -> Option<Arc<RecordShape>> {
        self.shapes.insert(table_name.into(), shape)
    }

    /// Shape for `table_name`, or the fallback.
    #[must_use]
    pub fn resolve(&self, table_name: &str) -> Arc<RecordShape> {
        self.shapes
            .get(table_name)
            .map_or_else(|| Arc::clone(&self.fallback), Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, table_name: &str) -> bool {
        self.shapes.contains_key(table_name)
    }

    #[must_use]
    pub fn fallback(&self) -> &Arc<RecordShape> {
        &self.fallback
    }

    /// Iterate registered table names and shapes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<RecordShape>)> {
        self.shapes.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Drop every registration. The fallback is kept.
    pub fn clear(&mut self) {
        self.shapes.clear();
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorClass, field::Field, schema::FALLBACK_HASH_KEY};

    fn users_shape() -> RecordShape {
        RecordShape::builder("users")
            .hash_key("id")
            .field("name", Field::text())
            .build()
            .expect("users shape should build")
    }

    #[test]
    fn registered_shape_resolves_by_table_name() {
        let mut registry = ShapeRegistry::new();
        assert!(registry.register(users_shape()).is_none());

        let shape = registry.resolve("users");
        assert_eq!(shape.table_name(), "users");
        assert!(shape.field("name").is_some());
        assert!(registry.contains("users"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregistered_tables_resolve_to_the_fallback() {
        let registry = ShapeRegistry::new();
        let shape = registry.resolve("anything");

        assert!(Arc::ptr_eq(&shape, registry.fallback()));
        assert_eq!(shape.hash_key(), FALLBACK_HASH_KEY);
        assert!(shape.fields().is_empty());
    }

    #[test]
    fn re_registration_replaces_the_earlier_shape() {
        let mut registry = ShapeRegistry::new();
        registry.register(users_shape());

        let replacement = RecordShape::builder("users")
            .hash_key("user_id")
            .build()
            .expect("replacement shape should build");
        let previous = registry
            .register(replacement)
            .expect("earlier shape should be returned");

        assert_eq!(previous.hash_key(), "id");
        assert_eq!(registry.resolve("users").hash_key(), "user_id");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clear_drops_registrations_but_keeps_fallback() {
        let custom = RecordShape::builder("*")
            .hash_key("pk")
            .build()
            .expect("fallback shape should build");
        let mut registry = ShapeRegistry::new().with_fallback(custom);
        registry.register(users_shape());

        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(registry.resolve("users").hash_key(), "pk");
    }

    #[test]
    fn builder_rejects_duplicate_fields_and_missing_keys() {
        let err = RecordShape::builder("t")
            .hash_key("id")
            .field("a", Field::text())
            .field("a", Field::integer())
            .build()
            .expect_err("duplicate field should be rejected");
        assert_eq!(err.class, ErrorClass::Validation);

        let err = RecordShape::builder("t")
            .build()
            .expect_err("missing hash key should be rejected");
        assert!(err.message.contains("no hash key"));

        let err = RecordShape::builder("t")
            .hash_key("id")
            .range_key("id")
            .build()
            .expect_err("colliding keys should be rejected");
        assert!(err.message.contains("same attribute"));
    }

    #[test]
    fn fields_keep_declaration_order_and_names() {
        let shape = RecordShape::builder("events")
            .hash_key("id")
            .field("zeta", Field::text())
            .field("alpha", Field::date().readonly())
            .build()
            .expect("shape should build");

        let names: Vec<&str> = shape.fields().iter().map(Field::name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(shape.field("alpha").expect("declared").is_readonly());
    }
}
