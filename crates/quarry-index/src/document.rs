//! Inbound entity-change events.
//!
//! The mapping/session layer that owns entity state is external to this
//! crate; it hands over one [`EntityChange`] per changed entity, carrying the
//! identifier, the tenant id (absent in single-tenant mode), the user field
//! values, and any nested objects to be indexed as child documents.

use serde::{Deserialize, Serialize};

/// One user field value of a change event.
///
/// The indexing/storage mode is not part of the event; it is fixed by the
/// schema declaration for the field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Declared field name.
    pub name: String,
    /// Text value as mapped by the caller.
    pub value: String,
}

impl FieldValue {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A nested object indexed as a child document of its entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedObject {
    /// Dot-separated path of the nested object within the entity.
    pub path: String,
    /// Field values of the nested object.
    pub fields: Vec<FieldValue>,
}

/// A change event for one entity, ready to be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityChange {
    /// Entity identifier, unique within its tenant.
    pub id: String,
    /// Mapped type name of the entity.
    pub type_name: String,
    /// Tenant id; `None` in single-tenant mode.
    pub tenant_id: Option<String>,
    /// Caller-assigned routing key, if any.
    pub routing_key: Option<String>,
    /// User field values for the main document.
    pub fields: Vec<FieldValue>,
    /// Nested objects indexed as child documents.
    pub children: Vec<NestedObject>,
}

impl EntityChange {
    /// Creates a change event with no routing key and no children.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            tenant_id: None,
            routing_key: None,
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets the tenant id.
    #[must_use]
    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Appends a user field value.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FieldValue::new(name, value));
        self
    }

    /// Appends a nested object.
    #[must_use]
    pub fn child(mut self, path: impl Into<String>, fields: Vec<FieldValue>) -> Self {
        self.children.push(NestedObject {
            path: path.into(),
            fields,
        });
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder_style_construction() {
        let event = EntityChange::new("doc-1", "book")
            .tenant("t1")
            .field("title", "hello")
            .child("authors", vec![FieldValue::new("name", "b. traven")]);

        assert_eq!(event.id, "doc-1");
        assert_eq!(event.tenant_id.as_deref(), Some("t1"));
        assert_eq!(event.fields.len(), 1);
        assert_eq!(event.children[0].path, "authors");
    }

    #[test]
    fn round_trips_through_serde() {
        let event = EntityChange::new("doc-1", "book").field("title", "hello");
        let json = serde_json::to_string(&event).unwrap();
        let back: EntityChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
