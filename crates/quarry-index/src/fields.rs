//! Internal bookkeeping fields written into every indexed document.
//!
//! Every document carries a small set of metadata fields (identifier, unique
//! key, tenant id, type discriminator, routing key, nested-document markers)
//! in a reserved namespace that cannot collide with user-defined fields.
//!
//! Two encodings exist:
//! - *searchable*: raw single token, indexed only — for fields queried by
//!   exact term and never read back (type discriminator, routing key);
//! - *searchable + retrievable*: raw single token plus a fast (columnar)
//!   field, so the value can be read at search time without a stored-field
//!   lookup (identifier, tenant id).

use tantivy::{
    TantivyDocument,
    schema::{FAST, Field, STRING, SchemaBuilder},
};

/// Reserved prefix for internal field names.
///
/// User-level field names must not start with this prefix; the schema builder
/// rejects them.
pub const INTERNAL_FIELD_PREFIX: &str = "__quarry_";

/// Builds the full name of an internal field from its logical name.
///
/// Pure prefix concatenation: distinct logical names always yield distinct
/// internal names.
pub fn internal_field_name(name: &str) -> String {
    format!("{INTERNAL_FIELD_PREFIX}{name}")
}

/// Document kind marker value for the main (root) document of an entity.
pub const DOC_KIND_MAIN: &str = "main";
/// Document kind marker value for a nested child document.
pub const DOC_KIND_CHILD: &str = "child";

/// Handles to the internal metadata fields of an index schema.
#[derive(Debug, Clone)]
pub struct MetadataFields {
    /// Entity identifier, retrievable at search time.
    pub id: Field,
    /// Tenant-scoped unique key used for upserts and deletes.
    pub unique_key: Field,
    /// Tenant discriminator, retrievable at search time.
    pub tenant_id: Field,
    /// Mapped type name of the entity.
    pub type_name: Field,
    /// Routing key assigned by the caller, if any.
    pub routing_key: Field,
    /// Main/child marker distinguishing root and nested documents.
    pub doc_kind: Field,
    /// Dot-separated path of the nested object within its entity.
    pub nested_path: Field,
}

impl MetadataFields {
    /// Registers all internal fields on a schema builder.
    pub fn register(builder: &mut SchemaBuilder) -> Self {
        Self {
            id: searchable_retrievable(builder, "id"),
            unique_key: searchable(builder, "unique_key"),
            tenant_id: searchable_retrievable(builder, "tenant_id"),
            type_name: searchable(builder, "type"),
            routing_key: searchable(builder, "routing_key"),
            doc_kind: searchable(builder, "doc_kind"),
            nested_path: searchable(builder, "nested_path"),
        }
    }

    /// Appends the identifier field to a document.
    pub fn add_id(&self, doc: &mut TantivyDocument, id: &str) {
        doc.add_text(self.id, id);
    }

    /// Appends the unique-key field to a document.
    pub fn add_unique_key(&self, doc: &mut TantivyDocument, key: &str) {
        doc.add_text(self.unique_key, key);
    }

    /// Appends the tenant field to a document.
    pub fn add_tenant_id(&self, doc: &mut TantivyDocument, tenant_id: &str) {
        doc.add_text(self.tenant_id, tenant_id);
    }

    /// Appends the type discriminator field to a document.
    pub fn add_type_name(&self, doc: &mut TantivyDocument, type_name: &str) {
        doc.add_text(self.type_name, type_name);
    }

    /// Appends the routing-key field to a document.
    pub fn add_routing_key(&self, doc: &mut TantivyDocument, routing_key: &str) {
        doc.add_text(self.routing_key, routing_key);
    }

    /// Appends the main/child marker to a document.
    pub fn add_doc_kind(&self, doc: &mut TantivyDocument, kind: &str) {
        doc.add_text(self.doc_kind, kind);
    }

    /// Appends the nested-path field to a child document.
    pub fn add_nested_path(&self, doc: &mut TantivyDocument, path: &str) {
        doc.add_text(self.nested_path, path);
    }
}

/// Adds an indexed-only metadata field: raw single token, no norms, nothing
/// stored and no columnar value.
fn searchable(builder: &mut SchemaBuilder, name: &str) -> Field {
    builder.add_text_field(&internal_field_name(name), STRING)
}

/// Adds an indexed metadata field whose raw value is also readable from the
/// columnar (fast) store at search time.
fn searchable_retrievable(builder: &mut SchemaBuilder, name: &str) -> Field {
    builder.add_text_field(&internal_field_name(name), STRING | FAST)
}

#[cfg(test)]
mod test {
    use tantivy::schema::{FieldType, Schema};

    use super::*;

    fn build() -> (Schema, MetadataFields) {
        let mut builder = Schema::builder();
        let fields = MetadataFields::register(&mut builder);
        (builder.build(), fields)
    }

    #[test]
    fn internal_names_carry_the_reserved_prefix() {
        for name in ["id", "", "tenant_id", "__quarry_id"] {
            assert!(internal_field_name(name).starts_with(INTERNAL_FIELD_PREFIX));
        }
    }

    #[test]
    fn prefixing_distinct_names_never_collides() {
        let names = ["id", "", "type", "unique_key", "__quarry_id", "Id"];
        let mut prefixed: Vec<String> = names.iter().map(|n| internal_field_name(n)).collect();
        prefixed.sort();
        prefixed.dedup();
        assert_eq!(prefixed.len(), names.len());
    }

    #[test]
    fn registers_all_metadata_fields() {
        let (schema, _) = build();
        for name in [
            "id",
            "unique_key",
            "tenant_id",
            "type",
            "routing_key",
            "doc_kind",
            "nested_path",
        ] {
            assert!(
                schema.get_field(&internal_field_name(name)).is_ok(),
                "missing internal field {name}"
            );
        }
    }

    #[test]
    fn searchable_fields_are_raw_and_not_retrievable() {
        let (schema, fields) = build();
        let entry = schema.get_field_entry(fields.type_name);

        assert!(entry.is_indexed());
        assert!(!entry.is_stored());
        assert!(!entry.is_fast());

        if let FieldType::Str(opts) = entry.field_type() {
            assert_eq!(opts.get_indexing_options().unwrap().tokenizer(), "raw");
        } else {
            panic!("type field should be a text field");
        }
    }

    #[test]
    fn retrievable_fields_expose_a_fast_column() {
        let (schema, fields) = build();
        for field in [fields.id, fields.tenant_id] {
            let entry = schema.get_field_entry(field);
            assert!(entry.is_indexed());
            assert!(entry.is_fast());
            assert!(!entry.is_stored());
        }
    }
}
