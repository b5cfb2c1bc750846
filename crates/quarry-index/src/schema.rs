//! Index schema construction.
//!
//! A schema combines the caller's field declarations with the internal
//! metadata fields from [`crate::fields`]. User field names are validated
//! against the reserved internal namespace before the schema is built.

use std::collections::HashMap;

use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions};

use crate::{
    EventContext, IndexError,
    analyzer::QUARRY_TOKENIZER,
    fields::{INTERNAL_FIELD_PREFIX, MetadataFields},
};

/// Indexing/storage mode of a user-declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Tokenized and searchable, not retrievable from the document store.
    Indexed,
    /// Retrievable from the document store, not searchable.
    Stored,
    /// Both searchable and retrievable.
    IndexedAndStored,
}

/// A user-declared text field.
#[derive(Debug, Clone)]
pub struct UserFieldSpec {
    /// Field name; must not start with the internal prefix.
    pub name: String,
    /// Indexing/storage mode.
    pub mode: FieldMode,
}

impl UserFieldSpec {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, mode: FieldMode) -> Self {
        Self {
            name: name.into(),
            mode,
        }
    }
}

/// Handles to all fields of a built index schema.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    /// The underlying Tantivy schema.
    schema: Schema,
    /// Internal metadata field handles.
    pub metadata: MetadataFields,
    /// User field handles by declared name.
    user_fields: HashMap<String, Field>,
}

impl IndexSchema {
    /// Builds a schema from user field declarations.
    ///
    /// Fails with a configuration error when a user field name collides with
    /// the reserved internal namespace or is declared twice.
    pub fn build(user_fields: &[UserFieldSpec], context: &EventContext) -> Result<Self, IndexError> {
        let mut builder = Schema::builder();
        let metadata = MetadataFields::register(&mut builder);

        let mut handles = HashMap::with_capacity(user_fields.len());
        for spec in user_fields {
            if spec.name.starts_with(INTERNAL_FIELD_PREFIX) {
                return Err(IndexError::config(
                    context,
                    format!(
                        "field name '{}' collides with the reserved prefix '{INTERNAL_FIELD_PREFIX}'",
                        spec.name
                    ),
                ));
            }
            if handles.contains_key(&spec.name) {
                return Err(IndexError::config(
                    context,
                    format!("field '{}' is declared twice", spec.name),
                ));
            }

            let field = builder.add_text_field(&spec.name, text_options(spec.mode));
            handles.insert(spec.name.clone(), field);
        }

        Ok(Self {
            schema: builder.build(),
            metadata,
            user_fields: handles,
        })
    }

    /// Returns a reference to the underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Looks up a user field handle by name.
    pub fn user_field(&self, name: &str) -> Option<Field> {
        self.user_fields.get(name).copied()
    }
}

/// Maps a field mode to Tantivy text options.
fn text_options(mode: FieldMode) -> TextOptions {
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(QUARRY_TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);

    match mode {
        FieldMode::Indexed => TextOptions::default().set_indexing_options(indexing),
        FieldMode::Stored => TextOptions::default().set_stored(),
        FieldMode::IndexedAndStored => TextOptions::default()
            .set_indexing_options(indexing)
            .set_stored(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn context() -> EventContext {
        EventContext::index("test")
    }

    #[test]
    fn builds_user_and_metadata_fields() {
        let schema = IndexSchema::build(
            &[
                UserFieldSpec::new("title", FieldMode::IndexedAndStored),
                UserFieldSpec::new("body", FieldMode::Indexed),
            ],
            &context(),
        )
        .unwrap();

        assert!(schema.user_field("title").is_some());
        assert!(schema.user_field("body").is_some());
        assert!(schema.user_field("missing").is_none());
        assert!(schema.schema().get_field("__quarry_id").is_ok());
    }

    #[test]
    fn rejects_reserved_prefix() {
        let err = IndexSchema::build(
            &[UserFieldSpec::new("__quarry_title", FieldMode::Indexed)],
            &context(),
        )
        .unwrap_err();

        match err {
            IndexError::Config { context, message } => {
                assert!(context.contains("test"));
                assert!(message.contains("__quarry_"));
            }
            other => panic!("expected config error, got {other}"),
        }
    }

    #[test]
    fn rejects_duplicate_declaration() {
        let err = IndexSchema::build(
            &[
                UserFieldSpec::new("title", FieldMode::Indexed),
                UserFieldSpec::new("title", FieldMode::Stored),
            ],
            &context(),
        )
        .unwrap_err();

        assert!(matches!(err, IndexError::Config { .. }));
    }

    #[test]
    fn indexed_mode_is_searchable_but_not_stored() {
        let schema = IndexSchema::build(
            &[UserFieldSpec::new("body", FieldMode::Indexed)],
            &context(),
        )
        .unwrap();

        let entry = schema.schema().get_field_entry(schema.user_field("body").unwrap());
        assert!(entry.is_indexed());
        assert!(!entry.is_stored());
    }

    #[test]
    fn stored_mode_is_retrievable_but_not_searchable() {
        let schema = IndexSchema::build(
            &[UserFieldSpec::new("payload", FieldMode::Stored)],
            &context(),
        )
        .unwrap();

        let entry = schema
            .schema()
            .get_field_entry(schema.user_field("payload").unwrap());
        assert!(!entry.is_indexed());
        assert!(entry.is_stored());
    }
}
