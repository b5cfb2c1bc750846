//! Index writer for applying entity changes to the Tantivy index.

use std::{fs, path::Path};

use tantivy::{
    Index, IndexWriter as TantivyIndexWriter, TantivyDocument, Term, directory::MmapDirectory,
};

use crate::{
    EntityChange, EventContext, FieldValue, IndexError, IndexSchema, MultiTenancy,
    analyzer::QUARRY_TOKENIZER,
    diagnostics::DiagnosticsBridge,
    fields::{DOC_KIND_CHILD, DOC_KIND_MAIN},
    settings::WriterConfigSource,
};

/// Applies entity changes to a Tantivy index.
///
/// The writer opens or creates an index at the specified path and provides
/// upsert, delete, and commit operations. Writes are tenant-checked before
/// any mutation. A failed writer can be discarded and replaced via
/// [`recreate`](Self::recreate) without configuration drift: the immutable
/// [`WriterConfigSource`] stamps out identical settings every time.
pub struct IndexWriter {
    /// The Tantivy index.
    index: Index,
    /// The underlying Tantivy writer.
    writer: TantivyIndexWriter,
    /// Schema with field handles.
    schema: IndexSchema,
    /// Tenant isolation strategy.
    tenancy: MultiTenancy,
    /// Immutable writer configuration, reused on every (re)creation.
    config: WriterConfigSource,
    /// Diagnostics sink.
    diagnostics: DiagnosticsBridge,
}

impl IndexWriter {
    /// Opens or creates an index at the given path.
    ///
    /// If the index doesn't exist, it is created with the given schema. The
    /// configuration source's analyzer is registered for user text fields,
    /// and the writer is stamped out from the source.
    pub fn open(
        path: &Path,
        schema: IndexSchema,
        tenancy: MultiTenancy,
        config: WriterConfigSource,
    ) -> Result<Self, IndexError> {
        fs::create_dir_all(path)?;

        let dir = MmapDirectory::open(path).map_err(|e| {
            let err: tantivy::TantivyError = e.into();
            IndexError::open_index(path.to_path_buf(), &err)
        })?;

        let index = Index::open_or_create(dir, schema.schema().clone())
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;
        index.tokenizers().register(QUARRY_TOKENIZER, config.analyzer());

        let diagnostics = DiagnosticsBridge::new(config.context().clone());
        let writer = config.open_writer(&index)?;
        diagnostics.message("writer", "writer created");
        diagnostics.message("merge", "merge policy applied from configuration source");

        Ok(Self {
            index,
            writer,
            schema,
            tenancy,
            config,
            diagnostics,
        })
    }

    /// Returns the event context this writer reports errors against.
    pub fn context(&self) -> &EventContext {
        self.config.context()
    }

    /// Applies one entity change as an upsert.
    ///
    /// Any previously indexed revision of the entity (main document plus
    /// nested children) is deleted by its unique key, then the new documents
    /// are staged. Nothing is visible until [`commit`](Self::commit).
    pub fn add_entity(&mut self, event: &EntityChange) -> Result<(), IndexError> {
        let context = self.config.context().clone();
        self.tenancy
            .check_tenant_id(event.tenant_id.as_deref(), &context)?;

        let unique_key = self
            .tenancy
            .key_policy()
            .unique_key(event.tenant_id.as_deref(), &event.id)?;

        // Upsert: drop the previous revision of this entity first.
        let term = Term::from_field_text(self.schema.metadata.unique_key, &unique_key);
        self.writer.delete_term(term);

        let main = self.encode_document(event, &unique_key, DOC_KIND_MAIN, None, &event.fields)?;
        self.writer
            .add_document(main)
            .map_err(|e| IndexError::write(&e))?;

        for child in &event.children {
            let doc = self.encode_document(
                event,
                &unique_key,
                DOC_KIND_CHILD,
                Some(&child.path),
                &child.fields,
            )?;
            self.writer
                .add_document(doc)
                .map_err(|e| IndexError::write(&e))?;
        }

        Ok(())
    }

    /// Encodes one document (main or nested child) for an entity change.
    fn encode_document(
        &self,
        event: &EntityChange,
        unique_key: &str,
        kind: &str,
        nested_path: Option<&str>,
        values: &[FieldValue],
    ) -> Result<TantivyDocument, IndexError> {
        let fields = &self.schema.metadata;
        let mut doc = TantivyDocument::new();

        fields.add_id(&mut doc, &event.id);
        fields.add_unique_key(&mut doc, unique_key);
        fields.add_type_name(&mut doc, &event.type_name);
        fields.add_doc_kind(&mut doc, kind);
        self.tenancy
            .contribute_to_document(&mut doc, fields, event.tenant_id.as_deref());

        if let Some(routing_key) = &event.routing_key {
            fields.add_routing_key(&mut doc, routing_key);
        }
        if let Some(path) = nested_path {
            fields.add_nested_path(&mut doc, path);
        }

        for value in values {
            let field = self.schema.user_field(&value.name).ok_or_else(|| {
                IndexError::config(
                    self.config.context(),
                    format!("field '{}' is not declared in the schema", value.name),
                )
            })?;
            doc.add_text(field, &value.value);
        }

        Ok(doc)
    }

    /// Deletes an entity (main document and nested children) by id.
    pub fn delete_entity(&mut self, tenant_id: Option<&str>, id: &str) -> Result<(), IndexError> {
        let context = self.config.context().clone();
        self.tenancy.check_tenant_id(tenant_id, &context)?;

        let unique_key = self.tenancy.key_policy().unique_key(tenant_id, id)?;
        let term = Term::from_field_text(self.schema.metadata.unique_key, &unique_key);
        self.writer.delete_term(term);
        Ok(())
    }

    /// Deletes every document belonging to one tenant.
    pub fn purge_tenant(&mut self, tenant_id: &str) -> Result<(), IndexError> {
        let context = self.config.context().clone();
        self.tenancy.check_tenant_id(Some(tenant_id), &context)?;

        let term = Term::from_field_text(self.schema.metadata.tenant_id, tenant_id);
        self.writer.delete_term(term);
        self.diagnostics
            .message("delete", &format!("purged tenant '{tenant_id}'"));
        Ok(())
    }

    /// Commits all pending changes, making them visible to readers.
    pub fn commit(&mut self) -> Result<(), IndexError> {
        self.writer.commit().map_err(|e| IndexError::commit(&e))?;
        self.diagnostics.message("commit", "commit completed");
        Ok(())
    }

    /// Rolls back any uncommitted changes.
    pub fn rollback(&mut self) -> Result<(), IndexError> {
        self.writer.rollback().map_err(|e| IndexError::commit(&e))?;
        self.diagnostics.message("commit", "rollback completed");
        Ok(())
    }

    /// Discards this writer and stamps out a replacement.
    ///
    /// Used after a writer operation failed: the old writer (and its lock)
    /// is dropped first, then a new writer is created from the immutable
    /// configuration source with identical effective settings.
    pub fn recreate(self) -> Result<Self, IndexError> {
        let Self {
            index,
            writer,
            schema,
            tenancy,
            config,
            diagnostics,
        } = self;
        drop(writer);

        let writer = config.open_writer(&index)?;
        diagnostics.message("writer", "writer recreated after failure");

        Ok(Self {
            index,
            writer,
            schema,
            tenancy,
            config,
            diagnostics,
        })
    }

    /// Returns the number of committed documents in the index.
    pub fn num_docs(&self) -> Result<u64, IndexError> {
        let reader = self
            .index
            .reader()
            .map_err(|e| IndexError::Write(e.to_string()))?;
        Ok(reader.searcher().num_docs())
    }
}
