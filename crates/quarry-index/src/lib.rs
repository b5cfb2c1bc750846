//! Tantivy-based low-level indexing core.
//!
//! This crate owns the write side of a quarry index:
//! - Internal metadata field encoding (identifier, tenant id, type
//!   discriminator, nested-document markers) in a reserved namespace
//! - Discriminator-based multi-tenancy: tenant field at index time, term
//!   filter at query time, fail-fast tenant validation
//! - An immutable writer configuration source that stamps out identical
//!   writer settings on every (re)creation
//! - A writer wrapper applying entity-change events as upserts
//! - A diagnostics bridge forwarding writer messages into `tracing`
//!
//! # Example
//!
//! ```no_run
//! use quarry_index::{
//!     EntityChange, EventContext, FieldMode, IndexSchema, IndexWriter, MultiTenancy,
//!     TenancyMode, UserFieldSpec, WriterConfigSource,
//! };
//!
//! let context = EventContext::index("books");
//! let schema = IndexSchema::build(
//!     &[UserFieldSpec::new("title", FieldMode::IndexedAndStored)],
//!     &context,
//! )
//! .unwrap();
//!
//! let mut writer = IndexWriter::open(
//!     "./index".as_ref(),
//!     schema,
//!     MultiTenancy::new(TenancyMode::Single),
//!     WriterConfigSource::defaults(context),
//! )
//! .unwrap();
//!
//! writer
//!     .add_entity(&EntityChange::new("doc-1", "book").field("title", "hello"))
//!     .unwrap();
//! writer.commit().unwrap();
//! ```

#![warn(missing_docs)]

mod analyzer;
mod context;
mod diagnostics;
mod document;
mod error;
mod fields;
mod schema;
mod settings;
mod tenancy;
mod writer;

pub use analyzer::{QUARRY_TOKENIZER, default_analyzer};
pub use context::EventContext;
pub use diagnostics::{DiagnosticsBridge, WRITER_LOG_TARGET};
pub use document::{EntityChange, FieldValue, NestedObject};
pub use error::IndexError;
pub use fields::{
    DOC_KIND_CHILD, DOC_KIND_MAIN, INTERNAL_FIELD_PREFIX, MetadataFields, internal_field_name,
};
pub use schema::{FieldMode, IndexSchema, UserFieldSpec};
pub use settings::{
    KEY_DELETES_RATIO, KEY_HEAP_BYTES, KEY_LEVEL_LOG_SIZE, KEY_MAX_DOCS_BEFORE_MERGE,
    KEY_MIN_LAYER_SIZE, KEY_MIN_NUM_SEGMENTS, KEY_NUM_THREADS, WriterConfigSource, WriterSetting,
};
pub use tenancy::{DocumentKeyPolicy, MultiTenancy, TenancyMode, UNIQUE_KEY_SEPARATOR};
pub use writer::IndexWriter;
