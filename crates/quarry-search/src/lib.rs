//! Low-level search execution for quarry indexes.
//!
//! Builds on [`quarry_index`] with the query-side machinery: deadline-aware
//! hit counting, payload decoding keyed by index-wide document ordinals,
//! constant-score filter queries for tenant and type scoping, and a
//! composition layer running several collectors in one index pass.
//!
//! # Example
//!
//! ```no_run
//! use std::{path::Path, time::Duration};
//!
//! use quarry_index::{EventContext, IndexSchema, MultiTenancy, TenancyMode, UserFieldSpec, FieldMode};
//! use quarry_search::{Deadline, Searcher};
//! use tantivy::{Term, query::TermQuery, schema::IndexRecordOption};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let context = EventContext::index("books");
//! let schema = IndexSchema::build(
//!     &[UserFieldSpec::new("title", FieldMode::Indexed)],
//!     &context,
//! )?;
//! let tenancy = MultiTenancy::new(TenancyMode::Single);
//! let searcher = Searcher::open(Path::new("/tmp/books"), schema, tenancy, context)?;
//!
//! let field = searcher.schema().user_field("title").ok_or("unknown field")?;
//! let query = TermQuery::new(
//!     Term::from_field_text(field, "dune"),
//!     IndexRecordOption::Basic,
//! );
//! let count = searcher.count(
//!     Box::new(query),
//!     None,
//!     Deadline::from_timeout(Duration::from_millis(500)),
//! )?;
//! println!("{} hits (truncated: {})", count.count, count.truncated);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod collect;
mod deadline;
mod error;
pub mod query;
mod searcher;

pub use collect::{
    CollectedFruits, CollectorFactory, CollectorKey, ComposedCollectors, CountCollectorFactory,
    DeadlineCountCollector, ExecutionContext, FastStrExtractor, FnExtractor, HitCount,
    PayloadCollector, PayloadCollectorFactory, PayloadExtractor, PayloadValues,
};
pub use deadline::Deadline;
pub use error::SearchError;
pub use query::{ConstScoreDocsQuery, SegmentTypeResolver, TypeNameQuery, UniformTypeResolver};
pub use searcher::{Hit, Searcher};
