//! Constant-score query wrappers used for filtering.
//!
//! Both queries here are filters rather than scoring queries: every matching
//! document receives the same constant score. They are meant to be combined
//! with a content query as `Must` clauses of a `BooleanQuery`, wrapped in
//! [`tantivy::query::ConstScoreQuery`] with score zero so they never disturb
//! relevance ranking.

mod const_score;
mod type_filter;

pub use const_score::ConstScoreDocsQuery;
pub use type_filter::{SegmentTypeResolver, TypeNameQuery, UniformTypeResolver};
