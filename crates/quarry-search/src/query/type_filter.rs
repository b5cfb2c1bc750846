//! Filter matching every document of segments that hold a given type.
//!
//! When an index is dedicated to a single mapped type, each segment either
//! belongs to that type entirely or not at all. Resolving the type once per
//! segment lets the filter degenerate to an all-docs or empty scorer instead
//! of evaluating a term per document.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use tantivy::{
    DocId, DocSet, Score, SegmentReader, TERMINATED, TantivyError,
    query::{ConstScorer, EnableScoring, Explanation, Query, Scorer, Weight},
};

/// Resolves the mapped type name a segment belongs to.
///
/// Implementations must not retain the segment reader: the resolver is
/// consulted once per segment per query execution.
pub trait SegmentTypeResolver: Send + Sync + 'static {
    /// Type name held by this segment, or `None` when unknown.
    fn segment_type_name(&self, reader: &SegmentReader) -> Option<String>;
}

/// Resolver for indexes dedicated to a single mapped type.
#[derive(Debug, Clone)]
pub struct UniformTypeResolver {
    type_name: String,
}

impl UniformTypeResolver {
    /// Creates a resolver reporting `type_name` for every segment.
    pub fn new(type_name: impl Into<String>) -> Self {
        UniformTypeResolver {
            type_name: type_name.into(),
        }
    }
}

impl SegmentTypeResolver for UniformTypeResolver {
    fn segment_type_name(&self, _reader: &SegmentReader) -> Option<String> {
        Some(self.type_name.clone())
    }
}

/// Query matching all documents of segments whose resolved type equals the
/// target type name, and none of any other segment.
#[derive(Clone)]
pub struct TypeNameQuery {
    type_name: String,
    resolver: Arc<dyn SegmentTypeResolver>,
}

impl TypeNameQuery {
    /// Creates a filter for `type_name` using the given per-segment resolver.
    pub fn new(type_name: impl Into<String>, resolver: Arc<dyn SegmentTypeResolver>) -> Self {
        TypeNameQuery {
            type_name: type_name.into(),
            resolver,
        }
    }

    /// The type name this filter selects.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl fmt::Debug for TypeNameQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeNameQuery")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// Identity is the target type name. The resolver is shared infrastructure
// and does not participate in equality, so two filters for the same type
// compare and hash the same even with distinct resolver handles.
impl PartialEq for TypeNameQuery {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for TypeNameQuery {}

impl Hash for TypeNameQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
    }
}

impl Query for TypeNameQuery {
    fn weight(&self, _enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        Ok(Box::new(TypeNameWeight {
            type_name: self.type_name.clone(),
            resolver: Arc::clone(&self.resolver),
        }))
    }
}

struct TypeNameWeight {
    type_name: String,
    resolver: Arc<dyn SegmentTypeResolver>,
}

impl Weight for TypeNameWeight {
    fn scorer(&self, reader: &SegmentReader, boost: Score) -> tantivy::Result<Box<dyn Scorer>> {
        if self.resolver.segment_type_name(reader).as_deref() == Some(&self.type_name) {
            let docs = AllDocsSet::new(reader.max_doc());
            Ok(Box::new(ConstScorer::new(docs, boost)))
        } else {
            Ok(Box::new(NoDocsScorer))
        }
    }

    fn explain(&self, reader: &SegmentReader, doc: DocId) -> tantivy::Result<Explanation> {
        let mut scorer = self.scorer(reader, 1.0)?;
        if scorer.seek(doc) == doc {
            Ok(Explanation::new("type name filter", scorer.score()))
        } else {
            Err(TantivyError::InvalidArgument(format!(
                "document {doc} does not match the type name filter"
            )))
        }
    }
}

/// Doc set over all documents of a segment, `0..max_doc`.
struct AllDocsSet {
    doc: DocId,
    max_doc: DocId,
}

impl AllDocsSet {
    fn new(max_doc: DocId) -> Self {
        AllDocsSet {
            doc: if max_doc == 0 { TERMINATED } else { 0 },
            max_doc,
        }
    }
}

impl DocSet for AllDocsSet {
    fn advance(&mut self) -> DocId {
        if self.doc == TERMINATED {
            return TERMINATED;
        }
        self.doc += 1;
        if self.doc >= self.max_doc {
            self.doc = TERMINATED;
        }
        self.doc
    }

    fn doc(&self) -> DocId {
        self.doc
    }

    fn size_hint(&self) -> u32 {
        self.max_doc
    }
}

struct NoDocsScorer;

impl DocSet for NoDocsScorer {
    fn advance(&mut self) -> DocId {
        TERMINATED
    }

    fn doc(&self) -> DocId {
        TERMINATED
    }

    fn size_hint(&self) -> u32 {
        0
    }
}

impl Scorer for NoDocsScorer {
    fn score(&mut self) -> Score {
        0.0
    }
}
