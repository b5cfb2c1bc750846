//! Search execution against a quarry index.
//!
//! Provides the [`Searcher`] struct for running queries with tenant and type
//! scoping, deadline-aware counting, top-hits retrieval, and composed
//! collector runs.

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

use quarry_index::{
    DOC_KIND_MAIN, EventContext, IndexSchema, MultiTenancy, QUARRY_TOKENIZER, default_analyzer,
    internal_field_name,
};
use tantivy::{
    DocId, Index, IndexReader, SegmentId, Term,
    collector::TopDocs,
    directory::MmapDirectory,
    query::{BooleanQuery, ConstScoreQuery, Occur, Query, TermQuery},
    schema::IndexRecordOption,
};

use crate::{
    Deadline, SearchError,
    collect::{
        CollectedFruits, CollectorFactory, ComposedCollectors, CountCollectorFactory,
        ExecutionContext, FastStrExtractor, HitCount, PayloadCollectorFactory,
    },
    query::{ConstScoreDocsQuery, TypeNameQuery},
};

/// A single ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Entity identifier decoded from the index.
    pub id: String,
    /// Relevance score of the hit.
    pub score: f32,
    /// Index-wide ordinal of the backing document, stable for one searcher
    /// snapshot.
    pub ordinal: u64,
}

/// Primary search entry point for a quarry index.
pub struct Searcher {
    reader: IndexReader,
    schema: IndexSchema,
    tenancy: MultiTenancy,
    context: EventContext,
}

impl Searcher {
    /// Opens an existing index for searching.
    ///
    /// The schema and tenancy mode must match what the index was written
    /// with.
    pub fn open(
        path: &Path,
        schema: IndexSchema,
        tenancy: MultiTenancy,
        context: EventContext,
    ) -> Result<Self, SearchError> {
        let dir = MmapDirectory::open(path).map_err(|e| {
            let err: tantivy::TantivyError = e.into();
            SearchError::open_index(&err)
        })?;
        let index = Index::open(dir).map_err(|e| SearchError::open_index(&e))?;
        index
            .tokenizers()
            .register(QUARRY_TOKENIZER, default_analyzer());
        let reader = index.reader().map_err(|e| SearchError::open_index(&e))?;
        Ok(Searcher {
            reader,
            schema,
            tenancy,
            context,
        })
    }

    /// Context describing the index for error reporting.
    pub fn context(&self) -> &EventContext {
        &self.context
    }

    /// Schema the searcher resolves user fields against.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Refreshes the searcher's view of the index.
    ///
    /// Commits made after the searcher was opened become visible only after
    /// a reload.
    pub fn reload(&self) -> Result<(), SearchError> {
        self.reader.reload().map_err(|e| SearchError::execute(&e))
    }

    /// Filter matching only main documents, excluding nested children.
    pub fn main_docs_filter(&self) -> Box<dyn Query> {
        let term = Term::from_field_text(self.schema.metadata.doc_kind, DOC_KIND_MAIN);
        Box::new(TermQuery::new(term, IndexRecordOption::Basic))
    }

    /// Wraps a content query with tenant and type filters.
    ///
    /// The tenant id is validated against the index's tenancy mode before
    /// any filter is built. Filters join the content query as `Must` clauses
    /// wrapped in a zero-score [`ConstScoreQuery`], so they narrow the match
    /// set without disturbing relevance scores.
    pub fn scoped(
        &self,
        content_query: Box<dyn Query>,
        tenant_id: Option<&str>,
        type_filter: Option<TypeNameQuery>,
    ) -> Result<Box<dyn Query>, SearchError> {
        self.tenancy.check_tenant_id(tenant_id, &self.context)?;
        let tenant_filter = self.tenancy.filter_or_null(&self.schema.metadata, tenant_id);
        Ok(combine_filters(content_query, tenant_filter, type_filter))
    }

    /// Wraps a content query with a filter matching any of several tenants.
    pub fn scoped_any_of(
        &self,
        content_query: Box<dyn Query>,
        tenant_ids: &BTreeSet<String>,
        type_filter: Option<TypeNameQuery>,
    ) -> Result<Box<dyn Query>, SearchError> {
        let tenant_filter =
            self.tenancy
                .filter_any_of(&self.schema.metadata, tenant_ids, &self.context)?;
        Ok(combine_filters(content_query, tenant_filter, type_filter))
    }

    /// Counts documents matching the query within the tenant scope.
    ///
    /// Counting stops once `deadline` expires; the returned [`HitCount`]
    /// then carries a lower bound and the truncated flag.
    pub fn count(
        &self,
        content_query: Box<dyn Query>,
        tenant_id: Option<&str>,
        deadline: Deadline,
    ) -> Result<HitCount, SearchError> {
        let query = self.scoped(content_query, tenant_id, None)?;
        self.count_scoped(query, deadline)
    }

    /// Counts documents matching the query across several tenants.
    pub fn count_any_of(
        &self,
        content_query: Box<dyn Query>,
        tenant_ids: &BTreeSet<String>,
        deadline: Deadline,
    ) -> Result<HitCount, SearchError> {
        let query = self.scoped_any_of(content_query, tenant_ids, None)?;
        self.count_scoped(query, deadline)
    }

    fn count_scoped(
        &self,
        query: Box<dyn Query>,
        deadline: Deadline,
    ) -> Result<HitCount, SearchError> {
        let searcher = self.reader.searcher();
        let context = ExecutionContext::new(&searcher, deadline);
        let factory = CountCollectorFactory::new();
        let collector = factory.create(&context)?;
        searcher
            .search(&*query, &collector)
            .map_err(|e| SearchError::execute(&e))
    }

    /// Runs the query and returns the best `limit` hits with decoded ids.
    ///
    /// Two passes over one searcher snapshot: top docs first, then a payload
    /// run over exactly those documents to read the id fast field.
    pub fn top_hits(
        &self,
        content_query: Box<dyn Query>,
        tenant_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Hit>, SearchError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query = self.scoped(content_query, tenant_id, None)?;
        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&*query, &TopDocs::with_limit(limit))
            .map_err(|e| SearchError::execute(&e))?;
        if top_docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_segment: HashMap<SegmentId, Vec<DocId>> = HashMap::new();
        for (_score, address) in &top_docs {
            let segment_id = searcher.segment_reader(address.segment_ord).segment_id();
            by_segment.entry(segment_id).or_default().push(address.doc_id);
        }
        let replay = ConstScoreDocsQuery::new(by_segment, 1.0);

        let context = ExecutionContext::new(&searcher, Deadline::none());
        let factory =
            PayloadCollectorFactory::new(FastStrExtractor::new(internal_field_name("id")));
        let collector = factory.create(&context)?;
        let mut ids = searcher
            .search(&replay, &collector)
            .map_err(|e| SearchError::execute(&e))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let ordinal = context.global_ordinal(address.segment_ord, address.doc_id);
            // Every document written through the index layer carries exactly
            // one id; a hit without one means the index was not built by it.
            let id = ids.remove(&ordinal).flatten().ok_or_else(|| {
                SearchError::Execute(format!("document {ordinal} has no id value"))
            })?;
            hits.push(Hit { id, score, ordinal });
        }
        Ok(hits)
    }

    /// Runs several collectors over one scoped query in a single pass.
    ///
    /// The closure registers collectors against the composition using the
    /// execution context built for this run; the returned fruits are keyed
    /// by each factory's [`crate::collect::CollectorKey`].
    pub fn collect<F>(
        &self,
        content_query: Box<dyn Query>,
        tenant_id: Option<&str>,
        deadline: Deadline,
        register: F,
    ) -> Result<CollectedFruits, SearchError>
    where
        F: FnOnce(&mut ComposedCollectors<'static>, &ExecutionContext) -> Result<(), SearchError>,
    {
        let query = self.scoped(content_query, tenant_id, None)?;
        let searcher = self.reader.searcher();
        let context = ExecutionContext::new(&searcher, deadline);
        let mut composed = ComposedCollectors::new();
        register(&mut composed, &context)?;
        composed.search(&searcher, &*query)
    }

    /// Total number of alive documents visible to this searcher.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

fn combine_filters(
    content_query: Box<dyn Query>,
    tenant_filter: Option<Box<dyn Query>>,
    type_filter: Option<TypeNameQuery>,
) -> Box<dyn Query> {
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, content_query)];
    if let Some(filter) = tenant_filter {
        clauses.push((Occur::Must, Box::new(ConstScoreQuery::new(filter, 0.0))));
    }
    if let Some(filter) = type_filter {
        clauses.push((
            Occur::Must,
            Box::new(ConstScoreQuery::new(Box::new(filter), 0.0)),
        ));
    }
    if clauses.len() == 1 {
        match clauses.pop() {
            Some((_, query)) => query,
            None => Box::new(BooleanQuery::new(Vec::new())),
        }
    } else {
        Box::new(BooleanQuery::new(clauses))
    }
}
