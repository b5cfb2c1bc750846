//! Query over an explicit set of documents, scored with a constant.
//!
//! Used for second-pass lookups: a first pass produces document addresses
//! (for example from a top-docs collector), and this query replays exactly
//! those documents so a payload collector can decode their fields without
//! re-evaluating the original query.

use std::{collections::HashMap, sync::Arc};

use tantivy::{
    DocId, DocSet, Score, SegmentId, SegmentReader, TERMINATED, TantivyError,
    query::{ConstScorer, EnableScoring, Explanation, Query, Scorer, Weight},
};

/// Query matching a fixed per-segment list of documents.
///
/// Every match receives the same constant score. Segments absent from the
/// map match nothing, so the query stays valid when the searcher sees more
/// segments than the address set covers.
#[derive(Debug, Clone)]
pub struct ConstScoreDocsQuery {
    docs: Arc<HashMap<SegmentId, Vec<DocId>>>,
    score: Score,
}

impl ConstScoreDocsQuery {
    /// Creates a query over the given documents.
    ///
    /// Each per-segment list is sorted and deduplicated; callers may pass
    /// addresses in any order.
    pub fn new(mut docs: HashMap<SegmentId, Vec<DocId>>, score: Score) -> Self {
        for list in docs.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        ConstScoreDocsQuery {
            docs: Arc::new(docs),
            score,
        }
    }

    /// Total number of documents across all segments.
    pub fn cardinality(&self) -> usize {
        self.docs.values().map(Vec::len).sum()
    }
}

impl Query for ConstScoreDocsQuery {
    fn weight(&self, _enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        Ok(Box::new(ConstScoreDocsWeight {
            docs: Arc::clone(&self.docs),
            score: self.score,
        }))
    }
}

struct ConstScoreDocsWeight {
    docs: Arc<HashMap<SegmentId, Vec<DocId>>>,
    score: Score,
}

impl Weight for ConstScoreDocsWeight {
    fn scorer(&self, reader: &SegmentReader, boost: Score) -> tantivy::Result<Box<dyn Scorer>> {
        let list = self
            .docs
            .get(&reader.segment_id())
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(ConstScorer::new(
            SortedDocsSet::new(list),
            self.score * boost,
        )))
    }

    fn explain(&self, reader: &SegmentReader, doc: DocId) -> tantivy::Result<Explanation> {
        let mut scorer = self.scorer(reader, 1.0)?;
        if scorer.seek(doc) == doc {
            Ok(Explanation::new("explicit document set", scorer.score()))
        } else {
            Err(TantivyError::InvalidArgument(format!(
                "document {doc} is not part of the explicit document set"
            )))
        }
    }
}

/// Doc set backed by a sorted, deduplicated vector of local doc ids.
struct SortedDocsSet {
    docs: Vec<DocId>,
    cursor: usize,
}

impl SortedDocsSet {
    fn new(docs: Vec<DocId>) -> Self {
        SortedDocsSet { docs, cursor: 0 }
    }
}

impl DocSet for SortedDocsSet {
    fn advance(&mut self) -> DocId {
        if self.cursor < self.docs.len() {
            self.cursor += 1;
        }
        self.doc()
    }

    fn doc(&self) -> DocId {
        match self.docs.get(self.cursor) {
            Some(doc) => *doc,
            None => TERMINATED,
        }
    }

    fn size_hint(&self) -> u32 {
        u32::try_from(self.docs.len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sorted_set_walks_in_order() {
        let mut docs = SortedDocsSet::new(vec![2, 5, 9]);
        assert_eq!(docs.doc(), 2);
        assert_eq!(docs.advance(), 5);
        assert_eq!(docs.advance(), 9);
        assert_eq!(docs.advance(), TERMINATED);
        assert_eq!(docs.advance(), TERMINATED);
    }

    #[test]
    fn empty_set_is_terminated() {
        let docs = SortedDocsSet::new(Vec::new());
        assert_eq!(docs.doc(), TERMINATED);
        assert_eq!(docs.size_hint(), 0);
    }

    #[test]
    fn construction_sorts_and_dedups() {
        let segment = SegmentId::generate_random();
        let mut map = HashMap::new();
        map.insert(segment, vec![7, 1, 7, 3]);
        let query = ConstScoreDocsQuery::new(map, 1.0);
        assert_eq!(query.cardinality(), 3);
    }
}
