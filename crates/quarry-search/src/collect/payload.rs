//! Payload collection: decoding a value per matching document.
//!
//! A payload collector maps every matching document to a caller-defined
//! value, keyed by the document's index-wide ordinal (segment doc base plus
//! local id). Values are decoded from fast-field columns or stored fields by
//! a [`PayloadExtractor`]; scores are never consulted.

use std::{collections::HashMap, marker::PhantomData, sync::Arc};

use tantivy::{
    DocId, Score, SegmentOrdinal, SegmentReader, TantivyDocument, TantivyError,
    collector::{Collector, SegmentCollector},
    columnar::StrColumn,
    store::StoreReader,
};

use super::{CollectorFactory, CollectorKey, ExecutionContext};
use crate::SearchError;

/// Number of blocks the per-segment document store reader caches.
const STORE_CACHE_BLOCKS: usize = 10;

/// Per-segment value source built by a [`PayloadExtractor`].
pub trait PayloadValues<T> {
    /// Decodes the value for one document.
    ///
    /// `stored` is the document's stored fields, preloaded only when the
    /// extractor asked for them.
    fn value(&mut self, doc: DocId, stored: Option<&TantivyDocument>) -> tantivy::Result<T>;
}

/// Builds per-segment value sources for a payload collector.
pub trait PayloadExtractor: Send + Sync + 'static {
    /// Value decoded per document.
    type Value: Send + 'static;

    /// Prepares a value source for one segment, resolving columns up front.
    fn for_segment(&self, reader: &SegmentReader)
    -> tantivy::Result<Box<dyn PayloadValues<Self::Value>>>;

    /// Whether [`PayloadValues::value`] needs the stored document.
    ///
    /// Stored fields are fetched once per matching document and only when
    /// this returns true; fast-field extractors leave it false.
    fn requires_stored_fields(&self) -> bool {
        false
    }
}

/// Collects one extracted value per matching document.
pub struct PayloadCollector<E: PayloadExtractor> {
    extractor: Arc<E>,
    doc_bases: Arc<Vec<u32>>,
}

impl<E: PayloadExtractor> PayloadCollector<E> {
    /// Creates a collector over `extractor` for the given segment geometry.
    pub fn new(extractor: Arc<E>, context: &ExecutionContext) -> Self {
        PayloadCollector {
            extractor,
            doc_bases: context.doc_bases(),
        }
    }
}

impl<E: PayloadExtractor> Collector for PayloadCollector<E> {
    type Fruit = HashMap<u64, E::Value>;
    type Child = PayloadSegmentCollector<E::Value>;

    fn for_segment(
        &self,
        segment_ord: SegmentOrdinal,
        reader: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        let values = self.extractor.for_segment(reader)?;
        let store = if self.extractor.requires_stored_fields() {
            Some(reader.get_store_reader(STORE_CACHE_BLOCKS)?)
        } else {
            None
        };
        let doc_base = self
            .doc_bases
            .get(segment_ord as usize)
            .copied()
            .unwrap_or(0);
        Ok(PayloadSegmentCollector {
            values,
            store,
            doc_base,
            collected: HashMap::new(),
            error: None,
        })
    }

    fn requires_scoring(&self) -> bool {
        false
    }

    fn merge_fruits(
        &self,
        segment_fruits: Vec<tantivy::Result<HashMap<u64, E::Value>>>,
    ) -> tantivy::Result<Self::Fruit> {
        let mut merged = HashMap::new();
        for fruit in segment_fruits {
            merged.extend(fruit?);
        }
        Ok(merged)
    }
}

/// Per-segment state for [`PayloadCollector`].
///
/// `collect` cannot fail, so the first decode error is parked here and
/// surfaced when the fruit is harvested and merged.
pub struct PayloadSegmentCollector<T> {
    values: Box<dyn PayloadValues<T>>,
    store: Option<StoreReader>,
    doc_base: u32,
    collected: HashMap<u64, T>,
    error: Option<TantivyError>,
}

impl<T: Send + 'static> SegmentCollector for PayloadSegmentCollector<T> {
    type Fruit = tantivy::Result<HashMap<u64, T>>;

    fn collect(&mut self, doc: DocId, _score: Score) {
        if self.error.is_some() {
            return;
        }
        let stored = match &self.store {
            Some(store) => match store.get::<TantivyDocument>(doc) {
                Ok(document) => Some(document),
                Err(e) => {
                    self.error = Some(e);
                    return;
                }
            },
            None => None,
        };
        match self.values.value(doc, stored.as_ref()) {
            Ok(value) => {
                let ordinal = u64::from(self.doc_base) + u64::from(doc);
                self.collected.insert(ordinal, value);
            }
            Err(e) => self.error = Some(e),
        }
    }

    fn harvest(self) -> Self::Fruit {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.collected),
        }
    }
}

/// Extractor reading a single-valued string fast field.
///
/// Documents without a value in the column decode to `None`.
#[derive(Debug, Clone)]
pub struct FastStrExtractor {
    field: String,
}

impl FastStrExtractor {
    /// Creates an extractor over the fast field named `field`.
    pub fn new(field: impl Into<String>) -> Self {
        FastStrExtractor {
            field: field.into(),
        }
    }
}

impl PayloadExtractor for FastStrExtractor {
    type Value = Option<String>;

    fn for_segment(
        &self,
        reader: &SegmentReader,
    ) -> tantivy::Result<Box<dyn PayloadValues<Option<String>>>> {
        let column = reader.fast_fields().str(&self.field)?;
        Ok(Box::new(FastStrValues { column }))
    }
}

struct FastStrValues {
    column: Option<StrColumn>,
}

impl PayloadValues<Option<String>> for FastStrValues {
    fn value(
        &mut self,
        doc: DocId,
        _stored: Option<&TantivyDocument>,
    ) -> tantivy::Result<Option<String>> {
        let Some(column) = &self.column else {
            return Ok(None);
        };
        let Some(ord) = column.term_ords(doc).next() else {
            return Ok(None);
        };
        let mut value = String::new();
        if column.ord_to_str(ord, &mut value)? {
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }
}

/// Extractor backed by a closure, for ad-hoc payloads.
pub struct FnExtractor<T, F> {
    decode: F,
    needs_stored: bool,
    _value: PhantomData<fn() -> T>,
}

impl<T, F> FnExtractor<T, F>
where
    T: Send + 'static,
    F: Fn(DocId, Option<&TantivyDocument>) -> tantivy::Result<T> + Clone + Send + Sync + 'static,
{
    /// Creates an extractor that decodes each document with `decode`.
    pub fn new(decode: F) -> Self {
        FnExtractor {
            decode,
            needs_stored: false,
            _value: PhantomData,
        }
    }

    /// Requests the stored document to be passed to the closure.
    #[must_use]
    pub fn with_stored_fields(mut self) -> Self {
        self.needs_stored = true;
        self
    }
}

impl<T, F> PayloadExtractor for FnExtractor<T, F>
where
    T: Send + 'static,
    F: Fn(DocId, Option<&TantivyDocument>) -> tantivy::Result<T> + Clone + Send + Sync + 'static,
{
    type Value = T;

    fn for_segment(&self, _reader: &SegmentReader) -> tantivy::Result<Box<dyn PayloadValues<T>>> {
        Ok(Box::new(FnValues {
            decode: self.decode.clone(),
        }))
    }

    fn requires_stored_fields(&self) -> bool {
        self.needs_stored
    }
}

struct FnValues<F> {
    decode: F,
}

impl<T, F> PayloadValues<T> for FnValues<F>
where
    F: Fn(DocId, Option<&TantivyDocument>) -> tantivy::Result<T>,
{
    fn value(&mut self, doc: DocId, stored: Option<&TantivyDocument>) -> tantivy::Result<T> {
        (self.decode)(doc, stored)
    }
}

/// Factory registering a [`PayloadCollector`] under a stable key.
pub struct PayloadCollectorFactory<E: PayloadExtractor> {
    key: CollectorKey<HashMap<u64, E::Value>>,
    extractor: Arc<E>,
}

impl<E: PayloadExtractor> PayloadCollectorFactory<E> {
    /// Creates a factory with a fresh key.
    pub fn new(extractor: E) -> Self {
        PayloadCollectorFactory {
            key: CollectorKey::new(),
            extractor: Arc::new(extractor),
        }
    }
}

impl<E: PayloadExtractor> CollectorFactory for PayloadCollectorFactory<E> {
    type Collector = PayloadCollector<E>;

    fn key(&self) -> CollectorKey<HashMap<u64, E::Value>> {
        self.key
    }

    fn create(&self, context: &ExecutionContext) -> Result<Self::Collector, SearchError> {
        Ok(PayloadCollector::new(Arc::clone(&self.extractor), context))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn merge_propagates_segment_errors() {
        let factory = PayloadCollectorFactory::new(FnExtractor::new(|doc, _| Ok(u64::from(doc))));
        let collector = PayloadCollector {
            extractor: Arc::clone(&factory.extractor),
            doc_bases: Arc::new(vec![0]),
        };
        let failed = Err(TantivyError::InvalidArgument("decode failed".to_string()));
        let result = collector.merge_fruits(vec![Ok(HashMap::new()), failed]);
        assert!(result.is_err());
    }

    #[test]
    fn merge_combines_disjoint_segments() {
        let factory = PayloadCollectorFactory::new(FnExtractor::new(|doc, _| Ok(u64::from(doc))));
        let collector = PayloadCollector {
            extractor: Arc::clone(&factory.extractor),
            doc_bases: Arc::new(vec![0, 10]),
        };
        let first: HashMap<u64, u64> = [(0, 0), (3, 3)].into_iter().collect();
        let second: HashMap<u64, u64> = [(10, 0), (12, 2)].into_iter().collect();
        let merged = collector.merge_fruits(vec![Ok(first), Ok(second)]).unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.get(&12), Some(&2));
    }

    #[test]
    fn segment_collector_keys_by_global_ordinal() {
        let mut child = PayloadSegmentCollector {
            values: Box::new(FnValues {
                decode: |doc: DocId, _: Option<&TantivyDocument>| Ok(u64::from(doc) * 2),
            }),
            store: None,
            doc_base: 100,
            collected: HashMap::new(),
            error: None,
        };
        child.collect(4, 0.0);
        let fruit = child.harvest().unwrap();
        assert_eq!(fruit.get(&104), Some(&8));
    }

    #[test]
    fn first_error_wins_and_stops_collection() {
        let mut child = PayloadSegmentCollector {
            values: Box::new(FnValues {
                decode: |doc: DocId, _: Option<&TantivyDocument>| {
                    if doc == 1 {
                        Err(TantivyError::InvalidArgument("bad doc".to_string()))
                    } else {
                        Ok(doc)
                    }
                },
            }),
            store: None,
            doc_base: 0,
            collected: HashMap::new(),
            error: None,
        };
        child.collect(0, 0.0);
        child.collect(1, 0.0);
        child.collect(2, 0.0);
        assert!(child.harvest().is_err());
    }
}
