//! Collector framework: typed keys, execution context, and composition.
//!
//! Searches often need several aggregations from a single index pass (a hit
//! count plus decoded payloads, for example). The pieces here let callers
//! describe each aggregation as a [`CollectorFactory`], compose them into one
//! [`ComposedCollectors`] run, and retrieve each result afterwards through a
//! typed [`CollectorKey`] without downcasting by hand.

mod count;
mod payload;

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
    sync::atomic::{AtomicU64, Ordering},
};

use tantivy::{
    DocId, Searcher,
    collector::{Collector, MultiCollector, MultiFruit},
    query::Query,
};

pub use count::{CountCollectorFactory, DeadlineCountCollector, HitCount};
pub use payload::{
    FastStrExtractor, FnExtractor, PayloadCollector, PayloadCollectorFactory, PayloadExtractor,
    PayloadValues,
};

use crate::{Deadline, SearchError};

/// Typed handle identifying one collector's result within a composed run.
///
/// Each key carries the fruit type as a phantom parameter and a process-wide
/// unique id, so retrieving a result through the key both locates it and
/// recovers its concrete type. Keys are cheap to copy; the same key value
/// must be used to register the collector and to take its fruit.
pub struct CollectorKey<T> {
    id: u64,
    _fruit: PhantomData<fn() -> T>,
}

impl<T> CollectorKey<T> {
    /// Creates a fresh key, distinct from every other key in the process.
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        CollectorKey {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            _fruit: PhantomData,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Default for CollectorKey<T> {
    fn default() -> Self {
        CollectorKey::new()
    }
}

// Manual impls: derived Clone/Copy would require T to be Clone/Copy even
// though the key only carries an id.
impl<T> Clone for CollectorKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CollectorKey<T> {}

impl<T> PartialEq for CollectorKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for CollectorKey<T> {}

impl<T> Hash for CollectorKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for CollectorKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CollectorKey").field(&self.id).finish()
    }
}

/// Per-execution state shared by all collectors of one search.
///
/// Built from the live searcher right before collectors are created, so the
/// document bases match the exact segment set the query will run against.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    deadline: Deadline,
    doc_bases: Arc<Vec<u32>>,
}

impl ExecutionContext {
    /// Builds a context for the given searcher snapshot.
    pub fn new(searcher: &Searcher, deadline: Deadline) -> Self {
        let mut doc_bases = Vec::with_capacity(searcher.segment_readers().len());
        let mut base = 0u32;
        for reader in searcher.segment_readers() {
            doc_bases.push(base);
            base += reader.max_doc();
        }
        ExecutionContext {
            deadline,
            doc_bases: Arc::new(doc_bases),
        }
    }

    /// The deadline bounding this execution.
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// First global ordinal of each segment, in segment order.
    pub fn doc_bases(&self) -> Arc<Vec<u32>> {
        Arc::clone(&self.doc_bases)
    }

    /// Index-wide ordinal of a document, stable for this searcher snapshot.
    pub fn global_ordinal(&self, segment_ord: u32, doc: DocId) -> u64 {
        let base = self.doc_bases.get(segment_ord as usize).copied().unwrap_or(0);
        u64::from(base) + u64::from(doc)
    }
}

/// Recipe for building a collector against a concrete execution.
///
/// Factories are reusable across searches; the collector itself is built
/// fresh per execution from the [`ExecutionContext`], which is where
/// deadline and segment geometry come from.
pub trait CollectorFactory {
    /// Collector type this factory builds.
    type Collector: Collector;

    /// Key under which the collector's fruit is stored after the run.
    fn key(&self) -> CollectorKey<<Self::Collector as Collector>::Fruit>;

    /// Builds the collector for one execution.
    fn create(&self, context: &ExecutionContext) -> Result<Self::Collector, SearchError>;
}

type FruitTaker<'a> = Box<dyn FnOnce(&mut MultiFruit) -> Box<dyn Any> + 'a>;

/// Several collectors composed into a single index pass.
pub struct ComposedCollectors<'a> {
    multi: MultiCollector<'a>,
    takers: Vec<(u64, FruitTaker<'a>)>,
}

impl Default for ComposedCollectors<'_> {
    fn default() -> Self {
        ComposedCollectors::new()
    }
}

impl<'a> ComposedCollectors<'a> {
    /// Creates an empty composition.
    pub fn new() -> Self {
        ComposedCollectors {
            multi: MultiCollector::new(),
            takers: Vec::new(),
        }
    }

    /// Builds a collector from the factory and adds it to the composition.
    pub fn add<F>(&mut self, factory: &F, context: &ExecutionContext) -> Result<(), SearchError>
    where
        F: CollectorFactory,
        F::Collector: 'a,
        <F::Collector as Collector>::Fruit: 'static,
    {
        let collector = factory.create(context)?;
        let handle = self.multi.add_collector(collector);
        let id = factory.key().id();
        self.takers.push((
            id,
            Box::new(move |fruits| Box::new(handle.extract(fruits))),
        ));
        Ok(())
    }

    /// Runs the composed collectors over the query and gathers all fruits.
    pub fn search(
        self,
        searcher: &Searcher,
        query: &dyn Query,
    ) -> Result<CollectedFruits, SearchError> {
        let mut multi_fruit = searcher
            .search(query, &self.multi)
            .map_err(|e| SearchError::execute(&e))?;
        let mut fruits = HashMap::with_capacity(self.takers.len());
        for (id, take) in self.takers {
            fruits.insert(id, take(&mut multi_fruit));
        }
        Ok(CollectedFruits { fruits })
    }
}

/// Results of a composed run, retrievable once per key.
pub struct CollectedFruits {
    fruits: HashMap<u64, Box<dyn Any>>,
}

impl CollectedFruits {
    /// Removes and returns the fruit registered under `key`.
    pub fn take<T: 'static>(&mut self, key: CollectorKey<T>) -> Result<T, SearchError> {
        self.fruits
            .remove(&key.id())
            .and_then(|fruit| fruit.downcast::<T>().ok())
            .map(|fruit| *fruit)
            .ok_or(SearchError::MissingFruit(key.id()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keys_are_unique_and_copyable() {
        let a: CollectorKey<u64> = CollectorKey::new();
        let b: CollectorKey<u64> = CollectorKey::new();
        let a2 = a;
        assert_eq!(a, a2);
        assert_ne!(a, b);
    }

    #[test]
    fn taking_an_unregistered_key_fails() {
        let mut fruits = CollectedFruits {
            fruits: HashMap::new(),
        };
        let key: CollectorKey<u64> = CollectorKey::new();
        assert!(matches!(
            fruits.take(key),
            Err(SearchError::MissingFruit(_))
        ));
    }
}
