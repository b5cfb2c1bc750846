//! Deadline-aware hit counting.

use tantivy::{
    DocId, Score, SegmentOrdinal, SegmentReader, TERMINATED,
    collector::{Collector, SegmentCollector},
    query::Weight,
};

use super::{CollectorFactory, CollectorKey, ExecutionContext};
use crate::{Deadline, SearchError};

/// Result of a deadline-aware count.
///
/// `truncated` reports whether any segment stopped counting because the
/// deadline expired; when set, `count` is a lower bound on the true total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitCount {
    /// Number of matching documents counted before any truncation.
    pub count: u64,
    /// Whether counting stopped early on at least one segment.
    pub truncated: bool,
}

/// Counts matching documents, giving up once the deadline expires.
///
/// Run standalone, the collector drives the scorer itself and exits the
/// per-segment loop as soon as the deadline passes. Inside a composed run
/// the framework drives document collection, so the collector can only stop
/// incrementing; either way the fruit reports truncation.
pub struct DeadlineCountCollector {
    deadline: Deadline,
}

impl DeadlineCountCollector {
    /// Creates a counter bounded by `deadline`.
    pub fn new(deadline: Deadline) -> Self {
        DeadlineCountCollector { deadline }
    }
}

impl Collector for DeadlineCountCollector {
    type Fruit = HitCount;
    type Child = DeadlineCountSegmentCollector;

    fn for_segment(
        &self,
        _segment_ord: SegmentOrdinal,
        _reader: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        Ok(DeadlineCountSegmentCollector {
            deadline: self.deadline,
            count: 0,
            truncated: false,
        })
    }

    fn requires_scoring(&self) -> bool {
        false
    }

    fn merge_fruits(&self, segment_fruits: Vec<HitCount>) -> tantivy::Result<HitCount> {
        let mut total = HitCount::default();
        for fruit in segment_fruits {
            total.count += fruit.count;
            total.truncated |= fruit.truncated;
        }
        Ok(total)
    }

    // Standalone execution path: drive the scorer directly so an expired
    // deadline breaks out of the loop instead of draining the doc set.
    fn collect_segment(
        &self,
        weight: &dyn Weight,
        segment_ord: SegmentOrdinal,
        reader: &SegmentReader,
    ) -> tantivy::Result<HitCount> {
        let mut child = self.for_segment(segment_ord, reader)?;
        let mut scorer = weight.scorer(reader, 1.0)?;
        let alive = reader.alive_bitset();
        let mut doc = scorer.doc();
        while doc != TERMINATED {
            if alive.is_none_or(|bitset| bitset.is_alive(doc)) {
                child.collect(doc, 0.0);
                if child.truncated {
                    break;
                }
            }
            doc = scorer.advance();
        }
        Ok(child.harvest())
    }
}

/// Per-segment state for [`DeadlineCountCollector`].
pub struct DeadlineCountSegmentCollector {
    deadline: Deadline,
    count: u64,
    truncated: bool,
}

impl SegmentCollector for DeadlineCountSegmentCollector {
    type Fruit = HitCount;

    fn collect(&mut self, _doc: DocId, _score: Score) {
        if self.truncated {
            return;
        }
        if self.deadline.expired() {
            self.truncated = true;
            return;
        }
        self.count += 1;
    }

    fn harvest(self) -> HitCount {
        HitCount {
            count: self.count,
            truncated: self.truncated,
        }
    }
}

/// Factory registering a [`DeadlineCountCollector`] under a stable key.
pub struct CountCollectorFactory {
    key: CollectorKey<HitCount>,
}

impl Default for CountCollectorFactory {
    fn default() -> Self {
        CountCollectorFactory::new()
    }
}

impl CountCollectorFactory {
    /// Creates a factory with a fresh key.
    pub fn new() -> Self {
        CountCollectorFactory {
            key: CollectorKey::new(),
        }
    }
}

impl CollectorFactory for CountCollectorFactory {
    type Collector = DeadlineCountCollector;

    fn key(&self) -> CollectorKey<HitCount> {
        self.key
    }

    fn create(&self, context: &ExecutionContext) -> Result<Self::Collector, SearchError> {
        Ok(DeadlineCountCollector::new(context.deadline()))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[test]
    fn merge_sums_counts_and_ors_truncation() {
        let collector = DeadlineCountCollector::new(Deadline::none());
        let merged = collector
            .merge_fruits(vec![
                HitCount {
                    count: 3,
                    truncated: false,
                },
                HitCount {
                    count: 2,
                    truncated: true,
                },
            ])
            .unwrap();
        assert_eq!(merged.count, 5);
        assert!(merged.truncated);
    }

    #[test]
    fn expired_deadline_stops_counting() {
        let mut child = DeadlineCountSegmentCollector {
            deadline: Deadline::from_timeout(Duration::ZERO),
            count: 0,
            truncated: false,
        };
        child.collect(0, 0.0);
        child.collect(1, 0.0);
        let fruit = child.harvest();
        assert_eq!(fruit.count, 0);
        assert!(fruit.truncated);
    }

    #[test]
    fn unbounded_deadline_counts_everything() {
        let mut child = DeadlineCountSegmentCollector {
            deadline: Deadline::none(),
            count: 0,
            truncated: false,
        };
        for doc in 0..100 {
            child.collect(doc, 0.0);
        }
        let fruit = child.harvest();
        assert_eq!(fruit.count, 100);
        assert!(!fruit.truncated);
    }
}
