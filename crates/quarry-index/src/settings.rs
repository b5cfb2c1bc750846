//! Writer configuration source.
//!
//! Writer tunables are parsed once from a flat property source at backend
//! startup and frozen into an immutable [`WriterConfigSource`]. Every writer
//! (re)creation stamps out a brand-new writer and a freshly constructed
//! merge policy from that source, so a writer replacing a failed one always
//! gets exactly the same effective configuration and no mutable state leaks
//! between writer instances.

use std::{collections::BTreeMap, fmt, str::FromStr};

use tantivy::{Index, IndexWriter, merge_policy::LogMergePolicy, tokenizer::TextAnalyzer};

use crate::{EventContext, IndexError, analyzer::default_analyzer};

/// Default overall writer heap size (50 MB).
const DEFAULT_HEAP_SIZE: usize = 50_000_000;

/// Smallest accepted heap size; below this the engine cannot allocate its
/// per-thread arenas.
const MIN_HEAP_SIZE: usize = 15_000_000;

/// Property key for the overall writer heap size in bytes.
pub const KEY_HEAP_BYTES: &str = "writer.heap_bytes";
/// Property key for the number of indexing threads.
pub const KEY_NUM_THREADS: &str = "writer.num_threads";
/// Property key for the minimum number of segments considered for a merge.
pub const KEY_MIN_NUM_SEGMENTS: &str = "merge.min_num_segments";
/// Property key for the segment size above which merging stops.
pub const KEY_MAX_DOCS_BEFORE_MERGE: &str = "merge.max_docs_before_merge";
/// Property key for the smallest segment layer size.
pub const KEY_MIN_LAYER_SIZE: &str = "merge.min_layer_size";
/// Property key for the logarithmic layer spacing.
pub const KEY_LEVEL_LOG_SIZE: &str = "merge.level_log_size";
/// Property key for the deleted-docs ratio that forces a merge.
pub const KEY_DELETES_RATIO: &str = "merge.deletes_ratio_before_merge";

/// One typed writer setting.
///
/// Each value knows whether it applies to writer construction or to the
/// merge policy object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriterSetting {
    /// Overall indexing heap in bytes, shared across writer threads.
    HeapBytes(usize),
    /// Number of indexing threads.
    NumThreads(usize),
    /// Minimum number of segments in a merge candidate.
    MinNumSegments(usize),
    /// Segments with more docs than this are never merge candidates.
    MaxDocsBeforeMerge(usize),
    /// Segments smaller than this share the lowest layer.
    MinLayerSize(u32),
    /// Logarithmic spacing between merge layers.
    LevelLogSize(f64),
    /// Fraction of deleted documents that forces a segment into a merge.
    DeletesRatioBeforeMerge(f32),
}

impl WriterSetting {
    /// Applies this setting to a merge policy under construction.
    ///
    /// Writer-level settings (heap, threads) are applied at writer
    /// construction instead and leave the policy untouched.
    fn apply_to_merge_policy(&self, policy: &mut LogMergePolicy) {
        match *self {
            Self::MinNumSegments(value) => policy.set_min_num_segments(value),
            Self::MaxDocsBeforeMerge(value) => policy.set_max_docs_before_merge(value),
            Self::MinLayerSize(value) => policy.set_min_layer_size(value),
            Self::LevelLogSize(value) => policy.set_level_log_size(value),
            Self::DeletesRatioBeforeMerge(value) => policy.set_del_docs_ratio_before_merge(value),
            Self::HeapBytes(_) | Self::NumThreads(_) => {}
        }
    }
}

/// Immutable bundle of writer configuration, built once at startup.
#[derive(Clone)]
pub struct WriterConfigSource {
    /// Analyzer registered for user text fields on every index open.
    analyzer: TextAnalyzer,
    /// Typed settings parsed from the property source.
    settings: Vec<WriterSetting>,
    /// Context for configuration errors raised later (writer creation).
    context: EventContext,
}

impl WriterConfigSource {
    /// Parses writer settings from a flat property source.
    ///
    /// All recognised keys are parsed in one pass; every malformed value and
    /// every unknown `writer.`/`merge.` key is collected and reported in a
    /// single configuration error carrying the event context. Keys outside
    /// those prefixes belong to other components and are ignored.
    pub fn from_properties(
        analyzer: TextAnalyzer,
        properties: &BTreeMap<String, String>,
        context: EventContext,
    ) -> Result<Self, IndexError> {
        let mut settings = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for (key, value) in properties {
            let parsed = match key.as_str() {
                KEY_HEAP_BYTES => parse(key, value, &mut errors).map(WriterSetting::HeapBytes),
                KEY_NUM_THREADS => parse(key, value, &mut errors).map(WriterSetting::NumThreads),
                KEY_MIN_NUM_SEGMENTS => {
                    parse(key, value, &mut errors).map(WriterSetting::MinNumSegments)
                }
                KEY_MAX_DOCS_BEFORE_MERGE => {
                    parse(key, value, &mut errors).map(WriterSetting::MaxDocsBeforeMerge)
                }
                KEY_MIN_LAYER_SIZE => {
                    parse(key, value, &mut errors).map(WriterSetting::MinLayerSize)
                }
                KEY_LEVEL_LOG_SIZE => {
                    parse(key, value, &mut errors).map(WriterSetting::LevelLogSize)
                }
                KEY_DELETES_RATIO => {
                    parse(key, value, &mut errors).map(WriterSetting::DeletesRatioBeforeMerge)
                }
                other if other.starts_with("writer.") || other.starts_with("merge.") => {
                    errors.push(format!("unknown setting '{other}'"));
                    None
                }
                _ => None,
            };

            if let Some(setting) = parsed {
                validate(setting, &mut errors);
                settings.push(setting);
            }
        }

        if errors.is_empty() {
            Ok(Self {
                analyzer,
                settings,
                context,
            })
        } else {
            Err(IndexError::config(&context, errors.join("; ")))
        }
    }

    /// Builds a source with default settings and the default analyzer.
    pub fn defaults(context: EventContext) -> Self {
        Self {
            analyzer: default_analyzer(),
            settings: Vec::new(),
            context,
        }
    }

    /// Returns the parsed settings.
    pub fn settings(&self) -> &[WriterSetting] {
        &self.settings
    }

    /// Returns the context this source reports errors against.
    pub fn context(&self) -> &EventContext {
        &self.context
    }

    /// Returns a clone of the analyzer for registration on an index.
    pub fn analyzer(&self) -> TextAnalyzer {
        self.analyzer.clone()
    }

    /// Constructs a fresh merge policy from the stored settings.
    ///
    /// Each call yields an independent object; mutating one result never
    /// affects another or the source itself.
    pub fn merge_policy(&self) -> LogMergePolicy {
        let mut policy = LogMergePolicy::default();
        for setting in &self.settings {
            setting.apply_to_merge_policy(&mut policy);
        }
        policy
    }

    /// Overall writer heap in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.settings
            .iter()
            .find_map(|setting| match setting {
                WriterSetting::HeapBytes(value) => Some(*value),
                _ => None,
            })
            .unwrap_or(DEFAULT_HEAP_SIZE)
    }

    /// Explicitly configured indexing thread count, if any.
    pub fn num_threads(&self) -> Option<usize> {
        self.settings.iter().find_map(|setting| match setting {
            WriterSetting::NumThreads(value) => Some(*value),
            _ => None,
        })
    }

    /// Stamps out a brand-new writer on the given index.
    ///
    /// Safe to call repeatedly: every writer gets a freshly constructed
    /// merge policy and identical effective settings.
    pub fn open_writer(&self, index: &Index) -> Result<IndexWriter, IndexError> {
        let writer = match self.num_threads() {
            Some(threads) => index.writer_with_num_threads(threads, self.heap_bytes()),
            None => index.writer(self.heap_bytes()),
        }
        .map_err(|e| IndexError::write(&e))?;

        writer.set_merge_policy(Box::new(self.merge_policy()));
        Ok(writer)
    }
}

impl fmt::Debug for WriterConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterConfigSource")
            .field("settings", &self.settings)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Parses one property value, recording a description of the failure.
fn parse<T: FromStr>(key: &str, value: &str, errors: &mut Vec<String>) -> Option<T> {
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(format!("setting '{key}' has malformed value '{value}'"));
            None
        }
    }
}

/// Range checks on parsed settings.
fn validate(setting: WriterSetting, errors: &mut Vec<String>) {
    match setting {
        WriterSetting::HeapBytes(value) if value < MIN_HEAP_SIZE => {
            errors.push(format!(
                "setting '{KEY_HEAP_BYTES}' must be at least {MIN_HEAP_SIZE} bytes, got {value}"
            ));
        }
        WriterSetting::NumThreads(0) => {
            errors.push(format!("setting '{KEY_NUM_THREADS}' must be at least 1"));
        }
        WriterSetting::LevelLogSize(value) if !value.is_finite() => {
            errors.push(format!("setting '{KEY_LEVEL_LOG_SIZE}' must be finite"));
        }
        WriterSetting::DeletesRatioBeforeMerge(value) if !(value > 0.0 && value <= 1.0) => {
            errors.push(format!(
                "setting '{KEY_DELETES_RATIO}' must be in (0.0, 1.0], got {value}"
            ));
        }
        _ => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn context() -> EventContext {
        EventContext::index("test")
    }

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_recognised_settings() {
        let source = WriterConfigSource::from_properties(
            default_analyzer(),
            &props(&[
                (KEY_HEAP_BYTES, "20000000"),
                (KEY_NUM_THREADS, "2"),
                (KEY_MIN_NUM_SEGMENTS, "4"),
                (KEY_LEVEL_LOG_SIZE, "0.75"),
            ]),
            context(),
        )
        .unwrap();

        assert_eq!(source.heap_bytes(), 20_000_000);
        assert_eq!(source.num_threads(), Some(2));
        assert_eq!(source.settings().len(), 4);
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let source = WriterConfigSource::from_properties(
            default_analyzer(),
            &props(&[("backend.hosts", "localhost"), (KEY_NUM_THREADS, "1")]),
            context(),
        )
        .unwrap();

        assert_eq!(source.settings().len(), 1);
    }

    #[test]
    fn collects_every_error_in_one_report() {
        let err = WriterConfigSource::from_properties(
            default_analyzer(),
            &props(&[
                (KEY_HEAP_BYTES, "lots"),
                ("merge.bogus", "1"),
                (KEY_DELETES_RATIO, "1.5"),
            ]),
            context(),
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("index 'test'"), "{message}");
        assert!(message.contains(KEY_HEAP_BYTES), "{message}");
        assert!(message.contains("merge.bogus"), "{message}");
        assert!(message.contains(KEY_DELETES_RATIO), "{message}");
    }

    #[test]
    fn rejects_out_of_range_values() {
        for (key, value) in [
            (KEY_HEAP_BYTES, "1024"),
            (KEY_NUM_THREADS, "0"),
            (KEY_DELETES_RATIO, "0.0"),
        ] {
            let result = WriterConfigSource::from_properties(
                default_analyzer(),
                &props(&[(key, value)]),
                context(),
            );
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn merge_policies_are_independent_but_identical() {
        let source = WriterConfigSource::from_properties(
            default_analyzer(),
            &props(&[
                (KEY_MIN_NUM_SEGMENTS, "5"),
                (KEY_MAX_DOCS_BEFORE_MERGE, "100000"),
                (KEY_MIN_LAYER_SIZE, "500"),
            ]),
            context(),
        )
        .unwrap();

        let first = source.merge_policy();
        let mut second = source.merge_policy();
        assert_eq!(format!("{first:?}"), format!("{second:?}"));

        // Mutating one stamped policy must not leak into the next.
        second.set_min_num_segments(99);
        let third = source.merge_policy();
        assert_eq!(format!("{first:?}"), format!("{third:?}"));
        assert_ne!(format!("{second:?}"), format!("{third:?}"));
    }
}
