//! Error types for search execution.

use thiserror::Error;

/// Errors that can occur while executing a search.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Failed to open the index for searching.
    #[error("failed to open index for searching: {message}")]
    OpenIndex {
        /// Underlying error message.
        message: String,
    },

    /// Query execution failed inside the search engine.
    #[error("failed to execute search: {0}")]
    Execute(String),

    /// A requested collector result was missing or had the wrong type.
    #[error("no collected result for key {0}")]
    MissingFruit(u64),

    /// Error bubbled up from the indexing layer (tenancy checks, configuration).
    #[error(transparent)]
    Index(#[from] quarry_index::IndexError),
}

impl SearchError {
    pub(crate) fn open_index(e: &tantivy::TantivyError) -> Self {
        SearchError::OpenIndex {
            message: e.to_string(),
        }
    }

    pub(crate) fn execute(e: &tantivy::TantivyError) -> Self {
        SearchError::Execute(e.to_string())
    }
}
