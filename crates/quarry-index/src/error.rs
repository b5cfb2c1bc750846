//! Error types for the quarry-index crate.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors that can occur when working with the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Failed to open or create the index.
    #[error("failed to open index at {path}: {message}")]
    OpenIndex {
        /// Path to the index directory.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to write to the index.
    #[error("failed to write to index: {0}")]
    Write(String),

    /// Failed to commit changes to the index.
    #[error("failed to commit index: {0}")]
    Commit(String),

    /// Invalid configuration, detected before any index mutation.
    #[error("invalid configuration for {context}: {message}")]
    Config {
        /// Where the bad configuration was encountered (index name).
        context: String,
        /// What was wrong with it.
        message: String,
    },

    /// An operation was requested from a component that does not support it.
    #[error("unsupported operation ({operation}): {message}")]
    Unsupported {
        /// Name of the requested operation.
        operation: &'static str,
        /// Why the component cannot perform it.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IndexError {
    /// Creates an `OpenIndex` error from a path and Tantivy error.
    pub(crate) fn open_index(path: PathBuf, source: &tantivy::TantivyError) -> Self {
        Self::OpenIndex {
            path,
            message: source.to_string(),
        }
    }

    /// Creates a `Write` error from a Tantivy error.
    pub(crate) fn write(source: &tantivy::TantivyError) -> Self {
        Self::Write(source.to_string())
    }

    /// Creates a `Commit` error from a Tantivy error.
    pub(crate) fn commit(source: &tantivy::TantivyError) -> Self {
        Self::Commit(source.to_string())
    }

    /// Creates a `Config` error referencing an event context.
    pub fn config(context: &crate::EventContext, message: impl Into<String>) -> Self {
        Self::Config {
            context: context.to_string(),
            message: message.into(),
        }
    }
}
