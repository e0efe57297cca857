//! Error types for authlink.
//!
//! Expected resolution results (`NotFound`, `Ambiguous`, `Error`) are data,
//! carried by [`crate::Outcome`]. The types here cover genuine failures:
//! the cache cannot be opened or written, the document cannot be loaded or
//! saved, or the configuration is unusable. Only these abort a run.

use thiserror::Error;

use crate::cache::CacheError;

/// Errors raised while loading, querying, or serializing a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {message}")]
    /// The document file could not be read or written.
    Io {
        /// Path of the file involved.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },

    #[error("XML parse error: {0}")]
    /// The document is not well-formed XML.
    Parse(String),
}

impl DocumentError {
    /// Creates an `Io` document error.
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Top-level error type for authlink.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Cache error: {0}")]
    /// The cache store failed.
    Cache(#[from] CacheError),

    #[error("Document error: {0}")]
    /// The document layer failed.
    Document(#[from] DocumentError),

    #[error("Configuration error: {message}")]
    /// A configuration value is unusable.
    Config {
        /// What is wrong with the configuration.
        message: String,
    },
}

impl LinkError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this is a cache error.
    #[must_use]
    pub const fn is_cache(&self) -> bool {
        matches!(self, Self::Cache(_))
    }

    /// Returns true if this is a document error.
    #[must_use]
    pub const fn is_document(&self) -> bool {
        matches!(self, Self::Document(_))
    }
}

/// Result type alias for authlink operations.
pub type LinkResult<T> = Result<T, LinkError>;
