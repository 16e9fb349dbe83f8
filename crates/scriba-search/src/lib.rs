//! Scriba Search Library
//!
//! Search documents for the command palette and a small in-memory index.
//!
//! The documents file is a JSON array of post listings, the format the kbar
//! search provider loads from `searchDocumentsPath`.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use scriba_search::SearchIndex;
//!
//! // let index = SearchIndex::from_posts(&posts);
//! // index.write_to_file(Path::new("out/search.json"))?;
//! let index = SearchIndex::new();
//! assert!(index.search("rust").is_empty());
//! ```

pub mod index;

pub use index::{SearchDocument, SearchIndex};
use thiserror::Error;

/// Search-related errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
