//! # Rankflow
//!
//! The per-query ranked retrieval core of a search backend.
//!
//! ## Features
//!
//! - Candidate retrieval with sub-token fallback
//! - Configurable fusion of relevance and categorical scores
//! - Liveness, bitmap and facet-group filtering under one document-store read guard
//! - Bounded top-K selection with offset pagination and multi-key sorting
//! - Hierarchical facet counts and attribute facets over the ranked prefix
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use rankflow::prelude::*;
//!
//! let index = MemoryInvertedIndex::new();
//! let store = MemoryDocumentStore::new();
//! for text in ["red running shoes", "blue hat", "red hat"] {
//!     let doc_id = store.add_document();
//!     index.add_document(doc_id, &UnicodeWordTokenizer::new().tokenize(text));
//! }
//!
//! let engine = RankingEngine::builder()
//!     .index(Arc::new(index))
//!     .store(Arc::new(store))
//!     .build()
//!     .unwrap();
//!
//! let response = engine.search(&Query::new("red hat").with_limit(2));
//! assert!(response.is_matched());
//! assert_eq!(response.result.doc_ids[0], 2);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod facet;
pub mod filter;
pub mod property;
pub mod query;
pub mod result;
pub mod scoring;
pub mod source;
pub mod store;

pub mod prelude {
    pub use crate::config::{AttributeFacetScope, FusionPolicy, RetrievalConfig};
    pub use crate::engine::{RankingEngine, RankingEngineBuilder};
    pub use crate::error::{RankflowError, Result};
    pub use crate::facet::{FacetGroupFilterBuilder, FacetPath, FacetTable, GroupParam};
    pub use crate::filter::{FilterCondition, FilterOperation, PropertyFilterCompiler};
    pub use crate::property::{PropertyTable, PropertyValue};
    pub use crate::query::{Query, SortField, SortOrder, TableSorterFactory};
    pub use crate::result::{ResultSet, SearchResponse, SearchStatus};
    pub use crate::scoring::{CategoryBoostScorer, PropertyRanker};
    pub use crate::source::{MemoryInvertedIndex, Tokenizer, UnicodeWordTokenizer};
    pub use crate::store::{DocId, MemoryDocumentStore};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
