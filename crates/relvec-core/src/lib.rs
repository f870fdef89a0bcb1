//! # `relvec` Core
//!
//! Vector similarity search over a relational table with native vector and
//! full-text support.
//!
//! Documents live in one table: a text column, a JSON metadata column, a
//! vector column and optionally some metadata fields promoted to their own
//! columns. `relvec` builds and runs the statements for that table.
//!
//! ## Features
//!
//! - **Metadata filters**: JSON filter expressions compiled into bound SQL predicates
//! - **Two distances**: `COSINE_SIMILARITY` (descending) and `L2DISTANCE` (ascending)
//! - **Keyword search**: `contains` on content, promoted or projected metadata fields
//! - **Embeddings**: client-side model or the database's `VECTOR_EMBEDDING`
//! - **MMR**: diversity-aware reranking of a candidate pool
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relvec_core::{EmbeddingStrategy, Filter, StoreConfig, VectorStore};
//! use serde_json::json;
//!
//! let config = StoreConfig::load()?;
//! let store = VectorStore::open(connection, &config, EmbeddingStrategy::internal("SAP_NEB.20240715")?).await?;
//!
//! store.add_texts(&["Rust is fast".to_string()], None, None).await?;
//!
//! let filter = Filter::parse(&json!({"lang": {"in": ["en", "de"]}}))?;
//! let docs = store.similarity_search("systems languages", 4, &filter).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::derive_partial_eq_without_eq)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::use_self)]

pub mod config;
pub mod connection;
pub mod distance;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod fragment;
pub mod mmr;
pub mod query;
#[cfg(test)]
mod query_tests;
pub mod result;
pub mod sanitize;
pub mod store;

pub use config::{ConfigError, StoreConfig, VectorType};
pub use connection::{Connection, Row, SqlValue};
pub use distance::DistanceStrategy;
pub use embedding::{EmbeddingExpr, EmbeddingPurpose, EmbeddingStrategy, Embeddings};
pub use error::{Error, Result};
pub use filter::{Filter, FilterCompiler};
pub use fragment::SqlFragment;
pub use mmr::{maximal_marginal_relevance, MmrOptions};
pub use query::{BatchStatement, InsertVectors, QueryBuilder, Statement};
pub use result::{Document, SearchHit};
pub use store::VectorStore;

/// Compiles a JSON filter into a predicate over the default metadata column.
///
/// Shorthand for [`FilterCompiler::compile_json`] without promoted columns.
///
/// # Errors
///
/// Returns the parse errors of [`Filter::parse`].
pub fn compile_filter(filter: &serde_json::Value) -> Result<SqlFragment> {
    let defaults = StoreConfig::default();
    FilterCompiler::new(defaults.table.metadata_column, std::iter::empty::<String>())
        .compile_json(filter)
}
