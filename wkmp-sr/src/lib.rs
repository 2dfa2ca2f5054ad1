//! wkmp-sr: streaming search-result ranking and filtering
//!
//! Ingests candidate files from a search network, scores them against a
//! mutable weight model and keeps a filtered, rank-sorted view current while
//! results keep arriving.

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod models;
pub mod query_tokens;
pub mod scoring;
pub mod services;
pub mod view;

pub use crate::config::SearchConfig;
pub use crate::engine::SearchEngine;
pub use crate::error::{SearchError, SearchResult};
