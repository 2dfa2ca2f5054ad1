//! # WKMP Common Library
//!
//! Shared code for all WKMP microservices including:
//! - Event types (WkmpEvent enum) and the EventBus
//! - Configuration file discovery and loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
