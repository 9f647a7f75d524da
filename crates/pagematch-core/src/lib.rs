//! # pagematch-core
//!
//! Core types, traits, and abstractions for the pagematch document
//! similarity pipeline.
//!
//! This crate provides the data model, the error taxonomy and the
//! [`EmbeddingStore`] trait that the other pagematch crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod search;
pub mod traits;
pub mod vector;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use search::{ScoreBasis, SearchOptions};
pub use traits::*;
pub use vector::cosine_similarity;

pub use pgvector::Vector;
