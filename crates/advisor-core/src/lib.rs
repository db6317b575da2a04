//! advisor-core
//!
//! Domain types, collaborator traits, error taxonomy, configuration and the
//! pure building blocks (chunking, query input, task graph) shared by the
//! ingestion and query pipelines.

pub mod chunker;
pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod query;
pub mod task_graph;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
