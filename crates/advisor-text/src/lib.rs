//! advisor-text
//!
//! Tantivy-backed lexical channel of the hybrid retriever.
pub mod tantivy_utils;
pub mod index;

pub use index::TantivyLexicalIndex;
