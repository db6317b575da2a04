//! advisor-vector
//!
//! LanceDB persistence for chunk records and embeddings.
pub mod schema;
pub mod table;
pub mod chunks;
pub mod vectors;

pub use chunks::LanceChunkStore;
pub use vectors::LanceVectorStore;
