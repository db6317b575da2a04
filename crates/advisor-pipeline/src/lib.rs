//! advisor-pipeline
//!
//! Ingestion (extract, chunk, record, embed) and the query chain
//! (hybrid retrieval, reranking, answer synthesis).
pub mod ingest;
pub mod indexer;
pub mod fusion;
pub mod retriever;
pub mod rerank;
pub mod synth;
pub mod context;
pub mod advisor;

pub use advisor::{Advisor, BackfillSummary, IngestSummary, Status};
pub use context::AdvisorContext;
pub use fusion::{fuse, Penalties};
pub use indexer::{IndexReport, VectorIndexer};
pub use ingest::{DocumentIngestor, DocumentOutcome, IngestReport};
pub use rerank::Reranker;
pub use retriever::{HybridRetriever, VectorChannel};
pub use synth::{build_prompt, AnswerSynthesizer, QueryIntent, ABSENCE_STATEMENT};
