//! Seams to the external collaborators of the pipeline.
//!
//! Model inference, storage and search backends sit behind these traits so
//! the pipeline can be assembled from production backends or in-memory ones.

use async_trait::async_trait;

use crate::types::{Chunk, ChunkRef, SearchHit, SourceDocument};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Scores a `(query, passage)` pair jointly. Higher is more relevant.
pub trait CrossEncoder: Send + Sync {
    fn score(&self, query: &str, passage: &str) -> anyhow::Result<f32>;

    fn score_batch(&self, query: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>> {
        passages.iter().map(|p| self.score(query, p)).collect()
    }
}

/// Turns raw document bytes into plain text for the declared format.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, document: &SourceDocument) -> anyhow::Result<String>;
}

/// Durable chunk records, unique by `(source, index)`.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn contains(&self, chunk_ref: &ChunkRef) -> anyhow::Result<bool>;
    /// Records a chunk. Returns `false` without modifying anything when a
    /// record with the same `(source, index)` already exists.
    async fn insert(&self, chunk: &Chunk) -> anyhow::Result<bool>;
    /// Fetches chunks by reference; missing refs are left out of the result.
    async fn get_many(&self, refs: &[ChunkRef]) -> anyhow::Result<Vec<Chunk>>;
    /// Every stored record, ordered by `(source, index)`.
    async fn scan(&self) -> anyhow::Result<Vec<Chunk>>;
    async fn count(&self) -> anyhow::Result<usize>;
}

/// Metadata stored alongside a vector.
#[derive(Debug, Clone)]
pub struct VectorMetadata {
    pub source: String,
    pub chunk_index: usize,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Writes a vector under `(namespace, key)`. Returns `false` and leaves
    /// the existing vector untouched when the key is already present.
    async fn upsert(&self, namespace: &str, key: &ChunkRef, vector: &[f32], metadata: &VectorMetadata) -> anyhow::Result<bool>;
    /// Nearest neighbours by cosine similarity, best first.
    async fn search(&self, namespace: &str, query_vector: &[f32], k: usize) -> anyhow::Result<Vec<SearchHit>>;
    async fn contains(&self, namespace: &str, key: &ChunkRef) -> anyhow::Result<bool>;
    async fn count(&self, namespace: &str) -> anyhow::Result<usize>;
}

#[async_trait]
pub trait LexicalIndex: Send + Sync {
    /// Adds chunks to the index, skipping `(source, index)` pairs already present.
    /// Returns the number of chunks added.
    async fn index(&self, chunks: &[Chunk]) -> anyhow::Result<usize>;
    /// Keyword search over raw chunk text, best first.
    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchHit>>;
}

/// A rendered prompt: fixed instructions plus the per-request user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> anyhow::Result<String>;
}
