use std::sync::Arc;
use tracing::{info, warn};

use advisor_core::error::Error;
use advisor_core::traits::{Embedder, VectorMetadata, VectorStore};
use advisor_core::types::{Chunk, IndexedVector};

#[derive(Debug, Default)]
pub struct IndexReport {
    pub indexed: usize,
    pub duplicates: usize,
    pub failures: Vec<Error>,
}

/// Embeds chunks and writes them to the vector store under one namespace.
pub struct VectorIndexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    namespace: String,
    batch_size: usize,
}

impl VectorIndexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, namespace: impl Into<String>, batch_size: usize) -> Self {
        Self { embedder, store, namespace: namespace.into(), batch_size: batch_size.max(1) }
    }

    /// Embeds a batch in one call; if that fails, falls back to one call per
    /// chunk so a single bad chunk only fails itself.
    fn embed(&self, batch: &[Chunk]) -> Vec<Result<IndexedVector, Error>> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = match self.embedder.embed_batch(&texts) {
            Ok(vectors) if vectors.len() == batch.len() => vectors.into_iter().map(Ok).collect(),
            Ok(vectors) => {
                warn!("embedder returned {} vectors for {} chunks, retrying per chunk", vectors.len(), batch.len());
                self.embed_each(batch)
            }
            Err(e) => {
                warn!("batch embedding failed ({}), retrying per chunk", e);
                self.embed_each(batch)
            }
        };
        let dim = self.embedder.dim();
        vectors
            .into_iter()
            .zip(batch)
            .map(|(v, c)| match v {
                Ok(v) if v.len() != dim => Err(Error::Embedding { chunk: c.chunk_ref(), reason: format!("expected dimension {}, got {}", dim, v.len()) }),
                Ok(embedding) => Ok(IndexedVector { chunk_ref: c.chunk_ref(), embedding, namespace: self.namespace.clone() }),
                Err(e) => Err(e),
            })
            .collect()
    }

    fn embed_each(&self, batch: &[Chunk]) -> Vec<Result<Vec<f32>, Error>> {
        batch
            .iter()
            .map(|c| self.embedder.embed(&c.text).map_err(|e| Error::Embedding { chunk: c.chunk_ref(), reason: e.to_string() }))
            .collect()
    }

    async fn write(&self, record: &IndexedVector, report: &mut IndexReport) {
        let metadata = VectorMetadata { source: record.chunk_ref.source.clone(), chunk_index: record.chunk_ref.index };
        match self.store.upsert(&record.namespace, &record.chunk_ref, &record.embedding, &metadata).await {
            Ok(true) => report.indexed += 1,
            Ok(false) => report.duplicates += 1,
            Err(e) => {
                warn!("vector write failed for {}: {}", record.chunk_ref, e);
                report.failures.push(Error::Store(format!("{}: {}", record.chunk_ref, e)));
            }
        }
    }

    pub async fn index(&self, chunks: &[Chunk]) -> IndexReport {
        let mut report = IndexReport::default();
        for batch in chunks.chunks(self.batch_size) {
            for record in self.embed(batch) {
                match record {
                    Ok(record) => self.write(&record, &mut report).await,
                    Err(e) => {
                        warn!("{}", e);
                        report.failures.push(e);
                    }
                }
            }
        }
        info!("Index '{}': {} indexed, {} duplicates, {} failed", self.namespace, report.indexed, report.duplicates, report.failures.len());
        report
    }

    /// Indexes only the chunks with no vector in this namespace yet. Chunks
    /// that already have one are counted as duplicates without embedding them.
    pub async fn index_missing(&self, chunks: &[Chunk]) -> IndexReport {
        let mut missing = Vec::new();
        let mut present = 0;
        let mut lookup_failures = Vec::new();
        for chunk in chunks {
            match self.store.contains(&self.namespace, &chunk.chunk_ref()).await {
                Ok(true) => present += 1,
                Ok(false) => missing.push(chunk.clone()),
                Err(e) => lookup_failures.push(Error::Store(format!("{}: {}", chunk.chunk_ref(), e))),
            }
        }
        info!("Backfill '{}': {} of {} chunks lack a vector", self.namespace, missing.len(), chunks.len());
        let mut report = self.index(&missing).await;
        report.duplicates += present;
        report.failures.extend(lookup_failures);
        report
    }
}
