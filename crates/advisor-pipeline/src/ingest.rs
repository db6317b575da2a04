use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use advisor_core::chunker::Chunker;
use advisor_core::error::Error;
use advisor_core::traits::{ChunkStore, TextExtractor};
use advisor_core::types::{Chunk, ChunkRef, SourceDocument};

/// What happened to one document.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// Chunks newly recorded for the document, in index order.
    Ingested(Vec<Chunk>),
    /// A record for chunk 0 already existed; nothing was read or written.
    Skipped,
    /// `recorded` holds chunks stored before the failure; they still need
    /// indexing even though the document is incomplete.
    Failed { error: Error, recorded: Vec<Chunk> },
}

impl DocumentOutcome {
    fn failed(error: Error) -> Self {
        Self::Failed { error, recorded: Vec::new() }
    }
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub chunks: Vec<Chunk>,
    pub ingested: Vec<String>,
    pub skipped: Vec<String>,
    pub failures: Vec<Error>,
}

/// Extracts, chunks and records source documents.
pub struct DocumentIngestor {
    extractor: Arc<dyn TextExtractor>,
    chunker: Chunker,
    store: Arc<dyn ChunkStore>,
    concurrency: usize,
}

impl DocumentIngestor {
    pub fn new(extractor: Arc<dyn TextExtractor>, chunker: Chunker, store: Arc<dyn ChunkStore>, concurrency: usize) -> Self {
        Self { extractor, chunker, store, concurrency: concurrency.max(1) }
    }

    pub async fn ingest(&self, documents: Vec<SourceDocument>) -> IngestReport {
        self.ingest_observed(documents, &|_: &str, _: &DocumentOutcome| {}).await
    }

    /// Like [`DocumentIngestor::ingest`], calling `observer` as each document
    /// finishes. Documents run concurrently; the report keeps input order.
    pub async fn ingest_observed(
        &self,
        documents: Vec<SourceDocument>,
        observer: &(dyn Fn(&str, &DocumentOutcome) + Sync),
    ) -> IngestReport {
        let outcomes: Vec<(String, DocumentOutcome)> = stream::iter(documents)
            .map(|doc| async move {
                let outcome = self.ingest_one(&doc).await;
                observer(&doc.source_id, &outcome);
                (doc.source_id, outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = IngestReport::default();
        for (source, outcome) in outcomes {
            match outcome {
                DocumentOutcome::Ingested(chunks) => {
                    report.chunks.extend(chunks);
                    report.ingested.push(source);
                }
                DocumentOutcome::Skipped => report.skipped.push(source),
                DocumentOutcome::Failed { error, recorded } => {
                    report.chunks.extend(recorded);
                    report.failures.push(error);
                }
            }
        }
        info!(
            "Ingest: {} new chunks from {} documents, {} skipped, {} failed",
            report.chunks.len(),
            report.ingested.len(),
            report.skipped.len(),
            report.failures.len()
        );
        report
    }

    async fn ingest_one(&self, doc: &SourceDocument) -> DocumentOutcome {
        match self.store.contains(&ChunkRef::new(doc.source_id.clone(), 0)).await {
            Ok(true) => {
                debug!("'{}' already ingested, skipping", doc.source_id);
                return DocumentOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => return DocumentOutcome::failed(Error::Store(format!("{}: {}", doc.source_id, e))),
        }

        let text = match self.extractor.extract(doc) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read {}: {}", doc.source_id, e);
                return DocumentOutcome::failed(Error::Extraction { source_id: doc.source_id.clone(), reason: e.to_string() });
            }
        };

        let mut recorded = Vec::new();
        for (index, piece) in self.chunker.split(&text).into_iter().enumerate() {
            let chunk = Chunk::new(doc.source_id.clone(), index, piece);
            match self.store.insert(&chunk).await {
                Ok(true) => recorded.push(chunk),
                Ok(false) => debug!("{} already recorded", chunk.chunk_ref()),
                Err(e) => {
                    warn!("Stopped recording '{}' at chunk {}: {}", doc.source_id, index, e);
                    let error = Error::Store(format!("{}: {}", chunk.chunk_ref(), e));
                    return DocumentOutcome::Failed { error, recorded };
                }
            }
        }
        DocumentOutcome::Ingested(recorded)
    }
}
