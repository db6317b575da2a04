use serde::Serialize;
use tracing::{info, warn};

use advisor_core::chunker::Chunker;
use advisor_core::error::{Error, Result};
use advisor_core::query::QueryInput;
use advisor_core::types::{Answer, Chunk, RankedContext, SourceDocument};

use crate::context::AdvisorContext;
use crate::fusion::Penalties;
use crate::indexer::{IndexReport, VectorIndexer};
use crate::ingest::{DocumentIngestor, DocumentOutcome, IngestReport};
use crate::rerank::Reranker;
use crate::retriever::{HybridRetriever, VectorChannel};
use crate::synth::AnswerSynthesizer;

#[derive(Debug)]
pub struct IngestSummary {
    pub ingest: IngestReport,
    pub index: IndexReport,
    /// Chunks added to the lexical index; `None` if it was unavailable or failed.
    pub lexical_indexed: Option<usize>,
}

/// Result of re-indexing the chunks already in the chunk store.
#[derive(Debug)]
pub struct BackfillSummary {
    pub scanned: usize,
    pub index: IndexReport,
    pub lexical_indexed: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub namespace: String,
    pub chunks: usize,
    pub vectors: usize,
    pub lexical_available: bool,
}

/// Ingestion and question answering over one [`AdvisorContext`].
pub struct Advisor {
    ctx: AdvisorContext,
    ingestor: DocumentIngestor,
    indexer: VectorIndexer,
    retriever: HybridRetriever,
    reranker: Reranker,
    synthesizer: AnswerSynthesizer,
}

impl Advisor {
    pub fn new(ctx: AdvisorContext) -> Result<Self> {
        ctx.settings.validate()?;
        let s = &ctx.settings;
        let chunker = Chunker::new(&s.chunking)?;
        let ingestor = DocumentIngestor::new(ctx.extractor.clone(), chunker, ctx.chunk_store.clone(), s.ingest.concurrency);
        let indexer = VectorIndexer::new(ctx.embedder.clone(), ctx.vector_store.clone(), s.retrieval.namespace.clone(), s.embedding.batch_size);
        let vector = VectorChannel { embedder: ctx.embedder.clone(), store: ctx.vector_store.clone(), namespace: s.retrieval.namespace.clone() };
        let retriever = HybridRetriever::new(Some(vector), ctx.lexical_index.clone(), ctx.chunk_store.clone(), Penalties::from(&s.retrieval));
        let reranker = Reranker::new(ctx.cross_encoder.clone());
        let synthesizer = AnswerSynthesizer::new(ctx.generator.clone());
        Ok(Self { ctx, ingestor, indexer, retriever, reranker, synthesizer })
    }

    pub fn context(&self) -> &AdvisorContext { &self.ctx }

    pub async fn ingest(&self, documents: Vec<SourceDocument>) -> IngestSummary {
        self.ingest_observed(documents, &|_: &str, _: &DocumentOutcome| {}).await
    }

    /// Records new chunks, then writes them to the vector store and the
    /// lexical index. Per-document and per-chunk failures are collected in
    /// the summary; nothing here aborts the batch.
    pub async fn ingest_observed(&self, documents: Vec<SourceDocument>, observer: &(dyn Fn(&str, &DocumentOutcome) + Sync)) -> IngestSummary {
        let ingest = self.ingestor.ingest_observed(documents, observer).await;
        let index = self.indexer.index(&ingest.chunks).await;
        let lexical_indexed = self.index_lexical(&ingest.chunks).await;
        IngestSummary { ingest, index, lexical_indexed }
    }

    /// Embeds every recorded chunk that has no vector yet and offers all of
    /// them to the lexical index. Recovers chunks whose indexing failed in
    /// an earlier ingest, since re-ingesting skips their documents.
    pub async fn backfill(&self) -> Result<BackfillSummary> {
        let chunks = self.ctx.chunk_store.scan().await.map_err(|e| Error::Store(format!("chunk scan failed: {}", e)))?;
        let index = self.indexer.index_missing(&chunks).await;
        let lexical_indexed = self.index_lexical(&chunks).await;
        info!("Backfill: scanned {} chunks, {} vectors written", chunks.len(), index.indexed);
        Ok(BackfillSummary { scanned: chunks.len(), index, lexical_indexed })
    }

    async fn index_lexical(&self, chunks: &[Chunk]) -> Option<usize> {
        match &self.ctx.lexical_index {
            Some(lexical) if !chunks.is_empty() => match lexical.index(chunks).await {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!("Lexical indexing failed; keyword search will miss these chunks: {}", e);
                    None
                }
            },
            Some(_) => Some(0),
            None => None,
        }
    }

    async fn retrieve_and_rerank(&self, query: &str) -> Result<RankedContext> {
        let s = &self.ctx.settings;
        let candidates = self.retriever.retrieve(query, s.retrieval.top_k).await?;
        if candidates.is_empty() { return Err(Error::NoMatchingContent(query.to_string())); }
        self.reranker.rerank(query, candidates, s.rerank.top_n).await
    }

    /// Retrieval and reranking only; the language model is not called.
    pub async fn search(&self, query: &str) -> Result<RankedContext> {
        let query = non_blank(query)?;
        self.retrieve_and_rerank(query).await
    }

    /// Retrieve, rerank and synthesize. Distinguishes an empty result
    /// ([`Error::NoMatchingContent`]) from unreachable backends.
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        let query = non_blank(query)?;
        let context = self.retrieve_and_rerank(query).await?;
        info!("'{}': answering from {} chunks", query, context.len());
        self.synthesizer.answer(query, context).await
    }

    /// Answers each query in order; one failing query does not stop the rest.
    pub async fn ask_all(&self, input: QueryInput) -> Result<Vec<(String, Result<Answer>)>> {
        let mut out = Vec::new();
        for query in input.into_queries()? {
            let answer = self.ask(&query).await;
            out.push((query, answer));
        }
        Ok(out)
    }

    pub async fn status(&self) -> Result<Status> {
        let namespace = self.ctx.settings.retrieval.namespace.clone();
        let chunks = self.ctx.chunk_store.count().await.map_err(|e| Error::Store(e.to_string()))?;
        let vectors = self.ctx.vector_store.count(&namespace).await.map_err(|e| Error::Store(e.to_string()))?;
        Ok(Status { namespace, chunks, vectors, lexical_available: self.ctx.lexical_index.is_some() })
    }
}

fn non_blank(query: &str) -> Result<&str> {
    let q = query.trim();
    if q.is_empty() { return Err(Error::InvalidInput("query is empty".to_string())); }
    Ok(q)
}
