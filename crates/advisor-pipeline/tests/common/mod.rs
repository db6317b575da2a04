#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use advisor_core::config::Settings;
use advisor_core::memory::{MemoryChunkStore, MemoryVectorStore};
use advisor_core::traits::{ChunkStore, Embedder, Generator, LexicalIndex, Prompt, VectorMetadata, VectorStore};
use advisor_core::types::{Chunk, ChunkRef, SearchHit};
use advisor_embed::{HashEmbedder, TermOverlapScorer};
use advisor_pipeline::{AdvisorContext, ABSENCE_STATEMENT};

pub const SCHEME_DOC: &str = "# Udyam Registration\nRegistration on the Udyam portal is free and needs only an Aadhaar number.\n\n\
## PM SVANidhi\nPM SVANidhi gives street vendors working capital loans of Rs 10,000 first.\n\n\
## ZED Certification\nZED certification rewards zero defect, zero effect manufacturing units.";

/// Settings that split [`SCHEME_DOC`] into exactly three chunks.
pub fn small_settings() -> Settings {
    let mut s = Settings::default();
    s.chunking.chunk_size = 120;
    s.chunking.chunk_overlap = 10;
    s.embedding.batch_size = 2;
    s
}

/// Answers with the context sentences that mention the question's proper
/// nouns (tokens with two or more capitals), or the absence statement.
#[derive(Default)]
pub struct ExtractiveGenerator {
    pub calls: AtomicUsize,
}

fn subject_terms(question: &str) -> Vec<String> {
    question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().filter(|c| c.is_uppercase()).count() >= 2)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (head, question) = prompt.user.rsplit_once("\n\nQuestion: ").ok_or_else(|| anyhow!("no question"))?;
        let context = head.split_once("Retrieved context:\n").map(|(_, c)| c).unwrap_or("");
        let terms = subject_terms(question);
        let sentences: Vec<&str> = context
            .split(['\n', '.'])
            .map(str::trim)
            .filter(|s| !s.is_empty() && terms.iter().any(|t| s.contains(t.as_str())))
            .collect();
        if terms.is_empty() || sentences.is_empty() {
            return Ok(ABSENCE_STATEMENT.to_string());
        }
        Ok(sentences.join(". "))
    }
}

#[derive(Default)]
pub struct FailingGenerator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("connection refused"))
    }
}

/// Stores vectors normally but cannot be searched.
#[derive(Default)]
pub struct SearchDownVectorStore {
    inner: MemoryVectorStore,
}

#[async_trait]
impl VectorStore for SearchDownVectorStore {
    async fn upsert(&self, namespace: &str, key: &ChunkRef, vector: &[f32], metadata: &VectorMetadata) -> Result<bool> {
        self.inner.upsert(namespace, key, vector, metadata).await
    }
    async fn search(&self, _namespace: &str, _query_vector: &[f32], _k: usize) -> Result<Vec<SearchHit>> {
        Err(anyhow!("vector index offline"))
    }
    async fn contains(&self, namespace: &str, key: &ChunkRef) -> Result<bool> {
        self.inner.contains(namespace, key).await
    }
    async fn count(&self, namespace: &str) -> Result<usize> {
        self.inner.count(namespace).await
    }
}

pub struct DownLexicalIndex;

#[async_trait]
impl LexicalIndex for DownLexicalIndex {
    async fn index(&self, _chunks: &[Chunk]) -> Result<usize> {
        Err(anyhow!("lexical index not built"))
    }
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<SearchHit>> {
        Err(anyhow!("lexical index not built"))
    }
}

/// Fails for any text containing `POISON`, in batches and one by one,
/// until [`PoisonAwareEmbedder::recover`] is called.
pub struct PoisonAwareEmbedder {
    inner: HashEmbedder,
    recovered: AtomicBool,
}

impl PoisonAwareEmbedder {
    pub fn new(dim: usize) -> Self { Self { inner: HashEmbedder::new(dim), recovered: AtomicBool::new(false) } }
    pub fn recover(&self) { self.recovered.store(true, Ordering::SeqCst); }
}

impl Embedder for PoisonAwareEmbedder {
    fn dim(&self) -> usize { self.inner.dim() }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if !self.recovered.load(Ordering::SeqCst) && texts.iter().any(|t| t.contains("POISON")) {
            return Err(anyhow!("provider rejected input"));
        }
        self.inner.embed_batch(texts)
    }
}

/// Accepts `limit` inserts, then every write fails.
pub struct FlakyChunkStore {
    inner: MemoryChunkStore,
    limit: usize,
    inserts: AtomicUsize,
}

impl FlakyChunkStore {
    pub fn new(limit: usize) -> Self { Self { inner: MemoryChunkStore::default(), limit, inserts: AtomicUsize::new(0) } }
}

#[async_trait]
impl ChunkStore for FlakyChunkStore {
    async fn contains(&self, chunk_ref: &ChunkRef) -> Result<bool> {
        self.inner.contains(chunk_ref).await
    }
    async fn insert(&self, chunk: &Chunk) -> Result<bool> {
        if self.inserts.fetch_add(1, Ordering::SeqCst) >= self.limit {
            return Err(anyhow!("disk full"));
        }
        self.inner.insert(chunk).await
    }
    async fn get_many(&self, refs: &[ChunkRef]) -> Result<Vec<Chunk>> {
        self.inner.get_many(refs).await
    }
    async fn scan(&self) -> Result<Vec<Chunk>> {
        self.inner.scan().await
    }
    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

pub fn memory_context(settings: Settings, generator: Arc<dyn Generator>) -> AdvisorContext {
    AdvisorContext::in_memory(settings, Arc::new(HashEmbedder::new(64)), Arc::new(TermOverlapScorer), generator)
}
