//! In-process implementations of the storage and search collaborators.
//!
//! Used by tests and by short-lived runs that do not need persistence.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::traits::{ChunkStore, LexicalIndex, VectorMetadata, VectorStore};
use crate::types::{Channel, Chunk, ChunkRef, SearchHit};

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("in-memory store lock poisoned")
}

#[derive(Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<BTreeMap<ChunkRef, Chunk>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self { Self::default() }

    /// All records, ordered by `(source, index)`.
    pub fn all(&self) -> anyhow::Result<Vec<Chunk>> {
        Ok(self.chunks.read().map_err(poisoned)?.values().cloned().collect())
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn contains(&self, chunk_ref: &ChunkRef) -> anyhow::Result<bool> {
        Ok(self.chunks.read().map_err(poisoned)?.contains_key(chunk_ref))
    }

    async fn insert(&self, chunk: &Chunk) -> anyhow::Result<bool> {
        let mut guard = self.chunks.write().map_err(poisoned)?;
        let key = chunk.chunk_ref();
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(key, chunk.clone());
        Ok(true)
    }

    async fn get_many(&self, refs: &[ChunkRef]) -> anyhow::Result<Vec<Chunk>> {
        let guard = self.chunks.read().map_err(poisoned)?;
        Ok(refs.iter().filter_map(|r| guard.get(r).cloned()).collect())
    }

    async fn scan(&self) -> anyhow::Result<Vec<Chunk>> {
        self.all()
    }

    async fn count(&self) -> anyhow::Result<usize> {
        Ok(self.chunks.read().map_err(poisoned)?.len())
    }
}

/// Brute-force cosine search over every stored vector of a namespace.
#[derive(Default)]
pub struct MemoryVectorStore {
    // namespace -> insertion-ordered (key, vector)
    spaces: RwLock<HashMap<String, Vec<(ChunkRef, Vec<f32>)>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self { Self::default() }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, namespace: &str, key: &ChunkRef, vector: &[f32], _metadata: &VectorMetadata) -> anyhow::Result<bool> {
        let mut guard = self.spaces.write().map_err(poisoned)?;
        let space = guard.entry(namespace.to_string()).or_default();
        if space.iter().any(|(k, _)| k == key) {
            return Ok(false);
        }
        space.push((key.clone(), vector.to_vec()));
        Ok(true)
    }

    async fn search(&self, namespace: &str, query_vector: &[f32], k: usize) -> anyhow::Result<Vec<SearchHit>> {
        let guard = self.spaces.read().map_err(poisoned)?;
        let Some(space) = guard.get(namespace) else { return Ok(Vec::new()) };
        let mut hits: Vec<SearchHit> = space
            .iter()
            .map(|(key, v)| SearchHit { chunk_ref: key.clone(), score: cosine_similarity(query_vector, v), channel: Channel::Vector })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn contains(&self, namespace: &str, key: &ChunkRef) -> anyhow::Result<bool> {
        Ok(self.spaces.read().map_err(poisoned)?.get(namespace).is_some_and(|space| space.iter().any(|(k, _)| k == key)))
    }

    async fn count(&self, namespace: &str) -> anyhow::Result<usize> {
        Ok(self.spaces.read().map_err(poisoned)?.get(namespace).map_or(0, Vec::len))
    }
}

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

/// Okapi BM25 over lowercased alphanumeric terms.
#[derive(Default)]
pub struct MemoryLexicalIndex {
    docs: RwLock<Vec<(ChunkRef, HashMap<String, usize>, usize)>>,
}

impl MemoryLexicalIndex {
    pub fn new() -> Self { Self::default() }
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl LexicalIndex for MemoryLexicalIndex {
    async fn index(&self, chunks: &[Chunk]) -> anyhow::Result<usize> {
        let mut guard = self.docs.write().map_err(poisoned)?;
        let mut added = 0;
        for chunk in chunks {
            let key = chunk.chunk_ref();
            if guard.iter().any(|(k, _, _)| *k == key) {
                continue;
            }
            let terms = tokenize(&chunk.text);
            let len = terms.len();
            let mut tf = HashMap::new();
            for t in terms {
                *tf.entry(t).or_insert(0) += 1;
            }
            guard.push((key, tf, len));
            added += 1;
        }
        Ok(added)
    }

    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchHit>> {
        let guard = self.docs.read().map_err(poisoned)?;
        if guard.is_empty() {
            return Ok(Vec::new());
        }
        let n = guard.len() as f32;
        let avg_len = guard.iter().map(|(_, _, l)| *l as f32).sum::<f32>() / n;
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();
        let mut hits = Vec::new();
        for (key, tf, len) in guard.iter() {
            let mut score = 0.0f32;
            for term in &terms {
                let Some(&freq) = tf.get(term) else { continue };
                let df = guard.iter().filter(|(_, d, _)| d.contains_key(term)).count() as f32;
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                let freq = freq as f32;
                let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * (*len as f32) / avg_len.max(1.0));
                score += idf * freq * (BM25_K1 + 1.0) / (freq + norm);
            }
            if score > 0.0 {
                hits.push(SearchHit { chunk_ref: key.clone(), score, channel: Channel::Lexical });
            }
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}
