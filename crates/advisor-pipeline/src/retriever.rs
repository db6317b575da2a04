use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use advisor_core::error::{Error, Result};
use advisor_core::traits::{ChunkStore, Embedder, LexicalIndex, VectorStore};
use advisor_core::types::{Channel, RetrievalCandidate, SearchHit};

use crate::fusion::{fuse, Penalties};

/// Embedding search over one namespace of the vector store.
pub struct VectorChannel {
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub namespace: String,
}

/// Runs the vector and lexical searches concurrently and fuses their
/// rankings. Either channel may be absent or failing; the query then runs on
/// the other one alone.
pub struct HybridRetriever {
    vector: Option<VectorChannel>,
    lexical: Option<Arc<dyn LexicalIndex>>,
    chunks: Arc<dyn ChunkStore>,
    penalties: Penalties,
}

impl HybridRetriever {
    pub fn new(vector: Option<VectorChannel>, lexical: Option<Arc<dyn LexicalIndex>>, chunks: Arc<dyn ChunkStore>, penalties: Penalties) -> Self {
        Self { vector, lexical, chunks, penalties }
    }

    async fn search_vector(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let unavailable = |reason: String| Error::ChannelUnavailable { channel: Channel::Vector, reason };
        let channel = self.vector.as_ref().ok_or_else(|| unavailable("not configured".to_string()))?;
        let query_vector = channel.embedder.embed(query).map_err(|e| unavailable(e.to_string()))?;
        channel.store.search(&channel.namespace, &query_vector, k).await.map_err(|e| unavailable(e.to_string()))
    }

    async fn search_lexical(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let unavailable = |reason: String| Error::ChannelUnavailable { channel: Channel::Lexical, reason };
        let index = self.lexical.as_ref().ok_or_else(|| unavailable("not configured".to_string()))?;
        index.search(query, k).await.map_err(|e| unavailable(e.to_string()))
    }

    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalCandidate>> {
        if top_k == 0 { return Ok(Vec::new()); }
        let (vector, lexical) = futures::join!(self.search_vector(query, top_k), self.search_lexical(query, top_k));
        let (vector_hits, lexical_hits, degraded) = match (vector, lexical) {
            (Ok(v), Ok(l)) => (v, l, None),
            (Ok(v), Err(e)) => {
                warn!("{}; ranking by vector search only", e);
                (v, Vec::new(), self.lexical.is_some().then_some(e))
            }
            (Err(e), Ok(l)) => {
                warn!("{}; ranking by lexical search only", e);
                (Vec::new(), l, self.vector.is_some().then_some(e))
            }
            (Err(ve), Err(le)) => {
                return Err(Error::RetrievalUnavailable { vector: ve.to_string(), lexical: le.to_string() });
            }
        };
        debug!("'{}': {} vector hits, {} lexical hits", query, vector_hits.len(), lexical_hits.len());

        let mut fused = fuse(&vector_hits, &lexical_hits, self.penalties);
        fused.truncate(top_k);
        if fused.is_empty() {
            // An empty ranking with a configured channel down says nothing about the corpus.
            return match degraded {
                Some(e) => Err(e),
                None => Ok(Vec::new()),
            };
        }

        let refs: Vec<_> = fused.iter().map(|h| h.chunk_ref.clone()).collect();
        let mut texts: HashMap<_, _> = self
            .chunks
            .get_many(&refs)
            .await
            .map_err(|e| Error::Store(format!("chunk lookup failed: {}", e)))?
            .into_iter()
            .map(|c| (c.chunk_ref(), c.text))
            .collect();

        let mut candidates = Vec::with_capacity(fused.len());
        for hit in fused {
            let Some(text) = texts.remove(&hit.chunk_ref) else {
                warn!("{} is indexed but has no chunk record; dropped", hit.chunk_ref);
                continue;
            };
            candidates.push(RetrievalCandidate {
                chunk_ref: hit.chunk_ref,
                text,
                lexical_score: hit.lexical_score,
                vector_score: hit.vector_score,
                fused_score: hit.fused_score,
            });
        }
        Ok(candidates)
    }
}
