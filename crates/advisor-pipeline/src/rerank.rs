use std::sync::Arc;
use tracing::debug;

use advisor_core::error::{Error, Result};
use advisor_core::traits::CrossEncoder;
use advisor_core::types::{RankedChunk, RankedContext, RetrievalCandidate};

pub struct Reranker {
    encoder: Arc<dyn CrossEncoder>,
}

impl Reranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>) -> Self { Self { encoder } }

    /// Scores every `(query, candidate)` pair, sorts by relevance and keeps
    /// the best `top_n`. Equal scores keep their fused order.
    pub async fn rerank(&self, query: &str, candidates: Vec<RetrievalCandidate>, top_n: usize) -> Result<RankedContext> {
        if candidates.is_empty() || top_n == 0 { return Ok(RankedContext::default()); }
        let passages: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let scores = self.encoder.score_batch(query, &passages).map_err(|e| Error::Rerank(e.to_string()))?;
        if scores.len() != candidates.len() {
            return Err(Error::Rerank(format!("cross-encoder returned {} scores for {} candidates", scores.len(), candidates.len())));
        }
        let mut items: Vec<RankedChunk> = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, score)| RankedChunk { candidate, relevance_score: if score.is_nan() { f32::NEG_INFINITY } else { score } })
            .collect();
        items.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        items.truncate(top_n);
        debug!("reranked to {} chunks", items.len());
        Ok(RankedContext::new(items))
    }
}
