//! Reciprocal-rank fusion of the vector and lexical rankings.
use std::collections::HashMap;

use advisor_core::config::RetrievalSettings;
use advisor_core::types::{ChunkRef, SearchHit};

/// Constant added to each channel's 1-based rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalties {
    pub vector: f64,
    pub lexical: f64,
}

impl Default for Penalties {
    fn default() -> Self { Self { vector: 50.0, lexical: 50.0 } }
}

impl From<&RetrievalSettings> for Penalties {
    fn from(s: &RetrievalSettings) -> Self { Self { vector: s.vector_penalty, lexical: s.lexical_penalty } }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub chunk_ref: ChunkRef,
    pub vector_score: Option<f32>,
    pub lexical_score: Option<f32>,
    pub fused_score: f64,
}

/// `fused = Σ 1 / (rank + penalty)` over the channels a chunk appears in.
///
/// Output is sorted by fused score, descending. Equal scores keep the
/// vector-search order, followed by lexical-only chunks in lexical order.
/// A chunk repeated within one channel counts at its best rank only.
pub fn fuse(vector_hits: &[SearchHit], lexical_hits: &[SearchHit], penalties: Penalties) -> Vec<FusedHit> {
    let mut fused: Vec<FusedHit> = Vec::new();
    let mut position: HashMap<ChunkRef, usize> = HashMap::new();

    let mut add = |hits: &[SearchHit], penalty: f64, is_vector: bool| {
        let mut seen = std::collections::HashSet::new();
        for (i, hit) in hits.iter().enumerate() {
            if !seen.insert(&hit.chunk_ref) { continue; }
            let contribution = 1.0 / ((i + 1) as f64 + penalty);
            let slot = *position.entry(hit.chunk_ref.clone()).or_insert_with(|| {
                fused.push(FusedHit { chunk_ref: hit.chunk_ref.clone(), vector_score: None, lexical_score: None, fused_score: 0.0 });
                fused.len() - 1
            });
            let entry = &mut fused[slot];
            entry.fused_score += contribution;
            if is_vector { entry.vector_score = Some(hit.score); } else { entry.lexical_score = Some(hit.score); }
        }
    };
    add(vector_hits, penalties.vector, true);
    add(lexical_hits, penalties.lexical, false);

    fused.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));
    fused
}
