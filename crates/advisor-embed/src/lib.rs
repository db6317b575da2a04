//! advisor-embed
//!
//! Local model inference: BGE-M3 embeddings and the BGE cross-encoder, plus
//! deterministic stand-ins selected with `APP_USE_FAKE_EMBEDDINGS=1`.
use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use advisor_core::traits::{CrossEncoder, Embedder};

pub mod device;
pub mod tokenize;
pub mod pool;
pub mod models;
pub mod bge;
pub mod hash;
pub mod rerank;

pub use bge::BgeM3Embedder;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;
pub use rerank::{BgeReranker, TermOverlapScorer};

/// Dimension of BGE-M3 dense vectors; the hash stand-in matches it.
pub const DEFAULT_DIM: usize = 1024;

pub fn use_fake_models() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn get_default_embedder(model_dir: Option<&Path>) -> Result<Box<dyn Embedder>> {
    if use_fake_models() { info!("Using HashEmbedder"); return Ok(Box::new(HashEmbedder::new(DEFAULT_DIM))); }
    let dir = models::resolve_model_dir(model_dir, "bge-m3")?;
    Ok(Box::new(BgeM3Embedder::load(&dir)?))
}

/// Loads the BGE reranker. Without fake models enabled a configured model
/// must load; with none configured and none found the overlap scorer is used.
pub fn get_default_cross_encoder(model_dir: Option<&Path>) -> Result<Box<dyn CrossEncoder>> {
    if use_fake_models() { info!("Using TermOverlapScorer"); return Ok(Box::new(TermOverlapScorer)); }
    match models::resolve_model_dir(model_dir, "bge-reranker-v2-m3") {
        Ok(dir) => Ok(Box::new(BgeReranker::load(&dir)?)),
        Err(e) if model_dir.is_none() => {
            warn!("No reranker model available ({}); falling back to term overlap", e);
            Ok(Box::new(TermOverlapScorer))
        }
        Err(e) => Err(e),
    }
}
