use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use std::collections::HashSet;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::info;

use advisor_core::traits::CrossEncoder;

use crate::device::select_device;
use crate::models::load_model_files;
use crate::tokenize::tokenize_batch;

/// BGE reranker: scores `(query, passage)` pairs jointly with a single-logit
/// classification head. Scores are sigmoid-squashed into `(0, 1)`.
pub struct BgeReranker {
    model: XLMRobertaForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
}

impl BgeReranker {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        let loaded = load_model_files(model_dir, &device)?;
        let model = XLMRobertaForSequenceClassification::new(1, &loaded.config, loaded.vb)?;
        info!("BGE reranker loaded");
        Ok(Self { model, tokenizer: loaded.tokenizer, device, max_len: 512 })
    }

    fn logits(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Vec<f32>> {
        let token_type_ids = input_ids.zeros_like()?.to_dtype(DType::I64)?;
        let logits = self.model.forward(input_ids, attention_mask, &token_type_ids)?;
        Ok(logits.squeeze(1)?.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec1()?)
    }
}

fn sigmoid(x: f32) -> f32 { 1.0 / (1.0 + (-x).exp()) }

impl CrossEncoder for BgeReranker {
    fn score(&self, query: &str, passage: &str) -> Result<f32> {
        Ok(self.score_batch(query, &[passage])?.into_iter().next().unwrap_or(0.0))
    }

    fn score_batch(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        if passages.is_empty() { return Ok(Vec::new()); }
        let pairs: Vec<(&str, &str)> = passages.iter().map(|p| (query, *p)).collect();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, pairs, self.max_len, &self.device)?;
        Ok(self.logits(&input_ids, &attention_mask)?.into_iter().map(sigmoid).collect())
    }
}

/// Fraction of distinct query terms present in the passage. Stand-in for the
/// neural reranker when no model is available.
pub struct TermOverlapScorer;

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

impl CrossEncoder for TermOverlapScorer {
    fn score(&self, query: &str, passage: &str) -> Result<f32> {
        let q = terms(query);
        if q.is_empty() { return Ok(0.0); }
        let p = terms(passage);
        Ok(q.iter().filter(|t| p.contains(*t)).count() as f32 / q.len() as f32)
    }
}
