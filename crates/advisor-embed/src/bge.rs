use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_transformers::models::xlm_roberta::XLMRobertaModel;
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use advisor_core::traits::Embedder;

use crate::device::select_device;
use crate::models::load_model_files;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

/// BGE-M3 dense embeddings: XLM-RoBERTa hidden states, masked mean pooled and
/// L2 normalised.
pub struct BgeM3Embedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl BgeM3Embedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        let loaded = load_model_files(model_dir, &device)?;
        let dim = loaded.config.hidden_size;
        let model = XLMRobertaModel::new(&loaded.config, loaded.vb)?;
        info!("BGE-M3 embedder loaded (dim={})", dim);
        Ok(Self { model, tokenizer: loaded.tokenizer, device, dim, max_len: 512 })
    }

    fn embed_tokens(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Vec<Vec<f32>>> {
        let token_type_ids = input_ids.zeros_like()?.to_dtype(DType::I64)?;
        let hidden = self.model.forward(input_ids, attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?)
    }
}

impl Embedder for BgeM3Embedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, inputs, self.max_len, &self.device)?;
        let out = self.embed_tokens(&input_ids, &attention_mask)?;
        debug!("embedded {} texts in {} ms", texts.len(), start.elapsed().as_millis());
        Ok(out)
    }
}
