use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::Config as XLMRobertaConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::info;

/// Finds a local model directory: the configured path first, then
/// `APP_MODEL_DIR/<name>`, then `models/<name>` and `../models/<name>`.
pub fn resolve_model_dir(configured: Option<&Path>, name: &str) -> Result<PathBuf> {
    if let Some(p) = configured {
        if p.exists() { return Ok(p.to_path_buf()); }
        return Err(anyhow!("Configured model dir {} does not exist", p.display()));
    }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(dir).join(name);
        if p.exists() { return Ok(p); }
    }
    for candidate in [Path::new("models").join(name), Path::new("../models").join(name)] {
        if candidate.exists() { return Ok(candidate); }
    }
    Err(anyhow!("Could not locate model directory for {}", name))
}

pub(crate) struct LoadedModel<'a> {
    pub config: XLMRobertaConfig,
    pub tokenizer: Tokenizer,
    pub vb: VarBuilder<'a>,
}

/// Loads tokenizer, config and weights. Prefers `model.safetensors`, falling
/// back to `pytorch_model.bin`.
pub(crate) fn load_model_files<'a>(model_dir: &Path, device: &Device) -> Result<LoadedModel<'a>> {
    info!("Loading model from {}", model_dir.display());
    let tokenizer_path = model_dir.join("tokenizer.json");
    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
    let config_path = model_dir.join("config.json");
    let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
    let safetensors = model_dir.join("model.safetensors");
    let weights: HashMap<String, Tensor> = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?.into_iter().collect()
    };
    let vb = VarBuilder::from_tensors(weights, DType::F32, device);
    Ok(LoadedModel { config, tokenizer, vb })
}
