use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Tokenizer};

/// XLM-RoBERTa `<pad>` id.
pub const PAD_ID: u32 = 1;

/// Encodes a batch and right-pads it to the longest sequence (capped at
/// `max_len`). Returns `(input_ids, attention_mask)`, both `[B, T]`.
pub fn tokenize_batch<'s, I>(tokenizer: &Tokenizer, inputs: Vec<I>, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)>
where
    I: Into<EncodeInput<'s>>,
{
    let batch = inputs.len();
    let mut rows: Vec<(Vec<u32>, Vec<u32>)> = Vec::with_capacity(batch);
    for input in inputs {
        let enc = tokenizer.encode(input, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > max_len { ids.truncate(max_len); mask.truncate(max_len); }
        rows.push((ids, mask));
    }
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let mut flat_ids = Vec::with_capacity(batch * width);
    let mut flat_mask = Vec::with_capacity(batch * width);
    for (mut ids, mut mask) in rows {
        let pad = width - ids.len();
        ids.extend(std::iter::repeat(PAD_ID).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
        flat_ids.extend(ids);
        flat_mask.extend(mask);
    }
    let input_ids = Tensor::from_vec(flat_ids, (batch, width), device)?;
    let attention_mask = Tensor::from_vec(flat_mask, (batch, width), device)?;
    Ok((input_ids, attention_mask))
}
