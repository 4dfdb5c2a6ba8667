//! Batch tokenization helpers shared by the embedding and reranking models.

use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Fixed-length `[B, T]` tensors ready for a BERT-family forward pass.
pub struct EncodedBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
}

// BERT vocabularies reserve id 0 for [PAD].
const PAD_ID: u32 = 0;

fn pad_row(ids: &mut Vec<u32>, mask: &mut Vec<u32>, types: &mut Vec<u32>, max_len: usize) {
    if ids.len() > max_len {
        ids.truncate(max_len);
        mask.truncate(max_len);
        types.truncate(max_len);
    }
    while ids.len() < max_len {
        ids.push(PAD_ID);
        mask.push(0);
        types.push(0);
    }
}

fn build(
    ids: Vec<u32>,
    mask: Vec<u32>,
    types: Vec<u32>,
    rows: usize,
    max_len: usize,
    device: &Device,
) -> Result<EncodedBatch> {
    Ok(EncodedBatch {
        input_ids: Tensor::from_vec(ids, (rows, max_len), device)?,
        attention_mask: Tensor::from_vec(mask, (rows, max_len), device)?,
        token_type_ids: Tensor::from_vec(types, (rows, max_len), device)?,
    })
}

/// Encode standalone texts, one row per text.
pub fn encode_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    device: &Device,
) -> Result<EncodedBatch> {
    let mut all_ids = Vec::with_capacity(texts.len() * max_len);
    let mut all_mask = Vec::with_capacity(texts.len() * max_len);
    let mut all_types = Vec::with_capacity(texts.len() * max_len);
    for text in texts {
        let enc = tokenizer
            .encode(text.as_str(), true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        let mut types = vec![0u32; ids.len()];
        pad_row(&mut ids, &mut mask, &mut types, max_len);
        all_ids.extend(ids);
        all_mask.extend(mask);
        all_types.extend(types);
    }
    build(all_ids, all_mask, all_types, texts.len(), max_len, device)
}

/// Encode `(query, passage)` pairs for a cross-encoder, one row per
/// passage. Segment ids distinguish the query from the passage.
pub fn encode_pairs(
    tokenizer: &Tokenizer,
    query: &str,
    passages: &[String],
    max_len: usize,
    device: &Device,
) -> Result<EncodedBatch> {
    let mut all_ids = Vec::with_capacity(passages.len() * max_len);
    let mut all_mask = Vec::with_capacity(passages.len() * max_len);
    let mut all_types = Vec::with_capacity(passages.len() * max_len);
    for passage in passages {
        let enc = tokenizer
            .encode((query, passage.as_str()), true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        let mut types = enc.get_type_ids().to_vec();
        pad_row(&mut ids, &mut mask, &mut types, max_len);
        all_ids.extend(ids);
        all_mask.extend(mask);
        all_types.extend(types);
    }
    build(all_ids, all_mask, all_types, passages.len(), max_len, device)
}
