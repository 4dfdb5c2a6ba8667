//! Local embedding model run with candle.
//!
//! Loads a sentence-transformer style BERT checkpoint (tokenizer.json,
//! config.json, pytorch_model.bin) from disk and mean-pools the hidden
//! states into L2-normalized sentence vectors. The model directory is
//! resolved from `APP_MODEL_DIR`, the configured path, or the conventional
//! `models/embedding` locations.

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::encode_batch;
use crate::Embedder;

const MAX_LEN: usize = 256;

pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl LocalEmbedder {
    pub fn new(model_dir: Option<&str>) -> Result<Self> {
        let model_dir = resolve_model_dir(model_dir)?;
        tracing::info!("loading embedding model from {}", model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let device = select_device();
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let vb = VarBuilder::from_tensors(strip_bert_prefix(weights), DType::F32, &device);
        let model = BertModel::load(vb, &config)?;

        let dim = config.hidden_size;
        Ok(Self { model, tokenizer, device, dim })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch = encode_batch(&self.tokenizer, texts, MAX_LEN, &self.device)?;
        let hidden = self.model.forward(
            &batch.input_ids,
            &batch.token_type_ids,
            Some(&batch.attention_mask),
        )?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

impl Embedder for LocalEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        MAX_LEN
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.forward(texts)
    }
}

/// Checkpoints exported from BertForX models prefix every tensor with
/// `bert.`; plain sentence-transformer exports do not. Accept both.
pub(crate) fn strip_bert_prefix(weights: Vec<(String, Tensor)>) -> HashMap<String, Tensor> {
    weights
        .into_iter()
        .map(|(name, tensor)| {
            let name = name
                .strip_prefix("bert.")
                .map(str::to_string)
                .unwrap_or(name);
            (name, tensor)
        })
        .collect()
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    if let Some(dir) = configured {
        let p = ragdb_core::config::expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
    }
    for candidate in ["models/embedding", "../models/embedding"] {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }
    Err(anyhow!("Could not locate the embedding model directory"))
}
