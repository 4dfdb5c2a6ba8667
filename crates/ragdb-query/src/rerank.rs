//! Cross-encoder reranking of retrieved candidates.
//!
//! The cross-encoder jointly encodes `(query, passage)` pairs, which gives
//! a much sharper relevance signal than vector similarity alone at the
//! cost of one forward pass per candidate. Candidates keep their raw
//! retrieval score; `rerank_score` is written next to it and wins for
//! ordering.

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use ragdb_core::config::Config;
use ragdb_core::types::ScoredChunk;
use ragdb_embed::device::select_device;
use ragdb_embed::tokenize::encode_pairs;

const MAX_LEN: usize = 256;

pub trait RelevanceScorer: Send + Sync {
    /// One relevance score per passage, higher is more relevant. Raw model
    /// logits are fine; only the ordering matters.
    fn score_pairs(&self, query: &str, passages: &[String]) -> Result<Vec<f32>>;
}

/// BERT sequence-classification cross-encoder loaded from a local
/// checkpoint (tokenizer.json, config.json, pytorch_model.bin).
pub struct CrossEncoder {
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoder {
    pub fn new(model_dir: Option<&str>) -> Result<Self> {
        let model_dir = resolve_model_dir(model_dir)?;
        tracing::info!("loading reranker model from {}", model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;

        let device = select_device();
        let raw: HashMap<String, Tensor> =
            candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?
                .into_iter()
                .collect();

        let pooler = linear_from(&raw, "bert.pooler.dense", "pooler.dense")?;
        let classifier = linear_from(&raw, "classifier", "classifier")?;

        let stripped: HashMap<String, Tensor> = raw
            .into_iter()
            .map(|(name, t)| {
                let name = name.strip_prefix("bert.").map(str::to_string).unwrap_or(name);
                (name, t)
            })
            .collect();
        let vb = VarBuilder::from_tensors(stripped, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;

        Ok(Self { model, pooler, classifier, tokenizer, device })
    }

    fn logits(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let batch = encode_pairs(&self.tokenizer, query, passages, MAX_LEN, &self.device)?;
        let hidden = self.model.forward(
            &batch.input_ids,
            &batch.token_type_ids,
            Some(&batch.attention_mask),
        )?;
        // Classification head: tanh pooler over [CLS], then a single-logit
        // linear layer.
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        Ok(logits.squeeze(1)?.to_device(&Device::Cpu)?.to_vec1::<f32>()?)
    }
}

impl RelevanceScorer for CrossEncoder {
    fn score_pairs(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }
        self.logits(query, passages)
    }
}

fn linear_from(weights: &HashMap<String, Tensor>, name: &str, alt: &str) -> Result<Linear> {
    let get = |suffix: &str| {
        weights
            .get(&format!("{name}.{suffix}"))
            .or_else(|| weights.get(&format!("{alt}.{suffix}")))
            .cloned()
            .ok_or_else(|| anyhow!("checkpoint is missing tensor {name}.{suffix}"))
    };
    Ok(Linear::new(get("weight")?, Some(get("bias")?)))
}

/// Lexical-overlap stand-in scorer, deterministic and model-free. Used by
/// tests and offline development via `APP_USE_FAKE_RERANKER=1`.
pub struct FakeScorer;

impl RelevanceScorer for FakeScorer {
    fn score_pairs(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let query_tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Ok(passages
            .iter()
            .map(|p| {
                let passage = p.to_lowercase();
                let hits = query_tokens.iter().filter(|t| passage.contains(*t)).count();
                let norm = (query_tokens.len().max(1) as f32).sqrt()
                    * (passage.split_whitespace().count().max(1) as f32).sqrt();
                hits as f32 / norm
            })
            .collect())
    }
}

pub struct Reranker {
    scorer: Box<dyn RelevanceScorer>,
}

impl Reranker {
    pub fn new(scorer: Box<dyn RelevanceScorer>) -> Self {
        Self { scorer }
    }

    /// Score every candidate against the query, then stable-sort by
    /// `rerank_score` descending and keep `top_k`. Ties keep retrieval
    /// order. Empty input returns empty without invoking the model, which
    /// would otherwise choke on a zero-length batch.
    pub fn rerank(
        &self,
        query: &str,
        mut chunks: Vec<ScoredChunk>,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if chunks.is_empty() {
            return Ok(chunks);
        }
        let passages: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let scores = self.scorer.score_pairs(query, &passages)?;
        if scores.len() != chunks.len() {
            return Err(anyhow!(
                "scorer returned {} scores for {} candidates",
                scores.len(),
                chunks.len()
            ));
        }
        for (chunk, score) in chunks.iter_mut().zip(scores) {
            chunk.rerank_score = Some(score);
        }
        chunks.sort_by(|a, b| {
            b.ranking_score()
                .partial_cmp(&a.ranking_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        chunks.truncate(top_k);
        Ok(chunks)
    }
}

fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_RERANKER")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn reranker_from_config(config: &Config) -> Result<Reranker> {
    if fake_requested() {
        tracing::debug!("using fake reranker (APP_USE_FAKE_RERANKER)");
        return Ok(Reranker::new(Box::new(FakeScorer)));
    }
    let model_dir = config.get::<String>("reranker.model_dir").ok();
    Ok(Reranker::new(Box::new(CrossEncoder::new(model_dir.as_deref())?)))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_RERANKER_DIR") {
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
    for candidate in ["models/reranker", "../models/reranker"] {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }
    Err(anyhow!("Could not locate the reranker model directory"))
}
