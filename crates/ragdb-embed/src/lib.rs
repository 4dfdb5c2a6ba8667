//! Embedding backends for chunk and query text.
//!
//! All backends return vectors of a fixed, model-determined dimension; the
//! index reads the dimension from the first batch rather than assuming a
//! constant. `APP_USE_FAKE_EMBEDDINGS=1` forces the deterministic fake
//! backend for fast tests and offline development.

use anyhow::Result;
use serde::Deserialize;

use ragdb_core::config::Config;

pub mod device;
pub mod local;
pub mod pool;
pub mod remote;
pub mod tokenize;

pub trait Embedder: Send + Sync {
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Maximum input length in tokens.
    fn max_len(&self) -> usize;
    /// Compute embeddings for a batch of input texts, one vector per text,
    /// in input order. An empty batch yields an empty matrix.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Closed set of embedding backends selectable via `embedding.backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    Local,
    #[serde(rename = "openai")]
    OpenAi,
    Fake,
}

/// Hash-based stand-in embedder. Deterministic for a given input, roughly
/// token-sensitive, and L2-normalized like the real backends.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let mut v = vec![0f32; self.dim];
            for (i, token) in text.split_whitespace().enumerate() {
                let mut hasher = XxHash64::with_seed(0);
                token.hash(&mut hasher);
                let h = hasher.finish();
                let idx = (h as usize) % self.dim;
                let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
                v[idx] += val + (i as f32 % 3.0) * 0.01;
            }
            let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
            for x in &mut v {
                *x /= norm;
            }
            out.push(v);
        }
        Ok(out)
    }
}

fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the embedder selected by configuration. The same backend family
/// must be used at index-build time and at query time; mixing them leaves
/// queries in a different vector space than the corpus.
pub fn embedder_from_config(config: &Config) -> Result<Box<dyn Embedder>> {
    if fake_requested() {
        tracing::debug!("using fake embedder (APP_USE_FAKE_EMBEDDINGS)");
        return Ok(Box::new(FakeEmbedder::new(384)));
    }
    let backend = config
        .get::<EmbeddingBackend>("embedding.backend")
        .unwrap_or(EmbeddingBackend::Local);
    match backend {
        EmbeddingBackend::Local => {
            let model_dir = config.get::<String>("embedding.model_dir").ok();
            Ok(Box::new(local::LocalEmbedder::new(model_dir.as_deref())?))
        }
        EmbeddingBackend::OpenAi => {
            let model = config
                .get::<String>("embedding.openai_model")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string());
            let base_url = config.get::<String>("embedding.base_url").ok();
            Ok(Box::new(remote::OpenAiEmbedder::new(model, base_url)?))
        }
        EmbeddingBackend::Fake => Ok(Box::new(FakeEmbedder::new(384))),
    }
}
