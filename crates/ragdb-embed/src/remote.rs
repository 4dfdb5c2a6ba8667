//! Remote embedding backend calling an OpenAI-compatible embeddings API.
//!
//! The whole input batch goes out in a single request. Failures surface as
//! errors to the caller; an empty result is only ever produced by an empty
//! input batch.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::Embedder;

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    rt: tokio::runtime::Runtime,
    model: String,
    api_key: String,
    base_url: String,
    dim: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(model: impl Into<String>, base_url: Option<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY not set for the openai embedding backend")?;
        let model = model.into();
        let dim = match model.as_str() {
            "text-embedding-3-large" => 3072,
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            _ => 1536,
        };
        Ok(Self {
            client: reqwest::Client::new(),
            rt: tokio::runtime::Runtime::new()?,
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
            dim,
        })
    }
}

impl Embedder for OpenAiEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        8192
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = serde_json::json!({ "model": self.model, "input": texts });
        let response: EmbeddingsResponse = self.rt.block_on(async {
            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                let detail = resp.text().await.unwrap_or_default();
                return Err(anyhow!("embeddings API returned {}: {}", status, detail));
            }
            Ok(resp.json::<EmbeddingsResponse>().await?)
        })?;
        if response.data.len() != texts.len() {
            return Err(anyhow!(
                "embeddings API returned {} vectors for {} inputs",
                response.data.len(),
                texts.len()
            ));
        }
        Ok(response.data.into_iter().map(|r| r.embedding).collect())
    }
}
