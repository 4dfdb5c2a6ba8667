//! Grounded answer generation over retrieved evidence.
//!
//! Two interchangeable backends sit behind one `generate` call: a hosted
//! OpenAI-compatible chat API and a locally hosted model server speaking
//! the Ollama chat protocol. Both receive the same system instruction and
//! the same `<SOURCE ID='doc_chunk'>` context blocks, so answers can cite
//! `[doc_id:chunk_id]` precisely. Backend failures come back as textual
//! error answers, never as panics — the chat layer renders them inline.

use anyhow::{anyhow, Result};
use serde::Deserialize;

use ragdb_core::config::Config;
use ragdb_core::types::ScoredChunk;

pub const SYSTEM_PROMPT: &str = "You are a grounded knowledge assistant.\n\
Your goal is to answer the user's question using ONLY the provided context.\n\
\n\
Rules:\n\
1. Use the provided context to answer the question.\n\
2. If the answer is not in the context, say \"I don't know based on the provided documents.\"\n\
3. Cite your sources for every fact using the format [doc_id:chunk_id].\n\
4. Do not make up information.\n\
5. Be concise and direct.\n";

/// Closed set of generation backends.
#[derive(Debug, Clone)]
pub enum GenerationBackend {
    OpenAi { model: String, base_url: String },
    Local { model: String, base_url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BackendKind {
    #[serde(rename = "openai")]
    OpenAi,
    Local,
}

pub struct Generator {
    backend: GenerationBackend,
    client: reqwest::Client,
    rt: tokio::runtime::Runtime,
    api_key: Option<String>,
}

/// Render evidence as clearly delimited per-source blocks tagged with the
/// chunk id the model is expected to cite.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        out.push_str(&format!(
            "<SOURCE ID='{}'>\n{}\n</SOURCE>\n\n",
            chunk.metadata.chunk_id, chunk.content
        ));
    }
    out
}

impl Generator {
    pub fn new(backend: GenerationBackend) -> Result<Self> {
        Ok(Self {
            backend,
            client: reqwest::Client::new(),
            rt: tokio::runtime::Runtime::new()?,
            api_key: std::env::var("OPENAI_API_KEY").ok(),
        })
    }

    /// Produce a grounded, cited answer. Upstream failures are folded into
    /// the returned text so the caller can display them inline.
    pub fn generate(&self, query: &str, context_chunks: &[ScoredChunk]) -> String {
        let context = format_context(context_chunks);
        let user = format!("Context:\n{context}\n\nQuestion: {query}");

        match &self.backend {
            GenerationBackend::OpenAi { model, base_url } => {
                let Some(api_key) = self.api_key.as_deref() else {
                    return "Error: OpenAI backend selected but OPENAI_API_KEY is not set. \
                            Switch to the local backend or set the key."
                        .to_string();
                };
                match self.chat_openai(base_url, model, api_key, &user) {
                    Ok(answer) => answer,
                    Err(e) => format!("OpenAI error: {e}"),
                }
            }
            GenerationBackend::Local { model, base_url } => {
                match self.chat_local(base_url, model, &user) {
                    Ok(answer) => answer,
                    Err(e) => format!("Local generation error: {e}"),
                }
            }
        }
    }

    fn chat_openai(&self, base_url: &str, model: &str, api_key: &str, user: &str) -> Result<String> {
        let url = format!("{base_url}/v1/chat/completions");
        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user },
            ],
            "temperature": 0.1,
        });
        let value: serde_json::Value = self.rt.block_on(async {
            let resp = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                let detail = resp.text().await.unwrap_or_default();
                return Err(anyhow!("chat API returned {}: {}", status, detail));
            }
            Ok(resp.json::<serde_json::Value>().await?)
        })?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("chat API response had no message content"))
    }

    fn chat_local(&self, base_url: &str, model: &str, user: &str) -> Result<String> {
        let url = format!("{base_url}/api/chat");
        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user },
            ],
            "stream": false,
            "options": { "temperature": 0.1 },
        });
        let value: serde_json::Value = self.rt.block_on(async {
            let resp = self.client.post(&url).json(&body).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let detail = resp.text().await.unwrap_or_default();
                return Err(anyhow!("local model server returned {}: {}", status, detail));
            }
            Ok(resp.json::<serde_json::Value>().await?)
        })?;
        value["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("local model response had no message content"))
    }
}

pub fn generator_from_config(config: &Config) -> Result<Generator> {
    let kind = config
        .get::<BackendKind>("generation.backend")
        .unwrap_or(BackendKind::OpenAi);
    let backend = match kind {
        BackendKind::OpenAi => GenerationBackend::OpenAi {
            model: config
                .get::<String>("generation.model")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            base_url: config
                .get::<String>("generation.base_url")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
        },
        BackendKind::Local => GenerationBackend::Local {
            model: config
                .get::<String>("generation.model")
                .unwrap_or_else(|_| "mistral".to_string()),
            base_url: config
                .get::<String>("generation.base_url")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
        },
    };
    Generator::new(backend)
}
