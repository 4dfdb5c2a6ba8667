//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Window parameters for the chunker. Defaults match the corpus the
/// pipeline was tuned on; override under `[chunking]` in config.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingParams {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self { chunk_size: default_chunk_size(), chunk_overlap: default_chunk_overlap() }
    }
}

/// Data directories used across ingestion, index build, and query time.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: String,
    #[serde(default = "default_processed_dir")]
    pub processed_dir: String,
    #[serde(default = "default_index_dir")]
    pub index_dir: String,
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

fn default_raw_dir() -> String {
    "data/raw".to_string()
}

fn default_processed_dir() -> String {
    "data/processed".to_string()
}

fn default_index_dir() -> String {
    "data/index".to_string()
}

fn default_report_dir() -> String {
    "reports".to_string()
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            processed_dir: default_processed_dir(),
            index_dir: default_index_dir(),
            report_dir: default_report_dir(),
        }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn paths(&self) -> DataPaths {
        self.get("paths").unwrap_or_default()
    }

    pub fn chunking(&self) -> ChunkingParams {
        self.get("chunking").unwrap_or_default()
    }

    /// Candidates fetched from the vector index before reranking.
    pub fn retrieve_top_k(&self) -> usize {
        self.get("retrieval.top_k").unwrap_or(10)
    }

    /// Candidates kept after the cross-encoder pass.
    pub fn rerank_top_k(&self) -> usize {
        self.get("retrieval.rerank_top_k").unwrap_or(5)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
