//! The query-time service bundle and its swappable handle.
//!
//! All query-path state (index snapshot, embedder, reranker, generator)
//! lives in one `QueryService` constructed from configuration. Reload is
//! "build a new service, swap the handle" — never mutation of live state —
//! so queries in flight keep the snapshot they started with.

use anyhow::Result;
use std::path::Path;
use std::sync::{Arc, RwLock};

use ragdb_core::config::Config;
use ragdb_core::types::ScoredChunk;
use ragdb_embed::embedder_from_config;

use crate::generate::{generator_from_config, Generator};
use crate::rerank::{reranker_from_config, Reranker};
use crate::retrieve::Retriever;

/// A generated answer plus the evidence it was grounded in, in rank order.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}

pub struct QueryService {
    retriever: Retriever,
    reranker: Reranker,
    generator: Generator,
    retrieve_k: usize,
    rerank_k: usize,
}

impl QueryService {
    /// Build the full query pipeline from configuration. Fails when the
    /// index has not been built yet (NotFound), which callers surface as
    /// "not ready" rather than an empty answer.
    pub fn open(config: &Config) -> Result<Self> {
        let paths = config.paths();
        let embedder = embedder_from_config(config)?;
        let retriever = Retriever::open(Path::new(&paths.index_dir), embedder)?;
        let reranker = reranker_from_config(config)?;
        let generator = generator_from_config(config)?;
        Ok(Self {
            retriever,
            reranker,
            generator,
            retrieve_k: config.retrieve_top_k(),
            rerank_k: config.rerank_top_k(),
        })
    }

    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        self.retriever.retrieve(query, top_k)
    }

    pub fn rerank(
        &self,
        query: &str,
        chunks: Vec<ScoredChunk>,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        self.reranker.rerank(query, chunks, top_k)
    }

    pub fn generate(&self, query: &str, evidence: &[ScoredChunk]) -> String {
        self.generator.generate(query, evidence)
    }

    /// retrieve → rerank → generate. An empty evidence set is a valid
    /// outcome; the generator then answers from no context and declines.
    pub fn answer(&self, query: &str) -> Result<Answer> {
        let candidates = self.retriever.retrieve(query, self.retrieve_k)?;
        tracing::debug!("retrieved {} candidates", candidates.len());
        let evidence = self.reranker.rerank(query, candidates, self.rerank_k)?;
        let answer = self.generator.generate(query, &evidence);
        Ok(Answer { answer, sources: evidence })
    }
}

/// Shared slot holding the active service. Readers grab an `Arc` snapshot;
/// a rebuild constructs a fresh `QueryService` and swaps it in atomically.
pub struct ServiceHandle {
    inner: RwLock<Arc<QueryService>>,
}

impl ServiceHandle {
    pub fn new(service: QueryService) -> Self {
        Self { inner: RwLock::new(Arc::new(service)) }
    }

    pub fn current(&self) -> Arc<QueryService> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn swap(&self, service: QueryService) {
        let mut slot = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Arc::new(service);
    }
}
