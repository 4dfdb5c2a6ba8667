//! Vector retrieval against a loaded index/store pair.

use anyhow::{anyhow, Result};
use std::path::Path;

use ragdb_core::types::ScoredChunk;
use ragdb_embed::Embedder;
use ragdb_index::{normalize, IndexStore};

pub struct Retriever {
    store: IndexStore,
    embedder: Box<dyn Embedder>,
}

impl Retriever {
    /// Load the pair from `index_dir`. Fails with a NotFound error when no
    /// index has been built yet; the caller decides whether to degrade or
    /// trigger a build. The embedder must be the same family the index was
    /// built with — mixing models puts queries in a different vector space
    /// and is not guarded here beyond the dimension check in search.
    pub fn open(index_dir: &Path, embedder: Box<dyn Embedder>) -> Result<Self> {
        let store = IndexStore::load(index_dir)?;
        tracing::info!(
            "loaded index with {} chunks from {}",
            store.chunks.len(),
            index_dir.display()
        );
        Ok(Self { store, embedder })
    }

    pub fn chunk_count(&self) -> usize {
        self.store.chunks.len()
    }

    /// Top-k chunks by cosine similarity, descending. Returns clones of
    /// the stored chunks so downstream reranking can write scores without
    /// touching storage.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        let mut vectors = self.embedder.embed_batch(&[query.to_string()])?;
        let mut query_vec = vectors
            .pop()
            .ok_or_else(|| anyhow!("embedder returned no vector for the query"))?;
        normalize(&mut query_vec);

        let hits = self.store.index.search(&query_vec, top_k)?;
        Ok(hits
            .into_iter()
            .map(|(row, score)| ScoredChunk::from_chunk(&self.store.chunks[row], score))
            .collect())
    }
}
