//! Full-corpus index build.
//!
//! Every rebuild loads the complete persisted chunk set and re-embeds it;
//! the index is never patched incrementally. That makes re-indexing after
//! additive ingestion correct by construction at the cost of redundant
//! embedding work, which is acceptable at the corpus sizes this targets.

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use ragdb_core::error::Error;
use ragdb_core::types::Chunk;
use ragdb_embed::Embedder;

use crate::flat::{normalize, FlatIndex};
use crate::store::{load_processed_data, write_pair};

// Embedding batch size; the build loop is interruptible between batches.
const EMBED_BATCH: usize = 32;

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub chunks: usize,
    pub dim: usize,
}

/// Embed all chunks under `processed_dir` and write the `vector.index` +
/// `doc_store.bin` pair into `index_dir`.
///
/// A corpus with zero chunks yields `Error::EmptyCorpus` and writes
/// nothing — an empty pair on disk would be indistinguishable from a
/// corrupt one.
pub fn build_index(
    processed_dir: &Path,
    index_dir: &Path,
    embedder: &dyn Embedder,
) -> Result<BuildSummary> {
    fs::create_dir_all(index_dir)?;

    let chunks = load_processed_data(processed_dir)?;
    tracing::info!("loaded {} chunks", chunks.len());
    if chunks.is_empty() {
        return Err(Error::EmptyCorpus(format!(
            "no chunks found under {}",
            processed_dir.display()
        ))
        .into());
    }
    warn_on_duplicate_ids(&chunks);

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut index: Option<FlatIndex> = None;
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let mut embeddings = embedder.embed_batch(&texts)?;
        if embeddings.len() != batch.len() {
            return Err(anyhow!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                batch.len()
            ));
        }
        for vector in &mut embeddings {
            normalize(vector);
            // The dimension comes from the first batch; it is a property
            // of the model, not of configuration.
            let index = index.get_or_insert_with(|| FlatIndex::new(vector.len()));
            index.add(vector)?;
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embedding complete");

    let index = index.ok_or_else(|| anyhow!("no embeddings were produced"))?;
    write_pair(index_dir, &index, &chunks)?;
    tracing::info!(
        "index written to {} ({} vectors, dim {})",
        index_dir.display(),
        index.len(),
        index.dim()
    );
    Ok(BuildSummary { chunks: chunks.len(), dim: index.dim() })
}

/// Chunk ids are derived from a truncated section title, so distinct
/// sections can collide. The build keeps going but makes the collision
/// visible, since citations on a colliding id are ambiguous.
fn warn_on_duplicate_ids(chunks: &[Chunk]) {
    let mut seen = HashSet::new();
    for chunk in chunks {
        if !seen.insert(chunk.metadata.chunk_id.as_str()) {
            tracing::warn!(
                chunk_id = %chunk.metadata.chunk_id,
                doc_id = %chunk.metadata.doc_id,
                "duplicate chunk id in corpus"
            );
        }
    }
}
