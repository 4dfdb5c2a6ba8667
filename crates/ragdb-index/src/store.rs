//! Processed-record loading and the persisted index/chunk-list pair.
//!
//! The loader always globs `*.json` under the processed directory rather
//! than trusting the manifest; additive ingestion then makes every rebuild
//! see the complete corpus, manifest or not.

use anyhow::Result;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use ragdb_core::error::{Error, Result as CoreResult};
use ragdb_core::types::{Chunk, DocumentRecord};

use crate::flat::FlatIndex;

pub const VECTOR_INDEX_FILE: &str = "vector.index";
pub const DOC_STORE_FILE: &str = "doc_store.bin";

/// Load every chunk currently persisted under `processed_dir`, in sorted
/// file order so rebuilds are deterministic. Records that fail to parse
/// are logged and skipped; they do not abort the load.
pub fn load_processed_data(processed_dir: &Path) -> Result<Vec<Chunk>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(processed_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .filter(|p| p.file_name().and_then(|n| n.to_str()) != Some("manifest.json"))
        .collect();
    paths.sort();

    tracing::info!("found {} processed documents to index", paths.len());

    let mut chunks = Vec::new();
    for path in &paths {
        let record = match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| Ok(serde_json::from_str::<DocumentRecord>(&raw)?))
        {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable processed record");
                continue;
            }
        };
        chunks.extend(record.chunks);
    }
    Ok(chunks)
}

/// A loaded index/chunk-list pair, position-aligned: index row `i`
/// resolves to `chunks[i]`.
#[derive(Debug)]
pub struct IndexStore {
    pub index: FlatIndex,
    pub chunks: Vec<Chunk>,
}

impl IndexStore {
    /// Fails with `Error::NotFound` when either half of the pair is
    /// absent, and refuses to serve a pair whose lengths disagree.
    pub fn load(index_dir: &Path) -> CoreResult<Self> {
        let index_path = index_dir.join(VECTOR_INDEX_FILE);
        let store_path = index_dir.join(DOC_STORE_FILE);
        if !index_path.exists() || !store_path.exists() {
            return Err(Error::NotFound(format!(
                "index or doc store missing in {}",
                index_dir.display()
            )));
        }

        let index = FlatIndex::load(&index_path)
            .map_err(|e| Error::Operation(format!("failed to read {}: {e}", index_path.display())))?;
        let file = fs::File::open(&store_path)
            .map_err(|e| Error::Operation(format!("failed to open {}: {e}", store_path.display())))?;
        let chunks: Vec<Chunk> = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::Operation(format!("failed to read {}: {e}", store_path.display())))?;

        if index.len() != chunks.len() {
            return Err(Error::Operation(format!(
                "index holds {} vectors but doc store holds {} chunks",
                index.len(),
                chunks.len()
            )));
        }
        Ok(Self { index, chunks })
    }
}

/// Persist the pair: stage both files under temporary names, then rename
/// into place, so a concurrent reader never opens a half-written file.
pub(crate) fn write_pair(index_dir: &Path, index: &FlatIndex, chunks: &[Chunk]) -> Result<()> {
    let tmp_index = index_dir.join(format!("{VECTOR_INDEX_FILE}.tmp"));
    let tmp_store = index_dir.join(format!("{DOC_STORE_FILE}.tmp"));

    index.save(&tmp_index)?;
    let file = BufWriter::new(fs::File::create(&tmp_store)?);
    bincode::serialize_into(file, chunks)?;

    fs::rename(&tmp_index, index_dir.join(VECTOR_INDEX_FILE))?;
    fs::rename(&tmp_store, index_dir.join(DOC_STORE_FILE))?;
    Ok(())
}
