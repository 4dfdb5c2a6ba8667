//! Ingestion orchestrator.
//!
//! Walks a source directory (non-recursive), extracts plain text per
//! format, chunks it, and persists one JSON record per document plus a
//! rewritten manifest. A failure on one file never aborts the others;
//! re-ingesting a filename overwrites that document's prior record, which
//! is what makes re-ingestion idempotent.

use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

use ragdb_core::chunk::create_chunks;
use ragdb_core::config::ChunkingParams;
use ragdb_core::types::{DocMeta, DocumentRecord, ManifestEntry};

pub mod extract;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub processed: usize,
    pub skipped: usize,
}

pub struct Ingestor {
    params: ChunkingParams,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(ChunkingParams::default())
    }
}

impl Ingestor {
    pub fn new(params: ChunkingParams) -> Self {
        Self { params }
    }

    /// Extract, chunk, and wrap one source file into a processed record.
    pub fn process_file(&self, path: &Path) -> Result<DocumentRecord> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("path has no usable filename: {}", path.display()))?;
        let text = extract::extract_text(path)?;

        // The doc id doubles as the processed filename, so spaces go.
        let doc_id = filename.replace(' ', "_");
        let metadata = DocMeta {
            doc_id,
            source: filename.to_string(),
            created_at: file_timestamp(path),
        };
        let chunks = create_chunks(&text, &metadata, self.params.chunk_size, self.params.chunk_overlap);
        Ok(DocumentRecord { metadata, chunks })
    }

    pub fn ingest(&self, input_dir: &Path, output_dir: &Path) -> Result<IngestSummary> {
        fs::create_dir_all(output_dir)?;

        let mut summary = IngestSummary::default();
        let mut manifest: Vec<ManifestEntry> = Vec::new();
        for path in discover_files(input_dir) {
            if !extract::is_supported(&path) {
                tracing::warn!(path = %path.display(), "skipping unsupported file");
                summary.skipped += 1;
                continue;
            }
            tracing::info!(path = %path.display(), "processing");
            match self
                .process_file(&path)
                .and_then(|record| persist_record(&record, output_dir))
            {
                Ok(entry) => {
                    manifest.push(entry);
                    summary.processed += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to process file");
                    summary.skipped += 1;
                }
            }
        }

        // The manifest is rewritten wholesale; it only ever describes the
        // current run, while the store loader globs the directory.
        fs::write(
            output_dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        tracing::info!(
            "ingestion complete: {} processed, {} skipped",
            summary.processed,
            summary.skipped
        );
        Ok(summary)
    }
}

fn persist_record(record: &DocumentRecord, output_dir: &Path) -> Result<ManifestEntry> {
    let out_path = output_dir.join(format!("{}.json", record.metadata.doc_id));
    fs::write(&out_path, serde_json::to_string_pretty(record)?)?;
    Ok(ManifestEntry {
        doc_id: record.metadata.doc_id.clone(),
        path: out_path.to_string_lossy().to_string(),
        chunk_count: record.chunks.len(),
    })
}

fn discover_files(input_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(input_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

fn file_timestamp(path: &Path) -> String {
    fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
        .unwrap_or_else(|_| chrono::Utc::now().to_rfc3339())
}
