//! Domain types shared by ingestion, indexing, and retrieval.

use serde::{Deserialize, Serialize};

pub type DocId = String;
pub type ChunkId = String;

/// Metadata attached to every chunk.
///
/// - `doc_id`: stable document identity (filename with spaces replaced)
/// - `chunk_id`: `{doc_id}_{section title prefix}_{sequence within section}`
/// - `section_title`: bare title of the section the chunk came from
/// - `source`: original filename of the source document
/// - `created_at`: RFC 3339 timestamp of ingestion
/// - `original_text`: chunk text without the section header prefix, kept
///   for citation fidelity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub doc_id: DocId,
    pub chunk_id: ChunkId,
    pub section_title: String,
    pub source: String,
    pub created_at: String,
    pub original_text: String,
}

/// The atomic retrievable unit. `content` is what gets embedded and shown
/// as evidence; for non-introduction sections it carries a
/// `"Section: <title>\n"` prefix so retrieval sees the section context.
///
/// Chunks are immutable once created; re-ingesting the owning document
/// replaces the whole set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMeta,
}

/// Document-level metadata stored in each processed record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMeta {
    pub doc_id: DocId,
    pub source: String,
    pub created_at: String,
}

/// One processed record per source file, persisted as `<doc_id>.json`.
/// Overwritten wholesale when the same filename is re-ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub metadata: DocMeta,
    pub chunks: Vec<Chunk>,
}

/// One manifest line per processed document. The manifest is rewritten on
/// every ingestion run; the store loader treats it as advisory and globs
/// the processed directory directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub doc_id: DocId,
    pub path: String,
    pub chunk_count: usize,
}

/// A chunk joined with its retrieval score. `rerank_score`, when present,
/// supersedes `score` for ordering and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub content: String,
    pub metadata: ChunkMeta,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl ScoredChunk {
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            content: chunk.content.clone(),
            metadata: chunk.metadata.clone(),
            score,
            rerank_score: None,
        }
    }

    /// The score retrieval consumers should rank and display by.
    pub fn ranking_score(&self) -> f32 {
        self.rerank_score.unwrap_or(self.score)
    }
}
