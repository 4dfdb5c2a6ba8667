use std::fs;
use std::path::Path;

use tempfile::TempDir;

use ragdb_core::chunk::create_chunks;
use ragdb_core::error::Error;
use ragdb_core::types::{DocMeta, DocumentRecord};
use ragdb_embed::{Embedder, FakeEmbedder};
use ragdb_index::{build_index, load_processed_data, FlatIndex, IndexStore};

fn write_record(processed_dir: &Path, doc_id: &str, text: &str) {
    let metadata = DocMeta {
        doc_id: doc_id.to_string(),
        source: doc_id.to_string(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    };
    let chunks = create_chunks(text, &metadata, 1000, 200);
    let record = DocumentRecord { metadata, chunks };
    let path = processed_dir.join(format!("{doc_id}.json"));
    fs::write(path, serde_json::to_string_pretty(&record).expect("json")).expect("write");
}

#[test]
fn build_load_search_round_trip() {
    let tmp = TempDir::new().expect("tmp");
    let processed = tmp.path().join("processed");
    let index_dir = tmp.path().join("index");
    fs::create_dir_all(&processed).expect("mkdir");

    write_record(&processed, "gardening.md", "# Tomatoes\nplant tomatoes in spring soil\n");
    write_record(&processed, "network.md", "# Sockets\ntcp sockets carry byte streams\n");

    let embedder = FakeEmbedder::new(64);
    let summary = build_index(&processed, &index_dir, &embedder).expect("build");
    assert_eq!(summary.chunks, 2);
    assert_eq!(summary.dim, 64);

    let store = IndexStore::load(&index_dir).expect("load");
    assert_eq!(store.index.len(), store.chunks.len());

    // A query equal to an indexed chunk's content must rank that chunk
    // first (self-similarity is maximal over unit vectors).
    let target = &store.chunks[0];
    let mut query = embedder
        .embed_batch(&[target.content.clone()])
        .expect("embed")
        .remove(0);
    ragdb_index::normalize(&mut query);
    let hits = store.index.search(&query, 2).expect("search");
    assert_eq!(hits[0].0, 0, "ordinal correspondence must hold");
    assert!(hits[0].1 > hits[1].1);
}

#[test]
fn rebuild_is_deterministic() {
    let tmp = TempDir::new().expect("tmp");
    let processed = tmp.path().join("processed");
    fs::create_dir_all(&processed).expect("mkdir");
    write_record(&processed, "a.md", "# One\nfirst document body\n");
    write_record(&processed, "b.md", "# Two\nsecond document body\n");

    let embedder = FakeEmbedder::new(32);
    let dir1 = tmp.path().join("index1");
    let dir2 = tmp.path().join("index2");
    build_index(&processed, &dir1, &embedder).expect("build 1");
    build_index(&processed, &dir2, &embedder).expect("build 2");

    let store1 = IndexStore::load(&dir1).expect("load 1");
    let store2 = IndexStore::load(&dir2).expect("load 2");

    let mut query = embedder
        .embed_batch(&["first document".to_string()])
        .expect("embed")
        .remove(0);
    ragdb_index::normalize(&mut query);
    let hits1 = store1.index.search(&query, 5).expect("search 1");
    let hits2 = store2.index.search(&query, 5).expect("search 2");
    assert_eq!(hits1, hits2);
    assert_eq!(
        store1.chunks[hits1[0].0].metadata.chunk_id,
        store2.chunks[hits2[0].0].metadata.chunk_id
    );
}

#[test]
fn empty_corpus_refuses_to_write() {
    let tmp = TempDir::new().expect("tmp");
    let processed = tmp.path().join("processed");
    let index_dir = tmp.path().join("index");
    fs::create_dir_all(&processed).expect("mkdir");

    let embedder = FakeEmbedder::new(16);
    let err = build_index(&processed, &index_dir, &embedder).expect_err("must refuse");
    match err.downcast_ref::<Error>() {
        Some(Error::EmptyCorpus(_)) => {}
        other => panic!("expected EmptyCorpus, got {other:?}"),
    }
    assert!(!index_dir.join(ragdb_index::VECTOR_INDEX_FILE).exists());
    assert!(!index_dir.join(ragdb_index::DOC_STORE_FILE).exists());
}

#[test]
fn load_missing_pair_is_not_found() {
    let tmp = TempDir::new().expect("tmp");
    match IndexStore::load(tmp.path()) {
        Err(Error::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn single_chunk_corpus_alignment() {
    let tmp = TempDir::new().expect("tmp");
    let processed = tmp.path().join("processed");
    let index_dir = tmp.path().join("index");
    fs::create_dir_all(&processed).expect("mkdir");
    write_record(&processed, "only.md", "a single tiny document\n");

    let embedder = FakeEmbedder::new(16);
    build_index(&processed, &index_dir, &embedder).expect("build");
    let store = IndexStore::load(&index_dir).expect("load");
    assert_eq!(store.chunks.len(), 1);

    let mut query = embedder
        .embed_batch(&["anything at all".to_string()])
        .expect("embed")
        .remove(0);
    ragdb_index::normalize(&mut query);
    // Requesting more results than the corpus holds clamps to the corpus.
    let hits = store.index.search(&query, 5).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, 0);
}

#[test]
fn loader_skips_manifest_and_corrupt_records() {
    let tmp = TempDir::new().expect("tmp");
    let processed = tmp.path().join("processed");
    fs::create_dir_all(&processed).expect("mkdir");

    write_record(&processed, "good.md", "a perfectly fine document\n");
    fs::write(processed.join("manifest.json"), "[]").expect("write manifest");
    fs::write(processed.join("broken.json"), "{ not json").expect("write broken");

    let chunks = load_processed_data(&processed).expect("load");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].metadata.doc_id, "good.md");
}

#[test]
fn flat_index_rejects_mismatched_dimensions() {
    let mut index = FlatIndex::new(4);
    index.add(&[1.0, 0.0, 0.0, 0.0]).expect("add");
    assert!(index.add(&[1.0, 0.0]).is_err());
    assert!(index.search(&[1.0, 0.0], 1).is_err());
}
