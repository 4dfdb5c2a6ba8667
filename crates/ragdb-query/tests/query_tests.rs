use std::fs;
use std::path::Path;

use tempfile::TempDir;

use ragdb_core::chunk::create_chunks;
use ragdb_core::types::{DocMeta, DocumentRecord, ScoredChunk};
use ragdb_embed::FakeEmbedder;
use ragdb_index::build_index;
use ragdb_query::generate::{format_context, GenerationBackend, Generator};
use ragdb_query::rerank::{FakeScorer, RelevanceScorer, Reranker};
use ragdb_query::Retriever;

fn write_record(processed_dir: &Path, doc_id: &str, text: &str) {
    let metadata = DocMeta {
        doc_id: doc_id.to_string(),
        source: doc_id.to_string(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    };
    let chunks = create_chunks(text, &metadata, 1000, 200);
    let record = DocumentRecord { metadata, chunks };
    fs::write(
        processed_dir.join(format!("{doc_id}.json")),
        serde_json::to_string_pretty(&record).expect("json"),
    )
    .expect("write");
}

fn build_test_index(tmp: &TempDir) -> std::path::PathBuf {
    let processed = tmp.path().join("processed");
    let index_dir = tmp.path().join("index");
    fs::create_dir_all(&processed).expect("mkdir");
    write_record(&processed, "soil.md", "# Compost\nlayer greens and browns in the compost bin\n");
    write_record(&processed, "water.md", "# Irrigation\ndrip lines water the beds slowly\n");
    write_record(&processed, "tools.md", "# Storage\nhang tools on the shed wall\n");
    build_index(&processed, &index_dir, &FakeEmbedder::new(64)).expect("build");
    index_dir
}

#[test]
fn retrieve_orders_and_clamps() {
    let tmp = TempDir::new().expect("tmp");
    let index_dir = build_test_index(&tmp);
    let retriever = Retriever::open(&index_dir, Box::new(FakeEmbedder::new(64))).expect("open");

    let results = retriever
        .retrieve("layer greens and browns in the compost bin", 2)
        .expect("retrieve");
    assert_eq!(results.len(), 2);
    assert!(results[0].score >= results[1].score);
    assert_eq!(results[0].metadata.doc_id, "soil.md");

    // Asking for more than the corpus holds clamps to the corpus size.
    let all = retriever.retrieve("anything", 50).expect("retrieve");
    assert_eq!(all.len(), retriever.chunk_count());
}

#[test]
fn retrieve_returns_defensive_copies() {
    let tmp = TempDir::new().expect("tmp");
    let index_dir = build_test_index(&tmp);
    let retriever = Retriever::open(&index_dir, Box::new(FakeEmbedder::new(64))).expect("open");

    let mut first = retriever.retrieve("drip lines", 1).expect("retrieve");
    first[0].content.push_str(" MUTATED");
    first[0].rerank_score = Some(99.0);

    let second = retriever.retrieve("drip lines", 1).expect("retrieve");
    assert!(!second[0].content.contains("MUTATED"));
    assert!(second[0].rerank_score.is_none());
}

fn scored(doc: &str, chunk: &str, content: &str, score: f32) -> ScoredChunk {
    ScoredChunk {
        content: content.to_string(),
        metadata: ragdb_core::types::ChunkMeta {
            doc_id: doc.to_string(),
            chunk_id: chunk.to_string(),
            section_title: "Introduction".to_string(),
            source: doc.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            original_text: content.to_string(),
        },
        score,
        rerank_score: None,
    }
}

#[test]
fn rerank_empty_input_skips_the_model() {
    struct PanicScorer;
    impl RelevanceScorer for PanicScorer {
        fn score_pairs(&self, _query: &str, _passages: &[String]) -> anyhow::Result<Vec<f32>> {
            panic!("scorer must not run on an empty candidate set");
        }
    }
    let reranker = Reranker::new(Box::new(PanicScorer));
    let out = reranker.rerank("query", Vec::new(), 5).expect("rerank");
    assert!(out.is_empty());
}

#[test]
fn rerank_sorts_and_truncates() {
    let reranker = Reranker::new(Box::new(FakeScorer));
    let chunks = vec![
        scored("a", "a_Introducti_0", "nothing relevant here", 0.9),
        scored("b", "b_Introducti_0", "compost bins need greens", 0.5),
        scored("c", "c_Introducti_0", "greens and browns for compost bins", 0.1),
    ];
    let out = reranker.rerank("compost greens", chunks, 2).expect("rerank");
    assert_eq!(out.len(), 2);
    assert!(out[0].rerank_score.expect("scored") >= out[1].rerank_score.expect("scored"));
    assert!(out.iter().all(|c| c.metadata.doc_id != "a"), "irrelevant chunk must rank last");

    // Output length is min(top_k, candidates).
    let out = reranker
        .rerank("compost", vec![scored("x", "x_Introducti_0", "compost", 0.2)], 5)
        .expect("rerank");
    assert_eq!(out.len(), 1);
}

#[test]
fn rerank_ties_keep_input_order() {
    struct ConstScorer;
    impl RelevanceScorer for ConstScorer {
        fn score_pairs(&self, _query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>> {
            Ok(vec![0.5; passages.len()])
        }
    }
    let reranker = Reranker::new(Box::new(ConstScorer));
    let chunks = vec![
        scored("first", "first_Introducti_0", "one", 0.3),
        scored("second", "second_Introducti_0", "two", 0.2),
        scored("third", "third_Introducti_0", "three", 0.1),
    ];
    let out = reranker.rerank("q", chunks, 3).expect("rerank");
    let order: Vec<&str> = out.iter().map(|c| c.metadata.doc_id.as_str()).collect();
    assert_eq!(order, vec!["first", "second", "third"]);
}

#[test]
fn context_blocks_carry_chunk_ids() {
    let chunks = vec![
        scored("doc1.md", "doc1.md_Introducti_0", "first passage", 0.8),
        scored("doc2.md", "doc2.md_Setup_0", "second passage", 0.6),
    ];
    let context = format_context(&chunks);
    assert!(context.contains("<SOURCE ID='doc1.md_Introducti_0'>"));
    assert!(context.contains("<SOURCE ID='doc2.md_Setup_0'>"));
    assert!(context.contains("first passage"));
    assert!(context.ends_with("</SOURCE>\n\n"));
}

#[test]
fn generator_reports_missing_key_inline() {
    std::env::remove_var("OPENAI_API_KEY");
    let generator = Generator::new(GenerationBackend::OpenAi {
        model: "gpt-4o-mini".to_string(),
        base_url: "https://api.openai.com".to_string(),
    })
    .expect("generator");
    let answer = generator.generate("what is compost?", &[]);
    assert!(answer.starts_with("Error:"), "got: {answer}");
}
