use ragdb_core::chunk::{create_chunks, extract_sections, split_text};
use ragdb_core::types::DocMeta;

fn doc_meta(doc_id: &str) -> DocMeta {
    DocMeta {
        doc_id: doc_id.to_string(),
        source: format!("{doc_id}.md"),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

#[test]
fn split_text_empty_input_yields_no_chunks() {
    assert!(split_text("", 100, 20).is_empty());
}

#[test]
fn split_text_short_input_is_one_chunk() {
    let chunks = split_text("short text", 100, 20);
    assert_eq!(chunks, vec!["short text".to_string()]);
}

#[test]
fn split_text_cuts_on_newlines_with_zero_overlap() {
    let chunks = split_text("Line 1\nLine 2\nLine 3", 10, 0);
    assert!(chunks.len() > 1, "small window must produce several chunks");
    assert_eq!(chunks.concat(), "Line 1\nLine 2\nLine 3");
}

#[test]
fn split_text_boundary_cuts_partition_the_input() {
    let text = "alpha bravo charlie\ndelta echo foxtrot\n\ngolf hotel india\njuliett kilo lima\n";
    let chunks = split_text(text, 24, 12);
    assert!(chunks.len() > 1);
    // Boundary cuts are inclusive of the delimiter, so chunks partition
    // the text exactly.
    assert_eq!(chunks.concat(), text);
}

#[test]
fn split_text_hard_cut_preserves_overlap_and_terminates() {
    let text: String = std::iter::repeat('x').take(537).collect();
    let chunks = split_text(&text, 100, 20);

    for c in &chunks {
        assert!(c.chars().count() <= 100);
    }
    // Consecutive hard-cut chunks share exactly the overlap region;
    // dropping it from each follow-up chunk reconstructs the input.
    let mut rebuilt = chunks[0].clone();
    for c in &chunks[1..] {
        rebuilt.push_str(&c.chars().skip(20).collect::<String>());
    }
    assert_eq!(rebuilt, text);
}

#[test]
fn split_text_terminates_when_overlap_exceeds_window() {
    // Degenerate parameters must not stall the window walk.
    let chunks = split_text("abcdefghijklmnopqrstuvwxyz", 5, 10);
    assert!(!chunks.is_empty());
    assert!(chunks.len() < 100);
}

#[test]
fn extract_sections_synthesizes_introduction() {
    let text = "leading prose\n\n# Setup\nhow to set things up\n\n## Details\nmore";
    let sections = extract_sections(text);
    assert_eq!(sections.len(), 3);
    assert_eq!(sections[0].title, "Introduction");
    assert_eq!(sections[0].level, 0);
    assert_eq!(sections[1].title, "Setup");
    assert_eq!(sections[1].level, 1);
    assert_eq!(sections[2].title, "Details");
    assert_eq!(sections[2].level, 2);
}

#[test]
fn create_chunks_empty_input_yields_no_chunks() {
    assert!(create_chunks("", &doc_meta("empty"), 1000, 200).is_empty());
}

#[test]
fn create_chunks_prefixes_section_titles() {
    let text = "intro paragraph\n\n# Usage\nrun the binary with a query\n";
    let chunks = create_chunks(text, &doc_meta("guide.md"), 1000, 200);
    assert_eq!(chunks.len(), 2);

    let intro = &chunks[0];
    assert_eq!(intro.content, intro.metadata.original_text);
    assert!(!intro.content.starts_with("Section: "));
    assert_eq!(intro.metadata.chunk_id, "guide.md_Introducti_0");

    let usage = &chunks[1];
    assert!(usage.content.starts_with("Section: Usage\n"));
    assert_eq!(usage.metadata.section_title, "Usage");
    assert_eq!(usage.metadata.original_text, "run the binary with a query");
    assert_eq!(usage.metadata.chunk_id, "guide.md_Usage_0");
}

#[test]
fn create_chunks_restarts_sequence_per_section() {
    let text = "# First\nbody one\n# Second\nbody two\n";
    let chunks = create_chunks(text, &doc_meta("d"), 1000, 200);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].metadata.chunk_id, "d_First_0");
    assert_eq!(chunks[1].metadata.chunk_id, "d_Second_0");
}

#[test]
fn create_chunks_drops_empty_sections() {
    let text = "# Empty\n\n\n# Full\nactual body\n";
    let chunks = create_chunks(text, &doc_meta("d"), 1000, 200);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].metadata.section_title, "Full");
}
