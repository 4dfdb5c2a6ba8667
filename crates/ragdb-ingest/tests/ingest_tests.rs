use std::fs;

use tempfile::TempDir;

use ragdb_core::types::{DocumentRecord, ManifestEntry};
use ragdb_ingest::{Ingestor, MANIFEST_FILE};

#[test]
fn ingest_mixed_directory_isolates_failures() {
    let tmp = TempDir::new().expect("tmp");
    let input = tmp.path().join("raw");
    let output = tmp.path().join("processed");
    fs::create_dir_all(&input).expect("mkdir");

    fs::write(input.join("guide.md"), "# Watering\nwater twice a week\n").expect("write");
    fs::write(input.join("notes.xyz"), "unsupported payload").expect("write");
    // Garbage bytes behind a .pdf extension: extraction fails, run continues.
    fs::write(input.join("broken.pdf"), b"\x00\x01not a pdf").expect("write");

    let summary = Ingestor::default().ingest(&input, &output).expect("ingest");
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 2);

    let manifest: Vec<ManifestEntry> =
        serde_json::from_str(&fs::read_to_string(output.join(MANIFEST_FILE)).expect("read"))
            .expect("parse manifest");
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest[0].doc_id, "guide.md");
    assert!(manifest[0].chunk_count >= 1);
    assert!(output.join("guide.md.json").exists());
}

#[test]
fn doc_id_replaces_spaces() {
    let tmp = TempDir::new().expect("tmp");
    let input = tmp.path().join("raw");
    let output = tmp.path().join("processed");
    fs::create_dir_all(&input).expect("mkdir");
    fs::write(input.join("my field notes.txt"), "plain content").expect("write");

    Ingestor::default().ingest(&input, &output).expect("ingest");
    assert!(output.join("my_field_notes.txt.json").exists());

    let record: DocumentRecord =
        serde_json::from_str(&fs::read_to_string(output.join("my_field_notes.txt.json")).expect("read"))
            .expect("parse record");
    assert_eq!(record.metadata.doc_id, "my_field_notes.txt");
    assert_eq!(record.metadata.source, "my field notes.txt");
}

#[test]
fn reingesting_overwrites_by_doc_id() {
    let tmp = TempDir::new().expect("tmp");
    let input = tmp.path().join("raw");
    let output = tmp.path().join("processed");
    fs::create_dir_all(&input).expect("mkdir");

    fs::write(input.join("doc.txt"), "first version").expect("write");
    Ingestor::default().ingest(&input, &output).expect("first ingest");

    fs::write(input.join("doc.txt"), "second version, now with more text").expect("write");
    Ingestor::default().ingest(&input, &output).expect("second ingest");

    let record_files: Vec<_> = fs::read_dir(&output)
        .expect("read_dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() != MANIFEST_FILE)
        .collect();
    assert_eq!(record_files.len(), 1, "same filename must not duplicate");

    let record: DocumentRecord =
        serde_json::from_str(&fs::read_to_string(output.join("doc.txt.json")).expect("read"))
            .expect("parse record");
    assert!(record.chunks[0].content.contains("second version"));
}

#[test]
fn html_extraction_strips_script_and_style() {
    let tmp = TempDir::new().expect("tmp");
    let input = tmp.path().join("raw");
    let output = tmp.path().join("processed");
    fs::create_dir_all(&input).expect("mkdir");

    let html = "<html><head><style>body { color: red; }</style>\
                <script>alert('nope');</script></head>\
                <body><p>visible   paragraph</p></body></html>";
    fs::write(input.join("page.html"), html).expect("write");

    Ingestor::default().ingest(&input, &output).expect("ingest");
    let record: DocumentRecord =
        serde_json::from_str(&fs::read_to_string(output.join("page.html.json")).expect("read"))
            .expect("parse record");
    let text: String = record.chunks.iter().map(|c| c.content.clone()).collect();
    assert!(text.contains("visible"));
    assert!(text.contains("paragraph"));
    assert!(!text.contains("alert"));
    assert!(!text.contains("color: red"));
}

#[test]
fn nul_bytes_are_stripped() {
    let tmp = TempDir::new().expect("tmp");
    let input = tmp.path().join("raw");
    let output = tmp.path().join("processed");
    fs::create_dir_all(&input).expect("mkdir");
    fs::write(input.join("dirty.txt"), b"clean\x00ed text").expect("write");

    Ingestor::default().ingest(&input, &output).expect("ingest");
    let record: DocumentRecord =
        serde_json::from_str(&fs::read_to_string(output.join("dirty.txt.json")).expect("read"))
            .expect("parse record");
    assert_eq!(record.chunks[0].content, "cleaned text");
}
