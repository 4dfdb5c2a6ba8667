//! Section-aware chunking with overlap.
//!
//! Documents are first split into sections on markdown-style headers, then
//! each section body goes through a sliding window that prefers to cut on
//! paragraph breaks, newlines, or spaces inside the overlap region. Chunks
//! carry a `"Section: <title>"` header so the section context is embedded
//! along with the passage text.

use crate::types::{Chunk, ChunkMeta, DocMeta};

/// A header-delimited region of a document. Untitled leading content is
/// collected under a synthetic "Introduction" section at level 0.
#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub content: String,
    pub level: usize,
}

fn parse_header(line: &str) -> Option<(usize, String)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    Some((hashes, rest.trim().to_string()))
}

/// Split `text` into sections on leading `#` header markers.
pub fn extract_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut title = "Introduction".to_string();
    let mut level = 0usize;
    let mut lines: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if let Some((next_level, next_title)) = parse_header(line) {
            if !lines.is_empty() {
                sections.push(Section {
                    title: title.clone(),
                    content: lines.join("\n").trim().to_string(),
                    level,
                });
            }
            title = next_title;
            level = next_level;
            lines.clear();
        } else {
            lines.push(line);
        }
    }
    if !lines.is_empty() {
        sections.push(Section {
            title,
            content: lines.join("\n").trim().to_string(),
            level,
        });
    }
    sections
}

/// Sliding-window splitter. Windows are `chunk_size` characters; the cut
/// point is searched backward within the trailing `chunk_overlap`
/// characters, preferring a paragraph break over a newline over a space,
/// and is inclusive of the delimiter. When no break exists in the search
/// region the window is cut hard at `chunk_size` and the next window
/// starts `chunk_overlap` characters back, which keeps the walk strictly
/// advancing on input with no delimiters at all.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    // An overlap >= the window size would stall the hard-cut advance.
    let overlap = chunk_overlap.min(chunk_size - 1);
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total {
        let end = start + chunk_size;
        if end >= total {
            chunks.push(chars[start..].iter().collect());
            break;
        }
        let search_start = start.max(end - overlap);
        if let Some(boundary) = find_break(&chars, search_start, end) {
            chunks.push(chars[start..boundary].iter().collect());
            start = boundary;
        } else {
            chunks.push(chars[start..end].iter().collect());
            start = end - overlap;
        }
    }
    chunks
}

fn find_break(chars: &[char], search_start: usize, end: usize) -> Option<usize> {
    if end >= 2 {
        for i in (search_start..=end - 2).rev() {
            if chars[i] == '\n' && chars[i + 1] == '\n' {
                return Some(i + 2);
            }
        }
    }
    for i in (search_start..end).rev() {
        if chars[i] == '\n' {
            return Some(i + 1);
        }
    }
    for i in (search_start..end).rev() {
        if chars[i] == ' ' {
            return Some(i + 1);
        }
    }
    None
}

/// Chunk a whole document, one window pass per section.
///
/// `chunk_id` is `{doc_id}_{first 10 chars of the section title}_{sequence
/// within the section}`. The sequence restarts per section, so two sections
/// whose titles share a 10-character prefix can collide; the index build
/// checks for and reports such collisions.
pub fn create_chunks(
    text: &str,
    meta: &DocMeta,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let mut all_chunks = Vec::new();
    for section in extract_sections(text) {
        if section.content.is_empty() {
            continue;
        }
        let title_prefix: String = section.title.chars().take(10).collect();
        for (i, raw) in split_text(&section.content, chunk_size, chunk_overlap)
            .into_iter()
            .enumerate()
        {
            let content = if section.title == "Introduction" {
                raw.clone()
            } else {
                format!("Section: {}\n{}", section.title, raw)
            };
            all_chunks.push(Chunk {
                content,
                metadata: ChunkMeta {
                    doc_id: meta.doc_id.clone(),
                    chunk_id: format!("{}_{}_{}", meta.doc_id, title_prefix, i),
                    section_title: section.title.clone(),
                    source: meta.source.clone(),
                    created_at: meta.created_at.clone(),
                    original_text: raw,
                },
            });
        }
    }
    all_chunks
}
