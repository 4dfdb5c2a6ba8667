//! Per-format plain-text extraction.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;

use ragdb_core::error::Error;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "html", "htm", "txt", "md"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extract plain text from a source file, dispatching on extension.
/// NUL bytes from corrupt extraction are always stripped.
pub fn extract_text(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let raw = match ext.as_str() {
        "pdf" => extract_pdf(path)?,
        "html" | "htm" => extract_html(path)?,
        "txt" | "md" => read_text(path)?,
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "'{}' ({})",
                other,
                path.display()
            ))
            .into())
        }
    };
    Ok(clean_text(&raw))
}

fn read_text(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    let text = pdf_extract::extract_text_from_mem(&data)
        .with_context(|| format!("PDF extraction failed for {}", path.display()))?;
    Ok(text)
}

fn extract_html(path: &Path) -> Result<String> {
    let raw = read_text(path)?;
    Ok(strip_html(&raw))
}

/// Tag-stripping text extraction: drop `<script>`/`<style>` subtrees, drop
/// remaining tags, decode the common entities, then collapse whitespace
/// line by line.
fn strip_html(html: &str) -> String {
    let script_style = Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>")
        .expect("static regex");
    let tags = Regex::new(r"(?s)<[^>]*>").expect("static regex");
    let comments = Regex::new(r"(?s)<!--.*?-->").expect("static regex");

    let text = comments.replace_all(html, "");
    let text = script_style.replace_all(&text, "");
    let text = tags.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    // Trim each line, break double-space runs into their own lines, drop
    // the blanks.
    let mut out_lines = Vec::new();
    for line in text.lines() {
        for phrase in line.trim().split("  ") {
            let phrase = phrase.trim();
            if !phrase.is_empty() {
                out_lines.push(phrase.to_string());
            }
        }
    }
    out_lines.join("\n")
}

fn clean_text(text: &str) -> String {
    text.replace('\u{0}', "")
}
