//! Retrieval metrics and the offline evaluation runner.

pub mod runner;

pub use runner::{load_dataset, run_eval, EvalExample, EvalSummary};

/// Fraction of gold ids matched anywhere in the retrieved list. Matching
/// is substring containment of the gold id within the retrieved id, so a
/// bare `doc_id` matches any of that document's chunk ids.
pub fn calculate_recall(retrieved_ids: &[String], gold_ids: &[String]) -> f64 {
    if gold_ids.is_empty() {
        return 0.0;
    }
    let hits = retrieved_ids
        .iter()
        .filter(|rid| gold_ids.iter().any(|gid| rid.contains(gid.as_str())))
        .count();
    hits as f64 / gold_ids.len() as f64
}

/// Reciprocal of the 1-based rank of the first retrieved id that matches
/// any gold id; 0.0 when nothing matches.
pub fn calculate_mrr(retrieved_ids: &[String], gold_ids: &[String]) -> f64 {
    if gold_ids.is_empty() {
        return 0.0;
    }
    for (i, rid) in retrieved_ids.iter().enumerate() {
        if gold_ids.iter().any(|gid| rid.contains(gid.as_str())) {
            return 1.0 / (i + 1) as f64;
        }
    }
    0.0
}

/// Trimmed, case-insensitive equality of a prediction and its reference.
pub fn exact_match(prediction: &str, expected: &str) -> bool {
    prediction.trim().to_lowercase() == expected.trim().to_lowercase()
}
