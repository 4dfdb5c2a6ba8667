//! JSONL evaluation runner over the retrieve → rerank → generate pipeline.
//!
//! Each example is retrieved at k=10 (where recall/MRR are computed),
//! reranked down to 5, and answered. Results land in the report directory
//! as `eval_report.json` plus a short markdown summary. LLM-judge scoring
//! of grounding/correctness is a separate concern and not run here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use ragdb_query::QueryService;

use crate::{calculate_mrr, calculate_recall};

const RETRIEVE_K: usize = 10;
const RERANK_K: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct EvalExample {
    #[serde(default)]
    pub id: Option<String>,
    pub question: String,
    #[serde(default)]
    pub gold_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryMetrics {
    #[serde(rename = "recall@10")]
    pub recall_at_10: f64,
    pub mrr: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalEntry {
    pub id: Option<String>,
    pub question: String,
    pub answer: String,
    pub metrics: QueryMetrics,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvalSummary {
    #[serde(rename = "avg_recall@10")]
    pub avg_recall_at_10: f64,
    pub avg_mrr: f64,
    pub examples: usize,
}

#[derive(Debug, Serialize)]
struct EvalReport {
    summary: EvalSummary,
    details: Vec<EvalEntry>,
}

/// One JSON object per non-blank line.
pub fn load_dataset(path: &Path) -> Result<Vec<EvalExample>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    let mut examples = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        examples.push(serde_json::from_str(line)?);
    }
    Ok(examples)
}

pub fn run_eval(service: &QueryService, data_path: &Path, report_dir: &Path) -> Result<EvalSummary> {
    let dataset = load_dataset(data_path)?;
    tracing::info!("running eval on {} examples", dataset.len());

    let mut details = Vec::with_capacity(dataset.len());
    let mut total_recall = 0.0;
    let mut total_mrr = 0.0;

    for example in &dataset {
        let retrieved = service.retrieve(&example.question, RETRIEVE_K)?;
        let retrieved_ids: Vec<String> = retrieved
            .iter()
            .map(|c| c.metadata.chunk_id.clone())
            .collect();
        let evidence = service.rerank(&example.question, retrieved, RERANK_K)?;
        let answer = service.generate(&example.question, &evidence);

        let recall = calculate_recall(&retrieved_ids, &example.gold_sources);
        let mrr = calculate_mrr(&retrieved_ids, &example.gold_sources);
        tracing::info!(
            id = example.id.as_deref().unwrap_or("-"),
            recall,
            mrr,
            "evaluated"
        );

        total_recall += recall;
        total_mrr += mrr;
        details.push(EvalEntry {
            id: example.id.clone(),
            question: example.question.clone(),
            answer,
            metrics: QueryMetrics { recall_at_10: recall, mrr },
        });
    }

    let summary = if details.is_empty() {
        EvalSummary::default()
    } else {
        let n = details.len() as f64;
        EvalSummary {
            avg_recall_at_10: total_recall / n,
            avg_mrr: total_mrr / n,
            examples: details.len(),
        }
    };

    fs::create_dir_all(report_dir)?;
    let report = EvalReport { summary: summary.clone(), details };
    fs::write(
        report_dir.join("eval_report.json"),
        serde_json::to_string_pretty(&report)?,
    )?;
    fs::write(report_dir.join("eval_report.md"), markdown_summary(&report.summary))?;

    Ok(summary)
}

fn markdown_summary(summary: &EvalSummary) -> String {
    format!(
        "# Evaluation Report\n\n## Summary\n\
         - **examples**: {}\n\
         - **avg_recall@10**: {:.4}\n\
         - **avg_mrr**: {:.4}\n",
        summary.examples, summary.avg_recall_at_10, summary.avg_mrr
    )
}
