use std::env;
use std::path::{Path, PathBuf};

use ragdb_core::config::Config;
use ragdb_core::error::Error;
use ragdb_embed::embedder_from_config;
use ragdb_index::build_index;
use ragdb_ingest::Ingestor;
use ragdb_query::QueryService;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|build-index|query|ask|eval> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn snippet(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() > 160 {
        let cut: String = line.chars().take(160).collect();
        format!("{cut}…")
    } else {
        line
    }
}

fn open_service(config: &Config) -> anyhow::Result<QueryService> {
    match QueryService::open(config) {
        Ok(service) => Ok(service),
        Err(e) => {
            if let Some(Error::NotFound(_)) = e.downcast_ref::<Error>() {
                eprintln!("Index not found — run `ragdb ingest` and `ragdb build-index` first.");
                std::process::exit(1);
            }
            Err(e)
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let paths = config.paths();
    let (cmd, args) = parse_args();

    match cmd.as_str() {
        "ingest" => {
            let input = args
                .first()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(&paths.raw_dir));
            let output = PathBuf::from(&paths.processed_dir);
            println!("Ingesting from {}", input.display());
            let summary = Ingestor::new(config.chunking()).ingest(&input, &output)?;
            println!(
                "✅ Ingest complete ({} processed, {} skipped)",
                summary.processed, summary.skipped
            );
        }
        "build-index" => {
            let embedder = embedder_from_config(&config)?;
            let processed = PathBuf::from(&paths.processed_dir);
            let index_dir = PathBuf::from(&paths.index_dir);
            match build_index(&processed, &index_dir, embedder.as_ref()) {
                Ok(summary) => {
                    println!("✅ Index built ({} chunks, dim {})", summary.chunks, summary.dim)
                }
                Err(e) => match e.downcast_ref::<Error>() {
                    Some(Error::EmptyCorpus(_)) => {
                        println!("No chunks found under {}. Run ingest first.", processed.display())
                    }
                    _ => return Err(e),
                },
            }
        }
        "query" => {
            let query_text = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: ragdb query \"<query>\" [top_k]");
                std::process::exit(1)
            });
            let top_k = args
                .get(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(|| config.retrieve_top_k());
            let service = open_service(&config)?;
            let candidates = service.retrieve(&query_text, top_k)?;
            let results = service.rerank(&query_text, candidates, config.rerank_top_k())?;
            if results.is_empty() {
                println!("No matching chunks.");
            }
            for (i, result) in results.iter().enumerate() {
                println!(
                    "{:>2}. [{}] score={:.4}",
                    i + 1,
                    result.metadata.chunk_id,
                    result.ranking_score()
                );
                println!("    {}", snippet(&result.metadata.original_text));
            }
        }
        "ask" => {
            let query_text = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: ragdb ask \"<question>\"");
                std::process::exit(1)
            });
            let service = open_service(&config)?;
            let answer = service.answer(&query_text)?;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for source in &answer.sources {
                    println!(
                        "  [{}] score={:.4}",
                        source.metadata.chunk_id,
                        source.ranking_score()
                    );
                }
            }
        }
        "eval" => {
            let data_path = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: ragdb eval <dataset.jsonl> [report_dir]");
                std::process::exit(1)
            });
            let report_dir = args.get(1).cloned().unwrap_or_else(|| paths.report_dir.clone());
            let service = open_service(&config)?;
            let summary =
                ragdb_eval::run_eval(&service, Path::new(&data_path), Path::new(&report_dir))?;
            println!(
                "✅ Eval complete: avg_recall@10={:.4} avg_mrr={:.4} ({} examples)",
                summary.avg_recall_at_10, summary.avg_mrr, summary.examples
            );
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
