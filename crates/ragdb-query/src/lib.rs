//! Query-time pipeline: vector retrieval, cross-encoder reranking, and
//! grounded answer generation over the retrieved evidence.

pub mod generate;
pub mod rerank;
pub mod retrieve;
pub mod service;

pub use generate::{format_context, Generator};
pub use rerank::{reranker_from_config, Reranker};
pub use retrieve::Retriever;
pub use service::{Answer, QueryService, ServiceHandle};
