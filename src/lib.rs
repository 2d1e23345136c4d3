//! Semantic similarity scoring for text pairs.
//!
//! Embeddings come from an external provider through a write-through,
//! file-backed [`EmbeddingCache`]; pairs are scored under the metrics in
//! [`metric`] and collected into a [`Report`] by the [`BatchRunner`].

pub mod config;
pub mod embed;
pub mod error;
pub mod eval;
pub mod metric;
pub mod report;

pub use embed::cache::EmbeddingCache;
pub use embed::{Embedder, Embedding, ModelConfig};
pub use error::{EvalError, Result};
pub use eval::Evaluator;
pub use eval::batch::{BatchRunner, Defaults, MetricResult, Report, format_percent};
pub use eval::cases::TestCases;
pub use metric::Metric;
