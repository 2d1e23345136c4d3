pub mod batch;
pub mod cases;

use crate::embed::ModelConfig;
use crate::embed::cache::EmbeddingCache;
use crate::error::Result;
use crate::metric::Metric;

/// Scores text pairs by resolving both embeddings through the cache.
pub struct Evaluator<'a> {
    cache: &'a mut EmbeddingCache,
}

impl<'a> Evaluator<'a> {
    pub fn new(cache: &'a mut EmbeddingCache) -> Self {
        Self { cache }
    }

    /// Embed `first` then `second` under `model` and apply `metric`.
    ///
    /// The score is returned as the metric produced it.
    pub fn compare(
        &mut self,
        first: &str,
        second: &str,
        model: &ModelConfig,
        metric: Metric,
    ) -> Result<f64> {
        let a = self.cache.get(model, first)?;
        let b = self.cache.get(model, second)?;
        metric.score(&a, &b)
    }

    pub fn cache(&self) -> &EmbeddingCache {
        self.cache
    }
}
