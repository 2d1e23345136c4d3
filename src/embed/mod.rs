pub mod cache;
pub mod openai;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

pub type Embedding = Vec<f32>;

/// Identifies an embedding model plus the parameters that shape its output.
///
/// Two configurations are the same cache namespace iff every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: String,
    /// Requested output dimensionality, for models that support truncation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>, dimensions: Option<usize>) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }

    /// Namespace key in the persisted cache.
    ///
    /// Same shape as the report's `model[dims]` column, but brackets and
    /// backslashes inside the model name are escaped, so a model literally
    /// named `m[2]` never shares a namespace with `m` at 2 dimensions.
    pub fn key(&self) -> String {
        let mut key = String::with_capacity(self.model.len() + 8);
        for c in self.model.chars() {
            if matches!(c, '[' | ']' | '\\') {
                key.push('\\');
            }
            key.push(c);
        }
        if let Some(dims) = self.dimensions {
            key.push_str(&format!("[{dims}]"));
        }
        key
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dimensions {
            Some(dims) => write!(f, "{}[{dims}]", self.model),
            None => f.write_str(&self.model),
        }
    }
}

/// An external service that turns text into a vector under a model configuration.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str, model: &ModelConfig) -> Result<Embedding>;
    fn name(&self) -> &str;
}
