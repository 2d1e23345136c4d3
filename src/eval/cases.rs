use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::embed::ModelConfig;
use crate::metric::Metric;

/// A named text compared against every term of a [`TestCases::TermList`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedText {
    pub name: String,
    pub text: String,
}

/// A named pair of texts compared directly with each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCase {
    pub name: String,
    pub first: String,
    pub second: String,
}

/// The test-case document, resolved to one shape at load time.
///
/// Variants are tried in order; each is distinguished by its required fields
/// (`terms`/`texts`, `cases`, `first`/`second`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestCases {
    /// Every text against every term, under one model and one metric.
    TermList {
        terms: Vec<String>,
        texts: Vec<NamedText>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<ModelConfig>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metric: Option<Metric>,
    },
    /// Every pair under every model and every metric.
    ModelMatrix {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        models: Vec<ModelConfig>,
        #[serde(default = "all_metrics")]
        metrics: Vec<Metric>,
        cases: Vec<PairCase>,
    },
    /// One pair, one model, one metric.
    DirectPair {
        first: String,
        second: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<ModelConfig>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metric: Option<Metric>,
    },
}

fn all_metrics() -> Vec<Metric> {
    Metric::ALL.to_vec()
}

impl TestCases {
    /// The document written on first run when no test-case file exists.
    pub fn example() -> Self {
        let terms = [
            "rat",
            "hat",
            "cat",
            "building",
            "construction worker",
            "president",
            "cheese",
            "Bjorn Borg",
            "kitchenette",
            "makeup",
        ];
        TestCases::TermList {
            terms: terms.iter().map(|t| t.to_string()).collect(),
            texts: vec![NamedText {
                name: "The rat in a hat".into(),
                text: "The rat in a hat".into(),
            }],
            model: None,
            metric: None,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            TestCases::TermList { .. } => "term-list",
            TestCases::ModelMatrix { .. } => "model-matrix",
            TestCases::DirectPair { .. } => "direct-pair",
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context(
            "test cases must have `terms` + `texts`, `cases`, or `first` + `second`",
        )
    }

    /// Read the document at `path`, writing [`TestCases::example`] there first
    /// if it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let example = Self::example();
            example.save(path)?;
            info!(path = %path.display(), "wrote example test cases");
            return Ok(example);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading test cases from {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("writing test cases to {}", path.display()))
    }
}
