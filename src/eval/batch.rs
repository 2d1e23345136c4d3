use serde::Serialize;
use tracing::info;

use super::Evaluator;
use super::cases::TestCases;
use crate::embed::ModelConfig;
use crate::embed::cache::EmbeddingCache;
use crate::error::Result;
use crate::metric::Metric;

/// Model and metric used when the test-case document does not name them.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub model: ModelConfig,
    pub metric: Metric,
}

/// One evaluated (model, case, comparator, metric) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub model: String,
    pub metric: Metric,
    pub case: String,
    /// The term a text was compared with; `None` for direct pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,
    pub score: f64,
    pub percent: String,
}

/// A report field. Comparand names and terms are quoted when written.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Plain(String),
    Quoted(String),
}

impl Cell {
    pub fn text(&self) -> &str {
        match self {
            Cell::Plain(s) | Cell::Quoted(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Every score in evaluation order.
    pub results: Vec<MetricResult>,
}

/// Render a score as an integer percentage.
///
/// The score is rounded to two decimals first and the percentage is rounded
/// again, so `0.994` becomes `"99%"` and `0.996` becomes `"100%"`. The first
/// rounding works on the exact binary value, so `0.015` (stored just below
/// the tie) becomes `"1%"`.
pub fn format_percent(score: f64) -> String {
    format!("{}%", (round_two_places(score) * 100.0).round() as i64)
}

/// Round to two decimals on the exact binary value, ties away from zero.
fn round_two_places(score: f64) -> f64 {
    // Only odd multiples of 1/8 lie exactly halfway between two hundredths.
    let eighths = score * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        return (score.abs() * 100.0).ceil().copysign(score) / 100.0;
    }
    // `{:.2}` rounds the exact value; it only disagrees on ties (half-even).
    format!("{score:.2}").parse().unwrap_or(score)
}

/// Walks a test-case document in a fixed order and scores every cell.
pub struct BatchRunner<'a> {
    evaluator: Evaluator<'a>,
    defaults: Defaults,
}

impl<'a> BatchRunner<'a> {
    pub fn new(cache: &'a mut EmbeddingCache, defaults: Defaults) -> Self {
        Self {
            evaluator: Evaluator::new(cache),
            defaults,
        }
    }

    /// Score every cell of `cases`. The first failure aborts the run.
    pub fn run(&mut self, cases: &TestCases) -> Result<Report> {
        match cases {
            TestCases::TermList {
                terms,
                texts,
                model,
                metric,
            } => {
                let model = model.as_ref().unwrap_or(&self.defaults.model).clone();
                let metric = metric.unwrap_or(self.defaults.metric);
                let mut report = Report {
                    header: ["model", "evaluation", "text-abbreviation", "term", "score"]
                        .map(String::from)
                        .to_vec(),
                    ..Default::default()
                };
                let description = model.to_string();
                for text in texts {
                    for term in terms {
                        let score = self.evaluator.compare(&text.text, term, &model, metric)?;
                        let percent = format_percent(score);
                        info!("[{}] {metric} with [{term}] = {percent}", text.name);
                        report.rows.push(vec![
                            Cell::Plain(description.clone()),
                            Cell::Plain(metric.to_string()),
                            Cell::Quoted(text.name.clone()),
                            Cell::Quoted(term.clone()),
                            Cell::Plain(percent.clone()),
                        ]);
                        report.results.push(MetricResult {
                            model: description.clone(),
                            metric,
                            case: text.name.clone(),
                            comparator: Some(term.clone()),
                            score,
                            percent,
                        });
                    }
                }
                Ok(report)
            }
            TestCases::ModelMatrix {
                models,
                metrics,
                cases,
            } => {
                let models = if models.is_empty() {
                    std::slice::from_ref(&self.defaults.model)
                } else {
                    models.as_slice()
                };
                let models = models.to_vec();
                let pairs: Vec<(&str, &str, &str)> = cases
                    .iter()
                    .map(|c| (c.name.as_str(), c.first.as_str(), c.second.as_str()))
                    .collect();
                self.run_pairs(&models, metrics, &pairs)
            }
            TestCases::DirectPair {
                first,
                second,
                name,
                model,
                metric,
            } => {
                let model = model.as_ref().unwrap_or(&self.defaults.model).clone();
                let metric = metric.unwrap_or(self.defaults.metric);
                let name = name.as_deref().unwrap_or("direct");
                self.run_pairs(&[model], &[metric], &[(name, first.as_str(), second.as_str())])
            }
        }
    }

    /// One row per (model, pair), one score column per metric.
    fn run_pairs(
        &mut self,
        models: &[ModelConfig],
        metrics: &[Metric],
        pairs: &[(&str, &str, &str)],
    ) -> Result<Report> {
        let mut header = vec!["model".to_string(), "test-case".to_string()];
        header.extend(metrics.iter().map(|m| m.to_string()));
        let mut report = Report {
            header,
            ..Default::default()
        };

        for model in models {
            let description = model.to_string();
            for &(name, first, second) in pairs {
                let mut row = vec![
                    Cell::Plain(description.clone()),
                    Cell::Quoted(name.to_string()),
                ];
                for &metric in metrics {
                    let score = self.evaluator.compare(first, second, model, metric)?;
                    let percent = format_percent(score);
                    info!("[{description}] [{name}] {metric} = {percent}");
                    row.push(Cell::Plain(percent.clone()));
                    report.results.push(MetricResult {
                        model: description.clone(),
                        metric,
                        case: name.to_string(),
                        comparator: None,
                        score,
                        percent,
                    });
                }
                report.rows.push(row);
            }
        }
        Ok(report)
    }
}
