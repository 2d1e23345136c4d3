use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EvalError, Result};

/// A similarity transform mapping two equal-length embeddings to a score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Euclidean,
    Manhattan,
    Cosine,
    NegativeInnerProduct,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Euclidean,
        Metric::Manhattan,
        Metric::Cosine,
        Metric::NegativeInnerProduct,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Manhattan => "manhattan",
            Metric::Cosine => "cosine",
            Metric::NegativeInnerProduct => "negative-inner-product",
        }
    }

    pub fn score(self, a: &[f32], b: &[f32]) -> Result<f64> {
        match self {
            Metric::Euclidean => euclidean_similarity(a, b),
            Metric::Manhattan => manhattan_similarity(a, b),
            Metric::Cosine => cosine_similarity(a, b),
            Metric::NegativeInnerProduct => inner_product_sigmoid(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EvalError::UnknownMetric(s.to_string()))
    }
}

fn check_dims(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(EvalError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum()
}

/// `exp(-‖a - b‖₂)`: 1.0 for identical vectors, decaying with L2 distance.
pub fn euclidean_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    check_dims(a, b)?;
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (*x as f64 - *y as f64).powi(2))
        .sum();
    Ok((-sum.sqrt()).exp())
}

/// `exp(-‖a - b‖₁)`.
pub fn manhattan_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    check_dims(a, b)?;
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (*x as f64 - *y as f64).abs())
        .sum();
    Ok((-sum).exp())
}

/// Cosine similarity rescaled from [-1, 1] to [0, 1] via `(cos + 1) / 2`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    check_dims(a, b)?;
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(EvalError::DegenerateVector);
    }
    // Rounding can push |cos| a hair past 1.
    let cosine = (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0);
    Ok((cosine + 1.0) / 2.0)
}

/// Logistic sigmoid of the inner product, `1 / (1 + exp(-(a·b)))`.
///
/// Equivalently the sigmoid of the *negated* negative inner product: a larger
/// inner product scores closer to 1, orthogonal vectors score exactly 0.5.
pub fn inner_product_sigmoid(a: &[f32], b: &[f32]) -> Result<f64> {
    check_dims(a, b)?;
    Ok(sigmoid(dot(a, b)))
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
