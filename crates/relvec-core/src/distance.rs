//! Distance strategies supported by the store.
//!
//! The store computes distances itself; this module knows which SQL function
//! to call and in which direction to sort. The client-side
//! [`cosine_similarity`] is only used for MMR reranking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Distance strategy for vector similarity calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceStrategy {
    /// Cosine similarity. Higher is better.
    #[default]
    Cosine,

    /// Euclidean (L2) distance. Lower is better.
    Euclidean,
}

impl DistanceStrategy {
    /// Name of the store function computing this metric.
    #[must_use]
    pub const fn sql_function(&self) -> &'static str {
        match self {
            Self::Cosine => "COSINE_SIMILARITY",
            Self::Euclidean => "L2DISTANCE",
        }
    }

    /// Returns whether higher values indicate more similarity.
    #[must_use]
    pub const fn higher_is_better(&self) -> bool {
        match self {
            Self::Cosine => true,
            Self::Euclidean => false,
        }
    }

    /// Sort direction that puts the best matches first.
    #[must_use]
    pub const fn order(&self) -> &'static str {
        if self.higher_is_better() {
            "DESC"
        } else {
            "ASC"
        }
    }
}

impl fmt::Display for DistanceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => f.write_str("cosine"),
            Self::Euclidean => f.write_str("euclidean"),
        }
    }
}

impl FromStr for DistanceStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" | "cosine_similarity" => Ok(Self::Cosine),
            "euclidean" | "euclidean_distance" | "l2" => Ok(Self::Euclidean),
            other => Err(Error::Configuration(format!(
                "unsupported distance strategy '{other}', expected one of: cosine, euclidean"
            ))),
        }
    }
}

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when either vector has zero norm. Extra components of the
/// longer vector are ignored.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
