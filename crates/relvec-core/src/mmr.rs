//! Maximal marginal relevance reranking.
//!
//! Greedy selection that trades relevance to the query against similarity
//! to what has already been picked:
//!
//! ```text
//! score(c) = lambda * sim(query, c) - (1 - lambda) * max(sim(c, s) for s in selected)
//! ```
//!
//! Both similarities are cosine, whatever distance the store ranks by.

use crate::distance::cosine_similarity;
use crate::error::{Error, Result};

/// Parameters of an MMR search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmrOptions {
    /// Number of results to return.
    pub k: usize,
    /// Size of the candidate pool fetched from the store.
    pub fetch_k: usize,
    /// 1 = pure relevance, 0 = maximal diversity.
    pub lambda: f32,
}

impl Default for MmrOptions {
    fn default() -> Self {
        Self {
            k: 4,
            fetch_k: 20,
            lambda: 0.5,
        }
    }
}

impl MmrOptions {
    /// Options returning `k` results with the default pool and lambda.
    #[must_use]
    pub fn with_k(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }
}

/// Selects up to `k` candidate indices in MMR order.
///
/// The first pick is the most relevant candidate. Ties keep pool order.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `lambda` is outside `[0, 1]`.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    lambda: f32,
    k: usize,
) -> Result<Vec<usize>> {
    if !(0.0..=1.0).contains(&lambda) {
        return Err(Error::invalid(format!(
            "lambda must be within [0, 1], got {lambda}"
        )));
    }
    let k = k.min(candidates.len());
    if k == 0 {
        return Ok(Vec::new());
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut selected = Vec::with_capacity(k);
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    // Highest similarity of each candidate to anything selected so far.
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];

    while selected.len() < k {
        let mut best: Option<(usize, f32)> = None;
        for (pos, &idx) in remaining.iter().enumerate() {
            let score = if selected.is_empty() {
                relevance[idx]
            } else {
                lambda * relevance[idx] - (1.0 - lambda) * redundancy[idx]
            };
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((pos, score));
            }
        }
        let Some((pos, _)) = best else { break };

        let picked = remaining.remove(pos);
        selected.push(picked);
        for &idx in &remaining {
            let sim = cosine_similarity(&candidates[picked], &candidates[idx]);
            if sim > redundancy[idx] {
                redundancy[idx] = sim;
            }
        }
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0],
            vec![0.99, 0.1],
            vec![0.0, 1.0],
            vec![0.7, 0.7],
        ]
    }

    fn by_relevance(query: &[f32], candidates: &[Vec<f32>]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|&a, &b| {
            cosine_similarity(query, &candidates[b])
                .partial_cmp(&cosine_similarity(query, &candidates[a]))
                .unwrap()
        });
        order
    }

    #[test]
    fn test_lambda_one_is_relevance_order() {
        // Arrange
        let query = [1.0, 0.2];
        let candidates = pool();

        // Act
        let picked = maximal_marginal_relevance(&query, &candidates, 1.0, 3).unwrap();

        // Assert
        assert_eq!(picked, by_relevance(&query, &candidates)[..3].to_vec());
    }

    #[test]
    fn test_diversity_skips_near_duplicate() {
        let picked = maximal_marginal_relevance(&[1.0, 0.0], &pool(), 0.3, 2).unwrap();
        assert_eq!(picked[0], 0);
        assert_ne!(picked[1], 1, "near duplicate of the first pick");
    }

    #[test]
    fn test_k_zero_and_empty_pool() {
        assert!(maximal_marginal_relevance(&[1.0], &pool(), 0.5, 0)
            .unwrap()
            .is_empty());
        assert!(maximal_marginal_relevance(&[1.0], &[], 0.5, 3)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_k_larger_than_pool_returns_whole_pool() {
        let mut picked = maximal_marginal_relevance(&[1.0, 0.0], &pool(), 0.5, 10).unwrap();
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_ties_keep_pool_order() {
        let candidates = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let picked = maximal_marginal_relevance(&[1.0, 0.0], &candidates, 1.0, 3).unwrap();
        assert_eq!(picked, vec![0, 1, 2]);
    }

    #[test]
    fn test_lambda_out_of_range() {
        for lambda in [-0.1, 1.1, f32::NAN] {
            assert!(matches!(
                maximal_marginal_relevance(&[1.0], &pool(), lambda, 1),
                Err(Error::InvalidArgument(_))
            ));
        }
    }
}
