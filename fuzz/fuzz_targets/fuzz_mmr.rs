//! Fuzz target for MMR reranking.
//!
//! Arbitrary vectors (including zero, NaN and mismatched lengths) must never
//! panic, and a successful selection holds distinct, in-range indices.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use relvec_core::maximal_marginal_relevance;

#[derive(Debug, Arbitrary)]
struct Input {
    query: Vec<f32>,
    candidates: Vec<Vec<f32>>,
    lambda: f32,
    k: u8,
}

fuzz_target!(|input: Input| {
    let k = usize::from(input.k);
    if let Ok(picked) =
        maximal_marginal_relevance(&input.query, &input.candidates, input.lambda, k)
    {
        assert!(picked.len() <= k.min(input.candidates.len()));
        let mut seen = picked.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), picked.len());
        assert!(picked.iter().all(|&i| i < input.candidates.len()));
    }
});
