//! Fuzz target for the filter compiler.
//!
//! Filters come straight from callers. Any JSON value must either compile
//! or be rejected with an error, and a compiled predicate must carry exactly
//! one parameter per placeholder.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relvec_core::FilterCompiler;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let compiler = FilterCompiler::new("VEC_META", ["author", "year"]);
    if let Ok(predicate) = compiler.compile_json(&value) {
        assert_eq!(
            predicate.sql().matches('?').count(),
            predicate.params().len(),
            "placeholder/parameter mismatch for {value}"
        );
    }
});
