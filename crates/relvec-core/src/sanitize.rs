//! Validation of primitive inputs before they reach statement text.
//!
//! Identifiers cannot be bound as parameters, so table, column and field
//! names are either stripped down to `[A-Za-z0-9_]` or rejected outright.

use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

/// Strips every character outside `[A-Za-z0-9_]`.
///
/// Never fails; the result may be empty.
#[must_use]
pub fn sanitize_identifier(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Returns true if `name` matches `^[A-Za-z_][A-Za-z0-9_]*$`.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Integer value of a JSON number, accepting integral floats such as `7.0`.
///
/// Returns `None` for fractional numbers and values outside the `i64` range.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn integral_value(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    // `i64::MAX as f64` rounds up to 2^63, hence the strict upper bound.
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Parses an integer from a JSON number or an integer string.
///
/// Integral floats (`7.0`) are accepted.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `value` is not an integer within
/// the `i64` range or is below `min`.
pub fn sanitize_int(value: &Value, min: i64) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => integral_value(n),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let parsed = parsed.ok_or_else(|| {
        Error::invalid(format!("value {value} must be an integer within the i64 range"))
    })?;
    if parsed < min {
        return Err(Error::invalid(format!(
            "value {parsed} must not be smaller than {min}"
        )));
    }
    Ok(parsed)
}

/// Converts a JSON array of numbers into a vector.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `value` is not an array or contains
/// anything but finite numbers.
pub fn sanitize_float_list(value: &Value) -> Result<Vec<f32>> {
    let Value::Array(items) = value else {
        return Err(Error::invalid(format!("expected a list of numbers, got {value}")));
    };
    items
        .iter()
        .map(|item| {
            item.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f as f32)
                .ok_or_else(|| Error::invalid(format!("list element {item} is not a number")))
        })
        .collect()
}

/// Rejects vectors containing NaN or infinite components.
///
/// Vector literals are rendered into statement text, where such values have
/// no valid spelling.
pub fn check_finite(vector: &[f32]) -> Result<()> {
    match vector.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(Error::invalid(format!(
            "vector component {i} is not a finite number"
        ))),
        None => Ok(()),
    }
}

/// Checks every key of a metadata object against the identifier pattern.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] naming the first offending key.
pub fn validate_metadata_keys(metadata: &Map<String, Value>) -> Result<()> {
    match metadata.keys().find(|key| !is_identifier(key)) {
        Some(key) => Err(Error::invalid(format!(
            "invalid metadata key '{key}': keys must match [A-Za-z_][A-Za-z0-9_]*"
        ))),
        None => Ok(()),
    }
}
