//! JSON to [`Filter`] conversion.

use serde_json::{Map, Value};

use super::{stringify, Clause, CompareOp, Comparator, Condition, Filter, Literal, LogicalOp, Operand};
use crate::error::{Error, Result};
use crate::sanitize::{integral_value, is_identifier};

/// Maximum nesting depth of logical operators.
pub const MAX_FILTER_DEPTH: usize = 64;

impl Filter {
    /// Parses a JSON filter expression.
    ///
    /// `null` and `{}` both yield the empty filter.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for malformed shapes, wrong arity or
    ///   value types, invalid field names and excessive nesting.
    /// - [`Error::UnsupportedOperator`] for unknown comparator tags and
    ///   unknown `$`-prefixed logical tags.
    pub fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => parse_object(map, 0),
            other => Err(Error::invalid(format!(
                "filter must be an object, got {other}"
            ))),
        }
    }
}

impl TryFrom<Value> for Filter {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::parse(&value)
    }
}

impl TryFrom<&Value> for Filter {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        Self::parse(value)
    }
}

fn strip_tag(key: &str) -> &str {
    key.strip_prefix('$').unwrap_or(key)
}

fn parse_object(map: &Map<String, Value>, depth: usize) -> Result<Filter> {
    if depth > MAX_FILTER_DEPTH {
        return Err(Error::invalid(format!(
            "filter nesting exceeds {MAX_FILTER_DEPTH} levels"
        )));
    }
    let clauses = map
        .iter()
        .map(|(key, value)| match strip_tag(key) {
            "and" => parse_logical(LogicalOp::And, key, value, depth),
            "or" => parse_logical(LogicalOp::Or, key, value, depth),
            _ if key.starts_with('$') => Err(Error::UnsupportedOperator(format!(
                "logical operator '{key}'"
            ))),
            _ => parse_field(key, value),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Filter { clauses })
}

fn parse_logical(op: LogicalOp, key: &str, value: &Value, depth: usize) -> Result<Clause> {
    let Value::Array(items) = value else {
        return Err(Error::invalid(format!("'{key}' expects a list of filters")));
    };
    if items.is_empty() {
        return Err(Error::invalid(format!("'{key}' expects at least one filter")));
    }
    let operands = items
        .iter()
        .map(|item| match item {
            Value::Object(map) => parse_object(map, depth + 1),
            other => Err(Error::invalid(format!(
                "operands of '{key}' must be objects, got {other}"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Clause::Logical { op, operands })
}

fn parse_field(field: &str, value: &Value) -> Result<Clause> {
    if !is_identifier(field) {
        return Err(Error::invalid(format!(
            "invalid filter field '{field}': names must match [A-Za-z_][A-Za-z0-9_]*"
        )));
    }
    let condition = match value {
        Value::Object(map) => Condition::Comparator(parse_comparator(field, map)?),
        literal => Condition::Literal(parse_literal(field, literal)?),
    };
    Ok(Clause::Field {
        field: field.to_string(),
        condition,
    })
}

fn parse_literal(field: &str, value: &Value) -> Result<Literal> {
    match value {
        Value::String(s) => Ok(Literal::Text(s.clone())),
        Value::Bool(b) => Ok(Literal::Bool(*b)),
        Value::Number(n) => integral_value(n).map(Literal::Integer).ok_or_else(|| {
            Error::invalid(format!(
                "filter value {n} for '{field}' is not an integer within the i64 range; \
                 use a comparator for other numbers"
            ))
        }),
        other => Err(Error::invalid(format!(
            "unsupported filter value {other} for '{field}'"
        ))),
    }
}

fn parse_comparator(field: &str, map: &Map<String, Value>) -> Result<Comparator> {
    let mut entries = map.iter();
    let (Some((tag, value)), None) = (entries.next(), entries.next()) else {
        return Err(Error::invalid(format!(
            "comparator for '{field}' must have exactly one operator, got {}",
            map.len()
        )));
    };

    let compare = |op| parse_operand(field, tag, value).map(|operand| Comparator::Compare { op, operand });

    match strip_tag(tag) {
        "eq" => compare(CompareOp::Eq),
        "ne" => compare(CompareOp::Ne),
        "lt" => compare(CompareOp::Lt),
        "lte" => compare(CompareOp::Lte),
        "gt" => compare(CompareOp::Gt),
        "gte" => compare(CompareOp::Gte),
        "between" => match value {
            Value::Array(pair) if pair.len() == 2 => Ok(Comparator::Between {
                low: stringify(&pair[0]),
                high: stringify(&pair[1]),
            }),
            other => Err(Error::invalid(format!(
                "'{tag}' on '{field}' expects a list of two values, got {other}"
            ))),
        },
        "like" => match value {
            Value::Null => Err(missing(field, tag)),
            other => Ok(Comparator::Like(stringify(other))),
        },
        "in" | "nin" => {
            let Value::Array(items) = value else {
                return Err(Error::invalid(format!(
                    "'{tag}' on '{field}' expects a list, got {value}"
                )));
            };
            if items.is_empty() {
                return Err(Error::invalid(format!(
                    "'{tag}' on '{field}' expects a non-empty list"
                )));
            }
            let values = items.iter().map(stringify).collect();
            if strip_tag(tag) == "in" {
                Ok(Comparator::In(values))
            } else {
                Ok(Comparator::NotIn(values))
            }
        }
        "contains" => match value {
            Value::Null => Err(missing(field, tag)),
            Value::Array(_) | Value::Object(_) => Err(Error::invalid(format!(
                "'{tag}' on '{field}' expects a single search term"
            ))),
            term => Ok(Comparator::Contains(stringify(term))),
        },
        _ => Err(Error::UnsupportedOperator(format!(
            "'{tag}' on field '{field}'"
        ))),
    }
}

fn parse_operand(field: &str, tag: &str, value: &Value) -> Result<Operand> {
    match value {
        Value::Null => Err(missing(field, tag)),
        Value::Bool(b) => Ok(Operand::Bool(*b)),
        Value::String(s) => Ok(Operand::Text(s.clone())),
        Value::Number(n) => n
            .as_f64()
            .map(Operand::Number)
            .ok_or_else(|| Error::invalid(format!("number {n} on '{field}' is out of range"))),
        Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("date") => {
            match obj.get("date") {
                Some(Value::String(date)) => Ok(Operand::Date(date.clone())),
                _ => Err(Error::invalid(format!(
                    "date value for '{field}' needs a string 'date' entry"
                ))),
            }
        }
        other => Ok(Operand::Json(other.clone())),
    }
}

fn missing(field: &str, tag: &str) -> Error {
    Error::invalid(format!("'{tag}' on '{field}' requires a value"))
}
