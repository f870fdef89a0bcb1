//! Builder methods for creating filters from Rust code.

use serde_json::Value;

use super::{stringify, Clause, CompareOp, Comparator, Condition, Filter, Literal, LogicalOp, Operand};
use crate::error::{Error, Result};
use crate::sanitize::is_identifier;

impl Filter {
    /// Creates a single-field filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `field` is not a valid identifier.
    pub fn field(field: impl Into<String>, condition: Condition) -> Result<Self> {
        let field = field.into();
        if !is_identifier(&field) {
            return Err(Error::invalid(format!("invalid filter field '{field}'")));
        }
        Ok(Self {
            clauses: vec![Clause::Field { field, condition }],
        })
    }

    /// Creates an `and` over the given filters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `operands` is empty.
    pub fn all(operands: Vec<Filter>) -> Result<Self> {
        Self::logical(LogicalOp::And, operands)
    }

    /// Creates an `or` over the given filters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `operands` is empty.
    pub fn any(operands: Vec<Filter>) -> Result<Self> {
        Self::logical(LogicalOp::Or, operands)
    }

    fn logical(op: LogicalOp, operands: Vec<Filter>) -> Result<Self> {
        if operands.is_empty() {
            return Err(Error::invalid(format!(
                "'{}' expects at least one filter",
                op.keyword().to_ascii_lowercase()
            )));
        }
        Ok(Self {
            clauses: vec![Clause::Logical { op, operands }],
        })
    }

    /// Appends the clauses of `other` as siblings (joined with `AND`).
    #[must_use]
    pub fn with(mut self, other: Filter) -> Self {
        self.clauses.extend(other.clauses);
        self
    }
}

impl Condition {
    /// Bare integer equality.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    /// Bare string equality.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Literal(Literal::Text(value.into()))
    }

    /// Bare boolean equality.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::Literal(Literal::Bool(value))
    }

    fn compare(op: CompareOp, operand: impl Into<Operand>) -> Self {
        Self::Comparator(Comparator::Compare {
            op,
            operand: operand.into(),
        })
    }

    /// Creates an `eq` comparator.
    #[must_use]
    pub fn eq(operand: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Eq, operand)
    }

    /// Creates a `ne` comparator.
    #[must_use]
    pub fn ne(operand: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Ne, operand)
    }

    /// Creates a `lt` comparator.
    #[must_use]
    pub fn lt(operand: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Lt, operand)
    }

    /// Creates a `lte` comparator.
    #[must_use]
    pub fn lte(operand: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Lte, operand)
    }

    /// Creates a `gt` comparator.
    #[must_use]
    pub fn gt(operand: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Gt, operand)
    }

    /// Creates a `gte` comparator.
    #[must_use]
    pub fn gte(operand: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Gte, operand)
    }

    /// Creates a `between` comparator.
    #[must_use]
    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::Comparator(Comparator::Between {
            low: stringify(&low.into()),
            high: stringify(&high.into()),
        })
    }

    /// Creates a `like` comparator.
    #[must_use]
    pub fn like(pattern: impl Into<String>) -> Self {
        Self::Comparator(Comparator::Like(pattern.into()))
    }

    /// Creates an `in` comparator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `values` is empty.
    pub fn is_in(values: Vec<Value>) -> Result<Self> {
        membership(values).map(|v| Self::Comparator(Comparator::In(v)))
    }

    /// Creates a `nin` comparator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `values` is empty.
    pub fn not_in(values: Vec<Value>) -> Result<Self> {
        membership(values).map(|v| Self::Comparator(Comparator::NotIn(v)))
    }

    /// Creates a full-text `contains` comparator.
    #[must_use]
    pub fn contains(term: impl Into<String>) -> Self {
        Self::Comparator(Comparator::Contains(term.into()))
    }
}

fn membership(values: Vec<Value>) -> Result<Vec<String>> {
    if values.is_empty() {
        return Err(Error::invalid("membership test expects a non-empty list"));
    }
    Ok(values.iter().map(stringify).collect())
}

impl Operand {
    /// A date operand, compared with `CAST(? AS DATE)`.
    #[must_use]
    pub fn date(date: impl Into<String>) -> Self {
        Self::Date(date.into())
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
