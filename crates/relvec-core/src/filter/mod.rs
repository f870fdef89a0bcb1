//! Metadata filtering for vector search.
//!
//! Filters arrive as JSON objects and are parsed once into a [`Filter`]
//! tree; the compiler and the keyword analyzer then walk the typed tree.
//!
//! ## Grammar
//!
//! ```text
//! filter     := { clause, ... }                       (keys in document order)
//! clause     := "and" | "or" : [filter, ...]          (at least one operand)
//!             | field : literal | { comparator: value }
//! comparator := eq ne lt lte gt gte in nin between like contains
//! ```
//!
//! Logical and comparator tags may also be written with a `$` prefix.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relvec_core::filter::{Filter, FilterCompiler};
//! use serde_json::json;
//!
//! let filter = Filter::parse(&json!({"and": [{"year": {"gte": 2020}}, {"lang": "en"}]}))?;
//! let predicate = FilterCompiler::new("VEC_META", ["lang"]).compile(&filter);
//! ```

mod builders;
mod compile;
mod keyword;
mod parse;

pub use compile::{json_accessor, FilterCompiler};
pub use keyword::keyword_columns;
pub use parse::MAX_FILTER_DEPTH;

use serde::Deserialize;
use serde_json::Value;

/// A parsed filter expression.
///
/// Clauses keep the key order of the JSON object they came from and are
/// combined with `AND`. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Filter {
    /// Clauses of this node, in key order.
    pub clauses: Vec<Clause>,
}

impl Filter {
    /// Returns true if the filter has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// One key of a filter object.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `and` / `or` over nested filters.
    Logical {
        /// Logical connective.
        op: LogicalOp,
        /// Nested filters, never empty.
        operands: Vec<Filter>,
    },
    /// A condition on one metadata field.
    Field {
        /// Field name, a valid identifier.
        field: String,
        /// Condition the field must satisfy.
        condition: Condition,
    },
}

/// Logical connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// All operands hold.
    And,
    /// Any operand holds.
    Or,
}

impl LogicalOp {
    /// SQL keyword for this connective.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Condition attached to a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Bare value, compared for equality.
    Literal(Literal),
    /// Single-tag comparator object.
    Comparator(Comparator),
}

/// Bare literal value.
///
/// Only integers are accepted among numbers: implicit equality on floats
/// is refused at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Integer, bound as its decimal string.
    Integer(i64),
    /// String, bound as-is.
    Text(String),
    /// Boolean, bound as `"true"` / `"false"`.
    Bool(bool),
}

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// Right-hand side of a binary comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// String value, bound as-is.
    Text(String),
    /// Number, compared as a float.
    Number(f64),
    /// Boolean, bound as `"true"` / `"false"`.
    Bool(bool),
    /// `{"type": "date", "date": "..."}`, compared as a date.
    Date(String),
    /// Any other JSON value, bound as its JSON text.
    Json(Value),
}

/// Comparator object, exactly one tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparator {
    /// `eq ne lt lte gt gte`
    Compare {
        /// Operator.
        op: CompareOp,
        /// Right-hand side.
        operand: Operand,
    },
    /// Inclusive range, bounds stringified.
    Between {
        /// Lower bound.
        low: String,
        /// Upper bound.
        high: String,
    },
    /// SQL `LIKE` pattern.
    Like(String),
    /// Membership, elements stringified.
    In(Vec<String>),
    /// Non-membership, elements stringified.
    NotIn(Vec<String>),
    /// Full-text search term.
    Contains(String),
}

/// Renders a JSON value the way filter parameters are bound: strings
/// verbatim, everything else as JSON text.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
