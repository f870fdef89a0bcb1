//! Filter to SQL predicate compilation.

use indexmap::IndexSet;
use serde_json::Value;

use super::{Clause, Comparator, Condition, Filter, Literal, Operand};
use crate::connection::SqlValue;
use crate::error::Result;
use crate::fragment::SqlFragment;

/// Compiles [`Filter`] trees into parameterized predicates.
///
/// Promoted fields are addressed as quoted columns, all other fields through
/// `JSON_VALUE` on the metadata column.
#[derive(Debug, Clone)]
pub struct FilterCompiler {
    metadata_column: String,
    promoted: IndexSet<String>,
}

impl FilterCompiler {
    /// Creates a compiler for the given metadata column and promoted fields.
    ///
    /// Names are used verbatim; callers pass sanitized identifiers.
    pub fn new<I, S>(metadata_column: impl Into<String>, promoted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metadata_column: metadata_column.into(),
            promoted: promoted.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `field` is materialized as its own column.
    #[must_use]
    pub fn is_promoted(&self, field: &str) -> bool {
        self.promoted.contains(field)
    }

    /// Parses and compiles a JSON filter.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Filter::parse`].
    pub fn compile_json(&self, value: &Value) -> Result<SqlFragment> {
        Ok(self.compile(&Filter::parse(value)?))
    }

    /// Compiles a parsed filter. The empty filter yields an empty fragment.
    #[must_use]
    pub fn compile(&self, filter: &Filter) -> SqlFragment {
        let has_siblings = filter.clauses.len() > 1;
        SqlFragment::join(
            filter.clauses.iter().map(|clause| {
                let frag = self.compile_clause(clause);
                // An OR next to siblings would otherwise bind looser than the AND joining them
                if has_siblings && matches!(clause, Clause::Logical { .. }) && !frag.is_empty() {
                    let mut wrapped = SqlFragment::new();
                    wrapped.push_sql("(").append(frag).push_sql(")");
                    wrapped
                } else {
                    frag
                }
            }),
            " AND ",
            false,
        )
    }

    fn compile_clause(&self, clause: &Clause) -> SqlFragment {
        match clause {
            Clause::Logical { op, operands } => SqlFragment::join(
                operands.iter().map(|operand| self.compile(operand)),
                &format!(" {} ", op.keyword()),
                true,
            ),
            Clause::Field { field, condition } => self.compile_condition(field, condition),
        }
    }

    /// Left-hand side expression for a field.
    #[must_use]
    pub fn accessor(&self, field: &str) -> String {
        if self.is_promoted(field) {
            format!("\"{field}\"")
        } else {
            json_accessor(&self.metadata_column, field)
        }
    }

    fn compile_condition(&self, field: &str, condition: &Condition) -> SqlFragment {
        let mut frag = SqlFragment::new();
        let comparator = match condition {
            Condition::Literal(literal) => {
                let value = match literal {
                    Literal::Integer(i) => i.to_string(),
                    Literal::Text(s) => s.clone(),
                    Literal::Bool(b) => b.to_string(),
                };
                frag.push_sql(&self.accessor(field)).push_sql(" = ").push_bind(value);
                return frag;
            }
            Condition::Comparator(comparator) => comparator,
        };

        let accessor = self.accessor(field);
        match comparator {
            Comparator::Contains(term) => {
                frag.push_sql("SCORE(")
                    .push_bind(term.as_str())
                    .push_sql(&format!(" IN (\"{field}\" EXACT SEARCH MODE 'text')) > 0"));
            }
            Comparator::Compare { op, operand } => {
                frag.push_sql(&accessor)
                    .push_sql(" ")
                    .push_sql(op.symbol())
                    .push_sql(" ");
                match operand {
                    Operand::Text(s) => {
                        frag.push_bind(s.as_str());
                    }
                    Operand::Bool(b) => {
                        frag.push_bind(b.to_string());
                    }
                    Operand::Number(n) => {
                        frag.push_sql("CAST(").push_bind(*n).push_sql(" AS FLOAT)");
                    }
                    Operand::Date(d) => {
                        frag.push_sql("CAST(").push_bind(d.as_str()).push_sql(" AS DATE)");
                    }
                    Operand::Json(v) => {
                        frag.push_bind(SqlValue::Text(v.to_string()));
                    }
                }
            }
            Comparator::Between { low, high } => {
                frag.push_sql(&accessor)
                    .push_sql(" BETWEEN ")
                    .push_bind(low.as_str())
                    .push_sql(" AND ")
                    .push_bind(high.as_str());
            }
            Comparator::Like(pattern) => {
                frag.push_sql(&accessor).push_sql(" LIKE ").push_bind(pattern.as_str());
            }
            Comparator::In(values) => {
                frag.push_sql(&accessor)
                    .push_sql(" IN (")
                    .push_bind_list(values.iter().map(String::as_str), ", ")
                    .push_sql(")");
            }
            Comparator::NotIn(values) => {
                frag.push_sql(&accessor)
                    .push_sql(" NOT IN (")
                    .push_bind_list(values.iter().map(String::as_str), ", ")
                    .push_sql(")");
            }
        }
        frag
    }
}

/// `JSON_VALUE("<column>", '$.<field>')`
#[must_use]
pub fn json_accessor(metadata_column: &str, field: &str) -> String {
    format!("JSON_VALUE(\"{metadata_column}\", '$.{field}')")
}
