//! SQL text paired with its positional parameters.

use crate::connection::SqlValue;

/// A piece of statement text together with the values for its `?`
/// placeholders, in order.
///
/// Placeholders only enter the text through [`push_bind`](Self::push_bind)
/// and [`append`](Self::append), so the number of `?` in the text always
/// equals the number of parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlFragment {
    /// Creates an empty fragment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw statement text.
    ///
    /// The text must not contain `?`; parameters go through `push_bind`.
    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        debug_assert!(!sql.contains('?'), "raw SQL must not carry placeholders");
        self.sql.push_str(sql);
        self
    }

    /// Appends a `?` placeholder bound to `value`.
    pub fn push_bind(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.sql.push('?');
        self.params.push(value.into());
        self
    }

    /// Appends one placeholder per value, separated by `separator`.
    pub fn push_bind_list<I>(&mut self, values: I, separator: &str) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<SqlValue>,
    {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.push_sql(separator);
            }
            self.push_bind(value);
        }
        self
    }

    /// Appends another fragment, text and parameters together.
    pub fn append(&mut self, other: SqlFragment) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
        self
    }

    /// Joins non-empty fragments with `separator`, wrapping each in
    /// parentheses when `parenthesize` is set.
    #[must_use]
    pub fn join<I>(parts: I, separator: &str, parenthesize: bool) -> Self
    where
        I: IntoIterator<Item = SqlFragment>,
    {
        let mut joined = Self::new();
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            if !joined.is_empty() {
                joined.push_sql(separator);
            }
            if parenthesize {
                joined.push_sql("(").append(part).push_sql(")");
            } else {
                joined.append(part);
            }
        }
        joined
    }

    /// Returns true if no text has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// The statement text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameters, in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Splits the fragment into text and parameters.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_bind_keeps_alignment() {
        let mut frag = SqlFragment::new();
        frag.push_sql("a = ").push_bind("x").push_sql(" AND b IN (");
        frag.push_bind_list(["1", "2"], ", ").push_sql(")");

        assert_eq!(frag.sql(), "a = ? AND b IN (?, ?)");
        assert_eq!(frag.params().len(), 3);
    }

    #[test]
    fn test_join_skips_empty_parts() {
        let mut a = SqlFragment::new();
        a.push_sql("x = ").push_bind("1");
        let mut b = SqlFragment::new();
        b.push_sql("y = ").push_bind("2");

        let joined = SqlFragment::join([a, SqlFragment::new(), b], " OR ", true);

        assert_eq!(joined.sql(), "(x = ?) OR (y = ?)");
        assert_eq!(
            joined.params(),
            &[SqlValue::from("1"), SqlValue::from("2")]
        );
    }

    #[test]
    fn test_join_of_nothing_is_empty() {
        let joined = SqlFragment::join(Vec::new(), " AND ", false);
        assert!(joined.is_empty());
        assert!(joined.params().is_empty());
    }
}
