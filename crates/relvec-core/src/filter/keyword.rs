//! Detection of metadata fields that need projecting for full-text search.

use indexmap::IndexSet;

use super::{Clause, Comparator, Condition, Filter};

/// Collects the fields used with `contains` that live inside the metadata
/// blob.
///
/// The content column and promoted fields are already physical columns and
/// are skipped. Names are returned once each, in first-seen order.
#[must_use]
pub fn keyword_columns(
    filter: &Filter,
    content_column: &str,
    is_promoted: impl Fn(&str) -> bool,
) -> IndexSet<String> {
    let mut found = IndexSet::new();
    collect(filter, content_column, &is_promoted, &mut found);
    found
}

fn collect(
    filter: &Filter,
    content_column: &str,
    is_promoted: &dyn Fn(&str) -> bool,
    found: &mut IndexSet<String>,
) {
    for clause in &filter.clauses {
        match clause {
            Clause::Logical { operands, .. } => {
                for operand in operands {
                    collect(operand, content_column, is_promoted, found);
                }
            }
            Clause::Field {
                field,
                condition: Condition::Comparator(Comparator::Contains(_)),
            } => {
                if field != content_column && !is_promoted(field) {
                    found.insert(field.clone());
                }
            }
            Clause::Field { .. } => {}
        }
    }
}
