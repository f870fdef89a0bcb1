//! Statement assembly.
//!
//! [`QueryBuilder`] owns the sanitized table layout and turns embedding
//! expressions, filters and documents into [`Statement`]s. It performs no
//! I/O; the store executes what it builds.

use serde_json::{Map, Value};

use crate::config::{StoreConfig, VectorType};
use crate::connection::SqlValue;
use crate::distance::DistanceStrategy;
use crate::embedding::{format_vector, EmbeddingExpr, EmbeddingPurpose};
use crate::error::{Error, Result};
use crate::filter::{json_accessor, keyword_columns, Filter, FilterCompiler};
use crate::fragment::SqlFragment;
use crate::sanitize::{check_finite, sanitize_identifier, sanitize_int, validate_metadata_keys};

/// Alias of the projection stage used for keyword search on metadata.
const PROJECTION_ALIAS: &str = "intermediate_result";

/// Alias of the distance column in search statements.
const SCORE_ALIAS: &str = "CS";

/// Statement text and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<SqlValue>,
}

impl From<SqlFragment> for Statement {
    fn from(frag: SqlFragment) -> Self {
        let (sql, params) = frag.into_parts();
        Self { sql, params }
    }
}

/// A statement executed once per parameter row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatement {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// One parameter list per row.
    pub rows: Vec<Vec<SqlValue>>,
}

/// Source of the vectors written by an insert.
#[derive(Debug, Clone, Copy)]
pub enum InsertVectors<'a> {
    /// Client-computed vectors, one per document.
    Literal(&'a [Vec<f32>]),
    /// The database embeds each document with this model.
    Delegated {
        /// Database-side model identifier.
        model_id: &'a str,
    },
}

/// Builds search, insert and delete statements for one table.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    content_column: String,
    metadata_column: String,
    vector_column: String,
    promoted: Vec<String>,
    distance: DistanceStrategy,
    vector_type: VectorType,
    vector_length: Option<usize>,
    compiler: FilterCompiler,
}

impl QueryBuilder {
    /// Creates a builder from a validated configuration.
    ///
    /// Table and column names are reduced to `[A-Za-z0-9_]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is invalid or a
    /// name sanitizes to nothing.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let distance = config.distance_strategy()?;

        let name = |key: &str, raw: &str| {
            let clean = sanitize_identifier(raw);
            if clean.is_empty() {
                Err(Error::Configuration(format!(
                    "'{key}' = '{raw}' is not a usable identifier"
                )))
            } else {
                Ok(clean)
            }
        };
        let metadata_column = name("table.metadata_column", &config.table.metadata_column)?;
        let promoted = config.table.promoted_columns.clone();

        Ok(Self {
            table: name("table.name", &config.table.name)?,
            content_column: name("table.content_column", &config.table.content_column)?,
            vector_column: name("table.vector_column", &config.table.vector_column)?,
            compiler: FilterCompiler::new(metadata_column.clone(), promoted.iter().cloned()),
            metadata_column,
            promoted,
            distance,
            vector_type: config.vector.vector_type,
            vector_length: config.vector.length,
        })
    }

    /// Configured distance strategy.
    #[must_use]
    pub fn distance(&self) -> DistanceStrategy {
        self.distance
    }

    /// Sanitized table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The filter compiler bound to this table's metadata layout.
    #[must_use]
    pub fn compiler(&self) -> &FilterCompiler {
        &self.compiler
    }

    /// Checks a vector against the configured dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] on a length mismatch.
    pub fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        match self.vector_length {
            Some(expected) if expected != vector.len() => Err(Error::invalid(format!(
                "vector dimension mismatch: expected {expected}, got {}",
                vector.len()
            ))),
            _ => Ok(()),
        }
    }

    /// Builds a top-`k` similarity search.
    ///
    /// Parameters of the embedding expression come first, then those of
    /// the predicate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for malformed literal vectors.
    pub fn build_search(
        &self,
        embedding: &EmbeddingExpr,
        k: usize,
        filter: &Filter,
    ) -> Result<Statement> {
        if let EmbeddingExpr::Literal(vector) = embedding {
            self.check_dimension(vector)?;
        }

        let projected = keyword_columns(filter, &self.content_column, |f| {
            self.compiler.is_promoted(f)
        });

        let mut stmt = SqlFragment::new();
        let source = if projected.is_empty() {
            format!("\"{}\"", self.table)
        } else {
            let columns: Vec<String> = projected
                .iter()
                .map(|f| format!("{} AS \"{f}\"", json_accessor(&self.metadata_column, f)))
                .collect();
            stmt.push_sql(&format!(
                "WITH {PROJECTION_ALIAS} AS (SELECT *, {} FROM \"{}\") ",
                columns.join(", "),
                self.table
            ));
            format!("{PROJECTION_ALIAS} AS \"{}\"", self.table)
        };

        stmt.push_sql(&format!(
            "SELECT TOP {k} \"{}\", \"{}\", TO_NVARCHAR(\"{}\"), {}(\"{}\", ",
            self.content_column,
            self.metadata_column,
            self.vector_column,
            self.distance.sql_function(),
            self.vector_column,
        ))
        .append(embedding.to_fragment(self.vector_type)?)
        .push_sql(&format!(") AS {SCORE_ALIAS} FROM {source}"));

        let predicate = self.compiler.compile(filter);
        if !predicate.is_empty() {
            stmt.push_sql(" WHERE ").append(predicate);
        }
        stmt.push_sql(&format!(" ORDER BY {SCORE_ALIAS} {}", self.distance.order()));

        Ok(stmt.into())
    }

    /// Like [`build_search`](Self::build_search), for untyped input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `k` is not a non-negative
    /// integer, plus the errors of [`Filter::parse`].
    pub fn build_search_untyped(
        &self,
        embedding: &EmbeddingExpr,
        k: &Value,
        filter: &Value,
    ) -> Result<Statement> {
        let k = usize::try_from(sanitize_int(k, 0)?)
            .map_err(|_| Error::invalid(format!("k = {k} is out of range")))?;
        self.build_search(embedding, k, &Filter::parse(filter)?)
    }

    /// Builds a batched insert of documents.
    ///
    /// Promoted fields are copied out of each metadata object into their own
    /// columns (`NULL` when absent); the metadata keeps them too.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when list lengths differ, a
    /// metadata key is invalid, or a vector has the wrong dimension or
    /// non-finite components. Nothing is built in that case.
    pub fn build_insert(
        &self,
        texts: &[String],
        metadatas: &[Map<String, Value>],
        vectors: InsertVectors<'_>,
    ) -> Result<BatchStatement> {
        if metadatas.len() != texts.len() {
            return Err(Error::invalid(format!(
                "got {} texts but {} metadata objects",
                texts.len(),
                metadatas.len()
            )));
        }
        if let InsertVectors::Literal(vectors) = vectors {
            if vectors.len() != texts.len() {
                return Err(Error::invalid(format!(
                    "got {} texts but {} vectors",
                    texts.len(),
                    vectors.len()
                )));
            }
            for vector in vectors {
                self.check_dimension(vector)?;
                check_finite(vector)?;
            }
        }
        for metadata in metadatas {
            validate_metadata_keys(metadata)?;
        }

        let mut columns = vec![
            format!("\"{}\"", self.content_column),
            format!("\"{}\"", self.metadata_column),
            format!("\"{}\"", self.vector_column),
        ];
        let mut placeholders = vec!["?".to_string(), "?".to_string()];
        placeholders.push(match vectors {
            InsertVectors::Literal(_) => format!("{}(?)", self.vector_type.conversion_function()),
            InsertVectors::Delegated { .. } => format!(
                "VECTOR_EMBEDDING(?, '{}', ?)",
                EmbeddingPurpose::Document.as_str()
            ),
        });
        for column in &self.promoted {
            columns.push(format!("\"{column}\""));
            placeholders.push("?".to_string());
        }
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );

        let rows = texts
            .iter()
            .zip(metadatas)
            .enumerate()
            .map(|(i, (text, metadata))| {
                let mut row = vec![
                    SqlValue::Text(text.clone()),
                    SqlValue::Text(Value::Object(metadata.clone()).to_string()),
                ];
                match vectors {
                    InsertVectors::Literal(vectors) => {
                        row.push(SqlValue::Text(format_vector(&vectors[i])));
                    }
                    InsertVectors::Delegated { model_id } => {
                        row.push(SqlValue::Text(text.clone()));
                        row.push(SqlValue::Text(model_id.to_string()));
                    }
                }
                row.extend(
                    self.promoted
                        .iter()
                        .map(|column| promoted_value(metadata.get(column))),
                );
                row
            })
            .collect();

        Ok(BatchStatement { sql, rows })
    }

    /// Builds a delete of every row matching `filter`.
    ///
    /// The empty filter deletes all rows. Deletes run against the base
    /// table, so `contains` is limited to the content column and promoted
    /// columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `filter` uses `contains` on a
    /// field that only exists inside the metadata column.
    pub fn build_delete(&self, filter: &Filter) -> Result<Statement> {
        let projected = keyword_columns(filter, &self.content_column, |f| {
            self.compiler.is_promoted(f)
        });
        if !projected.is_empty() {
            let fields: Vec<&str> = projected.iter().map(String::as_str).collect();
            return Err(Error::invalid(format!(
                "'contains' in a delete filter needs a content or promoted column, got {}",
                fields.join(", ")
            )));
        }

        let mut stmt = SqlFragment::new();
        stmt.push_sql(&format!("DELETE FROM \"{}\"", self.table));
        let predicate = self.compiler.compile(filter);
        if !predicate.is_empty() {
            stmt.push_sql(" WHERE ").append(predicate);
        }
        Ok(stmt.into())
    }

    /// Builds a statement returning the text form of a database-side embedding.
    ///
    /// # Errors
    ///
    /// Propagates rendering errors of the embedding expression.
    pub fn build_embed(&self, text: &str, purpose: EmbeddingPurpose, model_id: &str) -> Result<Statement> {
        let expr = EmbeddingExpr::Delegated {
            text: text.to_string(),
            purpose,
            model_id: model_id.to_string(),
        };
        let mut stmt = SqlFragment::new();
        stmt.push_sql("SELECT TO_NVARCHAR(")
            .append(expr.to_fragment(self.vector_type)?)
            .push_sql(") FROM SYS.DUMMY");
        Ok(stmt.into())
    }
}

fn promoted_value(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Bool(*b),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Double))
            .unwrap_or(SqlValue::Null),
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}
