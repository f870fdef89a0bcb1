//! Mapping of search rows into documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::connection::SqlValue;
use crate::error::{Error, Result};

/// A stored document: text plus its metadata object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document text.
    pub content: String,
    /// Metadata as stored in the metadata column.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Creates a document without metadata.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }

    /// Attaches a metadata object.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One search result with its score and stored vector.
///
/// For cosine stores higher scores are closer; for euclidean stores lower
/// scores are closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched document.
    pub document: Document,
    /// Value of the distance function.
    pub score: f32,
    /// Stored vector.
    pub vector: Vec<f32>,
}

/// Maps one `[content, metadata, vector, score]` row.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the row has the wrong shape, the metadata is
/// not a JSON object, or the vector text is malformed.
pub fn map_row(row: &[SqlValue]) -> Result<SearchHit> {
    let [content, metadata, vector, score] = row else {
        return Err(Error::Decode(format!(
            "expected 4 columns, got {}",
            row.len()
        )));
    };

    let content = content
        .as_text()
        .ok_or_else(|| Error::Decode(format!("content column is not text: {content}")))?
        .to_string();

    let metadata = match metadata {
        SqlValue::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(Error::Decode(format!(
                    "metadata is not a JSON object: {other}"
                )))
            }
            Err(e) => return Err(Error::Decode(format!("metadata is not valid JSON: {e}"))),
        },
        SqlValue::Null => Map::new(),
        other => return Err(Error::Decode(format!("metadata column is not text: {other}"))),
    };

    let vector = vector
        .as_text()
        .ok_or_else(|| Error::Decode(format!("vector column is not text: {vector}")))
        .and_then(parse_vector_text)?;

    #[allow(clippy::cast_possible_truncation)]
    let score = score
        .as_f64()
        .ok_or_else(|| Error::Decode(format!("score column is not numeric: {score}")))?
        as f32;

    Ok(SearchHit {
        document: Document { content, metadata },
        score,
        vector,
    })
}

/// Maps every row; the first malformed row fails the whole call.
///
/// # Errors
///
/// See [`map_row`].
pub fn map_rows(rows: &[Vec<SqlValue>]) -> Result<Vec<SearchHit>> {
    rows.iter().map(|row| map_row(row)).collect()
}

/// Parses the text form `[v1,v2,...]` of a vector.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the brackets are missing or a component is
/// not a float.
pub fn parse_vector_text(text: &str) -> Result<Vec<f32>> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| Error::Decode(format!("vector text '{text}' is not bracketed")))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<f32>()
                .map_err(|e| Error::Decode(format!("vector component '{token}': {e}")))
        })
        .collect()
}
