//! Embedding generation strategies.
//!
//! A store either computes vectors on the client through an [`Embeddings`]
//! implementation, or delegates to the database's own `VECTOR_EMBEDDING`
//! function. The choice is made once, when the store is built.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::{StoreConfig, VectorType};
use crate::connection::SqlValue;
use crate::error::{Error, Result};
use crate::fragment::SqlFragment;
use crate::sanitize::check_finite;

/// Client-side embedding model.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embeds documents for storage.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embeds a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Purpose tag passed to the database embedding function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingPurpose {
    /// Embedding of stored content.
    Document,
    /// Embedding of a search query.
    Query,
}

impl EmbeddingPurpose {
    /// Tag as understood by `VECTOR_EMBEDDING`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "DOCUMENT",
            Self::Query => "QUERY",
        }
    }
}

/// How a store obtains vectors.
#[derive(Clone)]
pub enum EmbeddingStrategy {
    /// Vectors are computed by the caller-supplied model.
    External(Arc<dyn Embeddings>),
    /// Vectors are computed by the database with the given model.
    Internal {
        /// Database-side model identifier.
        model_id: String,
    },
}

impl EmbeddingStrategy {
    /// Delegates embedding to the database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `model_id` is blank.
    pub fn internal(model_id: impl Into<String>) -> Result<Self> {
        let model_id = model_id.into();
        if model_id.trim().is_empty() {
            return Err(Error::Configuration(
                "internal embeddings require a model identifier".to_string(),
            ));
        }
        Ok(Self::Internal { model_id })
    }

    /// Strategy selected by `embedding.internal_model_id`.
    ///
    /// A configured model id wins over `external`; without one, the
    /// client-side model is required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configured model id is blank,
    /// or if neither a model id nor a client-side model is available.
    pub fn from_config(
        config: &StoreConfig,
        external: Option<Arc<dyn Embeddings>>,
    ) -> Result<Self> {
        match (&config.embedding.internal_model_id, external) {
            (Some(model_id), _) => Self::internal(model_id.as_str()),
            (None, Some(model)) => Ok(Self::External(model)),
            (None, None) => Err(Error::Configuration(
                "no embedding model: set embedding.internal_model_id or supply a client-side model"
                    .to_string(),
            )),
        }
    }

    /// Uses a client-side model.
    #[must_use]
    pub fn external(embeddings: Arc<dyn Embeddings>) -> Self {
        Self::External(embeddings)
    }

    /// Returns true for database-side embedding.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Embedding expression for a text query.
    ///
    /// External mode calls the model here; internal mode defers to the
    /// database.
    ///
    /// # Errors
    ///
    /// Propagates the model's error in external mode.
    pub async fn query_expr(&self, text: &str) -> Result<EmbeddingExpr> {
        match self {
            Self::External(model) => Ok(EmbeddingExpr::Literal(model.embed_query(text).await?)),
            Self::Internal { model_id } => Ok(EmbeddingExpr::Delegated {
                text: text.to_string(),
                purpose: EmbeddingPurpose::Query,
                model_id: model_id.clone(),
            }),
        }
    }
}

impl fmt::Debug for EmbeddingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External(_) => f.write_str("External(..)"),
            Self::Internal { model_id } => f
                .debug_struct("Internal")
                .field("model_id", model_id)
                .finish(),
        }
    }
}

/// The vector operand of a distance function.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingExpr {
    /// A vector known to the client, rendered as a literal.
    Literal(Vec<f32>),
    /// A vector the database computes from text.
    Delegated {
        /// Text to embed.
        text: String,
        /// Purpose tag.
        purpose: EmbeddingPurpose,
        /// Database-side model identifier.
        model_id: String,
    },
}

impl EmbeddingExpr {
    /// Renders the expression, binding text and model for delegated calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a literal vector contains
    /// non-finite components.
    pub fn to_fragment(&self, vector_type: VectorType) -> Result<SqlFragment> {
        let mut frag = SqlFragment::new();
        match self {
            Self::Literal(vector) => {
                check_finite(vector)?;
                frag.push_sql(&format!(
                    "{}('{}')",
                    vector_type.conversion_function(),
                    format_vector(vector)
                ));
            }
            Self::Delegated {
                text,
                purpose,
                model_id,
            } => {
                frag.push_sql("VECTOR_EMBEDDING(")
                    .push_bind(SqlValue::Text(text.clone()))
                    .push_sql(&format!(", '{}', ", purpose.as_str()))
                    .push_bind(SqlValue::Text(model_id.clone()))
                    .push_sql(")");
            }
        }
        Ok(frag)
    }
}

/// Text form of a vector: `[v1,v2,...]`.
#[must_use]
pub fn format_vector(vector: &[f32]) -> String {
    let items: Vec<String> = vector.iter().map(f32::to_string).collect();
    format!("[{}]", items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl Embeddings for Fixed {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.5, 0.25])
        }
    }

    #[test]
    fn test_internal_requires_model_id() {
        assert!(matches!(
            EmbeddingStrategy::internal("  "),
            Err(Error::Configuration(_))
        ));
        assert!(EmbeddingStrategy::internal("SAP_NEB.20240715").unwrap().is_internal());
    }

    #[test]
    fn test_from_config_prefers_configured_model() {
        // Arrange
        let mut config = StoreConfig::default();
        config.embedding.internal_model_id = Some("m1".to_string());

        // Act
        let strategy = EmbeddingStrategy::from_config(&config, Some(Arc::new(Fixed))).unwrap();

        // Assert
        assert!(matches!(strategy, EmbeddingStrategy::Internal { model_id } if model_id == "m1"));
    }

    #[test]
    fn test_from_config_falls_back_to_external_model() {
        let strategy =
            EmbeddingStrategy::from_config(&StoreConfig::default(), Some(Arc::new(Fixed))).unwrap();
        assert!(!strategy.is_internal());
    }

    #[test]
    fn test_from_config_needs_some_model() {
        assert!(matches!(
            EmbeddingStrategy::from_config(&StoreConfig::default(), None),
            Err(Error::Configuration(_))
        ));

        let mut config = StoreConfig::default();
        config.embedding.internal_model_id = Some(" ".to_string());
        assert!(matches!(
            EmbeddingStrategy::from_config(&config, None),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_literal_renders_without_params() {
        let expr = EmbeddingExpr::Literal(vec![1.0, -0.5, 0.0]);
        let frag = expr.to_fragment(VectorType::RealVector).unwrap();
        assert_eq!(frag.sql(), "TO_REAL_VECTOR('[1,-0.5,0]')");
        assert!(frag.params().is_empty());
    }

    #[test]
    fn test_literal_uses_half_vector_conversion() {
        let frag = EmbeddingExpr::Literal(vec![1.0])
            .to_fragment(VectorType::HalfVector)
            .unwrap();
        assert_eq!(frag.sql(), "TO_HALF_VECTOR('[1]')");
    }

    #[test]
    fn test_literal_rejects_nan() {
        let expr = EmbeddingExpr::Literal(vec![f32::NAN]);
        assert!(matches!(
            expr.to_fragment(VectorType::RealVector),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_delegated_binds_text_then_model() {
        let expr = EmbeddingExpr::Delegated {
            text: "hello".to_string(),
            purpose: EmbeddingPurpose::Query,
            model_id: "m1".to_string(),
        };
        let frag = expr.to_fragment(VectorType::RealVector).unwrap();
        assert_eq!(frag.sql(), "VECTOR_EMBEDDING(?, 'QUERY', ?)");
        assert_eq!(frag.params(), &[SqlValue::from("hello"), SqlValue::from("m1")]);
    }

    #[tokio::test]
    async fn test_external_query_expr_calls_model() {
        let strategy = EmbeddingStrategy::external(Arc::new(Fixed));
        let expr = strategy.query_expr("anything").await.unwrap();
        assert_eq!(expr, EmbeddingExpr::Literal(vec![0.5, 0.25]));
    }

    #[tokio::test]
    async fn test_internal_query_expr_defers_to_database() {
        let strategy = EmbeddingStrategy::internal("m1").unwrap();
        let expr = strategy.query_expr("q").await.unwrap();
        assert!(matches!(
            expr,
            EmbeddingExpr::Delegated { purpose: EmbeddingPurpose::Query, .. }
        ));
    }
}
