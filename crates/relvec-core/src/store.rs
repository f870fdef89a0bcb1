//! The vector store: statement execution on top of [`QueryBuilder`].
//!
//! Every operation follows the same path: validate locally, build the
//! statement, run it through the [`Connection`], map the rows. Nothing is
//! retried and nothing is cached between calls.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::connection::{Connection, Row};
use crate::distance::DistanceStrategy;
use crate::embedding::{EmbeddingExpr, EmbeddingPurpose, EmbeddingStrategy};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::mmr::{maximal_marginal_relevance, MmrOptions};
use crate::query::{InsertVectors, QueryBuilder, Statement};
use crate::result::{map_rows, parse_vector_text, Document, SearchHit};
use crate::sanitize::validate_metadata_keys;

/// Text embedded by the probe run when a store switches to database-side
/// embeddings.
const PROBE_TEXT: &str = "test";

/// A document store backed by a relational table with a vector column.
pub struct VectorStore {
    connection: Arc<dyn Connection>,
    builder: QueryBuilder,
    embedding: EmbeddingStrategy,
    mmr_defaults: MmrOptions,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("table", &self.builder.table())
            .field("distance", &self.builder.distance())
            .field("embedding", &self.embedding)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Opens a store over an existing table.
    ///
    /// With an internal strategy, the model is probed once against the
    /// database before the store is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is invalid, the
    /// internal model identifier is blank, or the embedding probe fails.
    pub async fn open(
        connection: Arc<dyn Connection>,
        config: &StoreConfig,
        embedding: EmbeddingStrategy,
    ) -> Result<Self> {
        let builder = QueryBuilder::new(config)?;
        let mut store = Self {
            connection,
            builder,
            embedding: embedding.clone(),
            mmr_defaults: MmrOptions {
                fetch_k: config.search.mmr_fetch_k,
                lambda: config.search.mmr_lambda,
                ..MmrOptions::default()
            },
        };
        store.set_embeddings(embedding).await?;

        info!(
            table = store.builder.table(),
            distance = %store.builder.distance(),
            internal_embeddings = store.embedding.is_internal(),
            "Vector store opened"
        );
        Ok(store)
    }

    /// Switches the embedding strategy.
    ///
    /// Switching to an internal model first checks that the database can
    /// run it; the previous strategy stays in place on failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the model identifier is blank or
    /// the probe fails.
    pub async fn set_embeddings(&mut self, embedding: EmbeddingStrategy) -> Result<()> {
        if let EmbeddingStrategy::Internal { model_id } = &embedding {
            if model_id.trim().is_empty() {
                return Err(Error::Configuration(
                    "internal embeddings require a model identifier".to_string(),
                ));
            }
            if let Err(e) = self.embed_in_database(PROBE_TEXT, model_id).await {
                warn!(model_id = %model_id, error = %e, "Internal embedding probe failed");
                return Err(Error::Configuration(format!(
                    "internal embedding model '{model_id}' is not usable: {e}"
                )));
            }
        }
        self.embedding = embedding;
        Ok(())
    }

    /// Current embedding strategy.
    #[must_use]
    pub fn embeddings(&self) -> &EmbeddingStrategy {
        &self.embedding
    }

    /// Configured distance strategy.
    #[must_use]
    pub fn distance(&self) -> DistanceStrategy {
        self.builder.distance()
    }

    /// Statement builder bound to this store's table layout.
    #[must_use]
    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// MMR options for `k` results with the configured pool size and lambda.
    #[must_use]
    pub fn mmr_options(&self, k: usize) -> MmrOptions {
        MmrOptions {
            k,
            ..self.mmr_defaults
        }
    }

    /// Inserts documents in a single batch and returns the inserted row count.
    ///
    /// Without `embeddings`, vectors come from the current strategy: the
    /// external model is called once for all texts, or the database embeds
    /// each text itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] on length mismatches, invalid
    /// metadata keys or bad vectors, all before any statement runs.
    /// [`Error::Execution`] if the store rejects the batch.
    pub async fn add_texts(
        &self,
        texts: &[String],
        metadatas: Option<&[Map<String, Value>]>,
        embeddings: Option<&[Vec<f32>]>,
    ) -> Result<u64> {
        let owned;
        let metadatas = if let Some(m) = metadatas {
            m
        } else {
            owned = vec![Map::new(); texts.len()];
            &owned
        };
        if metadatas.len() != texts.len() {
            return Err(Error::invalid(format!(
                "got {} texts but {} metadata objects",
                texts.len(),
                metadatas.len()
            )));
        }
        for metadata in metadatas {
            validate_metadata_keys(metadata)?;
        }

        let computed;
        let vectors = match (embeddings, &self.embedding) {
            (Some(vectors), _) => InsertVectors::Literal(vectors),
            (None, EmbeddingStrategy::Internal { model_id }) => {
                InsertVectors::Delegated { model_id }
            }
            (None, EmbeddingStrategy::External(model)) => {
                computed = model.embed_documents(texts).await?;
                InsertVectors::Literal(&computed)
            }
        };

        let batch = self.builder.build_insert(texts, metadatas, vectors)?;
        if batch.rows.is_empty() {
            return Ok(0);
        }
        debug!(sql = %batch.sql, rows = batch.rows.len(), "Executing insert batch");
        self.connection.execute_batch(&batch.sql, &batch.rows).await
    }

    /// Documents most similar to `query`.
    ///
    /// # Errors
    ///
    /// Propagates embedding, execution and decode errors.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: &Filter,
    ) -> Result<Vec<Document>> {
        let hits = self.similarity_search_with_score(query, k, filter).await?;
        Ok(hits.into_iter().map(|(doc, _)| doc).collect())
    }

    /// Documents most similar to `query`, with their scores.
    ///
    /// # Errors
    ///
    /// Propagates embedding, execution and decode errors.
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: &Filter,
    ) -> Result<Vec<(Document, f32)>> {
        let expr = self.embedding.query_expr(query).await?;
        let hits = self.search(&expr, k, filter).await?;
        Ok(hits.into_iter().map(|h| (h.document, h.score)).collect())
    }

    /// Documents most similar to `vector`.
    ///
    /// # Errors
    ///
    /// Propagates validation, execution and decode errors.
    pub async fn similarity_search_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filter: &Filter,
    ) -> Result<Vec<Document>> {
        let hits = self
            .similarity_search_with_score_by_vector(vector, k, filter)
            .await?;
        Ok(hits.into_iter().map(|(doc, _)| doc).collect())
    }

    /// Documents most similar to `vector`, with their scores.
    ///
    /// # Errors
    ///
    /// Propagates validation, execution and decode errors.
    pub async fn similarity_search_with_score_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filter: &Filter,
    ) -> Result<Vec<(Document, f32)>> {
        let hits = self
            .similarity_search_with_score_and_vector_by_vector(vector, k, filter)
            .await?;
        Ok(hits.into_iter().map(|h| (h.document, h.score)).collect())
    }

    /// Search hits for `vector` including the stored vectors.
    ///
    /// # Errors
    ///
    /// Propagates validation, execution and decode errors.
    pub async fn similarity_search_with_score_and_vector_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filter: &Filter,
    ) -> Result<Vec<SearchHit>> {
        self.search(&EmbeddingExpr::Literal(vector.to_vec()), k, filter)
            .await
    }

    /// Diverse documents relevant to `query`.
    ///
    /// The query is embedded client-side or by the database, depending on
    /// the strategy, since reranking needs the query vector itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `lambda` is outside `[0, 1]`;
    /// propagates embedding, execution and decode errors.
    pub async fn max_marginal_relevance_search(
        &self,
        query: &str,
        options: MmrOptions,
        filter: &Filter,
    ) -> Result<Vec<Document>> {
        let vector = match &self.embedding {
            EmbeddingStrategy::External(model) => model.embed_query(query).await?,
            EmbeddingStrategy::Internal { model_id } => {
                self.embed_in_database(query, model_id).await?
            }
        };
        self.max_marginal_relevance_search_by_vector(&vector, options, filter)
            .await
    }

    /// Diverse documents relevant to `vector`.
    ///
    /// Fetches `fetch_k` candidates, then keeps `k` of them in MMR order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `lambda` is outside `[0, 1]`;
    /// propagates execution and decode errors.
    pub async fn max_marginal_relevance_search_by_vector(
        &self,
        vector: &[f32],
        options: MmrOptions,
        filter: &Filter,
    ) -> Result<Vec<Document>> {
        if !(0.0..=1.0).contains(&options.lambda) {
            return Err(Error::invalid(format!(
                "lambda must be within [0, 1], got {}",
                options.lambda
            )));
        }
        let hits = self
            .similarity_search_with_score_and_vector_by_vector(vector, options.fetch_k, filter)
            .await?;
        let pool: Vec<Vec<f32>> = hits.iter().map(|h| h.vector.clone()).collect();
        let order = maximal_marginal_relevance(vector, &pool, options.lambda, options.k)?;

        let mut slots: Vec<Option<Document>> = hits.into_iter().map(|h| Some(h.document)).collect();
        Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
    }

    /// Deletes rows matching `filter` and returns the affected row count.
    ///
    /// Rows have no id column, so deletion by id is rejected. An empty
    /// filter deletes every row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `ids` is given, `filter` is
    /// missing, or `filter` applies `contains` to a metadata-only field;
    /// [`Error::Execution`] if the store rejects the statement.
    pub async fn delete(&self, ids: Option<&[String]>, filter: Option<&Filter>) -> Result<u64> {
        if ids.is_some() {
            return Err(Error::invalid("deletion by ids is not supported, use a filter"));
        }
        let filter = filter.ok_or_else(|| Error::invalid("delete requires a filter"))?;
        let stmt = self.builder.build_delete(filter)?;
        self.execute(&stmt).await
    }

    async fn search(&self, expr: &EmbeddingExpr, k: usize, filter: &Filter) -> Result<Vec<SearchHit>> {
        let stmt = self.builder.build_search(expr, k, filter)?;
        let rows = self.query(&stmt).await?;
        map_rows(&rows)
    }

    async fn embed_in_database(&self, text: &str, model_id: &str) -> Result<Vec<f32>> {
        let stmt = self
            .builder
            .build_embed(text, EmbeddingPurpose::Query, model_id)?;
        let rows = self.query(&stmt).await?;
        let text = rows
            .first()
            .and_then(|row| row.first())
            .and_then(|v| v.as_text())
            .ok_or_else(|| Error::Decode("embedding query returned no vector".to_string()))?;
        parse_vector_text(text)
    }

    async fn query(&self, stmt: &Statement) -> Result<Vec<Row>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing query");
        self.connection.query(&stmt.sql, &stmt.params).await
    }

    async fn execute(&self, stmt: &Statement) -> Result<u64> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing statement");
        self.connection.execute(&stmt.sql, &stmt.params).await
    }
}
