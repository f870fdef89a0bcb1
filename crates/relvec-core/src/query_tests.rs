//! Tests for query module

use crate::config::{StoreConfig, VectorType};
use crate::connection::SqlValue;
use crate::distance::DistanceStrategy;
use crate::embedding::{EmbeddingExpr, EmbeddingPurpose};
use crate::error::Error;
use crate::filter::Filter;
use crate::query::*;
use serde_json::{json, Map, Value};

fn builder() -> QueryBuilder {
    QueryBuilder::new(&StoreConfig::default()).expect("default config is valid")
}

fn builder_with(edit: impl FnOnce(&mut StoreConfig)) -> QueryBuilder {
    let mut config = StoreConfig::default();
    edit(&mut config);
    QueryBuilder::new(&config).expect("config is valid")
}

fn filter(value: Value) -> Filter {
    Filter::parse(&value).expect("valid filter")
}

fn meta(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object")
}

// =========================================================================
// Construction
// =========================================================================

#[test]
fn test_names_are_sanitized() {
    let builder = builder_with(|c| c.table.name = "my-table\"; DROP".to_string());
    assert_eq!(builder.table(), "mytableDROP");
}

#[test]
fn test_unusable_name_is_a_configuration_error() {
    let mut config = StoreConfig::default();
    config.table.vector_column = "--".to_string();
    assert!(matches!(QueryBuilder::new(&config), Err(Error::Configuration(_))));
}

#[test]
fn test_unsupported_distance_fails_at_construction() {
    let mut config = StoreConfig::default();
    config.search.distance = "hamming".to_string();
    assert!(matches!(QueryBuilder::new(&config), Err(Error::Configuration(_))));
}

// =========================================================================
// Search statements
// =========================================================================

#[test]
fn test_search_with_vector_and_no_filter() {
    // Arrange
    let expr = EmbeddingExpr::Literal(vec![1.0, 0.0, 0.0]);

    // Act
    let stmt = builder().build_search(&expr, 4, &Filter::default()).unwrap();

    // Assert
    assert_eq!(
        stmt.sql,
        "SELECT TOP 4 \"VEC_TEXT\", \"VEC_META\", TO_NVARCHAR(\"VEC_VECTOR\"), \
         COSINE_SIMILARITY(\"VEC_VECTOR\", TO_REAL_VECTOR('[1,0,0]')) AS CS \
         FROM \"EMBEDDINGS\" ORDER BY CS DESC"
    );
    assert!(stmt.params.is_empty());
}

#[test]
fn test_euclidean_sorts_ascending() {
    let builder = builder_with(|c| c.search.distance = "euclidean".to_string());
    let stmt = builder
        .build_search(&EmbeddingExpr::Literal(vec![0.5]), 2, &Filter::default())
        .unwrap();

    assert_eq!(builder.distance(), DistanceStrategy::Euclidean);
    assert!(stmt.sql.contains("L2DISTANCE(\"VEC_VECTOR\", TO_REAL_VECTOR('[0.5]'))"));
    assert!(stmt.sql.ends_with("ORDER BY CS ASC"));
}

#[test]
fn test_search_with_filter_appends_where() {
    let stmt = builder()
        .build_search(
            &EmbeddingExpr::Literal(vec![1.0]),
            3,
            &filter(json!({"lang": "en"})),
        )
        .unwrap();

    assert!(stmt
        .sql
        .contains("FROM \"EMBEDDINGS\" WHERE JSON_VALUE(\"VEC_META\", '$.lang') = ? ORDER BY CS DESC"));
    assert_eq!(stmt.params, vec![SqlValue::from("en")]);
}

#[test]
fn test_delegated_embedding_params_come_first() {
    // Arrange
    let expr = EmbeddingExpr::Delegated {
        text: "what is rust".to_string(),
        purpose: EmbeddingPurpose::Query,
        model_id: "model-1".to_string(),
    };

    // Act
    let stmt = builder()
        .build_search(&expr, 5, &filter(json!({"year": {"gt": 2000}, "lang": "en"})))
        .unwrap();

    // Assert
    assert!(stmt
        .sql
        .contains("COSINE_SIMILARITY(\"VEC_VECTOR\", VECTOR_EMBEDDING(?, 'QUERY', ?)) AS CS"));
    assert_eq!(
        stmt.params,
        vec![
            SqlValue::from("what is rust"),
            SqlValue::from("model-1"),
            SqlValue::Double(2000.0),
            SqlValue::from("en"),
        ]
    );
    assert_eq!(stmt.sql.matches('?').count(), stmt.params.len());
}

#[test]
fn test_keyword_search_on_metadata_adds_projection() {
    // Arrange
    let f = filter(json!({"or": [{"title": {"contains": "rust"}}, {"VEC_TEXT": {"contains": "vec"}}]}));

    // Act
    let stmt = builder()
        .build_search(&EmbeddingExpr::Literal(vec![1.0]), 2, &f)
        .unwrap();

    // Assert
    assert!(stmt.sql.starts_with(
        "WITH intermediate_result AS (SELECT *, JSON_VALUE(\"VEC_META\", '$.title') AS \"title\" \
         FROM \"EMBEDDINGS\") SELECT TOP 2 "
    ));
    assert!(stmt
        .sql
        .contains("FROM intermediate_result AS \"EMBEDDINGS\" WHERE (SCORE(? IN (\"title\" EXACT SEARCH MODE 'text')) > 0) OR (SCORE(? IN (\"VEC_TEXT\" EXACT SEARCH MODE 'text')) > 0)"));
    assert_eq!(stmt.params, vec![SqlValue::from("rust"), SqlValue::from("vec")]);
}

#[test]
fn test_keyword_search_on_promoted_field_needs_no_projection() {
    let builder = builder_with(|c| c.table.promoted_columns = vec!["title".to_string()]);
    let stmt = builder
        .build_search(
            &EmbeddingExpr::Literal(vec![1.0]),
            2,
            &filter(json!({"title": {"contains": "rust"}})),
        )
        .unwrap();

    assert!(stmt.sql.starts_with("SELECT TOP 2"));
    assert!(stmt.sql.contains("FROM \"EMBEDDINGS\" WHERE SCORE("));
}

#[test]
fn test_half_vector_literal() {
    let builder = builder_with(|c| c.vector.vector_type = VectorType::HalfVector);
    let stmt = builder
        .build_search(&EmbeddingExpr::Literal(vec![1.0]), 1, &Filter::default())
        .unwrap();
    assert!(stmt.sql.contains("TO_HALF_VECTOR('[1]')"));
}

#[test]
fn test_search_checks_dimension() {
    let builder = builder_with(|c| c.vector.length = Some(3));
    let err = builder
        .build_search(&EmbeddingExpr::Literal(vec![1.0, 2.0]), 1, &Filter::default())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_untyped_k_is_sanitized() {
    let expr = EmbeddingExpr::Literal(vec![1.0]);
    let stmt = builder()
        .build_search_untyped(&expr, &json!("7"), &json!({}))
        .unwrap();
    assert!(stmt.sql.starts_with("SELECT TOP 7 "));

    let stmt = builder()
        .build_search_untyped(&expr, &json!(7.0), &json!({}))
        .unwrap();
    assert!(stmt.sql.starts_with("SELECT TOP 7 "));

    for bad in [json!(-1), json!("ten"), json!(2.5)] {
        assert!(matches!(
            builder().build_search_untyped(&expr, &bad, &json!({})),
            Err(Error::InvalidArgument(_))
        ));
    }
}

#[test]
fn test_untyped_filter_errors_propagate() {
    let expr = EmbeddingExpr::Literal(vec![1.0]);
    let err = builder()
        .build_search_untyped(&expr, &json!(1), &json!({"x": {"foo": 1}}))
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperator(_)));
}

// =========================================================================
// Insert statements
// =========================================================================

#[test]
fn test_insert_with_literal_vectors() {
    // Arrange
    let builder = builder_with(|c| c.table.promoted_columns = vec!["author".to_string()]);
    let texts = vec!["hello".to_string(), "world".to_string()];
    let metas = vec![meta(json!({"author": "ann", "page": 1})), meta(json!({}))];
    let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];

    // Act
    let batch = builder
        .build_insert(&texts, &metas, InsertVectors::Literal(&vectors))
        .unwrap();

    // Assert
    assert_eq!(
        batch.sql,
        "INSERT INTO \"EMBEDDINGS\" (\"VEC_TEXT\", \"VEC_META\", \"VEC_VECTOR\", \"author\") \
         VALUES (?, ?, TO_REAL_VECTOR(?), ?)"
    );
    assert_eq!(
        batch.rows[0],
        vec![
            SqlValue::from("hello"),
            SqlValue::from(r#"{"author":"ann","page":1}"#),
            SqlValue::from("[1,0]"),
            SqlValue::from("ann"),
        ]
    );
    assert_eq!(batch.rows[1][3], SqlValue::Null);
}

#[test]
fn test_insert_with_delegated_vectors() {
    let texts = vec!["hello".to_string()];
    let metas = vec![Map::new()];

    let batch = builder()
        .build_insert(&texts, &metas, InsertVectors::Delegated { model_id: "m" })
        .unwrap();

    assert!(batch.sql.ends_with("VALUES (?, ?, VECTOR_EMBEDDING(?, 'DOCUMENT', ?))"));
    assert_eq!(
        batch.rows[0],
        vec![
            SqlValue::from("hello"),
            SqlValue::from("{}"),
            SqlValue::from("hello"),
            SqlValue::from("m"),
        ]
    );
}

#[test]
fn test_insert_rejects_length_mismatch() {
    let texts = vec!["a".to_string(), "b".to_string()];
    let metas = vec![Map::new(), Map::new()];
    let vectors = vec![vec![1.0]];

    let err = builder()
        .build_insert(&texts, &metas, InsertVectors::Literal(&vectors))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = builder()
        .build_insert(&texts, &metas[..1], InsertVectors::Delegated { model_id: "m" })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_insert_rejects_bad_metadata_key() {
    let texts = vec!["a".to_string()];
    let metas = vec![meta(json!({"bad key": 1}))];
    let err = builder()
        .build_insert(&texts, &metas, InsertVectors::Literal(&[vec![1.0]]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

// =========================================================================
// Delete and embedding statements
// =========================================================================

#[test]
fn test_delete_with_filter() {
    let stmt = builder()
        .build_delete(&filter(json!({"source": {"in": ["a", "b"]}})))
        .unwrap();
    assert_eq!(
        stmt.sql,
        "DELETE FROM \"EMBEDDINGS\" WHERE JSON_VALUE(\"VEC_META\", '$.source') IN (?, ?)"
    );
    assert_eq!(stmt.params.len(), 2);
}

#[test]
fn test_delete_with_empty_filter_has_no_where() {
    let stmt = builder().build_delete(&Filter::default()).unwrap();
    assert_eq!(stmt.sql, "DELETE FROM \"EMBEDDINGS\"");
}

#[test]
fn test_delete_rejects_contains_on_metadata_field() {
    // Arrange
    let filter = filter(json!({"title": {"contains": "rust"}}));

    // Act
    let err = builder().build_delete(&filter).unwrap_err();

    // Assert
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(err.to_string().contains("title"));
}

#[test]
fn test_delete_allows_contains_on_content_column() {
    let stmt = builder()
        .build_delete(&filter(json!({"VEC_TEXT": {"contains": "rust"}})))
        .unwrap();
    assert!(stmt.sql.starts_with("DELETE FROM \"EMBEDDINGS\" WHERE SCORE("));
    assert_eq!(stmt.params.len(), 1);
}

#[test]
fn test_embed_statement() {
    let stmt = builder()
        .build_embed("test", EmbeddingPurpose::Query, "m")
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT TO_NVARCHAR(VECTOR_EMBEDDING(?, 'QUERY', ?)) FROM SYS.DUMMY"
    );
    assert_eq!(stmt.params, vec![SqlValue::from("test"), SqlValue::from("m")]);
}
