//! `relvec` Configuration Module
//!
//! Provides configuration file support via `relvec.toml`, environment
//! variables and programmatic construction.
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`RELVEC_*`, sections separated by `__`,
//!    e.g. `RELVEC_TABLE__NAME=DOCS`)
//! 2. Configuration file (`relvec.toml`)
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::distance::DistanceStrategy;
use crate::sanitize::is_identifier;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Storage type of the vector column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VectorType {
    /// 32-bit floats.
    #[default]
    #[serde(rename = "REAL_VECTOR")]
    RealVector,
    /// 16-bit floats.
    #[serde(rename = "HALF_VECTOR")]
    HalfVector,
}

impl VectorType {
    /// Function converting vector text into this column type.
    #[must_use]
    pub const fn conversion_function(&self) -> &'static str {
        match self {
            Self::RealVector => "TO_REAL_VECTOR",
            Self::HalfVector => "TO_HALF_VECTOR",
        }
    }
}

/// Table layout section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Table name.
    pub name: String,
    /// Column holding document text.
    pub content_column: String,
    /// Column holding the JSON metadata blob.
    pub metadata_column: String,
    /// Column holding the vector.
    pub vector_column: String,
    /// Metadata fields materialized as their own columns.
    pub promoted_columns: Vec<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "EMBEDDINGS".to_string(),
            content_column: "VEC_TEXT".to_string(),
            metadata_column: "VEC_META".to_string(),
            vector_column: "VEC_VECTOR".to_string(),
            promoted_columns: Vec::new(),
        }
    }
}

/// Vector column section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Column type.
    pub vector_type: VectorType,
    /// Fixed dimensionality; `None` = dynamic.
    pub length: Option<usize>,
}

/// Search section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Distance strategy: cosine or euclidean.
    pub distance: String,
    /// Default candidate pool size for MMR search.
    pub mmr_fetch_k: usize,
    /// Default diversity parameter for MMR search.
    pub mmr_lambda: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            distance: "cosine".to_string(),
            mmr_fetch_k: 20,
            mmr_lambda: 0.5,
        }
    }
}

/// Embedding section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Database-side model; when set, the database computes embeddings.
    ///
    /// Read by [`EmbeddingStrategy::from_config`](crate::EmbeddingStrategy::from_config)
    /// and as the CLI's default `--model`.
    pub internal_model_id: Option<String>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main `relvec` configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Table layout.
    pub table: TableConfig,
    /// Vector column.
    pub vector: VectorConfig,
    /// Search behavior.
    pub search: SearchConfig,
    /// Embedding mode.
    pub embedding: EmbeddingConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl StoreConfig {
    /// Loads configuration from default sources.
    ///
    /// Priority: defaults < `relvec.toml` < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("relvec.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("RELVEC_").split("__"))
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str))
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parsed distance strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not supported.
    pub fn distance_strategy(&self) -> Result<DistanceStrategy, ConfigError> {
        self.search
            .distance
            .parse()
            .map_err(|e: crate::error::Error| ConfigError::InvalidValue {
                key: "search.distance".to_string(),
                message: e.to_string(),
            })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.distance_strategy()?;

        for column in &self.table.promoted_columns {
            if !is_identifier(column) {
                return Err(ConfigError::InvalidValue {
                    key: "table.promoted_columns".to_string(),
                    message: format!(
                        "'{column}' must match [A-Za-z_][A-Za-z0-9_]*"
                    ),
                });
            }
        }

        if self.vector.length == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "vector.length".to_string(),
                message: "value 0 is invalid, omit the key for dynamic length".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.search.mmr_lambda) {
            return Err(ConfigError::InvalidValue {
                key: "search.mmr_lambda".to_string(),
                message: format!(
                    "value {} is out of range [0, 1]",
                    self.search.mmr_lambda
                ),
            });
        }

        if self.search.mmr_fetch_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.mmr_fetch_k".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        if let Some(model) = &self.embedding.internal_model_id {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "embedding.internal_model_id".to_string(),
                    message: "model identifier must not be blank".to_string(),
                });
            }
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        Ok(())
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
