#![allow(clippy::doc_markdown)]
//! `relvec` CLI - preview the statements a vector store would run
//!
//! Usage:
//!   `relvec compile-filter '{"year": {"gte": 2020}}'`
//!   `relvec search-sql --k 4 --vector '[0.1, 0.2]' --filter '{"lang": "en"}'`
//!   `relvec delete-sql --filter '{"source": "wiki"}' --format json`

mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relvec_core::filter::keyword_columns;
use relvec_core::sanitize::{sanitize_float_list, sanitize_identifier};
use relvec_core::{EmbeddingExpr, EmbeddingPurpose, Filter, QueryBuilder, StoreConfig};

use output::{Format, Rendered};

#[derive(Parser)]
#[command(name = "relvec")]
#[command(
    author,
    version,
    about = "relvec CLI - statement preview for relational vector stores"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to ./relvec.toml when present)
    #[arg(short, long, global = true, env = "RELVEC_CONFIG")]
    config: Option<PathBuf>,

    /// Metadata fields stored as their own columns (overrides the config)
    #[arg(long, global = true, value_delimiter = ',')]
    promoted: Vec<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON filter into a predicate
    CompileFilter {
        /// Filter expression as JSON
        filter: String,
    },

    /// Build a top-k similarity search statement
    SearchSql {
        /// Number of results
        #[arg(long, allow_hyphen_values = true)]
        k: String,

        /// Query vector as a JSON array
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        vector: Option<String>,

        /// Query text, embedded by the database
        #[arg(long)]
        text: Option<String>,

        /// Database-side embedding model (defaults to embedding.internal_model_id)
        #[arg(long, requires = "text")]
        model: Option<String>,

        /// Filter expression as JSON
        #[arg(long, default_value = "{}")]
        filter: String,
    },

    /// Build a delete statement
    DeleteSql {
        /// Filter expression as JSON; `{}` deletes every row
        #[arg(long)]
        filter: String,
    },
}

fn parse_json(what: &str, text: &str) -> anyhow::Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{what} is not valid JSON"))
}

fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file {} not found", path.display());
            }
            StoreConfig::load_from_path(path)?
        }
        None => StoreConfig::load()?,
    };
    if !cli.promoted.is_empty() {
        config.table.promoted_columns.clone_from(&cli.promoted);
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &StoreConfig) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn compile_filter(config: &StoreConfig, filter: &str) -> anyhow::Result<Rendered> {
    let builder = QueryBuilder::new(config)?;
    let filter = Filter::parse(&parse_json("filter", filter)?)?;
    let content_column = sanitize_identifier(&config.table.content_column);
    let projected = keyword_columns(&filter, &content_column, |f| {
        builder.compiler().is_promoted(f)
    });

    let (sql, params) = builder.compiler().compile(&filter).into_parts();
    Ok(Rendered {
        sql,
        params,
        projected: projected.into_iter().collect(),
    })
}

fn search_sql(
    config: &StoreConfig,
    k: &str,
    vector: Option<&str>,
    text: Option<String>,
    model: Option<String>,
    filter: &str,
) -> anyhow::Result<Rendered> {
    let builder = QueryBuilder::new(config)?;
    let embedding = match (vector, text) {
        (Some(vector), _) => {
            EmbeddingExpr::Literal(sanitize_float_list(&parse_json("vector", vector)?)?)
        }
        (None, Some(text)) => {
            let model_id = model
                .or_else(|| config.embedding.internal_model_id.clone())
                .context("--text needs --model or embedding.internal_model_id")?;
            EmbeddingExpr::Delegated {
                text,
                purpose: EmbeddingPurpose::Query,
                model_id,
            }
        }
        (None, None) => bail!("either --vector or --text is required"),
    };

    tracing::debug!(?embedding, "Building search statement");
    let stmt = builder.build_search_untyped(
        &embedding,
        &Value::String(k.to_string()),
        &parse_json("filter", filter)?,
    )?;
    Ok(Rendered {
        sql: stmt.sql,
        params: stmt.params,
        projected: Vec::new(),
    })
}

fn delete_sql(config: &StoreConfig, filter: &str) -> anyhow::Result<Rendered> {
    let builder = QueryBuilder::new(config)?;
    let filter = Filter::parse(&parse_json("filter", filter)?)?;
    let stmt = builder.build_delete(&filter)?;
    Ok(Rendered {
        sql: stmt.sql,
        params: stmt.params,
        projected: Vec::new(),
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config);

    let format = cli.format;
    let rendered = match cli.command {
        Commands::CompileFilter { filter } => compile_filter(&config, &filter)?,
        Commands::SearchSql {
            k,
            vector,
            text,
            model,
            filter,
        } => search_sql(&config, &k, vector.as_deref(), text, model, &filter)?,
        Commands::DeleteSql { filter } => delete_sql(&config, &filter)?,
    };

    output::print(&rendered, format)
}
