//! AssistML command line
//!
//! `assistml recommend <catalog.json|catalog.db> <query.json> [--config config.yaml]`
//! runs one recommendation query and prints the report as JSON.
//!
//! `assistml import <catalog.json> <catalog.db>` loads a JSON export into a
//! SQLite catalog first.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use assistml::store::{CatalogSnapshot, DocumentStore, InMemoryStore, SqliteStore};
use assistml::{ModelRecommender, Query, QueryRequest, RecommenderConfig, RecommenderError};

// ──────────────────────────────────────────────────────────────────────────────
// ARGUMENTS
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "assistml")]
#[command(about = "Recommend trained ML models for a dataset from a catalog of past experiments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query against a catalog and print the report
    Recommend {
        /// Catalog file: a JSON snapshot or a SQLite database (.db, .sqlite, .sqlite3)
        catalog: PathBuf,

        /// Query file (JSON)
        query: PathBuf,

        /// YAML configuration; environment overrides still apply
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Load a JSON catalog snapshot into a SQLite database
    Import {
        snapshot: PathBuf,
        database: PathBuf,
    },
}

// ──────────────────────────────────────────────────────────────────────────────
// CATALOG LOADING
// ──────────────────────────────────────────────────────────────────────────────

async fn open_store(path: &Path) -> Result<Arc<dyn DocumentStore>> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match extension {
        "db" | "sqlite" | "sqlite3" => {
            let store = SqliteStore::new(path)
                .await
                .with_context(|| format!("Failed to open SQLite catalog {}", path.display()))?;
            Ok(Arc::new(store))
        }
        _ => {
            let snapshot = CatalogSnapshot::from_json_file(path)
                .with_context(|| format!("Failed to load JSON catalog {}", path.display()))?;
            info!(
                datasets = snapshot.datasets.len(),
                models = snapshot.models.len(),
                "Loaded catalog snapshot"
            );
            Ok(Arc::new(InMemoryStore::from_snapshot(snapshot)))
        }
    }
}

async fn import(snapshot: &Path, database: &Path) -> Result<()> {
    let catalog = CatalogSnapshot::from_json_file(snapshot)
        .with_context(|| format!("Failed to load JSON catalog {}", snapshot.display()))?;
    let store = SqliteStore::new(database)
        .await
        .with_context(|| format!("Failed to open SQLite catalog {}", database.display()))?;
    store.import_snapshot(catalog).await.context("Catalog import failed")?;
    println!("imported {} into {}", snapshot.display(), database.display());
    Ok(())
}

fn load_query(path: &Path) -> Result<Query> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read query {}", path.display()))?;
    let request: QueryRequest = serde_json::from_str(&raw).context("Query is not valid JSON")?;
    Ok(Query::try_from(request)?)
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("assistml=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let (catalog, query, config) = match Cli::parse().command {
        Commands::Import { snapshot, database } => return import(&snapshot, &database).await,
        Commands::Recommend { catalog, query, config } => (catalog, query, config),
    };

    let config = match &config {
        Some(path) => {
            let mut config = RecommenderConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            config.apply_env_overrides()?;
            config.validate()?;
            config
        }
        None => RecommenderConfig::from_env().context("Failed to load configuration")?,
    };

    let store = open_store(&catalog).await?;
    let query = load_query(&query)?;
    info!(dataset = %query.dataset_id, task_type = %query.task_type, "Running recommendation query");

    let recommender = ModelRecommender::new(store, config);
    match recommender.build_report(&query).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(RecommenderError::EmptyResult { task_type }) => {
            println!("no recommendation possible: no candidate models for task type '{}'", task_type);
            Ok(())
        }
        Err(e) => Err(e).context("Recommendation failed"),
    }
}
