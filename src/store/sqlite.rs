//! SQLite document store
//!
//! Documents are stored as JSON alongside the few columns the recommender
//! filters on. Every call opens its own connection on the blocking pool.

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::info;

use super::{CatalogSnapshot, DocumentStore, ModelPage};
use crate::catalog::{Dataset, Document, DocumentId, DocumentKind, Implementation, Model, Task, TaskType};
use crate::error::{StoreError, StoreResult};
use crate::select::similarity::TOLERANCE_EPSILON;

const RATIO_COLUMNS: [&str; 4] = ["numeric_ratio", "categorical_ratio", "datetime_ratio", "unstructured_ratio"];

#[derive(Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    pub async fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let path_clone = path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&path_clone)?;
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS datasets (
                    id TEXT PRIMARY KEY,
                    numeric_ratio REAL NOT NULL,
                    categorical_ratio REAL NOT NULL,
                    datetime_ratio REAL NOT NULL,
                    unstructured_ratio REAL NOT NULL,
                    doc TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    task_type TEXT NOT NULL,
                    dataset_id TEXT NOT NULL,
                    doc TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS implementations (
                    id TEXT PRIMARY KEY,
                    doc TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS models (
                    id TEXT PRIMARY KEY,
                    task_id TEXT NOT NULL,
                    doc TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_tasks_type ON tasks(task_type);
                CREATE INDEX IF NOT EXISTS idx_models_task ON models(task_id, id);
                "#,
            )?;
            Ok::<_, StoreError>(())
        })
        .await??;

        Ok(Self { db_path: path })
    }

    /// Load a whole catalog export in one transaction, replacing documents
    /// with the same ids.
    pub async fn import_snapshot(&self, snapshot: CatalogSnapshot) -> StoreResult<()> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)?;
            let tx = conn.transaction()?;

            for dataset in &snapshot.datasets {
                let info = &dataset.info;
                tx.execute(
                    "INSERT OR REPLACE INTO datasets (id, numeric_ratio, categorical_ratio, datetime_ratio, unstructured_ratio, doc)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        dataset.id.as_str(),
                        info.numeric_ratio,
                        info.categorical_ratio,
                        info.datetime_ratio,
                        info.unstructured_ratio,
                        serde_json::to_string(dataset)?
                    ],
                )?;
            }
            for t in &snapshot.tasks {
                tx.execute(
                    "INSERT OR REPLACE INTO tasks (id, task_type, dataset_id, doc) VALUES (?1, ?2, ?3, ?4)",
                    params![t.id.as_str(), t.task_type.as_str(), t.dataset_id.as_str(), serde_json::to_string(t)?],
                )?;
            }
            for implementation in &snapshot.implementations {
                tx.execute(
                    "INSERT OR REPLACE INTO implementations (id, doc) VALUES (?1, ?2)",
                    params![implementation.id.as_str(), serde_json::to_string(implementation)?],
                )?;
            }
            for model in &snapshot.models {
                tx.execute(
                    "INSERT OR REPLACE INTO models (id, task_id, doc) VALUES (?1, ?2, ?3)",
                    params![model.id.as_str(), model.setup.task_id.as_str(), serde_json::to_string(model)?],
                )?;
            }
            tx.commit()?;

            info!(
                datasets = snapshot.datasets.len(),
                tasks = snapshot.tasks.len(),
                implementations = snapshot.implementations.len(),
                models = snapshot.models.len(),
                "Imported catalog snapshot into {:?}",
                path
            );
            Ok::<_, StoreError>(())
        })
        .await?
    }
}

fn table_for(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Dataset => "datasets",
        DocumentKind::Task => "tasks",
        DocumentKind::Implementation => "implementations",
        DocumentKind::Model => "models",
    }
}

fn ratio_pattern_sql(tolerance: Option<f64>) -> String {
    let mut sql = String::from("SELECT doc FROM datasets WHERE 1 = 1");
    for (i, column) in RATIO_COLUMNS.iter().enumerate() {
        let n = i + 1;
        sql.push_str(&format!(" AND (({column} <> 0) = (?{n} <> 0))"));
        if tolerance.is_some() {
            sql.push_str(&format!(" AND ({column} = 0 OR ABS({column} - ?{n}) <= ?5)"));
        }
    }
    sql.push_str(" ORDER BY id");
    sql
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find_tasks_by_type(&self, task_type: TaskType) -> StoreResult<Vec<Task>> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            let mut stmt = conn.prepare("SELECT doc FROM tasks WHERE task_type = ?1 ORDER BY id")?;
            let docs = stmt
                .query_map(params![task_type.as_str()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            docs.iter()
                .map(|doc| serde_json::from_str::<Task>(doc).map_err(StoreError::from))
                .collect::<StoreResult<Vec<_>>>()
        })
        .await?
    }

    async fn find_datasets_matching_ratio_pattern(
        &self,
        target: &Dataset,
        tolerance: Option<f64>,
    ) -> StoreResult<Vec<Dataset>> {
        let path = self.db_path.clone();
        let mut bindings: Vec<f64> = target.info.ratios().to_vec();
        if let Some(tol) = tolerance {
            bindings.push(tol + TOLERANCE_EPSILON);
        }

        task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            let mut stmt = conn.prepare(&ratio_pattern_sql(tolerance))?;
            let docs = stmt
                .query_map(params_from_iter(bindings.iter()), |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            docs.iter()
                .map(|doc| serde_json::from_str::<Dataset>(doc).map_err(StoreError::from))
                .collect::<StoreResult<Vec<_>>>()
        })
        .await?
    }

    async fn find_models_for_tasks(
        &self,
        task_ids: &[DocumentId],
        batch_size: usize,
        cursor: Option<&DocumentId>,
    ) -> StoreResult<ModelPage> {
        if batch_size == 0 {
            return Err(StoreError::Backend("batch size must be positive".into()));
        }
        if task_ids.is_empty() {
            return Ok(ModelPage::default());
        }
        let path = self.db_path.clone();
        let placeholders = vec!["?"; task_ids.len()].join(", ");
        let sql = format!(
            "SELECT doc FROM models WHERE task_id IN ({placeholders}) AND id > ? ORDER BY id LIMIT ?"
        );
        let mut bindings: Vec<Value> = task_ids.iter().map(|id| Value::Text(id.to_string())).collect();
        bindings.push(Value::Text(cursor.map(|c| c.to_string()).unwrap_or_default()));
        bindings.push(Value::Integer(batch_size as i64));

        task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            let mut stmt = conn.prepare(&sql)?;
            let docs = stmt
                .query_map(params_from_iter(bindings.iter()), |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            let models = docs
                .iter()
                .map(|doc| serde_json::from_str::<Model>(doc).map_err(StoreError::from))
                .collect::<StoreResult<Vec<_>>>()?;
            Ok(ModelPage::from_rows(models, batch_size))
        })
        .await?
    }

    async fn resolve_document(&self, kind: DocumentKind, id: &DocumentId) -> StoreResult<Document> {
        let path = self.db_path.clone();
        let id_str = id.to_string();

        task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            let doc: Option<String> = conn
                .query_row(
                    &format!("SELECT doc FROM {} WHERE id = ?1", table_for(kind)),
                    params![&id_str],
                    |row| row.get(0),
                )
                .optional()?;
            let doc = doc.ok_or_else(|| StoreError::NotFound { kind, id: id_str.clone() })?;
            let document = match kind {
                DocumentKind::Dataset => Document::Dataset(serde_json::from_str::<Dataset>(&doc)?.into()),
                DocumentKind::Task => Document::Task(serde_json::from_str::<Task>(&doc)?.into()),
                DocumentKind::Implementation => {
                    Document::Implementation(serde_json::from_str::<Implementation>(&doc)?.into())
                }
                DocumentKind::Model => Document::Model(serde_json::from_str::<Model>(&doc)?.into()),
            };
            Ok(document)
        })
        .await?
    }
}
