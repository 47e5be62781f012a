use std::path::Path;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

const CREATE_SEARCHES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS searches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        query TEXT NOT NULL,
        num_results INTEGER NOT NULL,
        cost_dollars REAL,
        results_json TEXT NOT NULL
    )
"#;

/// Opens (creating if needed) the local search-history database.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    debug!("Opening history database at {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open history database {}", db_path.display()))?;

    sqlx::query(CREATE_SEARCHES_TABLE).execute(&pool).await?;

    Ok(pool)
}
