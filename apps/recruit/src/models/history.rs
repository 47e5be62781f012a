use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Summary row from the `searches` table (results_json is not loaded).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SearchHistoryRow {
    pub id: i64,
    pub run_id: String,
    pub timestamp: String,
    pub query: String,
    pub num_results: i64,
    pub cost_dollars: Option<f64>,
}

/// The trimmed candidate shape persisted in `results_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    pub name: String,
    pub linkedin_url: String,
    pub title: Option<String>,
    pub highlights: Vec<String>,
}
