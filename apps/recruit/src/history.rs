//! Search history — every search is recorded in the local SQLite store so past
//! queries (and what they cost) can be listed later.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::history::{SearchHistoryRow, StoredResult};
use crate::search::SearchResponse;

/// Records a search and returns the new row id.
pub async fn save_search(pool: &SqlitePool, response: &SearchResponse) -> Result<i64, AppError> {
    let stored: Vec<StoredResult> = response
        .results
        .iter()
        .map(|c| StoredResult {
            name: c.name.clone(),
            linkedin_url: c.linkedin_url.clone(),
            title: c.title.clone(),
            highlights: c.highlights.clone(),
        })
        .collect();
    let results_json = serde_json::to_string(&stored)?;

    let result = sqlx::query(
        "INSERT INTO searches (run_id, timestamp, query, num_results, cost_dollars, results_json) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(Utc::now().to_rfc3339())
    .bind(&response.query)
    .bind(response.results.len() as i64)
    .bind(response.cost_dollars)
    .bind(results_json)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent searches first, optionally restricted to queries containing `query_filter`.
pub async fn get_history(
    pool: &SqlitePool,
    limit: u32,
    query_filter: Option<&str>,
) -> Result<Vec<SearchHistoryRow>, AppError> {
    let rows = match query_filter {
        Some(filter) => {
            sqlx::query_as::<_, SearchHistoryRow>(
                "SELECT id, run_id, timestamp, query, num_results, cost_dollars FROM searches \
                 WHERE query LIKE ? ORDER BY id DESC LIMIT ?",
            )
            .bind(format!("%{filter}%"))
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, SearchHistoryRow>(
                "SELECT id, run_id, timestamp, query, num_results, cost_dollars FROM searches \
                 ORDER BY id DESC LIMIT ?",
            )
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

/// Candidates stored for a past search.
pub async fn get_results(pool: &SqlitePool, id: i64) -> Result<Vec<StoredResult>, AppError> {
    let json: Option<String> = sqlx::query_scalar("SELECT results_json FROM searches WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match json {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Err(AppError::NoResults(format!("no search with id {id}"))),
    }
}
