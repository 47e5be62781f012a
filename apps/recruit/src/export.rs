//! CSV export of search and filter results, and CSV import for re-filtering.
//!
//! Files are named `{query-slug}-{YYYY-MM-DD}.csv` and appended to when the same
//! query runs again on the same day; the header is only written to new files.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::filtering::engine::ClassificationOutcome;
use crate::models::candidate::{Candidate, HIGHLIGHT_SEPARATOR};
use crate::search::SearchResponse;

const SLUG_MAX_LEN: usize = 50;

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    timestamp: &'a str,
    name: &'a str,
    linkedin_url: &'a str,
    title: &'a str,
    query: &'a str,
    highlights: String,
}

#[derive(Debug, Serialize)]
struct FilteredRow<'a> {
    timestamp: &'a str,
    name: &'a str,
    linkedin_url: &'a str,
    title: &'a str,
    query: &'a str,
    highlights: String,
    #[serde(rename = "match")]
    is_match: bool,
    confidence: String,
    reason: &'a str,
    current_company: &'a str,
    current_role: &'a str,
    graduation_year: &'a str,
}

/// Paths written by `export_filtered_csv`.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredExport {
    pub matched_path: PathBuf,
    pub rejected_path: Option<PathBuf>,
}

/// Candidates read back from a CSV, plus the query recorded in it (if any).
#[derive(Debug, Clone)]
pub struct ImportedCandidates {
    pub candidates: Vec<Candidate>,
    pub query: Option<String>,
}

/// Lowercases, drops punctuation, and joins words with single hyphens.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::new();
    let mut pending_hyphen = false;

    for c in text.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_hyphen = true;
        }
    }

    slug.chars().take(max_len).collect()
}

/// `{slug}-{YYYY-MM-DD}.csv` for today's date in UTC.
pub fn auto_filename(query: &str) -> String {
    format!("{}-{}.csv", slugify(query, SLUG_MAX_LEN), today())
}

/// Appends raw search results to the query's daily CSV and returns its path.
pub fn export_csv(response: &SearchResponse, output_dir: &Path) -> Result<PathBuf, AppError> {
    ensure_dir(output_dir)?;
    let filepath = output_dir.join(auto_filename(&response.query));
    let timestamp = now_timestamp();

    let mut writer = append_writer(&filepath)?;
    for candidate in &response.results {
        writer.serialize(ResultRow {
            timestamp: &timestamp,
            name: &candidate.name,
            linkedin_url: &candidate.linkedin_url,
            title: candidate.title.as_deref().unwrap_or_default(),
            query: &response.query,
            highlights: candidate.joined_highlights(),
        })?;
    }
    writer.flush()?;

    info!("Exported {} results to {}", response.results.len(), filepath.display());
    Ok(filepath)
}

/// Writes matched candidates to `{slug}-filtered-{date}.csv` and, when there
/// are any, rejected candidates to `{slug}-rejected-{date}.csv`.
pub fn export_filtered_csv(
    matched: &[ClassificationOutcome],
    rejected: &[ClassificationOutcome],
    query: &str,
    output_dir: &Path,
) -> Result<FilteredExport, AppError> {
    ensure_dir(output_dir)?;
    let slug = slugify(query, SLUG_MAX_LEN);
    let date = today();
    let timestamp = now_timestamp();

    let matched_path = output_dir.join(format!("{slug}-filtered-{date}.csv"));
    write_filtered(&matched_path, matched, query, &timestamp)?;

    let rejected_path = if rejected.is_empty() {
        None
    } else {
        let path = output_dir.join(format!("{slug}-rejected-{date}.csv"));
        write_filtered(&path, rejected, query, &timestamp)?;
        Some(path)
    };

    Ok(FilteredExport {
        matched_path,
        rejected_path,
    })
}

/// Reads candidates from a CSV produced by this tool or by hand.
///
/// Header names are matched case-insensitively with spaces treated as
/// underscores; profile text comes from `text` or `text_snippet`. Rows with
/// missing trailing fields read them as empty, and extra fields are ignored.
pub fn read_candidates(path: &Path) -> Result<ImportedCandidates, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase().replace(' ', "_"))
        .collect();

    let mut candidates = Vec::new();
    let mut query = None;

    for record in reader.records() {
        let record = record?;
        let row: HashMap<&str, &str> = headers
            .iter()
            .map(String::as_str)
            .zip(record.iter())
            .collect();
        let field = |key: &str| row.get(key).copied().unwrap_or_default();

        if query.is_none() && !field("query").is_empty() {
            query = Some(field("query").to_string());
        }

        let highlights = field("highlights");
        let text = match field("text") {
            "" => field("text_snippet"),
            text => text,
        };

        candidates.push(
            Candidate::new(field("name"), field("linkedin_url"))
                .with_title(field("title"))
                .with_highlights(if highlights.is_empty() {
                    Vec::new()
                } else {
                    highlights.split(HIGHLIGHT_SEPARATOR).map(str::to_string).collect()
                })
                .with_text(text),
        );
    }

    Ok(ImportedCandidates { candidates, query })
}

fn write_filtered(
    path: &Path,
    outcomes: &[ClassificationOutcome],
    query: &str,
    timestamp: &str,
) -> Result<(), AppError> {
    let mut writer = append_writer(path)?;
    for ClassificationOutcome { candidate, verdict } in outcomes {
        writer.serialize(FilteredRow {
            timestamp,
            name: &candidate.name,
            linkedin_url: &candidate.linkedin_url,
            title: candidate.title.as_deref().unwrap_or_default(),
            query,
            highlights: candidate.joined_highlights(),
            is_match: verdict.is_match,
            confidence: format!("{:.2}", verdict.confidence),
            reason: &verdict.reason,
            current_company: verdict.current_company.as_deref().unwrap_or_default(),
            current_role: verdict.current_role.as_deref().unwrap_or_default(),
            graduation_year: verdict.graduation_year.as_deref().unwrap_or_default(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Opens `path` for appending; the header row is only emitted for new or empty files.
fn append_writer(path: &Path) -> Result<csv::Writer<fs::File>, AppError> {
    let has_content = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;

    Ok(csv::WriterBuilder::new()
        .has_headers(!has_content)
        .from_writer(file))
}

fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    Ok(())
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M").to_string()
}
