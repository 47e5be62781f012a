//! Terminal rendering: fixed-width tables for humans, JSON documents for agents.

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::export::FilteredExport;
use crate::filtering::engine::{ClassificationOutcome, FilterResult};
use crate::models::history::SearchHistoryRow;
use crate::search::SearchResponse;

/// Fits `text` into `width` characters, marking truncation with `…`.
pub fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return format!("{text:<width$}");
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub fn print_search_table(response: &SearchResponse) {
    println!("{}", format!("Results for: {}", response.query).bold());
    println!(
        "{}",
        format!("{} {} {} {}", fit("Name", 25), fit("LinkedIn URL", 40), fit("Title", 35), "Highlights")
            .dimmed()
    );
    for candidate in &response.results {
        let highlight = candidate
            .highlights
            .first()
            .map(|h| fit(h, 40))
            .unwrap_or_default();
        println!(
            "{} {} {} {}",
            fit(&candidate.name, 25).cyan().bold(),
            fit(&candidate.linkedin_url, 40).blue(),
            fit(candidate.title.as_deref().unwrap_or_default(), 35),
            highlight
        );
    }
}

pub fn print_filtered_table(query: &str, matched: &[ClassificationOutcome]) {
    println!("{}", format!("Filtered results for: {query}").bold());
    println!(
        "{}",
        format!("{} {} {} {}", fit("Name", 25), fit("Title", 30), fit("Confidence", 10), "Reason")
            .dimmed()
    );
    for ClassificationOutcome { candidate, verdict } in matched {
        let confidence = fit(&format!("{:.0}%", verdict.confidence * 100.0), 10);
        let confidence = if verdict.confidence >= 0.8 {
            confidence.green()
        } else {
            confidence.yellow()
        };
        println!(
            "{} {} {} {}",
            fit(&candidate.name, 25).cyan().bold(),
            fit(candidate.title.as_deref().unwrap_or_default(), 30),
            confidence,
            fit(&verdict.reason, 45)
        );
    }
}

pub fn print_history_table(rows: &[SearchHistoryRow]) {
    println!("{}", "Search History".bold());
    println!(
        "{}",
        format!("{} {} {} {} {}", fit("ID", 5), fit("Time", 16), fit("Query", 40), fit("Results", 7), "Cost")
            .dimmed()
    );
    for row in rows {
        let time: String = row.timestamp.chars().take(16).collect::<String>().replace('T', " ");
        let cost = match row.cost_dollars {
            Some(cost) if cost > 0.0 => format!("${cost:.4}"),
            _ => "-".to_string(),
        };
        println!(
            "{} {} {} {:>7} {}",
            fit(&row.id.to_string(), 5).dimmed(),
            fit(&time, 16).cyan(),
            fit(&row.query, 40).bold(),
            row.num_results,
            cost.green()
        );
    }
}

/// One-line run summary: attempted → matched (rejected, mode).
pub fn filter_summary(result: &FilterResult, strict: bool) -> String {
    format!(
        "Filtered: {} → {} candidates ({} rejected, {} mode)",
        result.total(),
        result.matched.len(),
        result.rejected.len(),
        if strict { "strict" } else { "normal" }
    )
}

#[derive(Debug, Serialize)]
struct JsonCandidate<'a> {
    name: &'a str,
    linkedin_url: &'a str,
    title: Option<&'a str>,
    highlights: &'a [String],
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    is_match: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_company: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_role: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    graduation_year: Option<Option<&'a str>>,
}

impl<'a> JsonCandidate<'a> {
    fn from_outcome(outcome: &'a ClassificationOutcome) -> Self {
        let ClassificationOutcome { candidate, verdict } = outcome;
        Self {
            name: &candidate.name,
            linkedin_url: &candidate.linkedin_url,
            title: candidate.title.as_deref(),
            highlights: &candidate.highlights,
            is_match: Some(verdict.is_match),
            confidence: Some(verdict.confidence),
            reason: Some(&verdict.reason),
            current_company: Some(verdict.current_company.as_deref()),
            current_role: Some(verdict.current_role.as_deref()),
            graduation_year: Some(verdict.graduation_year.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchJson<'a> {
    query: &'a str,
    timestamp: String,
    num_results: usize,
    cost_dollars: f64,
    results: Vec<JsonCandidate<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    csv_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct FilteredSearchJson<'a> {
    query: &'a str,
    timestamp: String,
    total_results: usize,
    filtered_results: usize,
    rejected: usize,
    confidence_threshold: f64,
    cost_dollars: f64,
    results: Vec<JsonCandidate<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    csv_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejected_csv_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefilterJson<'a> {
    input_file: String,
    query: &'a str,
    total_candidates: usize,
    matched: usize,
    rejected: usize,
    confidence_threshold: f64,
    matched_csv: String,
    rejected_csv: Option<String>,
}

pub fn search_json(
    response: &SearchResponse,
    csv_path: Option<&std::path::Path>,
) -> serde_json::Result<String> {
    let doc = SearchJson {
        query: &response.query,
        timestamp: Utc::now().to_rfc3339(),
        num_results: response.results.len(),
        cost_dollars: response.cost_dollars,
        results: response
            .results
            .iter()
            .map(|c| JsonCandidate {
                name: &c.name,
                linkedin_url: &c.linkedin_url,
                title: c.title.as_deref(),
                highlights: &c.highlights,
                is_match: None,
                confidence: None,
                reason: None,
                current_company: None,
                current_role: None,
                graduation_year: None,
            })
            .collect(),
        csv_path: csv_path.map(|p| p.display().to_string()),
    };
    serde_json::to_string_pretty(&doc)
}

/// Result document for a search that came back empty.
pub fn empty_search_json(query: &str) -> serde_json::Result<String> {
    serde_json::to_string(&serde_json::json!({
        "query": query,
        "num_results": 0,
        "results": [],
    }))
}

pub fn filtered_search_json(
    response: &SearchResponse,
    result: &FilterResult,
    threshold: f64,
    export: Option<&FilteredExport>,
) -> serde_json::Result<String> {
    let doc = FilteredSearchJson {
        query: &response.query,
        timestamp: Utc::now().to_rfc3339(),
        total_results: response.results.len(),
        filtered_results: result.matched.len(),
        rejected: result.rejected.len(),
        confidence_threshold: threshold,
        cost_dollars: response.cost_dollars,
        results: result.matched.iter().map(JsonCandidate::from_outcome).collect(),
        csv_path: export.map(|e| e.matched_path.display().to_string()),
        rejected_csv_path: export
            .and_then(|e| e.rejected_path.as_ref())
            .map(|p| p.display().to_string()),
    };
    serde_json::to_string_pretty(&doc)
}

pub fn refilter_json(
    input_file: &std::path::Path,
    query: &str,
    result: &FilterResult,
    threshold: f64,
    export: &FilteredExport,
) -> serde_json::Result<String> {
    let doc = RefilterJson {
        input_file: input_file.display().to_string(),
        query,
        total_candidates: result.total(),
        matched: result.matched.len(),
        rejected: result.rejected.len(),
        confidence_threshold: threshold,
        matched_csv: export.matched_path.display().to_string(),
        rejected_csv: export.rejected_path.as_ref().map(|p| p.display().to_string()),
    };
    serde_json::to_string_pretty(&doc)
}
