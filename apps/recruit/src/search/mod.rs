/// People Search — thin client over Exa's `/search` endpoint restricted to the
/// `people` category. Produces `Candidate` records for filtering and export.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::candidate::Candidate;

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
const HIGHLIGHT_SENTENCES: u32 = 3;
const HIGHLIGHTS_PER_URL: u32 = 3;
const PROFILE_TEXT_MAX_CHARS: u32 = 2000;
pub const MAX_NUM_RESULTS: u32 = 100;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid search request: {0}")]
    InvalidRequest(String),
}

/// Exa search modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Auto,
    Neural,
    Fast,
    Deep,
    Instant,
}

impl FromStr for SearchType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(SearchType::Auto),
            "neural" => Ok(SearchType::Neural),
            "fast" => Ok(SearchType::Fast),
            "deep" => Ok(SearchType::Deep),
            "instant" => Ok(SearchType::Instant),
            other => Err(SearchError::InvalidRequest(format!(
                "unknown search type '{other}' (expected auto, neural, fast, deep or instant)"
            ))),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchType::Auto => "auto",
            SearchType::Neural => "neural",
            SearchType::Fast => "fast",
            SearchType::Deep => "deep",
            SearchType::Instant => "instant",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub num_results: u32,
    pub search_type: SearchType,
    /// ISO 3166-1 alpha-2 country code used to bias results.
    pub location: Option<String>,
    pub include_text: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            num_results: 10,
            search_type: SearchType::Auto,
            location: None,
            include_text: false,
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.query.trim().is_empty() {
            return Err(SearchError::InvalidRequest("query must not be empty".to_string()));
        }
        if !(1..=MAX_NUM_RESULTS).contains(&self.num_results) {
            return Err(SearchError::InvalidRequest(format!(
                "num_results must be between 1 and {MAX_NUM_RESULTS}"
            )));
        }
        Ok(())
    }

    fn to_body(&self) -> Value {
        let mut contents = json!({
            "highlights": {
                "numSentences": HIGHLIGHT_SENTENCES,
                "highlightsPerUrl": HIGHLIGHTS_PER_URL,
            }
        });
        if self.include_text {
            contents["text"] = json!({ "maxCharacters": PROFILE_TEXT_MAX_CHARS });
        }

        let mut body = json!({
            "query": self.query,
            "category": "people",
            "numResults": self.num_results,
            "type": self.search_type,
            "contents": contents,
        });
        if let Some(location) = &self.location {
            body["userLocation"] = json!(location);
        }
        body
    }
}

/// Candidates returned for one query plus what the call cost.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<Candidate>,
    pub cost_dollars: f64,
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
    #[serde(rename = "costDollars")]
    cost_dollars: Option<ExaCost>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    title: Option<String>,
    url: Option<String>,
    author: Option<String>,
    #[serde(default)]
    highlights: Option<Vec<String>>,
    text: Option<String>,
}

/// Exa reports cost either as `{"total": n}` or a bare number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExaCost {
    Breakdown { total: Option<f64> },
    Total(f64),
}

impl ExaCost {
    fn total(&self) -> f64 {
        match self {
            ExaCost::Breakdown { total } => total.unwrap_or(0.0),
            ExaCost::Total(total) => *total,
        }
    }
}

#[derive(Clone)]
pub struct ExaClient {
    client: Client,
    api_key: String,
}

impl ExaClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SearchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        request.validate()?;
        info!(
            "Searching Exa people: query={:?} num_results={} type={}",
            request.query, request.num_results, request.search_type
        );

        let response = self
            .client
            .post(EXA_SEARCH_URL)
            .header("x-api-key", &self.api_key)
            .json(&request.to_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let exa: ExaResponse = response.json().await?;
        let response = into_search_response(&request.query, exa);
        debug!(
            "Exa returned {} results (cost ${:.4})",
            response.results.len(),
            response.cost_dollars
        );
        Ok(response)
    }
}

fn into_search_response(query: &str, exa: ExaResponse) -> SearchResponse {
    let results = exa.results.into_iter().map(into_candidate).collect();
    SearchResponse {
        query: query.to_string(),
        results,
        cost_dollars: exa.cost_dollars.map(|c| c.total()).unwrap_or(0.0),
    }
}

fn into_candidate(result: ExaResult) -> Candidate {
    let (name, title) = split_profile_title(result.title.as_deref().unwrap_or_default());
    let name = if name.is_empty() {
        result.author.unwrap_or_default()
    } else {
        name
    };

    Candidate::new(name, result.url.unwrap_or_default())
        .with_title(title)
        .with_highlights(result.highlights.unwrap_or_default())
        .with_text(result.text.unwrap_or_default())
}

/// Splits a LinkedIn page title such as `"Jane Doe | Staff Engineer | LinkedIn"`
/// into `("Jane Doe", "Staff Engineer")`.
fn split_profile_title(raw: &str) -> (String, String) {
    let cleaned = raw.replace(" | LinkedIn", "");
    let mut parts = cleaned.trim().split(" | ").map(str::trim);
    let name = parts.next().unwrap_or_default().to_string();
    let title = parts.collect::<Vec<_>>().join(" | ");
    (name, title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_title_with_role() {
        let (name, title) = split_profile_title("Jane Doe | Staff Engineer at Acme | LinkedIn");
        assert_eq!(name, "Jane Doe");
        assert_eq!(title, "Staff Engineer at Acme");
    }

    #[test]
    fn test_split_title_keeps_multi_part_role() {
        let (name, title) = split_profile_title("Jane Doe | Engineer | Acme | LinkedIn");
        assert_eq!(name, "Jane Doe");
        assert_eq!(title, "Engineer | Acme");
    }

    #[test]
    fn test_split_title_name_only() {
        let (name, title) = split_profile_title("Jane Doe");
        assert_eq!(name, "Jane Doe");
        assert_eq!(title, "");
    }

    #[test]
    fn test_into_search_response_maps_fields_and_cost() {
        let json = r#"{
            "results": [
                {
                    "title": "Jane Doe | Staff Engineer | LinkedIn",
                    "url": "https://linkedin.com/in/jane",
                    "highlights": ["Led the payments team"],
                    "text": "Jane has 10 years of experience."
                },
                {
                    "title": "",
                    "url": "https://linkedin.com/in/anon",
                    "author": "Alex Author"
                }
            ],
            "costDollars": {"total": 0.015}
        }"#;
        let exa: ExaResponse = serde_json::from_str(json).unwrap();
        let response = into_search_response("staff engineers", exa);

        assert_eq!(response.query, "staff engineers");
        assert!((response.cost_dollars - 0.015).abs() < f64::EPSILON);
        assert_eq!(response.results.len(), 2);

        let jane = &response.results[0];
        assert_eq!(jane.name, "Jane Doe");
        assert_eq!(jane.title.as_deref(), Some("Staff Engineer"));
        assert_eq!(jane.highlights, vec!["Led the payments team".to_string()]);
        assert_eq!(jane.text.as_deref(), Some("Jane has 10 years of experience."));

        let anon = &response.results[1];
        assert_eq!(anon.name, "Alex Author");
        assert!(anon.title.is_none());
        assert!(anon.highlights.is_empty());
    }

    #[test]
    fn test_bare_number_cost() {
        let exa: ExaResponse =
            serde_json::from_str(r#"{"results": [], "costDollars": 0.005}"#).unwrap();
        assert!((into_search_response("q", exa).cost_dollars - 0.005).abs() < f64::EPSILON);
    }

    #[test]
    fn test_request_body_includes_text_and_location_when_set() {
        let request = SearchRequest {
            location: Some("US".to_string()),
            include_text: true,
            search_type: SearchType::Deep,
            num_results: 25,
            ..SearchRequest::new("ml researchers")
        };
        let body = request.to_body();
        assert_eq!(body["category"], "people");
        assert_eq!(body["numResults"], 25);
        assert_eq!(body["type"], "deep");
        assert_eq!(body["userLocation"], "US");
        assert_eq!(body["contents"]["text"]["maxCharacters"], 2000);
        assert_eq!(body["contents"]["highlights"]["numSentences"], 3);
    }

    #[test]
    fn test_request_body_omits_optional_fields() {
        let body = SearchRequest::new("q").to_body();
        assert!(body.get("userLocation").is_none());
        assert!(body["contents"].get("text").is_none());
    }

    #[test]
    fn test_validate_num_results_bounds() {
        let mut request = SearchRequest::new("q");
        request.num_results = 0;
        assert!(request.validate().is_err());
        request.num_results = 101;
        assert!(request.validate().is_err());
        request.num_results = 100;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_search_type_parsing() {
        assert_eq!("Instant".parse::<SearchType>().unwrap(), SearchType::Instant);
        assert!("semantic".parse::<SearchType>().is_err());
    }
}
