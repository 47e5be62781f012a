//! Filtering Core — classifies every candidate under a shared concurrency cap
//! and partitions the results into matched and rejected.
//!
//! Flow: resolve credential → build criteria → one worker per candidate
//! (bounded by a semaphore) → join in input order → partition by threshold.
//!
//! Every input candidate comes back in exactly one of the two lists. The only
//! error surfaced to callers is a missing credential, raised before any request.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::filtering::criteria::{build_criteria, FilterSpec};
use crate::filtering::prompts::build_prompt;
use crate::filtering::verdict::Verdict;
use crate::filtering::worker::{classify_candidate, Classifier, RetryPolicy};
use crate::llm_client::{LlmClient, LlmSettings};
use crate::models::candidate::Candidate;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;
pub const STRICT_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 20;
const DEFAULT_MAX_PROFILE_CHARS: usize = 2000;

/// Reason recorded for candidates still unresolved when the run deadline passes.
pub const DEADLINE_EXCEEDED_REASON: &str = "run deadline exceeded";

/// Knobs for a single filtering run.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Inclusive lower bound on confidence for a match to count.
    pub confidence_threshold: f64,
    /// Maximum classification requests in flight at once.
    pub concurrency_limit: usize,
    pub max_profile_chars: usize,
    pub retry: RetryPolicy,
    /// Overall wall-clock budget for the run.
    pub deadline: Option<Duration>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            max_profile_chars: DEFAULT_MAX_PROFILE_CHARS,
            retry: RetryPolicy::default(),
            deadline: None,
        }
    }
}

/// A candidate paired with its verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationOutcome {
    pub candidate: Candidate,
    pub verdict: Verdict,
}

/// Matched and rejected outcomes, each in original input order.
#[derive(Debug, Clone, Default)]
pub struct FilterResult {
    pub matched: Vec<ClassificationOutcome>,
    pub rejected: Vec<ClassificationOutcome>,
}

impl FilterResult {
    pub fn total(&self) -> usize {
        self.matched.len() + self.rejected.len()
    }
}

/// Classifies `candidates` against the OpenRouter endpoint configured in `config`.
///
/// Fails with `AppError::MissingCredential` before issuing any request when no
/// API key is configured. Per-candidate failures never fail the run.
pub async fn classify_all(
    config: &Config,
    candidates: Vec<Candidate>,
    query: &str,
    spec: Option<&FilterSpec>,
    options: &FilterOptions,
) -> Result<FilterResult, AppError> {
    let api_key = config.require_openrouter_key()?;
    let client = LlmClient::new(LlmSettings::from_config(config, api_key))?;
    info!("LLM client initialized (model: {})", client.model());

    Ok(run_filter(&client, candidates, query, spec, options).await)
}

/// Runs the classify-and-partition pipeline with an arbitrary classifier.
pub async fn run_filter(
    classifier: &dyn Classifier,
    candidates: Vec<Candidate>,
    query: &str,
    spec: Option<&FilterSpec>,
    options: &FilterOptions,
) -> FilterResult {
    let attempted = candidates.len();
    info!(
        "Filtering {} candidates (concurrency={}, threshold={})",
        attempted, options.concurrency_limit, options.confidence_threshold
    );

    let criteria = build_criteria(query, spec);
    let permits = Semaphore::new(options.concurrency_limit.clamp(1, Semaphore::MAX_PERMITS));
    // a budget past the end of representable time means no deadline
    let deadline = options
        .deadline
        .and_then(|budget| Instant::now().checked_add(budget));

    let workers = candidates.into_iter().map(|candidate| {
        let prompt = build_prompt(&candidate, &criteria, options.max_profile_chars);
        let permits = &permits;
        async move {
            let work = classify_candidate(classifier, &candidate, &prompt, permits, &options.retry);
            let verdict = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, work).await {
                    Ok(verdict) => verdict,
                    Err(_) => {
                        warn!("Run deadline reached before {} was classified", candidate.name);
                        Verdict::failure(DEADLINE_EXCEEDED_REASON)
                    }
                },
                None => work.await,
            };
            ClassificationOutcome { candidate, verdict }
        }
    });

    // join_all yields results in submission order, not completion order
    let outcomes = join_all(workers).await;
    let result = partition(outcomes, options.confidence_threshold);

    info!(
        "Filtered: {} → {} matched, {} rejected",
        attempted,
        result.matched.len(),
        result.rejected.len()
    );

    result
}

/// Splits outcomes by `verdict.match && confidence >= threshold`, keeping order.
pub fn partition(outcomes: Vec<ClassificationOutcome>, threshold: f64) -> FilterResult {
    let (matched, rejected) = outcomes
        .into_iter()
        .partition(|outcome| outcome.verdict.passes(threshold));
    FilterResult { matched, rejected }
}
