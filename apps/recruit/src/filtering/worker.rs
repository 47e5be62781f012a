//! Classification Worker — classifies one candidate with bounded retry.
//!
//! Each attempt walks an explicit state machine:
//!
//! ```text
//! Pending ─► InFlight(n) ─┬─► Succeeded(verdict)
//!                         ├─► RateLimited(n) ──(base·2ⁿ sleep)──► InFlight(n+1)
//!                         ├─► TransientFailure(n) ──(fixed sleep)──► InFlight(n+1)
//!                         └─► Exhausted(failure verdict)       (n = last attempt)
//! ```
//!
//! The worker never returns an error: exhausted retries become a non-match verdict.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::filtering::verdict::{parse_verdict, try_parse_verdict, Verdict};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::candidate::Candidate;

/// Reason recorded when every attempt was rate limited.
pub const RATE_LIMITED_REASON: &str = "rate limited after retries";

/// Anything that can answer a classification prompt with raw model text.
///
/// `LlmClient` is the production implementation; tests swap in fakes.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, prompt: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl Classifier for LlmClient {
    async fn classify(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await
    }
}

/// Retry behaviour for a single candidate.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// First rate-limit backoff; doubles on each further attempt.
    pub base_backoff: Duration,
    /// Fixed delay after any non-rate-limit failure.
    pub transient_delay: Duration,
    /// Re-issue the request when the model output is not valid JSON.
    pub retry_parse_failures: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            transient_delay: Duration::from_secs(1),
            retry_parse_failures: false,
        }
    }
}

impl RetryPolicy {
    /// Backoff after the rate-limited attempt `attempt` (zero-based): base·2ⁿ.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << attempt.min(20))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn is_last(&self, attempt: u32) -> bool {
        attempt + 1 >= self.attempts()
    }
}

/// Where a candidate's classification currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Pending,
    InFlight { attempt: u32 },
    RateLimited { attempt: u32 },
    TransientFailure { attempt: u32, error: String },
    Succeeded(Verdict),
    Exhausted(Verdict),
}

/// What a single request/response cycle produced.
#[derive(Debug)]
pub enum AttemptOutcome {
    Parsed(Verdict),
    /// Raw model text that did not parse as a verdict.
    Unparseable(String),
    RateLimited,
    Failed(String),
}

impl AttemptState {
    /// Transition out of `InFlight { attempt }` given that attempt's outcome.
    pub fn after_attempt(attempt: u32, outcome: AttemptOutcome, policy: &RetryPolicy) -> Self {
        let last = policy.is_last(attempt);
        match outcome {
            AttemptOutcome::Parsed(verdict) => AttemptState::Succeeded(verdict),
            AttemptOutcome::Unparseable(_) if policy.retry_parse_failures && !last => {
                AttemptState::TransientFailure {
                    attempt,
                    error: "unparseable model response".to_string(),
                }
            }
            AttemptOutcome::Unparseable(raw) => AttemptState::Exhausted(parse_verdict(&raw)),
            AttemptOutcome::RateLimited if last => {
                AttemptState::Exhausted(Verdict::failure(RATE_LIMITED_REASON))
            }
            AttemptOutcome::RateLimited => AttemptState::RateLimited { attempt },
            AttemptOutcome::Failed(error) if last => {
                AttemptState::Exhausted(Verdict::failure(format!("API error: {error}")))
            }
            AttemptOutcome::Failed(error) => AttemptState::TransientFailure { attempt, error },
        }
    }
}

/// Classifies one candidate, retrying transient failures per `policy`.
///
/// A permit from `permits` is held only for the duration of each request, so
/// candidates sleeping in backoff do not count against the concurrency limit.
pub async fn classify_candidate(
    classifier: &dyn Classifier,
    candidate: &Candidate,
    prompt: &str,
    permits: &Semaphore,
    policy: &RetryPolicy,
) -> Verdict {
    let mut state = AttemptState::Pending;

    loop {
        state = match state {
            AttemptState::Pending => AttemptState::InFlight { attempt: 0 },
            AttemptState::InFlight { attempt } => {
                let outcome = attempt_once(classifier, prompt, permits).await;
                AttemptState::after_attempt(attempt, outcome, policy)
            }
            AttemptState::RateLimited { attempt } => {
                let delay = policy.backoff_delay(attempt);
                warn!(
                    "Rate limited classifying {} (attempt {}), retrying after {}ms...",
                    candidate.name,
                    attempt + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                AttemptState::InFlight {
                    attempt: attempt + 1,
                }
            }
            AttemptState::TransientFailure { attempt, error } => {
                warn!(
                    "Classification attempt {} for {} failed: {}; retrying after {}ms...",
                    attempt + 1,
                    candidate.name,
                    error,
                    policy.transient_delay.as_millis()
                );
                tokio::time::sleep(policy.transient_delay).await;
                AttemptState::InFlight {
                    attempt: attempt + 1,
                }
            }
            AttemptState::Succeeded(verdict) => {
                debug!(
                    "Classified {}: match={} confidence={:.2}",
                    candidate.name, verdict.is_match, verdict.confidence
                );
                return verdict;
            }
            AttemptState::Exhausted(verdict) => {
                warn!("Giving up on {}: {}", candidate.name, verdict.reason);
                return verdict;
            }
        };
    }
}

async fn attempt_once(
    classifier: &dyn Classifier,
    prompt: &str,
    permits: &Semaphore,
) -> AttemptOutcome {
    let response = {
        let _permit = match permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => return AttemptOutcome::Failed(e.to_string()),
        };
        classifier.classify(prompt).await
    };

    match response {
        Ok(text) => match try_parse_verdict(&text) {
            Ok(verdict) => AttemptOutcome::Parsed(verdict),
            Err(e) => {
                debug!("Model response is not a verdict: {e}");
                AttemptOutcome::Unparseable(text)
            }
        },
        Err(e) if e.is_rate_limited() => AttemptOutcome::RateLimited,
        Err(e) => AttemptOutcome::Failed(e.to_string()),
    }
}
