use thiserror::Error;

use crate::llm_client::LlmError;
use crate::search::SearchError;

/// Application-level error type.
/// Per-candidate classification failures never reach this type; they are folded
/// into the candidate's verdict instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found. Set it in .env or as an environment variable.")]
    MissingCredential(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No results: {0}")]
    NoResults(String),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit code for this error.
    /// 2 = missing credential, 3 = nothing to work on, 1 = everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::MissingCredential(_) => 2,
            AppError::NoResults(_) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message_names_the_variable() {
        let err = AppError::MissingCredential("OPENROUTER_API_KEY");
        assert!(err.to_string().starts_with("OPENROUTER_API_KEY not found"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::MissingCredential("EXA_API_KEY").exit_code(), 2);
        assert_eq!(AppError::NoResults("empty".to_string()).exit_code(), 3);
        assert_eq!(AppError::Validation("bad".to_string()).exit_code(), 1);
    }
}
