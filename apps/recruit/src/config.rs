use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::errors::AppError;

const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_FILTER_MODEL: &str = "anthropic/claude-haiku-4.5";
const DEFAULT_FILTER_MAX_TOKENS: u32 = 200;
const DEFAULT_MAX_PROFILE_CHARS: usize = 2000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Application configuration loaded from `.env` and environment variables.
///
/// API keys are optional at load time: `history` and `version` work without
/// them, and each command asks for the key it needs via `require_*`.
#[derive(Debug, Clone)]
pub struct Config {
    pub exa_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub filter_model: String,
    pub filter_max_tokens: u32,
    pub max_profile_chars: usize,
    pub request_timeout: Duration,
    pub history_db_path: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            exa_api_key: optional_env("EXA_API_KEY"),
            openrouter_api_key: optional_env("OPENROUTER_API_KEY"),
            openrouter_base_url: optional_env("OPENROUTER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string()),
            filter_model: optional_env("RECRUIT_FILTER_MODEL")
                .unwrap_or_else(|| DEFAULT_FILTER_MODEL.to_string()),
            filter_max_tokens: parse_env("RECRUIT_FILTER_MAX_TOKENS", DEFAULT_FILTER_MAX_TOKENS)?,
            max_profile_chars: parse_env("RECRUIT_MAX_PROFILE_CHARS", DEFAULT_MAX_PROFILE_CHARS)?,
            request_timeout: Duration::from_secs(parse_env(
                "RECRUIT_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            history_db_path: match optional_env("RECRUIT_HISTORY_DB") {
                Some(path) => PathBuf::from(path),
                None => default_history_path().context(
                    "Could not determine the home directory; set RECRUIT_HISTORY_DB",
                )?,
            },
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "warn".to_string()),
        })
    }

    pub fn require_exa_key(&self) -> Result<&str, AppError> {
        self.exa_api_key
            .as_deref()
            .ok_or(AppError::MissingCredential("EXA_API_KEY"))
    }

    pub fn require_openrouter_key(&self) -> Result<&str, AppError> {
        self.openrouter_api_key
            .as_deref()
            .ok_or(AppError::MissingCredential("OPENROUTER_API_KEY"))
    }
}

/// Masks a secret for display: first 8 and last 4 characters.
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

/// `~/.config/exa-recruit/history.db`, or `None` when the platform reports no home directory.
fn default_history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("exa-recruit").join("history.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_keys() -> Config {
        Config {
            exa_api_key: None,
            openrouter_api_key: None,
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            filter_model: DEFAULT_FILTER_MODEL.to_string(),
            filter_max_tokens: DEFAULT_FILTER_MAX_TOKENS,
            max_profile_chars: DEFAULT_MAX_PROFILE_CHARS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            history_db_path: PathBuf::from("history.db"),
            rust_log: "warn".to_string(),
        }
    }

    #[test]
    fn test_require_openrouter_key_missing_is_credential_error() {
        let config = config_without_keys();
        let err = config.require_openrouter_key().unwrap_err();
        assert!(matches!(err, AppError::MissingCredential("OPENROUTER_API_KEY")));
    }

    #[test]
    fn test_require_exa_key_present() {
        let mut config = config_without_keys();
        config.exa_api_key = Some("exa-123".to_string());
        assert_eq!(config.require_exa_key().unwrap(), "exa-123");
    }

    #[test]
    fn test_redact_keeps_head_and_tail() {
        assert_eq!(redact("sk-or-v1-abcdef123456"), "sk-or-v1...3456");
    }

    #[test]
    fn test_redact_short_secret_fully_masked() {
        assert_eq!(redact("short"), "*****");
    }

    #[test]
    fn test_default_history_path_is_under_home_dir() {
        let home = dirs::home_dir().expect("test environment has a home directory");
        let path = default_history_path().unwrap();
        assert!(path.starts_with(&home));
        assert!(path.ends_with(".config/exa-recruit/history.db"));
    }
}
