//! Criteria Builder — turns a query or structured filter config into the
//! natural-language criteria block embedded in every classification prompt.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Structured filter config, usually loaded from `--filter-config <file>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub company: Option<String>,
    pub company_aliases: Vec<String>,
    pub roles: Vec<String>,
    pub graduation_years: Vec<GraduationYear>,
    pub require_current: bool,
    pub extra: Option<String>,
}

/// Graduation years appear as both numbers and strings in hand-written configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraduationYear {
    Number(i64),
    Text(String),
}

impl fmt::Display for GraduationYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraduationYear::Number(n) => write!(f, "{n}"),
            GraduationYear::Text(s) => f.write_str(s),
        }
    }
}

impl FilterSpec {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read filter config {}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Builds the criteria string shared by every candidate in a run.
///
/// Structured fields win over the query when at least one is populated;
/// lines always appear in the order company, roles, years, current, extra.
pub fn build_criteria(query: &str, spec: Option<&FilterSpec>) -> String {
    let Some(spec) = spec else {
        return query.to_string();
    };

    let mut parts = Vec::new();

    if let Some(company) = spec.company.as_deref().filter(|c| !c.is_empty()) {
        let mut company_str = company.to_string();
        if !spec.company_aliases.is_empty() {
            company_str.push_str(&format!(
                " (also known as: {})",
                spec.company_aliases.join(", ")
            ));
        }
        parts.push(format!("- Target company: {company_str}"));
    }

    if !spec.roles.is_empty() {
        parts.push(format!("- Target roles: {}", spec.roles.join(", ")));
    }

    if !spec.graduation_years.is_empty() {
        let years: Vec<String> = spec.graduation_years.iter().map(|y| y.to_string()).collect();
        parts.push(format!("- Graduation years: {}", years.join(", ")));
    }

    if spec.require_current {
        parts.push("- Must be CURRENTLY at the target company (not former)".to_string());
    }

    if let Some(extra) = spec.extra.as_deref().filter(|e| !e.is_empty()) {
        parts.push(format!("- Additional: {extra}"));
    }

    if parts.is_empty() {
        query.to_string()
    } else {
        parts.join("\n")
    }
}
