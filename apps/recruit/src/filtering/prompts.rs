// Prompt template and builder for candidate classification.

use crate::models::candidate::Candidate;

/// Classification prompt template.
/// Replace `{criteria}`, `{name}`, `{title}`, `{text}` and `{highlights}` before sending.
pub const FILTER_PROMPT_TEMPLATE: &str = r#"You are a recruiting filter. Given a candidate's LinkedIn profile data and search criteria, determine if this person is a genuine match.

Search criteria:
{criteria}

Candidate profile:
- Name: {name}
- Current title: {title}
- Profile text: {text}
- Highlights: {highlights}

Respond with ONLY this JSON (no markdown, no explanation):
{"match": true, "confidence": 0.95, "reason": "one sentence", "current_company": "extracted company name or null", "current_role": "extracted role or null", "graduation_year": "extracted year or null"}"#;

const UNKNOWN_TITLE: &str = "(unknown)";
const NO_PROFILE_TEXT: &str = "(no profile text available)";
const NO_HIGHLIGHTS: &str = "(none)";

/// Builds the exact prompt sent to the model for one candidate.
/// Profile text is cut to `max_profile_chars` characters.
pub fn build_prompt(candidate: &Candidate, criteria: &str, max_profile_chars: usize) -> String {
    let title = candidate
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_TITLE);

    let text = candidate
        .text
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| truncate_chars(t, max_profile_chars))
        .unwrap_or(NO_PROFILE_TEXT);

    let highlights = if candidate.highlights.is_empty() {
        NO_HIGHLIGHTS.to_string()
    } else {
        candidate.joined_highlights()
    };

    fill_placeholders(
        FILTER_PROMPT_TEMPLATE,
        &[
            ("criteria", criteria),
            ("name", &candidate.name),
            ("title", title),
            ("text", text),
            ("highlights", &highlights),
        ],
    )
}

/// Single left-to-right pass over `template`: each `{key}` is replaced once and
/// substituted values are never scanned again. Other braces pass through.
fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = values.iter().find_map(|(key, value)| {
            tail.strip_prefix(key)?
                .strip_prefix('}')
                .map(|after| (*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate::new("Grace Hopper", "https://linkedin.com/in/grace")
            .with_title("Rear Admiral | US Navy")
            .with_highlights(vec![
                "Invented the compiler".to_string(),
                "COBOL".to_string(),
            ])
            .with_text("Computer scientist and naval officer.")
    }

    #[test]
    fn test_prompt_contains_all_fields() {
        let prompt = build_prompt(&candidate(), "- Target roles: Engineer", 2000);
        assert!(prompt.contains("Search criteria:\n- Target roles: Engineer\n"));
        assert!(prompt.contains("- Name: Grace Hopper"));
        assert!(prompt.contains("- Current title: Rear Admiral | US Navy"));
        assert!(prompt.contains("- Profile text: Computer scientist and naval officer."));
        assert!(prompt.contains("- Highlights: Invented the compiler | COBOL"));
        assert!(prompt.contains(r#"{"match": true, "confidence": 0.95"#));
    }

    #[test]
    fn test_placeholders_for_missing_fields() {
        let bare = Candidate::new("Anon", "u");
        let prompt = build_prompt(&bare, "criteria", 2000);
        assert!(prompt.contains("- Current title: (unknown)"));
        assert!(prompt.contains("- Profile text: (no profile text available)"));
        assert!(prompt.contains("- Highlights: (none)"));
    }

    #[test]
    fn test_profile_text_truncated_by_characters() {
        let long = Candidate::new("A", "u").with_text("é".repeat(50));
        let prompt = build_prompt(&long, "c", 10);
        let expected = format!("- Profile text: {}\n", "é".repeat(10));
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"é".repeat(11)));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_prompt(&candidate(), "c", 2000);
        let b = build_prompt(&candidate(), "c", 2000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_criteria_with_placeholder_text_is_left_alone() {
        let prompt = build_prompt(&candidate(), "mention {name} literally", 2000);
        assert!(prompt.contains("mention {name} literally"));
    }

    #[test]
    fn test_placeholder_text_inside_candidate_data_is_kept_verbatim() {
        let tricky = Candidate::new("Robert {title}", "u")
            .with_title("Engineer")
            .with_text("Writes about {highlights} and {criteria} syntax")
            .with_highlights(vec!["Shipped".to_string()]);
        let prompt = build_prompt(&tricky, "Senior engineers", 2000);

        assert!(prompt.contains("- Name: Robert {title}\n"));
        assert!(prompt.contains("- Current title: Engineer\n"));
        assert!(prompt.contains("- Profile text: Writes about {highlights} and {criteria} syntax\n"));
        assert!(prompt.contains("- Highlights: Shipped\n"));
        assert!(prompt.contains("Search criteria:\nSenior engineers\n"));
    }

    #[test]
    fn test_fill_placeholders_leaves_unknown_braces() {
        assert_eq!(
            fill_placeholders(r#"{"a": 1} {x} {y"#, &[("x", "{y}")]),
            r#"{"a": 1} {y} {y"#
        );
    }

    #[test]
    fn test_no_unfilled_placeholders_remain() {
        let prompt = build_prompt(&candidate(), "c", 2000);
        for placeholder in ["{criteria}", "{name}", "{title}", "{text}", "{highlights}"] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
    }
}
