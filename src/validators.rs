//! Input Validators - Deterministic syntactic and safety checks
//!
//! Questions and SPL strings are checked here before they reach the
//! completion service or the search backend. Every function returns
//! `Ok(())` or `Err(EngineError::Input)` with a human-readable message.

use crate::error::{EngineError, EngineResult};
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_QUESTION_LEN: usize = 5;
pub const MAX_QUESTION_LEN: usize = 1000;
pub const MAX_SPL_LEN: usize = 5000;
pub const MIN_MAX_RESULTS: usize = 1;
pub const MAX_MAX_RESULTS: usize = 10_000;

/// Verbs that write, delete or exfiltrate data
pub const DANGEROUS_COMMANDS: &[&str] = &[
    "delete",
    "drop",
    "truncate",
    "alter",
    "create",
    "update",
    "insert",
    "outputcsv",
    "outputlookup",
    "script",
    "sendemail",
];

/// Injection attempts aimed at the completion prompt
static UNSAFE_QUESTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<script",
        r"(?i)javascript:",
        r"(?i)eval\s*\(",
        r"(?i)exec\s*\(",
        r"(?i)system\s*\(",
        r"(?i)__import__",
        r"(?i)subprocess",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static DANGEROUS_COMMAND_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    DANGEROUS_COMMANDS
        .iter()
        .filter_map(|cmd| {
            Regex::new(&format!(r"(?i)\b{}\b", cmd))
                .ok()
                .map(|re| (*cmd, re))
        })
        .collect()
});

/// Validate a natural language question
pub fn validate_question(question: &str) -> EngineResult<()> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(EngineError::input_field("Question cannot be empty", "question"));
    }

    if trimmed.chars().count() < MIN_QUESTION_LEN {
        return Err(EngineError::input_field(
            format!("Question must be at least {} characters long", MIN_QUESTION_LEN),
            "question",
        ));
    }

    if question.chars().count() > MAX_QUESTION_LEN {
        return Err(EngineError::input_field(
            format!("Question must be less than {} characters", MAX_QUESTION_LEN),
            "question",
        ));
    }

    if UNSAFE_QUESTION_PATTERNS.iter().any(|re| re.is_match(question)) {
        return Err(EngineError::input_field(
            "Question contains potentially unsafe content",
            "question",
        ));
    }

    Ok(())
}

/// Validate an SPL query for basic safety and syntax
pub fn validate_spl_query(query: &str) -> EngineResult<()> {
    let query = query.trim();
    if query.is_empty() {
        return Err(EngineError::input_field("SPL query cannot be empty", "spl_query"));
    }

    if query.chars().count() > MAX_SPL_LEN {
        return Err(EngineError::input_field(
            format!("SPL query too long (max {} characters)", MAX_SPL_LEN),
            "spl_query",
        ));
    }

    if !query.to_lowercase().starts_with("search") {
        return Err(EngineError::input_field(
            "SPL query must start with 'search' command",
            "spl_query",
        ));
    }

    if let Some((cmd, _)) = DANGEROUS_COMMAND_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(query))
    {
        return Err(EngineError::input_field(
            format!("SPL query contains potentially dangerous command: {}", cmd),
            "spl_query",
        ));
    }

    if has_malformed_pipes(query) {
        return Err(EngineError::input_field(
            "Invalid pipe usage in SPL query",
            "spl_query",
        ));
    }

    Ok(())
}

/// Leading pipe, or two pipes separated only by whitespace
fn has_malformed_pipes(query: &str) -> bool {
    let mut previous = None;
    for c in query.chars().filter(|c| !c.is_whitespace()) {
        if c == '|' && matches!(previous, None | Some('|')) {
            return true;
        }
        previous = Some(c);
    }
    false
}

/// Validate the requested result cap
pub fn validate_max_results(max_results: usize) -> EngineResult<()> {
    if max_results < MIN_MAX_RESULTS {
        return Err(EngineError::input_field(
            "max_results must be greater than 0",
            "max_results",
        ));
    }

    if max_results > MAX_MAX_RESULTS {
        return Err(EngineError::input_field(
            "max_results cannot exceed 10,000",
            "max_results",
        ));
    }

    Ok(())
}

/// Strip NUL bytes and collapse whitespace runs
pub fn sanitize_input(input: &str) -> String {
    input
        .replace('\0', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
