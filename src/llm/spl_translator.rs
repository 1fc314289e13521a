//! SPL Translator - Natural language to SPL through the completion service
//!
//! `translate` tolerates free-form completions: it tries a JSON object
//! first, then scans lines for a query, and finally degrades to an empty
//! query with low confidence. `enhance` requires strict JSON.
//! Neither method returns an error; failures are encoded in the result.

use crate::cache::EnvironmentContext;
use crate::config::LlmConfig;
use crate::llm::openai_client::{strip_code_fences, CompletionClient, CompletionRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Advisory label produced by the completion service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    /// Unknown labels read as medium
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "low" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslationResult {
    pub success: bool,
    pub spl_query: String,
    pub explanation: String,
    pub confidence: Confidence,
    pub original_question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranslationResult {
    pub fn failed(question: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            spl_query: String::new(),
            explanation: String::new(),
            confidence: Confidence::Low,
            original_question: question.to_string(),
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub success: bool,
    pub enhanced_query: String,
    pub changes: String,
    pub confidence: Confidence,
    pub original_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Query, explanation and confidence extracted from a completion
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSpl {
    pub query: String,
    pub explanation: String,
    pub confidence: Confidence,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSpl {
    query: Option<String>,
    explanation: Option<String>,
    confidence: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawEnhancement {
    query: Option<String>,
    changes: Option<String>,
    confidence: Option<String>,
}

const TRANSLATE_PROMPT: &str = r#"You are an expert Splunk SPL (Search Processing Language) query generator. Your task is to convert natural language questions into accurate SPL queries.

SPL Syntax Guidelines:
- Always start with 'search' command
- Use pipe (|) to chain commands
- Common commands: search, stats, eval, where, sort, head, tail, table, fields
- Time ranges: earliest=-1h, latest=now, etc.
- Field operations: field=value, field!="value", field>10
- Statistics: count, sum, avg, max, min, dc (distinct count)
- Grouping: by field_name

Common Patterns:
- Error logs: search index=* error OR failed | head 100
- Login events: search index=security action=login | stats count by user
- Time-based: search index=* earliest=-24h latest=now
- Top values: search index=* | top 10 field_name
- Failed attempts: search index=* (failed OR error) | stats count by host

Response Format:
Provide your response as JSON with these fields:
{
    "query": "the SPL query",
    "explanation": "brief explanation of what the query does",
    "confidence": "high|medium|low"
}
"#;

const ENHANCE_PROMPT: &str = r#"You are an expert at improving SPL queries. Given an existing SPL query and user feedback, provide an improved version.

Focus on:
- Performance optimization
- Better field selection
- More specific filtering
- Proper time ranges
- Statistical accuracy

Respond with JSON format:
{
    "query": "improved SPL query",
    "changes": "description of changes made",
    "confidence": "high|medium|low"
}"#;

/// Translation gateway over a completion client
pub struct SplTranslator {
    client: Arc<dyn CompletionClient>,
    temperature: f32,
    translate_max_tokens: u32,
    enhance_max_tokens: u32,
}

impl SplTranslator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self::with_config(client, &LlmConfig::default())
    }

    pub fn with_config(client: Arc<dyn CompletionClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            temperature: config.temperature,
            translate_max_tokens: config.translate_max_tokens,
            enhance_max_tokens: config.enhance_max_tokens,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.client.has_credentials()
    }

    /// Convert a natural language question to SPL
    pub async fn translate(&self, question: &str, context: Option<&EnvironmentContext>) -> TranslationResult {
        info!("Converting natural language to SPL: {}", question);

        let request = CompletionRequest {
            system: build_system_prompt(context),
            user: format!("Convert this question to SPL: {}", question),
            temperature: self.temperature,
            max_tokens: self.translate_max_tokens,
        };

        match self.client.complete(request).await {
            Ok(content) => {
                let parsed = parse_spl_response(&content);
                info!("Generated SPL: {}", parsed.query);
                TranslationResult {
                    success: true,
                    spl_query: parsed.query,
                    explanation: parsed.explanation,
                    confidence: parsed.confidence,
                    original_question: question.to_string(),
                    error: None,
                }
            }
            Err(e) => {
                error!("Failed to convert natural language to SPL: {}", e);
                TranslationResult::failed(question, e.to_string())
            }
        }
    }

    /// Improve an existing query given free-text feedback
    pub async fn enhance(&self, spl_query: &str, feedback: &str) -> EnhancementResult {
        let request = CompletionRequest {
            system: ENHANCE_PROMPT.to_string(),
            user: format!(
                "Original query: {}\nFeedback: {}\nProvide an improved query.",
                spl_query, feedback
            ),
            temperature: self.temperature,
            max_tokens: self.enhance_max_tokens,
        };

        let outcome = match self.client.complete(request).await {
            Ok(content) => parse_enhancement(&content),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(raw) => EnhancementResult {
                success: true,
                enhanced_query: raw.query.unwrap_or_else(|| spl_query.to_string()),
                changes: raw.changes.unwrap_or_default(),
                confidence: raw
                    .confidence
                    .as_deref()
                    .map(Confidence::from_label)
                    .unwrap_or_default(),
                original_query: spl_query.to_string(),
                error: None,
            },
            Err(e) => {
                error!("Failed to enhance SPL query: {}", e);
                EnhancementResult {
                    success: false,
                    enhanced_query: String::new(),
                    changes: String::new(),
                    confidence: Confidence::Low,
                    original_query: spl_query.to_string(),
                    error: Some(e),
                }
            }
        }
    }
}

/// Strict parse: the completion must be a single JSON object
fn parse_enhancement(content: &str) -> Result<RawEnhancement, String> {
    let value: Value = serde_json::from_str(content.trim())
        .map_err(|e| format!("Failed to parse enhancement response: {}", e))?;
    if !value.is_object() {
        return Err("Failed to parse enhancement response: expected a JSON object".to_string());
    }
    serde_json::from_value(value).map_err(|e| format!("Failed to parse enhancement response: {}", e))
}

/// Instruction template plus any known indexes and fields
pub fn build_system_prompt(context: Option<&EnvironmentContext>) -> String {
    let mut prompt = TRANSLATE_PROMPT.to_string();

    if let Some(ctx) = context {
        if !ctx.indexes.is_empty() {
            prompt.push_str(&format!("\nAvailable indexes: {}\n", ctx.indexes.join(", ")));
        }
        if !ctx.common_fields.is_empty() {
            prompt.push_str(&format!("\nCommon fields: {}\n", ctx.common_fields.join(", ")));
        }
    }

    prompt
}

/// Extract the query from a completion, degrading step by step
pub fn parse_spl_response(content: &str) -> ParsedSpl {
    let payload = strip_code_fences(content);
    if payload.starts_with('{') {
        match serde_json::from_str::<RawSpl>(payload) {
            Ok(raw) => {
                return ParsedSpl {
                    query: raw.query.unwrap_or_default().trim().to_string(),
                    explanation: raw.explanation.unwrap_or_default(),
                    confidence: raw
                        .confidence
                        .as_deref()
                        .map(Confidence::from_label)
                        .unwrap_or_default(),
                }
            }
            Err(e) => warn!("Completion was not valid JSON, scanning lines: {}", e),
        }
    }

    let mut query = String::new();
    let mut explanation = String::new();
    for line in content.lines().map(str::trim) {
        // later lines win
        if line.starts_with("search ") {
            query = line.to_string();
        } else {
            let lower = line.to_lowercase();
            if lower.contains("explanation") || lower.contains("does") {
                explanation = line.to_string();
            }
        }
    }

    if !query.is_empty() {
        return ParsedSpl {
            query,
            explanation,
            confidence: Confidence::Medium,
        };
    }

    let trimmed = content.trim();
    if trimmed.starts_with("search ") {
        return ParsedSpl {
            query: trimmed.to_string(),
            explanation: "Query generated from natural language".to_string(),
            confidence: Confidence::Low,
        };
    }

    warn!("Failed to parse SPL from completion");
    ParsedSpl {
        query: String::new(),
        explanation: "Failed to parse response".to_string(),
        confidence: Confidence::Low,
    }
}
