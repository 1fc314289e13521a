use crate::cache::{ContextCache, EnvironmentContext};
use crate::config::AppConfig;
use crate::error::EngineResult;
use crate::llm::{Confidence, EnhancementResult, OpenAiClient, SplTranslator, TranslationResult};
use crate::splunk::{
    JobSummary, Record, SearchExecutor, SearchOutcome, SearchRequest, SearchStatistics, SplunkConnector,
    ValidationOutcome,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

pub const MAX_SUGGESTIONS: usize = 5;

/// Example questions offered while the user is typing
pub const SUGGESTION_CATALOG: &[&str] = &[
    "Show me error logs from the last hour",
    "What are the top source IPs by traffic volume?",
    "Find failed login attempts in the last 24 hours",
    "Show me the most common HTTP status codes",
    "Which users have logged in today?",
    "What are the top 10 processes by CPU usage?",
    "Show me security events from the last week",
    "Find all 404 errors in web logs",
    "What hosts are generating the most events?",
    "Show me database connection errors",
];

/// Response of a translated or raw SPL run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub spl_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    pub results: Vec<Record>,
    /// Always the number of returned rows, not the backend-reported count
    pub result_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<SearchStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationOutcome>,
    /// Translation outcome, kept when translation did not yield a query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<TranslationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds
    pub processing_time: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    fn new(status: &str, detail: Option<String>) -> Self {
        Self {
            status: status.to_string(),
            detail,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub overall: OverallStatus,
    pub timestamp: DateTime<Utc>,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.overall == OverallStatus::Healthy
    }

    /// Health report for a failure while computing health itself
    pub fn error(message: impl Into<String>) -> Self {
        let mut components = BTreeMap::new();
        components.insert("engine".to_string(), ComponentHealth::new("error", Some(message.into())));
        Self {
            overall: OverallStatus::Error,
            timestamp: Utc::now(),
            components,
        }
    }
}

/// Natural language to SPL query engine
///
/// Composes the translator, the search executor and the environment context
/// cache into the operations exposed to the HTTP server and the REPL. None of
/// the operations return an error: failures are carried in `success`/`error`.
pub struct SplQueryEngine {
    executor: SearchExecutor,
    translator: SplTranslator,
    context_cache: ContextCache,
    default_timeout: Duration,
}

impl SplQueryEngine {
    pub fn new(executor: SearchExecutor, translator: SplTranslator, context_cache: ContextCache) -> Self {
        Self {
            executor,
            translator,
            context_cache,
            default_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    /// Wire the production Splunk and OpenAI clients from configuration
    pub fn from_config(config: &AppConfig) -> EngineResult<Self> {
        let connector = Arc::new(SplunkConnector::new(config.splunk.clone()));
        let executor = SearchExecutor::new(connector).with_poll_interval(config.search.poll_interval());

        let client = Arc::new(OpenAiClient::new(&config.llm)?);
        let translator = SplTranslator::with_config(client, &config.llm);

        Ok(Self::new(executor, translator, ContextCache::new(config.search.context_ttl()))
            .with_default_timeout(config.search.default_timeout()))
    }

    /// Deadline applied to every search run by the engine
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn executor(&self) -> &SearchExecutor {
        &self.executor
    }

    /// Translate a question to SPL and run it
    pub async fn run_natural_language(&self, question: &str, max_results: usize) -> QueryResponse {
        let start = Instant::now();
        info!("Processing natural language query: {}", question);

        let context = self.get_environment_context().await;
        let translation = self.translator.translate(question, Some(&context)).await;

        if !translation.success {
            return QueryResponse {
                question: Some(question.to_string()),
                error: Some("Failed to convert question to SPL".to_string()),
                details: Some(translation),
                processing_time: start.elapsed().as_secs_f64(),
                ..QueryResponse::default()
            };
        }

        if translation.spl_query.trim().is_empty() {
            return QueryResponse {
                question: Some(question.to_string()),
                error: Some("No valid SPL query generated".to_string()),
                details: Some(translation),
                processing_time: start.elapsed().as_secs_f64(),
                ..QueryResponse::default()
            };
        }

        let response = QueryResponse {
            question: Some(question.to_string()),
            explanation: Some(translation.explanation),
            confidence: Some(translation.confidence),
            ..QueryResponse::default()
        };

        self.validate_and_run(translation.spl_query, max_results, response, start).await
    }

    /// Run raw SPL without translation
    pub async fn run_spl(&self, spl_query: &str, max_results: usize) -> QueryResponse {
        let start = Instant::now();
        info!("Executing SPL query: {}", spl_query);
        self.validate_and_run(spl_query.to_string(), max_results, QueryResponse::default(), start)
            .await
    }

    async fn validate_and_run(
        &self,
        spl_query: String,
        max_results: usize,
        mut response: QueryResponse,
        start: Instant,
    ) -> QueryResponse {
        // advisory only: parse-only checks reject some valid queries
        let validation = self.executor.validate_query(&spl_query).await;
        if !validation.valid {
            warn!(
                "SPL validation failed, running anyway: {}",
                validation.error.as_deref().unwrap_or("unknown error")
            );
        }

        let request = SearchRequest::new(spl_query.clone(), max_results, self.default_timeout);
        let SearchOutcome {
            success,
            results,
            statistics,
            error,
            ..
        } = self.executor.execute_query(&request).await;

        response.success = success;
        response.spl_query = spl_query;
        response.result_count = results.len();
        response.results = results;
        response.statistics = Some(statistics);
        response.validation = Some(validation);
        if !success {
            response.error = Some(error.unwrap_or_else(|| "Unknown execution error".to_string()));
        }
        response.processing_time = start.elapsed().as_secs_f64();

        info!(
            "Query processed in {:.2}s ({} results)",
            response.processing_time, response.result_count
        );
        response
    }

    /// Improve an existing query from free-text feedback
    pub async fn enhance_query(&self, spl_query: &str, feedback: &str) -> EnhancementResult {
        self.translator.enhance(spl_query, feedback).await
    }

    pub fn suggest_questions(&self, partial: &str) -> Vec<String> {
        suggest_questions(partial)
    }

    /// Cached environment context; refreshed after the TTL
    pub async fn get_environment_context(&self) -> EnvironmentContext {
        if let Some(context) = self.context_cache.get().await {
            return context;
        }

        match self.executor.try_list_indexes().await {
            Ok(indexes) => {
                let context = EnvironmentContext::with_indexes(indexes);
                self.context_cache.insert(context.clone()).await;
                context
            }
            Err(e) => {
                warn!("Failed to get Splunk context: {}", e);
                EnvironmentContext::minimal()
            }
        }
    }

    /// Component health; overall is healthy or degraded
    pub async fn get_health(&self) -> HealthStatus {
        let mut overall = OverallStatus::Healthy;
        let mut components = BTreeMap::new();

        let splunk = match self.executor.try_list_indexes().await {
            Ok(indexes) => ComponentHealth::new("connected", Some(format!("{} indexes", indexes.len()))),
            Err(e) => {
                error!("Splunk health check failed: {}", e);
                overall = OverallStatus::Degraded;
                ComponentHealth::new("error", Some(e.to_string()))
            }
        };
        components.insert("splunk".to_string(), splunk);

        let openai = if self.translator.has_credentials() {
            ComponentHealth::new("configured", None)
        } else {
            overall = OverallStatus::Degraded;
            ComponentHealth::new("not_configured", Some("OPENAI_API_KEY is not set".to_string()))
        };
        components.insert("openai".to_string(), openai);

        HealthStatus {
            overall,
            timestamp: Utc::now(),
            components,
        }
    }

    pub async fn list_indexes(&self) -> Vec<String> {
        self.executor.list_indexes().await
    }

    pub async fn list_recent_jobs(&self, count: usize) -> Vec<JobSummary> {
        self.executor.list_recent_jobs(count).await
    }

    pub async fn fetch_job_results(&self, sid: &str, count: usize) -> Vec<Record> {
        self.executor.fetch_job_results(sid, count).await
    }
}

/// Catalog entries containing any word of `partial`, in catalog order
pub fn suggest_questions(partial: &str) -> Vec<String> {
    let words: Vec<String> = partial.split_whitespace().map(str::to_lowercase).collect();
    if words.is_empty() {
        return Vec::new();
    }

    SUGGESTION_CATALOG
        .iter()
        .filter(|s| {
            let lower = s.to_lowercase();
            words.iter().any(|w| lower.contains(w.as_str()))
        })
        .take(MAX_SUGGESTIONS)
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestions_match_any_word() {
        assert_eq!(suggest_questions("login"), vec!["Find failed login attempts in the last 24 hours"]);

        let errors = suggest_questions("ERRORS");
        assert_eq!(
            errors,
            vec!["Find all 404 errors in web logs", "Show me database connection errors"]
        );
    }

    #[test]
    fn test_suggestions_capped_and_ordered() {
        let matches = suggest_questions("show top");
        assert_eq!(matches.len(), MAX_SUGGESTIONS);
        assert_eq!(matches[0], SUGGESTION_CATALOG[0]);
        assert_eq!(matches[1], SUGGESTION_CATALOG[1]);
        assert!(suggest_questions("   ").is_empty());
        assert!(suggest_questions("kubernetes").is_empty());
    }

    #[test]
    fn test_health_error_report() {
        let health = HealthStatus::error("boom");
        assert_eq!(health.overall, OverallStatus::Error);
        assert!(!health.is_healthy());
        assert_eq!(serde_json::to_value(health.overall).unwrap(), "error");
    }
}
