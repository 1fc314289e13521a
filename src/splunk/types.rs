//! Search data model shared by the executor, the orchestrator and the HTTP layer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One search result row
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Search id reported for inline (non-job) executions
pub const ONESHOT_SEARCH_ID: &str = "oneshot";

/// Parameters of one search execution
#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    pub timeout: Duration,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: usize, timeout: Duration) -> Self {
        Self {
            query: query.into(),
            max_results,
            timeout,
        }
    }
}

/// Execution statistics, shaped the same way for both strategies
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStatistics {
    pub result_count: u64,
    pub scan_count: u64,
    /// Seconds
    pub run_duration: f64,
    pub search_id: String,
    pub is_done: bool,
}

/// Outcome of one search execution
///
/// On the job path `results` is always empty and only `statistics` is
/// populated, so `statistics.result_count` can be non-zero while
/// `results` is empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub success: bool,
    pub results: Vec<Record>,
    pub statistics: SearchStatistics,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn succeeded(query: impl Into<String>, results: Vec<Record>, statistics: SearchStatistics) -> Self {
        Self {
            success: true,
            results,
            statistics,
            query: query.into(),
            error: None,
        }
    }

    pub fn failed(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            statistics: SearchStatistics::default(),
            query: query.into(),
            error: Some(error.into()),
        }
    }
}

/// Parse-only validation verdict from the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationOutcome {
    pub fn valid(query: impl Into<String>) -> Self {
        Self {
            valid: true,
            query: query.into(),
            error: None,
        }
    }

    pub fn invalid(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            query: query.into(),
            error: Some(error.into()),
        }
    }
}

/// Job metadata as reported by the backend's status endpoint
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobStatus {
    pub sid: String,
    pub is_done: bool,
    pub dispatch_state: Option<String>,
    pub result_count: u64,
    pub scan_count: u64,
    pub run_duration: f64,
}

impl JobStatus {
    /// FAILED jobs report isDone too; callers check this before reading counts
    pub fn is_failed(&self) -> bool {
        self.dispatch_state
            .as_deref()
            .map_or(false, |s| s.eq_ignore_ascii_case("FAILED"))
    }
}

/// One entry of the recent jobs listing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub search_text: String,
    pub created_at: String,
    pub duration_seconds: f64,
    pub result_count: u64,
}
