//! Search Executor - Runs SPL against the backend with a fast path and a job fallback
//!
//! Small, patient searches first try an inline oneshot execution. If that
//! path fails for any reason, or the request is too large or too impatient
//! for it, the query is dispatched as a job and polled until done.
//!
//! The job path reports statistics only: `results` stays empty even on
//! success because job result bodies are not read back here. Callers
//! branch on `statistics.result_count`, not on `results.len()`.

use crate::error::{EngineError, EngineResult};
use crate::splunk::client::{Connector, SearchService};
use crate::splunk::types::{
    JobSummary, Record, SearchOutcome, SearchRequest, SearchStatistics, ValidationOutcome,
    ONESHOT_SEARCH_ID,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Oneshot is only attempted for result caps up to this size
pub const FAST_PATH_MAX_RESULTS: usize = 100;

/// Oneshot is only attempted when the caller allows at least this long
pub const FAST_PATH_MIN_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Leading commands that already start a search pipeline
pub const SEARCH_COMMANDS: &[&str] = &[
    "search",
    "tstats",
    "inputlookup",
    "from",
    "metadata",
    "rest",
    "datamodel",
    "eventcount",
    "makeresults",
    "dbinspect",
    "pivot",
    "mstats",
];

/// Served when the backend cannot list its indexes
pub const DEFAULT_INDEXES: &[&str] = &["_audit", "_internal", "main"];

/// Keys that mark streaming envelope objects rather than result rows
const ENVELOPE_KEYS: &[&str] = &["preview", "init_offset", "offset", "messages", "fields", "highlighted"];

enum ConnectionState {
    Disconnected,
    Connected(Arc<dyn SearchService>),
}

/// Owns the backend session and the execution policy
pub struct SearchExecutor {
    connector: Arc<dyn Connector>,
    state: Mutex<ConnectionState>,
    poll_interval: Duration,
}

impl SearchExecutor {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            state: Mutex::new(ConnectionState::Disconnected),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the job status polling interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.lock().await, ConnectionState::Connected(_))
    }

    /// Drop the session; the next operation reconnects once
    pub async fn reset_connection(&self) {
        *self.state.lock().await = ConnectionState::Disconnected;
    }

    /// Return the live session, establishing it first if absent
    async fn ensure_connected(&self) -> EngineResult<Arc<dyn SearchService>> {
        let mut state = self.state.lock().await;
        if let ConnectionState::Connected(service) = &*state {
            return Ok(Arc::clone(service));
        }

        let service = self.connector.connect().await.map_err(|e| {
            error!("Failed to connect to Splunk: {}", e);
            e
        })?;
        *state = ConnectionState::Connected(Arc::clone(&service));
        Ok(service)
    }

    async fn note_failure(&self, err: &EngineError) {
        if err.is_connection() {
            warn!("Dropping Splunk session after connection failure");
            self.reset_connection().await;
        }
    }

    /// Execute a search; failures are encoded in the outcome
    pub async fn execute_query(&self, request: &SearchRequest) -> SearchOutcome {
        let query = normalize_query(&request.query);
        match self.run_search(&query, request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Search execution failed: {}", e);
                self.note_failure(&e).await;
                SearchOutcome::failed(query, e.to_string())
            }
        }
    }

    async fn run_search(&self, query: &str, request: &SearchRequest) -> EngineResult<SearchOutcome> {
        let service = self.ensure_connected().await?;
        info!("Executing SPL query: {}", query);

        if use_fast_path(request.max_results, request.timeout) {
            match self.run_oneshot(service.as_ref(), query, request.max_results).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => warn!("Oneshot search failed, falling back to search job: {}", e),
            }
        } else {
            debug!(
                "Skipping oneshot (max_results={}, timeout={:?})",
                request.max_results, request.timeout
            );
        }

        self.run_job(service.as_ref(), query, request).await
    }

    async fn run_oneshot(
        &self,
        service: &dyn SearchService,
        query: &str,
        max_results: usize,
    ) -> EngineResult<SearchOutcome> {
        let started = Instant::now();
        let body = service.oneshot(query, max_results).await?;
        let results = parse_search_body(&body)?;

        let statistics = SearchStatistics {
            result_count: results.len() as u64,
            scan_count: 0,
            run_duration: started.elapsed().as_secs_f64(),
            search_id: ONESHOT_SEARCH_ID.to_string(),
            is_done: true,
        };
        info!(
            "Oneshot search completed. Results: {}, Duration: {:.3}s",
            statistics.result_count, statistics.run_duration
        );
        Ok(SearchOutcome::succeeded(query, results, statistics))
    }

    async fn run_job(
        &self,
        service: &dyn SearchService,
        query: &str,
        request: &SearchRequest,
    ) -> EngineResult<SearchOutcome> {
        let sid = service.create_job(query, request.max_results).await?;
        debug!("Dispatched search job {}", sid);
        let started = Instant::now();

        let status = loop {
            let status = service.job_status(&sid).await?;
            if status.is_done {
                break status;
            }

            if started.elapsed() > request.timeout {
                if let Err(e) = service.cancel_job(&sid).await {
                    warn!("Failed to cancel search job {}: {}", sid, e);
                }
                return Err(EngineError::timeout_for_job(
                    format!("job {} did not finish within {:?}", sid, request.timeout),
                    sid,
                ));
            }

            tokio::time::sleep(self.poll_interval).await;
        };

        if status.is_failed() {
            return Err(EngineError::execution(format!("Search job {} failed", sid)));
        }

        let statistics = SearchStatistics {
            result_count: status.result_count,
            scan_count: status.scan_count,
            run_duration: status.run_duration,
            search_id: sid,
            is_done: status.is_done,
        };
        info!(
            "Search job {} completed. Results: {}, Duration: {}s",
            statistics.search_id, statistics.result_count, statistics.run_duration
        );
        Ok(SearchOutcome::succeeded(query, Vec::new(), statistics))
    }

    /// Ask the backend to parse the query without running it
    pub async fn validate_query(&self, query: &str) -> ValidationOutcome {
        let result = async {
            let service = self.ensure_connected().await?;
            service.parse_only(query).await
        }
        .await;

        match result {
            Ok(()) => ValidationOutcome::valid(query),
            Err(e) => {
                warn!("SPL validation failed: {}", e);
                self.note_failure(&e).await;
                ValidationOutcome::invalid(query, e.to_string())
            }
        }
    }

    /// Sorted index names, or the error that prevented listing them
    pub async fn try_list_indexes(&self) -> EngineResult<Vec<String>> {
        let service = self.ensure_connected().await?;
        match service.list_indexes().await {
            Ok(mut indexes) => {
                indexes.sort();
                Ok(indexes)
            }
            Err(e) => {
                self.note_failure(&e).await;
                Err(e)
            }
        }
    }

    /// Sorted index names; falls back to the default indexes on failure
    pub async fn list_indexes(&self) -> Vec<String> {
        match self.try_list_indexes().await {
            Ok(indexes) => indexes,
            Err(e) => {
                warn!("Failed to get indexes, using defaults: {}", e);
                DEFAULT_INDEXES.iter().map(|s| s.to_string()).collect()
            }
        }
    }

    /// Most recent search jobs; empty on failure
    pub async fn list_recent_jobs(&self, count: usize) -> Vec<JobSummary> {
        let result = async {
            let service = self.ensure_connected().await?;
            service.list_jobs(count).await
        }
        .await;

        result.unwrap_or_else(|e| {
            error!("Failed to get search history: {}", e);
            Vec::new()
        })
    }

    /// Result rows of an existing job; empty on failure
    pub async fn fetch_job_results(&self, sid: &str, count: usize) -> Vec<Record> {
        let result = async {
            let service = self.ensure_connected().await?;
            service.job_results(sid, count).await
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!("Failed to read results for job {}: {}", sid, e);
            Vec::new()
        })
    }
}

/// Whether the oneshot path should be tried first
pub fn use_fast_path(max_results: usize, timeout: Duration) -> bool {
    max_results <= FAST_PATH_MAX_RESULTS && timeout >= FAST_PATH_MIN_TIMEOUT
}

/// Trim and prefix `search ` unless the query already starts a pipeline
pub fn normalize_query(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.starts_with('|') {
        return trimmed.to_string();
    }

    let first = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if SEARCH_COMMANDS.contains(&first.as_str()) {
        trimmed.to_string()
    } else {
        format!("search {}", trimmed)
    }
}

/// Decode an inline search response body into records
///
/// Accepts `{"results": [...]}` or a bare array; anything else is read
/// as a stream of concatenated JSON values.
pub fn parse_search_body(body: &str) -> EngineResult<Vec<Record>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        match &value {
            Value::Object(map) => {
                if let Some(Value::Array(rows)) = map.get("results") {
                    return Ok(records_from(rows));
                }
            }
            Value::Array(rows) => return Ok(records_from(rows)),
            _ => {}
        }
    }

    read_record_stream(trimmed)
}

fn records_from(rows: &[Value]) -> Vec<Record> {
    rows.iter().filter_map(|r| r.as_object().cloned()).collect()
}

fn read_record_stream(body: &str) -> EngineResult<Vec<Record>> {
    let mut records = Vec::new();
    for item in serde_json::Deserializer::from_str(body).into_iter::<Value>() {
        let value = item.map_err(|e| EngineError::execution(format!("Unreadable search results: {}", e)))?;
        let Value::Object(mut map) = value else {
            continue;
        };

        if let Some(Value::Object(row)) = map.remove("result") {
            records.push(row);
        } else if let Some(Value::Array(rows)) = map.get("results") {
            records.extend(records_from(rows));
        } else if !ENVELOPE_KEYS.iter().any(|k| map.contains_key(*k)) {
            records.push(map);
        }
    }
    Ok(records)
}
