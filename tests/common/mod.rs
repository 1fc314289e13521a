//! Call-recording stand-ins for the Splunk backend and the completion service

#![allow(dead_code)]

use async_trait::async_trait;
use nl_spl_engine::cache::ContextCache;
use nl_spl_engine::engine::SplQueryEngine;
use nl_spl_engine::error::{EngineError, EngineResult};
use nl_spl_engine::llm::{CompletionClient, CompletionRequest, SplTranslator};
use nl_spl_engine::splunk::{Connector, JobStatus, JobSummary, Record, SearchExecutor, SearchService};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Scripted backend; every call is appended to `calls`
pub struct StubBackend {
    pub oneshot_response: EngineResult<String>,
    /// Status polls before the job reports done; `None` never finishes
    pub job_done_after: Option<usize>,
    pub job_result_count: u64,
    pub job_dispatch_state: Option<String>,
    pub create_job_error: Option<EngineError>,
    pub indexes: EngineResult<Vec<String>>,
    pub parse_error: Option<EngineError>,
    pub jobs: Vec<JobSummary>,
    pub job_rows: Vec<Record>,

    pub calls: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<String>>,
    pub status_polls: AtomicUsize,
    pub index_calls: AtomicUsize,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            oneshot_response: Ok(r#"{"results": []}"#.to_string()),
            job_done_after: Some(0),
            job_result_count: 0,
            job_dispatch_state: Some("DONE".to_string()),
            create_job_error: None,
            indexes: Ok(vec!["main".to_string(), "_internal".to_string()]),
            parse_error: None,
            jobs: Vec::new(),
            job_rows: Vec::new(),
            calls: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            status_polls: AtomicUsize::new(0),
            index_calls: AtomicUsize::new(0),
        }
    }
}

impl StubBackend {
    pub fn with_records(count: usize) -> Self {
        let rows: Vec<serde_json::Value> = (0..count)
            .map(|i| serde_json::json!({ "host": format!("web-{}", i), "count": i.to_string() }))
            .collect();
        Self {
            oneshot_response: Ok(serde_json::json!({ "results": rows }).to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, op: &str) -> bool {
        self.calls().iter().any(|c| c == op)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn record(&self, op: &str) {
        self.calls.lock().unwrap().push(op.to_string());
    }
}

#[async_trait]
impl SearchService for StubBackend {
    async fn oneshot(&self, query: &str, _count: usize) -> EngineResult<String> {
        self.record("oneshot");
        self.queries.lock().unwrap().push(query.to_string());
        self.oneshot_response.clone()
    }

    async fn create_job(&self, query: &str, _count: usize) -> EngineResult<String> {
        self.record("create_job");
        self.queries.lock().unwrap().push(query.to_string());
        match &self.create_job_error {
            Some(e) => Err(e.clone()),
            None => Ok("1700000000.42".to_string()),
        }
    }

    async fn job_status(&self, sid: &str) -> EngineResult<JobStatus> {
        self.record("job_status");
        let polls = self.status_polls.fetch_add(1, Ordering::SeqCst);
        let is_done = self.job_done_after.map_or(false, |n| polls >= n);
        Ok(JobStatus {
            sid: sid.to_string(),
            is_done,
            dispatch_state: if is_done {
                self.job_dispatch_state.clone()
            } else {
                Some("RUNNING".to_string())
            },
            result_count: self.job_result_count,
            scan_count: self.job_result_count * 10,
            run_duration: 1.5,
        })
    }

    async fn cancel_job(&self, sid: &str) -> EngineResult<()> {
        self.record("cancel_job");
        self.cancelled.lock().unwrap().push(sid.to_string());
        Ok(())
    }

    async fn job_results(&self, _sid: &str, count: usize) -> EngineResult<Vec<Record>> {
        self.record("job_results");
        Ok(self.job_rows.iter().take(count).cloned().collect())
    }

    async fn list_indexes(&self) -> EngineResult<Vec<String>> {
        self.record("list_indexes");
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        self.indexes.clone()
    }

    async fn list_jobs(&self, count: usize) -> EngineResult<Vec<JobSummary>> {
        self.record("list_jobs");
        Ok(self.jobs.iter().take(count).cloned().collect())
    }

    async fn parse_only(&self, _query: &str) -> EngineResult<()> {
        self.record("parse_only");
        match &self.parse_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Hands out the same backend; can be told to refuse connections
pub struct StubConnector {
    pub backend: Arc<StubBackend>,
    pub refuse: AtomicBool,
    pub connects: AtomicUsize,
}

impl StubConnector {
    pub fn new(backend: Arc<StubBackend>) -> Self {
        Self {
            backend,
            refuse: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(&self) -> EngineResult<Arc<dyn SearchService>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(EngineError::connection_to("connection refused", "https://splunk.test:8089"));
        }
        Ok(self.backend.clone() as Arc<dyn SearchService>)
    }
}

/// Replies with a fixed completion and records each request
pub struct StubCompletion {
    pub reply: EngineResult<String>,
    pub has_key: bool,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl StubCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            has_key: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(EngineError::translation(message)),
            has_key: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn complete(&self, request: CompletionRequest) -> EngineResult<String> {
        self.requests.lock().unwrap().push(request);
        self.reply.clone()
    }

    fn has_credentials(&self) -> bool {
        self.has_key
    }
}

pub fn executor_for(connector: Arc<StubConnector>) -> SearchExecutor {
    SearchExecutor::new(connector).with_poll_interval(TEST_POLL_INTERVAL)
}

/// Engine wired to stubs, with the returned handles for assertions
pub fn engine_with(
    backend: StubBackend,
    completion: StubCompletion,
) -> (SplQueryEngine, Arc<StubBackend>, Arc<StubConnector>, Arc<StubCompletion>) {
    let backend = Arc::new(backend);
    let connector = Arc::new(StubConnector::new(backend.clone()));
    let completion = Arc::new(completion);

    let engine = SplQueryEngine::new(
        executor_for(connector.clone()),
        SplTranslator::new(completion.clone()),
        ContextCache::new(Duration::from_secs(300)),
    );
    (engine, backend, connector, completion)
}
