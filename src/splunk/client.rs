//! Splunk client - REST protocol spoken by the search executor
//!
//! The executor only depends on the `SearchService` and `Connector`
//! traits. `SplunkConnector` and `SplunkService` implement them over the
//! management API with reqwest; tests substitute in-memory stubs.

use crate::config::SplunkConfig;
use crate::error::{EngineError, EngineResult};
use crate::splunk::types::{JobStatus, JobSummary, Record};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Operations consumed from the search backend
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run a search inline and return the raw response body
    async fn oneshot(&self, query: &str, count: usize) -> EngineResult<String>;

    /// Dispatch an asynchronous search job, returning its sid
    async fn create_job(&self, query: &str, count: usize) -> EngineResult<String>;

    /// Refresh job metadata
    async fn job_status(&self, sid: &str) -> EngineResult<JobStatus>;

    async fn cancel_job(&self, sid: &str) -> EngineResult<()>;

    async fn job_results(&self, sid: &str, count: usize) -> EngineResult<Vec<Record>>;

    async fn list_indexes(&self) -> EngineResult<Vec<String>>;

    async fn list_jobs(&self, count: usize) -> EngineResult<Vec<JobSummary>>;

    /// Syntax check without execution; `Err` means the backend rejected the query
    async fn parse_only(&self, query: &str) -> EngineResult<()>;
}

/// Establishes an authenticated backend session
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> EngineResult<Arc<dyn SearchService>>;
}

const JOBS_PATH: &str = "/services/search/jobs";
const LOGIN_PATH: &str = "/services/auth/login";
const INDEXES_PATH: &str = "/services/data/indexes";

/// Connector for the Splunk management API
pub struct SplunkConnector {
    config: SplunkConfig,
}

impl SplunkConnector {
    pub fn new(config: SplunkConfig) -> Self {
        Self { config }
    }

    async fn login(&self, client: &Client, base_url: &str) -> EngineResult<String> {
        let url = format!("{}{}", base_url, LOGIN_PATH);
        let response = client
            .post(&url)
            .form(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
                ("output_mode", "json"),
            ])
            .send()
            .await
            .map_err(|e| EngineError::connection_to(format!("Failed to reach Splunk: {}", e), &url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::connection_to(
                format!("Authentication failed ({}): {}", status, backend_message(&body)),
                &url,
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::connection_to(format!("Malformed login response: {}", e), &url))?;

        body.get("sessionKey")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EngineError::connection_to("Login response did not contain a session key", &url))
    }
}

#[async_trait]
impl Connector for SplunkConnector {
    async fn connect(&self) -> EngineResult<Arc<dyn SearchService>> {
        let base_url = self.config.base_url();
        let client = Client::builder()
            .danger_accept_invalid_certs(!self.config.verify_tls)
            .timeout(self.config.request_timeout())
            .build()
            .map_err(|e| EngineError::connection_to(format!("Failed to build HTTP client: {}", e), &base_url))?;

        let authorization = match self.config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => format!("Bearer {}", token),
            None => format!("Splunk {}", self.login(&client, &base_url).await?),
        };

        info!("Successfully connected to Splunk at {}", base_url);
        Ok(Arc::new(SplunkService {
            client,
            base_url,
            authorization,
        }))
    }
}

/// Authenticated session against the management API
pub struct SplunkService {
    client: Client,
    base_url: String,
    authorization: String,
}

impl SplunkService {
    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> EngineResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .form(form)
            .send()
            .await?;
        check_status(response).await
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> EngineResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .query(query)
            .send()
            .await?;
        check_status(response).await
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> EngineResult<Value> {
        let response = self.get(path, query).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SearchService for SplunkService {
    async fn oneshot(&self, query: &str, count: usize) -> EngineResult<String> {
        let response = self
            .post_form(
                JOBS_PATH,
                &[
                    ("search", query.to_string()),
                    ("exec_mode", "oneshot".to_string()),
                    ("count", count.to_string()),
                    ("output_mode", "json".to_string()),
                ],
            )
            .await?;
        Ok(response.text().await?)
    }

    async fn create_job(&self, query: &str, count: usize) -> EngineResult<String> {
        let response = self
            .post_form(
                JOBS_PATH,
                &[
                    ("search", query.to_string()),
                    ("exec_mode", "normal".to_string()),
                    ("count", count.to_string()),
                    ("output_mode", "json".to_string()),
                ],
            )
            .await?;
        let body: Value = response.json().await?;
        body.get("sid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EngineError::execution("Job creation response did not contain a sid"))
    }

    async fn job_status(&self, sid: &str) -> EngineResult<JobStatus> {
        let body = self
            .get_json(&format!("{}/{}", JOBS_PATH, sid), &[("output_mode", "json".to_string())])
            .await?;
        parse_job_status(sid, &body)
    }

    async fn cancel_job(&self, sid: &str) -> EngineResult<()> {
        self.post_form(
            &format!("{}/{}/control", JOBS_PATH, sid),
            &[("action", "cancel".to_string()), ("output_mode", "json".to_string())],
        )
        .await?;
        Ok(())
    }

    async fn job_results(&self, sid: &str, count: usize) -> EngineResult<Vec<Record>> {
        let body = self
            .get_json(
                &format!("{}/{}/results", JOBS_PATH, sid),
                &[("output_mode", "json".to_string()), ("count", count.to_string())],
            )
            .await?;
        Ok(body
            .get("results")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(|r| r.as_object().cloned()).collect())
            .unwrap_or_default())
    }

    async fn list_indexes(&self) -> EngineResult<Vec<String>> {
        let body = self
            .get_json(
                INDEXES_PATH,
                &[("output_mode", "json".to_string()), ("count", "0".to_string())],
            )
            .await?;
        Ok(parse_index_names(&body))
    }

    async fn list_jobs(&self, count: usize) -> EngineResult<Vec<JobSummary>> {
        let body = self
            .get_json(
                JOBS_PATH,
                &[("output_mode", "json".to_string()), ("count", count.to_string())],
            )
            .await?;
        Ok(parse_job_list(&body))
    }

    async fn parse_only(&self, query: &str) -> EngineResult<()> {
        self.post_form(
            JOBS_PATH,
            &[
                ("search", query.to_string()),
                ("parse_only", "true".to_string()),
                ("output_mode", "json".to_string()),
            ],
        )
        .await?;
        Ok(())
    }
}

/// Turn non-2xx responses into errors carrying the backend's message
async fn check_status(response: Response) -> EngineResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = format!("Splunk returned {}: {}", status, backend_message(&body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EngineError::connection_to(message, url)),
        _ => Err(EngineError::execution_with_status(message, status.as_u16())),
    }
}

/// Extract `messages[].text` from an error body, or fall back to the raw text
fn backend_message(body: &str) -> String {
    let texts: Vec<String> = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("messages").and_then(Value::as_array).cloned())
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m.get("text").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    if texts.is_empty() {
        body.trim().chars().take(500).collect()
    } else {
        texts.join("; ")
    }
}

/// Numbers arrive as JSON numbers or as strings depending on endpoint and version
fn lenient_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f as u64).unwrap_or(0),
        _ => 0,
    }
}

fn lenient_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn lenient_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map_or(false, |i| i != 0),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "True"),
        _ => false,
    }
}

fn entries(body: &Value) -> impl Iterator<Item = &Value> {
    body.get("entry")
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .into_iter()
        .flatten()
}

pub(crate) fn parse_job_status(sid: &str, body: &Value) -> EngineResult<JobStatus> {
    let content = entries(body)
        .next()
        .and_then(|e| e.get("content"))
        .ok_or_else(|| EngineError::execution(format!("Job {} status response had no content", sid)))?;

    Ok(JobStatus {
        sid: content
            .get("sid")
            .and_then(Value::as_str)
            .unwrap_or(sid)
            .to_string(),
        is_done: lenient_bool(content.get("isDone")),
        dispatch_state: content
            .get("dispatchState")
            .and_then(Value::as_str)
            .map(str::to_string),
        result_count: lenient_u64(content.get("resultCount")),
        scan_count: lenient_u64(content.get("scanCount")),
        run_duration: lenient_f64(content.get("runDuration")),
    })
}

pub(crate) fn parse_index_names(body: &Value) -> Vec<String> {
    entries(body)
        .filter_map(|e| e.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

pub(crate) fn parse_job_list(body: &Value) -> Vec<JobSummary> {
    entries(body)
        .map(|entry| {
            let content = entry.get("content").cloned().unwrap_or(Value::Null);
            let text = |v: Option<&Value>| v.and_then(Value::as_str).unwrap_or_default().to_string();
            JobSummary {
                id: text(content.get("sid")),
                search_text: text(entry.get("name")),
                created_at: content
                    .get("createTime")
                    .or_else(|| entry.get("published"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                duration_seconds: lenient_f64(content.get("runDuration")),
                result_count: lenient_u64(content.get("resultCount")),
            }
        })
        .collect()
}
