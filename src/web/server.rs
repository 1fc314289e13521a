use crate::config::SearchConfig;
use crate::engine::{HealthStatus, QueryResponse, SplQueryEngine};
use crate::error::EngineError;
use crate::history::{HistoryEntry, QueryHistory, QueryKind};
use crate::llm::EnhancementResult;
use crate::splunk::{JobSummary, Record};
use crate::validators::{sanitize_input, validate_max_results, validate_question, validate_spl_query};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

const MIN_FEEDBACK_LEN: usize = 5;
const MAX_FEEDBACK_LEN: usize = 500;
const MAX_SUGGESTIONS_LIMIT: usize = 20;
const MAX_HISTORY_COUNT: usize = 100;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SplQueryEngine>,
    pub history: Arc<QueryHistory>,
    /// Used when a query request omits `max_results`
    pub default_max_results: usize,
}

impl AppState {
    pub fn new(engine: SplQueryEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            history: Arc::new(QueryHistory::default()),
            default_max_results: SearchConfig::default().default_max_results,
        }
    }

    /// Take request defaults from the search configuration
    pub fn with_search_config(mut self, config: &SearchConfig) -> Self {
        self.default_max_results = config.default_max_results;
        self
    }
}

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/natural", post(natural_language_query))
        .route("/spl", post(spl_query))
        .route("/enhance", post(enhance_query))
        .route("/suggestions", post(query_suggestions))
        .route("/health", get(health_check))
        .route("/indexes", get(list_indexes))
        .route("/history", get(search_history))
        .route("/session", get(session_history))
        .route("/jobs/:sid/results", get(job_results));

    Router::new()
        .nest("/api/v1/query", api_routes)
        .route("/", get(index))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("SPL query API listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Rejection returned as `{"error": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match err {
            EngineError::Input { .. } => StatusCode::BAD_REQUEST,
            EngineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EngineError::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("Request rejected ({}): {}", self.status, self.message);
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

fn default_max_suggestions() -> usize {
    5
}

#[derive(Deserialize)]
struct NaturalLanguageRequest {
    question: String,
    max_results: Option<usize>,
}

#[derive(Deserialize)]
struct SplRequest {
    spl_query: String,
    max_results: Option<usize>,
}

#[derive(Deserialize)]
struct EnhanceRequest {
    spl_query: String,
    feedback: String,
}

#[derive(Deserialize)]
struct SuggestionsRequest {
    #[serde(default)]
    partial_question: String,
    #[serde(default = "default_max_suggestions")]
    max_suggestions: usize,
}

#[derive(Serialize)]
struct SuggestionsResponse {
    suggestions: Vec<String>,
    partial_question: String,
}

#[derive(Deserialize)]
struct CountParams {
    count: Option<usize>,
}

#[derive(Serialize)]
struct IndexesResponse {
    indexes: Vec<String>,
    count: usize,
}

#[derive(Serialize)]
struct JobsResponse {
    jobs: Vec<JobSummary>,
    count: usize,
}

#[derive(Serialize)]
struct SessionResponse {
    entries: Vec<HistoryEntry>,
    count: usize,
}

#[derive(Serialize)]
struct JobResultsResponse {
    sid: String,
    results: Vec<Record>,
    result_count: usize,
}

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Natural Language to SPL Query API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "natural": "POST /api/v1/query/natural",
            "spl": "POST /api/v1/query/spl",
            "enhance": "POST /api/v1/query/enhance",
            "suggestions": "POST /api/v1/query/suggestions",
            "health": "GET /api/v1/query/health",
            "indexes": "GET /api/v1/query/indexes",
            "history": "GET /api/v1/query/history",
            "session": "GET /api/v1/query/session",
            "job_results": "GET /api/v1/query/jobs/:sid/results",
        }
    }))
}

/// Translate a question and run it
async fn natural_language_query(
    State(state): State<AppState>,
    Json(req): Json<NaturalLanguageRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let start = Instant::now();
    let question = sanitize_input(&req.question);
    let max_results = req.max_results.unwrap_or(state.default_max_results);
    validate_question(&question)?;
    validate_max_results(max_results)?;
    info!(
        "POST /natural question_len={} max_results={}",
        question.len(),
        max_results
    );

    let response = state.engine.run_natural_language(&question, max_results).await;
    state
        .history
        .record(
            QueryKind::Natural,
            question,
            response.spl_query.clone(),
            response.success,
            response.result_count,
            response.processing_time,
        )
        .await;

    info!(
        "POST /natural success={} results={} duration={:.3}s",
        response.success,
        response.result_count,
        start.elapsed().as_secs_f64()
    );
    Ok(Json(response))
}

/// Run raw SPL
async fn spl_query(
    State(state): State<AppState>,
    Json(req): Json<SplRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let start = Instant::now();
    let query = req.spl_query.trim();
    let max_results = req.max_results.unwrap_or(state.default_max_results);
    validate_spl_query(query)?;
    validate_max_results(max_results)?;
    info!("POST /spl query_len={} max_results={}", query.len(), max_results);

    let response = state.engine.run_spl(query, max_results).await;
    state
        .history
        .record(
            QueryKind::Spl,
            query,
            response.spl_query.clone(),
            response.success,
            response.result_count,
            response.processing_time,
        )
        .await;

    info!(
        "POST /spl success={} results={} duration={:.3}s",
        response.success,
        response.result_count,
        start.elapsed().as_secs_f64()
    );
    Ok(Json(response))
}

async fn enhance_query(
    State(state): State<AppState>,
    Json(req): Json<EnhanceRequest>,
) -> Result<Json<EnhancementResult>, ApiError> {
    let query = req.spl_query.trim();
    validate_spl_query(query)?;

    let feedback = sanitize_input(&req.feedback);
    let len = feedback.chars().count();
    if !(MIN_FEEDBACK_LEN..=MAX_FEEDBACK_LEN).contains(&len) {
        return Err(ApiError::bad_request(format!(
            "Feedback must be between {} and {} characters",
            MIN_FEEDBACK_LEN, MAX_FEEDBACK_LEN
        )));
    }

    Ok(Json(state.engine.enhance_query(query, &feedback).await))
}

async fn query_suggestions(
    State(state): State<AppState>,
    Json(req): Json<SuggestionsRequest>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    if !(1..=MAX_SUGGESTIONS_LIMIT).contains(&req.max_suggestions) {
        return Err(ApiError::bad_request(format!(
            "max_suggestions must be between 1 and {}",
            MAX_SUGGESTIONS_LIMIT
        )));
    }

    let mut suggestions = state.engine.suggest_questions(&req.partial_question);
    suggestions.truncate(req.max_suggestions);

    Ok(Json(SuggestionsResponse {
        suggestions,
        partial_question: req.partial_question,
    }))
}

/// 200 when every component is healthy, 503 otherwise
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let health = state.engine.get_health().await;
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

async fn list_indexes(State(state): State<AppState>) -> Json<IndexesResponse> {
    let indexes = state.engine.list_indexes().await;
    Json(IndexesResponse {
        count: indexes.len(),
        indexes,
    })
}

/// Recent search jobs on the backend
async fn search_history(
    State(state): State<AppState>,
    Query(params): Query<CountParams>,
) -> Result<Json<JobsResponse>, ApiError> {
    let count = params.count.unwrap_or(10);
    if !(1..=MAX_HISTORY_COUNT).contains(&count) {
        return Err(ApiError::bad_request(format!(
            "count must be between 1 and {}",
            MAX_HISTORY_COUNT
        )));
    }

    let jobs = state.engine.list_recent_jobs(count).await;
    Ok(Json(JobsResponse {
        count: jobs.len(),
        jobs,
    }))
}

/// Queries run through this server, newest first
async fn session_history(
    State(state): State<AppState>,
    Query(params): Query<CountParams>,
) -> Json<SessionResponse> {
    let count = params.count.unwrap_or(MAX_HISTORY_COUNT);
    let entries = state.history.recent(count).await;
    Json(SessionResponse {
        count: entries.len(),
        entries,
    })
}

async fn job_results(
    State(state): State<AppState>,
    Path(sid): Path<String>,
    Query(params): Query<CountParams>,
) -> Result<Json<JobResultsResponse>, ApiError> {
    let count = params.count.unwrap_or(state.default_max_results);
    validate_max_results(count)?;

    let results = state.engine.fetch_job_results(&sid, count).await;
    Ok(Json(JobResultsResponse {
        sid,
        result_count: results.len(),
        results,
    }))
}
