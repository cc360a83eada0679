//! HTTP search API.
//!
//! This module exposes the ranking engine over HTTP with axum. The same search
//! endpoint accepts a `GET` query string or a `POST` JSON body with identical
//! semantics, and answers with ranked project records.
//!
//! Routes:
//!
//! - `GET|POST /api/projects/search` - run a search
//! - `GET /health` - liveness plus catalog size and whether semantic search is configured

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::catalog::FilterSpec;
use crate::models::{RelevanceLevel, ScoredResult};
use crate::query::{QueryError, RankingEngine, SearchOutcome, SearchQuery};

/// Message returned when a search arrives without query text.
pub const QUERY_REQUIRED: &str = "Query parameter is required";

/// Errors that can occur while serving requests.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid request parameters
    #[error("{0}")]
    InvalidRequest(String),

    /// Anything the caller could not have avoided
    #[error("{0}")]
    Internal(String),

    /// Failed to bind or run the listener
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

impl From<QueryError> for ServerError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidQuery(msg) => ServerError::InvalidRequest(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) | ServerError::Io(_) => {
                error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Search request, from either the query string or a JSON body.
///
/// Flat filter fields take precedence over the nested `filters` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default, rename = "type")]
    pub project_type: Option<String>,

    #[serde(default)]
    pub supervisor: Option<String>,

    #[serde(default, alias = "joint")]
    pub joint_or_ureca: Option<bool>,

    /// Number of results (default 20)
    #[serde(default, alias = "top", alias = "topK")]
    pub limit: Option<usize>,

    /// List the filtered catalog instead of ranking it
    #[serde(default)]
    pub initial_load: bool,

    #[serde(default)]
    pub filters: Option<FilterSpec>,
}

impl SearchParams {
    /// Validate the request and turn it into an engine query.
    ///
    /// # Errors
    /// Returns `ServerError::InvalidRequest` for a blank query outside initial-load mode
    pub fn into_query(self) -> ServerResult<SearchQuery> {
        let query = self.query.unwrap_or_default();
        if !self.initial_load && query.trim().is_empty() {
            return Err(ServerError::InvalidRequest(QUERY_REQUIRED.to_string()));
        }

        let flat = FilterSpec {
            category: self.category,
            project_type: self.project_type,
            supervisor: self.supervisor,
            joint_or_ureca: self.joint_or_ureca.unwrap_or(false),
        };
        let filters = flat.or(self.filters.unwrap_or_default());

        Ok(SearchQuery::new(query, self.limit, filters).with_initial_load(self.initial_load))
    }
}

/// Response payload for the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Results, best first
    pub results: Vec<ProjectResultDto>,

    /// Number of results, or the whole filtered set size for an initial load
    pub total: usize,

    /// Whether the semantic strategy produced these results
    pub using_semantic: bool,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            results: outcome.results.into_iter().map(ProjectResultDto::from).collect(),
            total: outcome.total,
            using_semantic: outcome.using_semantic,
        }
    }
}

/// Data transfer object for a single search result.
///
/// Flattens the project record and its score into the dataset's field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResultDto {
    pub project_no: String,
    pub score: f32,
    pub title: String,
    pub summary: String,
    pub supervisor: String,
    pub category: String,
    #[serde(rename = "type")]
    pub project_type: String,
    #[serde(rename = "isJointOrURECA")]
    pub is_joint_or_ureca: String,
    pub keywords: Vec<String>,
    pub relevance: RelevanceLevel,
}

impl From<ScoredResult> for ProjectResultDto {
    fn from(result: ScoredResult) -> Self {
        let project = result.project;
        Self {
            project_no: project.project_no,
            score: result.score,
            title: project.title,
            summary: project.summary,
            supervisor: project.supervisor,
            category: project.category,
            project_type: project.project_type,
            is_joint_or_ureca: project.is_joint_or_ureca,
            keywords: project.keywords,
            relevance: result.relevance,
        }
    }
}

/// Response payload for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub projects: usize,
    pub semantic_configured: bool,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Upper bound on the time spent answering one search
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Address to bind, as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared, read-only request context.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<RankingEngine>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(engine: Arc<RankingEngine>, config: &ServerConfig) -> Self {
        Self {
            engine,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/projects/search", get(search_get).post(search_post))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve the API until Ctrl-C is received.
///
/// # Errors
/// Returns `ServerError::Io` if the address cannot be bound or serving fails
pub async fn serve(config: &ServerConfig, state: AppState) -> ServerResult<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn search_get(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ServerResult<Json<SearchResponse>> {
    let Query(params) = params.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    run_search(&state, params).await
}

async fn search_post(
    State(state): State<AppState>,
    params: Result<Json<SearchParams>, JsonRejection>,
) -> ServerResult<Json<SearchResponse>> {
    let Json(params) = params.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    run_search(&state, params).await
}

async fn run_search(state: &AppState, params: SearchParams) -> ServerResult<Json<SearchResponse>> {
    let query = params.into_query()?;
    debug!("Search request: {:?}", query);

    let outcome = tokio::time::timeout(state.request_timeout, state.engine.search(&query))
        .await
        .map_err(|_| ServerError::Internal("search timed out".to_string()))??;

    Ok(Json(SearchResponse::from(outcome)))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        projects: state.engine.catalog().len(),
        semantic_configured: state.engine.semantic_configured(),
    })
}
