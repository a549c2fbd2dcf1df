//! HTTP server for the dashboard
//!
//! Serves the rendered page plus a small JSON API over the same workflows.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::{ApiKeys, KeyStore, KeyUpdate, LlmConfig, Settings};
use crate::error::DashboardError;
use crate::ui::{Dashboard, PageView, RunOutcome};
use crate::workflows::{Workflow, WorkflowReport};
use crate::Result;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub ticker: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub tab: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// Workflow Runner
/// =============================

/// Runs a workflow on behalf of a request
#[async_trait::async_trait]
pub trait WorkflowRunner: Send + Sync {
    async fn run(&self, workflow: Workflow, ticker: &str, keys: &ApiKeys) -> Result<WorkflowReport>;
}

/// Runner that talks to the configured LLM and the live data APIs
pub struct LiveRunner {
    llm: LlmConfig,
}

impl LiveRunner {
    pub fn new(llm: LlmConfig) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl WorkflowRunner for LiveRunner {
    async fn run(&self, workflow: Workflow, ticker: &str, keys: &ApiKeys) -> Result<WorkflowReport> {
        workflow.run(ticker, keys, &self.llm).await
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub llm: LlmConfig,
    pub keys: KeyStore,
    pub dashboard: Arc<Dashboard>,
    pub runner: Arc<dyn WorkflowRunner>,
}

impl ApiState {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            llm: settings.llm.clone(),
            keys: KeyStore::new(settings.keys.clone()),
            dashboard: Arc::new(Dashboard::new(settings.theme, settings.llm.backend)?),
            runner: Arc::new(LiveRunner::new(settings.llm.clone())),
        })
    }
}

/// =============================
/// Helpers
/// =============================

/// HTTP status for a failed run
pub fn status_for(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::MissingKeys(_) => StatusCode::PRECONDITION_FAILED,
        DashboardError::InvalidTicker(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn render_page(state: &ApiState, status: StatusCode, view: PageView) -> Response {
    match state.dashboard.render(&view) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "Dashboard render failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h1>Dashboard rendering failed</h1>".to_string()),
            )
                .into_response()
        }
    }
}

async fn execute(state: &ApiState, workflow: Workflow, ticker: &str) -> Result<WorkflowReport> {
    let keys = state.keys.snapshot().await;
    info!(workflow = %workflow, ticker = %ticker, "Run requested");

    let result = state.runner.run(workflow, ticker, &keys).await;
    if let Err(e) = &result {
        warn!(workflow = %workflow, ticker = %ticker, error = %e, "Run failed");
    }
    result
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Page Endpoints
/// =============================

async fn index(State(state): State<ApiState>, Query(query): Query<PageQuery>) -> Response {
    let tab = query
        .tab
        .as_deref()
        .and_then(|t| t.parse::<Workflow>().ok())
        .unwrap_or(Workflow::Forecast);

    let view = PageView::new(state.keys.snapshot().await).with_tab(tab);
    render_page(&state, StatusCode::OK, view)
}

async fn save_keys(State(state): State<ApiState>, Form(update): Form<KeyUpdate>) -> Response {
    let keys = state.keys.update(update).await;
    let view = PageView::new(keys).with_notice("API KEYS UPDATED.");
    render_page(&state, StatusCode::OK, view)
}

async fn run_page(state: ApiState, workflow: Workflow, form: RunRequest) -> Response {
    let result = execute(&state, workflow, &form.ticker).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e),
    };

    let view = PageView::new(state.keys.snapshot().await)
        .with_outcome(RunOutcome::from_result(workflow, result))
        .with_ticker(form.ticker.trim());
    render_page(&state, status, view)
}

async fn forecast_page(State(state): State<ApiState>, Form(form): Form<RunRequest>) -> Response {
    run_page(state, Workflow::Forecast, form).await
}

async fn report_page(State(state): State<ApiState>, Form(form): Form<RunRequest>) -> Response {
    run_page(state, Workflow::Report, form).await
}

/// =============================
/// JSON Endpoints
/// =============================

async fn run_json(
    state: ApiState,
    workflow: Workflow,
    payload: std::result::Result<Json<RunRequest>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!("Invalid request body: {}", rejection))),
            )
        }
    };

    match execute(&state, workflow, &req.ticker).await {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::success(report))),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn forecast_json(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<RunRequest>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    run_json(state, Workflow::Forecast, payload).await
}

async fn report_json(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<RunRequest>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    run_json(state, Workflow::Report, payload).await
}

async fn status(State(state): State<ApiState>) -> Json<ApiResponse> {
    let keys = state.keys.snapshot().await;
    Json(ApiResponse::success(serde_json::json!({
        "backend": state.llm.backend,
        "model": state.llm.model,
        "theme": state.dashboard.theme(),
        "missing_keys": keys.missing(),
        "workflows": Workflow::ALL,
    })))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/keys", post(save_keys))
        .route("/forecast", post(forecast_page))
        .route("/report", post(report_page))
        .route("/api/forecast", post(forecast_json))
        .route("/api/report", post(report_json))
        .route("/api/status", get(status))
        // Only the health check is readable cross-origin; runs spend the stored keys
        .route("/health", get(health).layer(CorsLayer::permissive()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(settings: Settings) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let state = ApiState::new(&settings)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;

    info!(
        backend = %settings.llm.backend,
        model = %settings.llm.model,
        theme = ?settings.theme,
        "Dashboard listening on http://0.0.0.0:{}",
        settings.port
    );
    info!("Local: http://127.0.0.1:{}", settings.port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::test_support::{calls, text, ScriptedModel};
    use crate::config::{Backend, Theme};
    use crate::tools::test_support::EchoTool;
    use crate::tools::ToolRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    /// Runs the real workflow against a scripted model and fake tools
    struct ScriptedRunner;

    #[async_trait::async_trait]
    impl WorkflowRunner for ScriptedRunner {
        async fn run(&self, workflow: Workflow, ticker: &str, keys: &ApiKeys) -> Result<WorkflowReport> {
            keys.ensure_complete()?;
            let model = Arc::new(ScriptedModel::new(vec![
                calls(&["get_company_profile"]),
                text("Outlook positive, +2% next week.\nTERMINATE"),
                text("Positive outlook: up 2% next week."),
            ]));
            let mut registry = ToolRegistry::new();
            registry.register(Arc::new(EchoTool { name: "get_company_profile", fail: false }));
            workflow.converse(ticker, model, registry).await
        }
    }

    fn state(keys: ApiKeys) -> ApiState {
        ApiState {
            llm: LlmConfig::new(Backend::Gemini),
            keys: KeyStore::new(keys),
            dashboard: Arc::new(Dashboard::new(Theme::Brutalist, Backend::Gemini).unwrap()),
            runner: Arc::new(ScriptedRunner),
        }
    }

    fn full_keys() -> ApiKeys {
        ApiKeys::new(Backend::Gemini, "g".into(), "m".into(), "f".into())
    }

    fn no_keys() -> ApiKeys {
        ApiKeys::new(Backend::Gemini, String::new(), String::new(), String::new())
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = create_router(state(full_keys()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    fn cross_origin_get(uri: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::ORIGIN, "https://evil.example")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_cors_only_on_health() {
        let router = create_router(state(full_keys()));

        let response = router.clone().oneshot(cross_origin_get("/health")).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );

        let response = router.oneshot(cross_origin_get("/api/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_index_renders_dashboard() {
        let response = create_router(state(no_keys()))
            .oneshot(Request::get("/?tab=report").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert!(html.contains("AGENTIC ANALYST"));
        assert!(html.contains("MISSING API KEYS: Google, FMP, Finnhub"));
        assert!(html.contains(r#"<section id="forecast" class="panel" hidden>"#));
        assert!(html.contains(r#"<section id="report" class="panel">"#));
    }

    #[tokio::test]
    async fn test_status_lists_missing_keys() {
        let keys = ApiKeys::new(Backend::Gemini, "g".into(), String::new(), "f".into());
        let response = create_router(state(keys))
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["backend"], "gemini");
        assert_eq!(body["data"]["theme"], "brutalist");
        assert_eq!(body["data"]["missing_keys"], serde_json::json!(["FMP"]));
    }

    #[tokio::test]
    async fn test_forecast_json_success() {
        let response = create_router(state(full_keys()))
            .oneshot(json_post("/api/forecast", serde_json::json!({"ticker": "reliance.ns"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["ticker"], "RELIANCE.NS");
        assert_eq!(body["data"]["summary"], "Positive outlook: up 2% next week.");
        assert_eq!(body["data"]["chat_history"][0]["name"], "User_Proxy");
    }

    #[tokio::test]
    async fn test_missing_keys_is_precondition_failed() {
        let response = create_router(state(no_keys()))
            .oneshot(json_post("/api/report", serde_json::json!({"ticker": "TCS.NS"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing API keys: Google, FMP, Finnhub");
    }

    #[tokio::test]
    async fn test_blank_ticker_is_bad_request() {
        let response = create_router(state(full_keys()))
            .oneshot(json_post("/api/forecast", serde_json::json!({"ticker": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_still_returns_envelope() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/forecast")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = create_router(state(full_keys())).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_form_run_renders_result_panel() {
        let response = create_router(state(full_keys()))
            .oneshot(form_post("/report", "ticker=tcs.ns"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert!(html.contains("REPORT GENERATION COMPLETE"));
        assert!(html.contains("ANNUAL PERFORMANCE REPORT"));
        assert!(html.contains("VIEW ANALYSIS STEPS"));
        assert!(html.contains("Positive outlook: up 2% next week."));
    }

    #[tokio::test]
    async fn test_form_run_without_keys() {
        let response = create_router(state(no_keys()))
            .oneshot(form_post("/forecast", "ticker=RELIANCE.NS"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        assert!(body_string(response).await.contains("CONFIGURE API KEYS IN SIDEBAR FIRST."));
    }

    #[tokio::test]
    async fn test_save_keys_keeps_blank_fields() {
        let state = state(ApiKeys::new(Backend::Gemini, "old".into(), String::new(), String::new()));
        let router = create_router(state.clone());

        let response = router
            .oneshot(form_post("/keys", "llm=&fmp=fmp-key&finnhub=fh-key"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("API KEYS UPDATED."));
        assert!(!html.contains("MISSING API KEYS"));

        let keys = state.keys.snapshot().await;
        assert_eq!(keys.llm, "old");
        assert_eq!(keys.fmp, "fmp-key");
        assert_eq!(keys.finnhub, "fh-key");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&DashboardError::MissingKeys(vec![])),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            status_for(&DashboardError::InvalidTicker(String::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&DashboardError::ToolError("boom".into())),
            StatusCode::BAD_GATEWAY
        );
    }
}
