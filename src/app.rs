use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;
use crate::problem::{Platform, ProblemRecord, SubmissionStatus, strip_tle_marker};
use crate::scanner::{ScanTrigger, Scanner};
use crate::source::GitHubClient;
use crate::store::{ProblemUpdate, RecordStore, StoreError};

pub struct AppState {
    pub store: Arc<RecordStore>,
    /// Absent when the server runs without a scanner, as in tests
    pub scanner: Option<Arc<dyn ScanTrigger>>,
}

/// Query filters accepted by `GET /api/problems`
#[derive(Debug, Default, Deserialize)]
pub struct ProblemFilter {
    pub platform: Option<String>,
    pub result: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateQuery {
    platform: Option<String>,
}

struct ParsedFilter {
    platform: Option<Platform>,
    result: Option<SubmissionStatus>,
    query: Option<String>,
}

impl ProblemFilter {
    fn parse(&self) -> Result<ParsedFilter, String> {
        let platform = match non_empty(&self.platform) {
            Some(p) => Some(p.parse::<Platform>()?),
            None => None,
        };
        let result = match non_empty(&self.result) {
            Some(r) => Some(r.parse::<SubmissionStatus>()?),
            None => None,
        };
        Ok(ParsedFilter {
            platform,
            result,
            query: non_empty(&self.q).map(|q| q.to_lowercase()),
        })
    }
}

impl ParsedFilter {
    fn matches(&self, problem: &ProblemRecord) -> bool {
        if self.platform.is_some_and(|p| p != problem.platform) {
            return false;
        }
        if self.result.is_some_and(|r| r != effective_status(problem)) {
            return false;
        }
        match &self.query {
            Some(q) => {
                problem.display_name().to_lowercase().contains(q)
                    || problem.problem_id.to_lowercase().contains(q)
                    || problem.tags.iter().any(|t| t.to_lowercase().contains(q))
            }
            None => true,
        }
    }
}

/// Records written before `result` existed only carry the name marker
fn effective_status(problem: &ProblemRecord) -> SubmissionStatus {
    if strip_tle_marker(&problem.name).is_some() {
        SubmissionStatus::TimeLimitExceeded
    } else {
        problem.result
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Start the scanner and serve the API until the process is stopped
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(RecordStore::new(&config.data_file));
    store.init()?;

    let client = GitHubClient::new(
        config.repo.clone(),
        &config.github_api_url,
        config.github_token.as_deref(),
        config.http_timeout,
    )?;
    let scanner = Arc::new(Scanner::new(client, config.repo.clone(), Arc::clone(&store)));
    Arc::clone(&scanner).spawn_periodic(config.scan_interval);

    let app_state = Arc::new(AppState {
        store,
        scanner: Some(scanner),
    });
    let app = router(app_state, &config);

    let listener = TcpListener::bind(config.listen_addr()).await?;
    log::info!("Server is running on port {}", config.port);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP routes and their middleware
///
/// With a static directory, paths that match no file get `index.html` with
/// a 200 so client-side routes survive a reload.
pub fn router(state: Arc<AppState>, config: &Config) -> Router {
    let api = Router::new()
        .route("/api/problems", get(list_problems))
        .route("/api/problems/:problem_id", put(update_problem))
        .route("/api/scan", post(trigger_scan))
        .with_state(state);

    let app = match &config.static_dir {
        Some(dir) => api.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => api.fallback(not_found),
    };

    app.layer(CatchPanicLayer::custom(internal_error))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO)))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::PUT, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return cors.allow_origin(AnyOrigin);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid allowed origin {:?}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

async fn list_problems(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filter): Query<ProblemFilter>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    log::info!("GET /api/problems request from: {}", origin);

    let filter = match filter.parse() {
        Ok(filter) => filter,
        Err(message) => return error_listing(StatusCode::BAD_REQUEST, &message),
    };

    let mut snapshot = state.store.read();
    snapshot.problems.retain(|p| filter.matches(p));

    Json(snapshot).into_response()
}

async fn update_problem(
    State(state): State<Arc<AppState>>,
    Path(problem_id): Path<String>,
    Query(query): Query<UpdateQuery>,
    Json(update): Json<ProblemUpdate>,
) -> Response {
    let platform = match non_empty(&query.platform).map(str::parse::<Platform>) {
        Some(Ok(platform)) => Some(platform),
        Some(Err(message)) => {
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message })))
                .into_response();
        }
        None => None,
    };

    match state.store.update(&problem_id, platform, &update) {
        Ok(record) => Json(record).into_response(),
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Problem not found" })),
        )
            .into_response(),
        Err(e) => {
            log::error!("Error updating problem {}: {}", problem_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

async fn trigger_scan(State(state): State<Arc<AppState>>) -> Response {
    let Some(scanner) = &state.scanner else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "scanner disabled" })),
        )
            .into_response();
    };

    if Arc::clone(scanner).trigger() {
        (StatusCode::ACCEPTED, Json(serde_json::json!({ "status": "started" }))).into_response()
    } else {
        (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "status": "already running" })),
        )
            .into_response()
    }
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Listing-shaped error body, so clients always get `problems` back
fn error_listing(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": message,
            "problems": [],
            "lastModified": Utc::now(),
        })),
    )
        .into_response()
}

fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    log::error!("Error: {}", detail);
    error_listing(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}
