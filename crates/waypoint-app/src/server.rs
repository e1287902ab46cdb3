//! HTTP surface: one generation endpoint plus a health check.

use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, DefaultBodyLimit, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::Instrument;
use uuid::Uuid;
use waypoint_adapters::config::{Config, RateLimitConfig};
use waypoint_adapters::RateLimiter;
use waypoint_core::{PipelineError, Roadmap, Violation};
use waypoint_engine::Pipeline;


/// Header carrying the caller's address when behind a proxy.
const FORWARDED_FOR: &str = "x-forwarded-for";
/// Response header echoing the generated request id.
const REQUEST_ID: &str = "x-request-id";
/// Identity shared by callers that cannot be told apart.
pub const UNKNOWN_CLIENT: &str = "unknown";

// --- Error Handling ---

/// Wraps a pipeline failure so it renders as `{ error, kind, details? }`.
pub struct AppError(PipelineError);

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        // Diagnostics are redacted and bounded when attached to the error.
        // Upstream faults were already logged at warn by the pipeline.
        if let Some(diagnostic) = &err.diagnostic {
            if err.kind.is_caller_fault() || err.kind.is_upstream_fault() {
                tracing::debug!(kind = err.kind.as_str(), diagnostic = %diagnostic, "request failed");
            } else {
                tracing::error!(kind = err.kind.as_str(), cause = %diagnostic, "internal error");
            }
        }
        let status =
            StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(err.body())).into_response()
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let cause = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("handler panicked");
    AppError(PipelineError::internal(cause)).into_response()
}

// --- Client identity ---

/// First entry of `x-forwarded-for`, or [`UNKNOWN_CLIENT`].
pub fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

// --- State ---

#[derive(Clone)]
pub struct AppState {
    pipeline: Pipeline,
    body_limit_kb: usize,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, body_limit_kb: usize) -> Self {
        Self {
            pipeline,
            body_limit_kb,
            started_at: Utc::now(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    mode: &'static str,
    started_at: DateTime<Utc>,
    tracked_clients: usize,
}

// --- Handlers ---

fn body_violation(rejection: &BytesRejection, limit_kb: usize) -> Violation {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Violation::new(
            "",
            "max_size",
            format!("Request body must be at most {} KB", limit_kb),
        )
    } else {
        Violation::new("", "body", rejection.body_text())
    }
}

async fn generate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Roadmap>, AppError> {
    let identity = client_identity(&headers);
    tracing::Span::current().record("client", identity.as_str());
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let violation = body_violation(&rejection, state.body_limit_kb);
            return Err(state.pipeline.reject_unreadable(&identity, violation).into());
        }
    };

    // Detached so a client disconnect does not cancel the upstream call.
    let pipeline = state.pipeline.clone();
    let work = tokio::spawn(
        async move { pipeline.handle(&identity, &body).await }.in_current_span(),
    );
    let roadmap = work
        .await
        .map_err(|err| PipelineError::internal(format!("generation task failed: {}", err)))??;
    Ok(Json(roadmap))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: state.pipeline.mode().as_str(),
        started_at: state.started_at,
        tracked_clients: state.pipeline.limiter().tracked(),
    })
}

/// Run every request inside a span keyed by a fresh request id.
async fn request_span(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        %request_id,
        method = %req.method(),
        path = %req.uri().path(),
        client = tracing::field::Empty,
    );
    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID, value);
    }
    response
}

// --- Server ---

pub fn router(pipeline: Pipeline, body_limit_kb: usize) -> Router {
    let routes = Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/healthz", get(health_handler))
        .with_state(AppState::new(pipeline, body_limit_kb));
    with_layers(routes, body_limit_kb)
}

/// Shared middleware stack. The request span sits outside panic recovery so
/// even a panicking handler's response carries its request id.
fn with_layers(routes: Router, body_limit_kb: usize) -> Router {
    routes
        .layer(DefaultBodyLimit::max(body_limit_kb * 1024))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(request_span))
        .layer(TraceLayer::new_for_http())
}

/// Periodically drop rate-limit entries that have been idle for a while.
pub fn spawn_sweeper(limiter: RateLimiter, config: &RateLimitConfig) -> tokio::task::JoinHandle<()> {
    let every = Duration::from_secs(config.sweep_interval_secs);
    let idle = limiter.window() * config.idle_windows;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.evict_idle(tokio::time::Instant::now().into_std(), idle);
            if removed > 0 {
                tracing::debug!(removed, remaining = limiter.tracked(), "evicted idle rate-limit entries");
            }
        }
    })
}

pub async fn run_server(config: Config) -> Result<()> {
    let pipeline = Pipeline::from_config(&config).context("failed to build generation pipeline")?;
    let sweeper = spawn_sweeper(pipeline.limiter().clone(), &config.rate_limit);
    let mode = pipeline.mode();
    let app = router(pipeline, config.server.body_limit_kb);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.server.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, mode = mode.as_str(), "waypoint listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down gracefully");
        })
        .await;
    sweeper.abort();
    served.context("server error")
}
