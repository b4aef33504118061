use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::response::Response;
use axum::routing::get;
use axum::{middleware, Json, Router};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::PirateHttpError;
use crate::health::HealthResponse;
use crate::state::AppState;

async fn ensure_request_id(req: Request<Body>, next: middleware::Next) -> Response {
    let request_id_header = HeaderName::from_static("x-request-id");

    let mut req = req;
    let request_id = req
        .headers()
        .get(&request_id_header)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if req.headers().get(&request_id_header).is_none() {
        if let Ok(v) = HeaderValue::from_str(&request_id) {
            req.headers_mut().insert(request_id_header.clone(), v);
        }
    }

    let mut res = next.run(req).await;

    if res.headers().get(&request_id_header).is_none() {
        if let Ok(v) = HeaderValue::from_str(&request_id) {
            res.headers_mut().insert(request_id_header, v);
        }
    }

    res
}

async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, PirateHttpError> {
    let report = state.health_source.health().await;
    let queue_depth = state.queue.length(&state.health_queue).await.map_err(|e| anyhow::anyhow!(e))?;

    Ok(Json(HealthResponse {
        status: "ok",
        provider: report.provider,
        authenticated: report.authenticated,
        model: report.model,
        queue_depth,
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> Result<String, PirateHttpError> {
    state.metrics.render().map_err(PirateHttpError::from)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(ensure_request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve<A: ToSocketAddrs>(state: AppState, addr: A) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
