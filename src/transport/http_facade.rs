// =============================================================================
// HTTP FACADE
// =============================================================================
//
// Request/response binding of the dispatcher.
//
// **Routes:**
// - `GET  /health`       -> `{"status": "ok"}`
// - `GET  /tools`        -> `{"tools": [{name, description, inputSchema}]}`
// - `POST /tools/:name`  -> `DispatchResult` JSON (empty body = `{}`)
//
// The HTTP status mirrors the result's error kind so plain HTTP clients can
// branch on it; the body is the same `DispatchResult` either way.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

use super::TransportError;
use crate::core::tools::{DispatchResult, ErrorKind, ToolDispatcher};

pub fn router(dispatcher: Arc<ToolDispatcher>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/:name", post(call_tool))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(dispatcher)
}

/// Serves until Ctrl-C.
pub async fn serve(
    addr: SocketAddr,
    dispatcher: Arc<ToolDispatcher>,
    max_body_bytes: usize,
) -> Result<(), TransportError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })?;

    tracing::info!(%addr, "HTTP transport listening");

    axum::serve(listener, router(dispatcher, max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(TransportError::Serve)?;

    tracing::info!("HTTP transport stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_tools(State(dispatcher): State<Arc<ToolDispatcher>>) -> Json<Value> {
    let tools: Vec<Value> = dispatcher.tools().map(|tool| tool.definition()).collect();
    Json(json!({ "tools": tools }))
}

async fn call_tool(
    State(dispatcher): State<Arc<ToolDispatcher>>,
    Path(name): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<DispatchResult>) {
    let result = match parse_body(&body) {
        Ok(args) => dispatcher.dispatch(&name, args).await,
        Err(result) => result,
    };

    (status_for(&result), Json(result))
}

fn parse_body(body: &[u8]) -> Result<Value, DispatchResult> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| DispatchResult::Failure {
        error_kind: ErrorKind::InvalidArgument,
        message: format!("request body is not valid JSON: {}", e),
    })
}

pub fn status_for(result: &DispatchResult) -> StatusCode {
    match result.error_kind() {
        None => StatusCode::OK,
        Some(ErrorKind::InvalidArgument) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorKind::PermissionDenied) => StatusCode::FORBIDDEN,
        Some(ErrorKind::CredentialError) => StatusCode::UNAUTHORIZED,
        Some(ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
