use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flowrun_core::graph::RunResult;

use crate::error::ApiError;
use crate::middleware::Authenticated;
use crate::state::AppState;

// GET /api/health, no auth required
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// POST /api/flow/execute
pub async fn execute_flow(
    Authenticated(auth_result): Authenticated,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RunResult>, ApiError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|_| ApiError::InvalidJson)?;
    info!(caller = %auth_result.name, bytes = body.len(), "Executing flow");

    // Dropped with the handler when the client goes away.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let run = state.engine.execute_payload(&payload, cancel).await?;
    Ok(Json(run))
}
