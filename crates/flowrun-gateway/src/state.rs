use std::sync::Arc;

use flowrun_core::config::GatewayConfig;
use flowrun_engine::FlowEngine;

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub engine: Arc<FlowEngine>,
}
