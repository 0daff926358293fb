//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::LedgerStrategy;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub database: String,
    pub ledger_strategy: &'static str,
}

/// Health check endpoint handler
///
/// Reports database reachability and which ledger serialization strategy
/// the server was started with, so operators can tell the two deployments
/// apart without reading config files.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_status = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected".to_string(),
        Err(_) => "disconnected".to_string(),
    };

    let ledger_strategy = match state.config.ledger.strategy {
        LedgerStrategy::RowLock => "row_lock",
        LedgerStrategy::Optimistic => "optimistic",
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        database: db_status,
        ledger_strategy,
    })
}
