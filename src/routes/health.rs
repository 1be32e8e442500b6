//! Health check endpoints

use axum::{extract::State, routing::get, Router};
use serde::Serialize;

use crate::state::AppState;
use super::extract::Json;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub database: &'static str,
    pub ai_enabled: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(state.db()).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!("Health check database ping failed: {}", e);
            "unavailable"
        }
    };

    Json(HealthResponse {
        status: if database == "ok" { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        service: "studydrop-server",
        database,
        ai_enabled: state.ai().is_enabled(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}
