//! Route modules for the StudyDrop server

pub mod admin;
pub mod ai;
pub mod auth;
pub mod classes;
pub mod colleges;
pub mod comments;
pub mod downloads;
pub mod extract;
pub mod flashcards;
pub mod health;
pub mod notifications;
pub mod proxy;
pub mod uploads;
pub mod users;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config().uploads.max_bytes;

    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/colleges", colleges::router())
        .nest("/classes", classes::router())
        .nest("/uploads", uploads::router(max_upload_bytes))
        .nest("/comments", comments::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
        .nest("/ai", ai::router())
        .nest("/flashcards", flashcards::router())
        .nest("/downloads", downloads::router())
        .nest("/proxy", proxy::router())
        .route("/health", get(health::health_check));

    Router::new()
        .nest("/health", health::router())
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
