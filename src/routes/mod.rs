use axum::{routing::get, Router};
use std::sync::Arc;

use crate::AppState;

pub mod assistant;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .merge(assistant::routes())
}

async fn health_check() -> &'static str {
    "OK"
}
