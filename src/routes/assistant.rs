use axum::{
    extract::State,
    routing::{get, post},
    Router,
    Json,
    http::Method,
};
use std::sync::Arc;
use tower_http::cors::{CorsLayer, Any};

use crate::{
    AppState,
    error::AppError,
    models::{AskRequest, QueryAnswer, Schema},
    services::assistant::answer_question,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/ask", post(ask))
        .route("/schema", get(current_schema))
        .route("/schema/refresh", post(refresh_schema))
        .layer(cors)
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<QueryAnswer>, AppError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(AppError::InvalidInput("Please type a question before running.".to_string()));
    }

    tracing::info!("Answering question: {}", question);
    let schema = state.schema();
    let answer = answer_question(
        question,
        &state.llm,
        &state.db,
        &schema,
        state.config.max_rows,
    )
    .await
    .map_err(|e| {
        tracing::error!("Question failed: {}", e);
        e
    })?;

    Ok(Json(answer))
}

async fn current_schema(State(state): State<Arc<AppState>>) -> Json<Schema> {
    Json(state.schema())
}

async fn refresh_schema(State(state): State<Arc<AppState>>) -> Result<Json<Schema>, AppError> {
    let schema = state.refresh_schema().await?;
    Ok(Json(schema))
}
