use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("LLM error: {0}")]
    LlmError(String),
    /// The model reply could not be turned into `sql`/`summary`/`chart`.
    /// `raw` is the untouched reply so the caller can show it.
    #[error("LLM returned invalid JSON")]
    MalformedResponse { raw: String },
    #[error("Unsafe SQL blocked: only SELECT and WITH queries are allowed")]
    UnsafeQuery { sql: String },
    #[error("Query failed: {0}")]
    ExecutionFailure(String),
    #[error("Chart rendering failed: {0}")]
    ChartRenderFailure(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<tokio_rusqlite::Error> for AppError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            AppError::LlmError(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": message }))
            }
            AppError::MalformedResponse { raw } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": message, "raw_response": raw }),
            ),
            AppError::UnsafeQuery { sql } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message, "sql": sql }),
            ),
            AppError::ExecutionFailure(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            AppError::ChartRenderFailure(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message }))
            }
            AppError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    fn status_and_body(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = tokio_test::block_on(to_bytes(response.into_body(), usize::MAX)).unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn unsafe_query_returns_blocked_sql() {
        let (status, body) = status_and_body(AppError::UnsafeQuery {
            sql: "DROP TABLE t".to_string(),
        });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["sql"], "DROP TABLE t");
        assert!(body["error"].as_str().unwrap().starts_with("Unsafe SQL blocked"));
    }

    #[test]
    fn malformed_response_returns_raw_reply() {
        let raw = "Sorry, I can't help with that {oops";
        let (status, body) = status_and_body(AppError::MalformedResponse {
            raw: raw.to_string(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["raw_response"], raw);
        assert_eq!(body["error"], "LLM returned invalid JSON");
    }

    #[test]
    fn execution_failure_message_is_user_visible() {
        let (status, body) =
            status_and_body(AppError::ExecutionFailure("no such column: salry".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query failed: no such column: salry");
    }
}
