//! One question, end to end: model reply -> normalized, gated, capped SQL ->
//! result rows -> chart.

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{ParsedLlmResponse, QueryAnswer, Schema, TabularResult};
use crate::services::chart::prepare_chart;
use crate::services::datasource::DataSource;
use crate::services::llm_agent::LlmAgent;
use crate::services::normalizer::normalize_table_names;
use crate::services::response_repair::parse_llm_response;
use crate::services::safety::{add_limit, is_select_only};

const NO_SQL_NOTICE: &str = "No SQL query was generated for this question.";

/// Turns the model's SQL into the statement that will actually run.
///
/// `Ok(None)` means the model produced no SQL. Queries that fail the
/// read-only gate come back as [`AppError::UnsafeQuery`] and must not run.
pub fn prepare_sql(
    parsed: &ParsedLlmResponse,
    schema: &Schema,
    max_rows: u32,
) -> Result<Option<String>, AppError> {
    let sql = match parsed.sql.as_deref().map(str::trim) {
        Some(sql) if !sql.is_empty() => sql,
        _ => return Ok(None),
    };

    let sql = normalize_table_names(sql, schema);
    if !is_select_only(&sql) {
        warn!("LLM generated unsafe SQL, query blocked: {}", sql);
        return Err(AppError::UnsafeQuery { sql });
    }

    Ok(Some(add_limit(&sql, max_rows)))
}

/// Models say "no chart" with `null`, `""`, `{}`, `[]` or `false`.
fn requests_chart(spec: &JsonValue) -> bool {
    match spec {
        JsonValue::Null | JsonValue::Bool(false) => false,
        JsonValue::String(text) => !text.trim().is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Builds the answer for an executed (or skipped) query. A chart that cannot
/// be prepared is reported in `chart_error` and the rows are still returned.
pub fn build_answer(
    question: &str,
    parsed: ParsedLlmResponse,
    sql: Option<String>,
    result: Option<TabularResult>,
    schema: &Schema,
) -> QueryAnswer {
    let ParsedLlmResponse { summary, chart, .. } = parsed;

    let Some(result) = result else {
        return QueryAnswer {
            question: question.to_string(),
            sql,
            summary,
            notice: Some(NO_SQL_NOTICE.to_string()),
            schema: Some(schema.clone()),
            ..Default::default()
        };
    };

    let chart = chart.filter(requests_chart);
    let (chart, chart_error) = match chart.as_ref().map(|spec| prepare_chart(spec, &result)) {
        Some(Ok(chart)) => (Some(chart), None),
        Some(Err(e)) => {
            warn!("{}", e);
            (None, Some(e.to_string()))
        }
        None => (None, None),
    };

    QueryAnswer {
        question: question.to_string(),
        sql,
        summary,
        result: Some(result),
        chart,
        chart_error,
        ..Default::default()
    }
}

/// Everything after the model call: repair, prepare, execute, answer.
pub async fn answer_from_reply(
    question: &str,
    raw_reply: &str,
    db: &DataSource,
    schema: &Schema,
    max_rows: u32,
) -> Result<QueryAnswer, AppError> {
    let parsed = parse_llm_response(raw_reply)?;
    let Some(sql) = prepare_sql(&parsed, schema, max_rows)? else {
        info!("Model returned no SQL for question");
        return Ok(build_answer(question, parsed, None, None, schema));
    };

    let result = db.execute_readonly(&sql).await?;
    info!("Query returned {} rows", result.rows.len());

    Ok(build_answer(question, parsed, Some(sql), Some(result), schema))
}

pub async fn answer_question(
    question: &str,
    llm: &LlmAgent,
    db: &DataSource,
    schema: &Schema,
    max_rows: u32,
) -> Result<QueryAnswer, AppError> {
    let start = std::time::Instant::now();

    let raw_reply = llm.complete(question, schema).await?;
    let answer = answer_from_reply(question, &raw_reply, db, schema, max_rows).await?;

    info!("Answered question in {:?}", start.elapsed());
    Ok(answer)
}
