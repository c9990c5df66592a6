use serde_json::{json, Value as JsonValue};

use crate::error::AppError;
use crate::models::TabularResult;

/// Turns the model's Vega-Lite spec into one bound to the executed result.
///
/// Any `data` the model supplied is discarded; the query rows are inlined as
/// `data.values` instead.
pub fn prepare_chart(spec: &JsonValue, result: &TabularResult) -> Result<JsonValue, AppError> {
    let spec = match spec {
        JsonValue::String(text) => serde_json::from_str::<JsonValue>(text).map_err(|e| {
            AppError::ChartRenderFailure(format!("chart spec is not valid JSON: {}", e))
        })?,
        other => other.clone(),
    };

    let mut spec = match spec {
        JsonValue::Object(map) => map,
        other => {
            return Err(AppError::ChartRenderFailure(format!(
                "chart spec must be a JSON object, got {}",
                kind(&other)
            )))
        }
    };

    spec.remove("data");
    spec.insert("data".to_string(), json!({ "values": result.records() }));

    Ok(JsonValue::Object(spec))
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
