use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::ParsedLlmResponse;

static LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"//.*\n").expect("line comment pattern"));
static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern"));
static TRAILING_COMMA_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\}").expect("trailing comma pattern"));
static TRAILING_COMMA_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\]").expect("trailing comma pattern"));

/// Decodes a model reply into `sql`, `summary` and `chart`.
///
/// Strict JSON is tried first. Failing that, the outermost `{...}` is cut out
/// and patched for the usual model mistakes (single quotes, comments, trailing
/// commas) before a second strict decode. Quote swapping also hits apostrophes
/// inside values; that case ends in [`AppError::MalformedResponse`].
pub fn parse_llm_response(raw_text: &str) -> Result<ParsedLlmResponse, AppError> {
    let content = raw_text.trim();

    match serde_json::from_str::<ParsedLlmResponse>(content) {
        Ok(parsed) => return Ok(parsed),
        Err(e) => debug!("Strict decode failed, attempting repair: {}", e),
    }

    let repaired = extract_object(content).map(repair_fragment);
    match repaired.as_deref().map(serde_json::from_str::<ParsedLlmResponse>) {
        Some(Ok(parsed)) => Ok(parsed),
        Some(Err(e)) => Err(malformed(raw_text, &e.to_string())),
        None => Err(malformed(raw_text, "no JSON object found")),
    }
}

fn extract_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn repair_fragment(fragment: &str) -> String {
    let fragment = fragment.replace('\'', "\"");
    let fragment = LINE_COMMENT.replace_all(&fragment, "");
    let fragment = BLOCK_COMMENT.replace_all(&fragment, "");
    let fragment = TRAILING_COMMA_OBJECT.replace_all(&fragment, "}");
    TRAILING_COMMA_ARRAY.replace_all(&fragment, "]").into_owned()
}

fn malformed(raw_text: &str, reason: &str) -> AppError {
    warn!("LLM returned invalid JSON ({}). Raw output:\n{}", reason, raw_text);
    AppError::MalformedResponse { raw: raw_text.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select_one() -> ParsedLlmResponse {
        ParsedLlmResponse {
            sql: Some("SELECT 1".to_string()),
            summary: "ok".to_string(),
            chart: None,
        }
    }

    #[test]
    fn strict_json_is_decoded_directly() {
        let raw = r#"{"sql":"SELECT 1","summary":"ok","chart":null}"#;
        let parsed = parse_llm_response(raw).unwrap();
        assert_eq!(parsed, select_one());
    }

    #[test]
    fn strict_json_keeps_chart_object() {
        let raw = r#"{"sql":"SELECT city FROM employees","summary":"","chart":{"mark":"bar","encoding":{}}}"#;
        let parsed = parse_llm_response(raw).unwrap();
        assert_eq!(parsed.chart, Some(json!({"mark": "bar", "encoding": {}})));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let parsed = parse_llm_response(r#"  {"summary": "nothing to query"}  "#).unwrap();
        assert_eq!(parsed.sql, None);
        assert_eq!(parsed.summary, "nothing to query");
        assert_eq!(parsed.chart, None);
    }

    #[test]
    fn repairs_single_quotes_and_trailing_comma_in_prose() {
        let raw = "Here is the answer: {'sql': 'SELECT 1', 'summary': 'ok',}";
        let parsed = parse_llm_response(raw).unwrap();
        assert_eq!(parsed, select_one());
    }

    #[test]
    fn strips_comments_and_array_trailing_commas() {
        let raw = "```json\n{\n  // generated query\n  \"sql\": \"SELECT 1\",\n  /* short\n explanation */\n  \"summary\": \"ok\",\n  \"chart\": {\"layer\": [1, 2,],},\n}\n```";
        let parsed = parse_llm_response(raw).unwrap();
        assert_eq!(parsed.sql.as_deref(), Some("SELECT 1"));
        assert_eq!(parsed.summary, "ok");
        assert_eq!(parsed.chart, Some(json!({"layer": [1, 2]})));
    }

    #[test]
    fn plain_text_is_malformed_and_keeps_raw() {
        match parse_llm_response("not json at all") {
            Err(AppError::MalformedResponse { raw }) => assert_eq!(raw, "not json at all"),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn unrecoverable_fragment_is_malformed() {
        let raw = "{'sql': 'SELECT name FROM t WHERE name = 'O'Brien''}";
        assert!(matches!(
            parse_llm_response(raw),
            Err(AppError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn reversed_braces_are_malformed() {
        assert!(matches!(
            parse_llm_response("} oops {"),
            Err(AppError::MalformedResponse { .. })
        ));
    }
}
