//! Read-only gate and row cap applied to model-generated SQL before it runs.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use tracing::debug;

pub const DEFAULT_MAX_ROWS: u32 = 200;

pub const FORBIDDEN_KEYWORDS: [&str; 15] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "CREATE",
    "REPLACE", "GRANT", "REVOKE", "MERGE", "CALL", "EXEC", "BEGIN", "COMMIT",
];

const READ_ONLY_PREFIXES: [&str; 2] = ["SELECT", "WITH"];

const ROW_CAP_MARKERS: [&str; 3] = [" LIMIT ", " FETCH ", " TOP "];

/// Returns `true` when `sql` is a read-only query.
///
/// Every bare keyword token in the input is checked against
/// [`FORBIDDEN_KEYWORDS`], trailing statements included, and the outer
/// statement must start with `SELECT` or `WITH`. String literals and quoted
/// identifiers are single tokens, so `'DROP'` or `"delete"` do not trip it.
pub fn is_select_only(sql: &str) -> bool {
    let dialect = SQLiteDialect {};
    let tokens = match Tokenizer::new(&dialect, sql).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => {
            debug!("Rejecting SQL that does not tokenize: {}", e);
            return false;
        }
    };

    let significant: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_) | Token::EOF))
        .collect();

    if !significant.iter().any(|t| !matches!(t, Token::SemiColon)) {
        return false;
    }

    let forbidden = significant.iter().find_map(|t| match t {
        Token::Word(word) if word.quote_style.is_none() => {
            let upper = word.value.to_uppercase();
            FORBIDDEN_KEYWORDS.contains(&upper.as_str()).then_some(upper)
        }
        _ => None,
    });
    if let Some(keyword) = forbidden {
        debug!("Rejecting SQL containing forbidden keyword {}", keyword);
        return false;
    }

    let leading = sql.trim().to_uppercase();
    READ_ONLY_PREFIXES.iter().any(|prefix| leading.starts_with(prefix))
}

/// Appends ` LIMIT {max_rows}` unless the query already caps its rows.
///
/// Detection is a plain substring check on the upper-cased text, so a
/// literal such as `'... limit ...'` also counts as an existing cap.
pub fn add_limit(sql: &str, max_rows: u32) -> String {
    let upper = sql.to_uppercase();
    if ROW_CAP_MARKERS.iter().any(|marker| upper.contains(marker)) {
        return sql.to_string();
    }
    format!("{} LIMIT {}", sql.trim_end(), max_rows)
}
