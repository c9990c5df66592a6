//! Canonicalizes table-name casing in model-generated SQL.
//!
//! Models routinely write `employees` for a table reflected as `Employees`,
//! and some stores compare identifiers case-sensitively. The statement is
//! parsed into an owned tree, table references are rewritten to the reflected
//! spelling, and the tree is rendered back to text.

use std::collections::HashMap;
use std::convert::Infallible;
use std::ops::ControlFlow;

use sqlparser::ast::{Expr, Ident, ObjectNamePart, TableFactor, VisitMut, VisitorMut};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use crate::models::Schema;

/// Lowercase table name -> canonical table name.
///
/// When two tables differ only by case the later one in schema order wins.
#[derive(Debug, Clone, Default)]
pub struct TableNameMap(HashMap<String, String>);

impl TableNameMap {
    pub fn from_schema(schema: &Schema) -> Self {
        Self(
            schema
                .keys()
                .map(|table| (table.to_lowercase(), table.clone()))
                .collect(),
        )
    }

    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Rewrites table references in `sql` to their canonical casing in `schema`.
///
/// Returns `sql` untouched when the schema is empty or the SQL does not parse.
/// Only unquoted identifiers are adjusted. The rewrite is syntactic: a bare
/// column whose name matches a table is rewritten as well.
pub fn normalize_table_names(sql: &str, schema: &Schema) -> String {
    if schema.is_empty() {
        return sql.to_string();
    }

    let tables = TableNameMap::from_schema(schema);

    let mut statements = match Parser::parse_sql(&SQLiteDialect {}, sql) {
        Ok(statements) if !statements.is_empty() => statements,
        Ok(_) => return sql.to_string(),
        Err(e) => {
            debug!("Leaving SQL as-is, parser rejected it: {}", e);
            return sql.to_string();
        }
    };

    let mut rewriter = TableNameRewriter { tables: &tables };
    for statement in statements.iter_mut() {
        if let ControlFlow::Break(never) = statement.visit(&mut rewriter) {
            match never {}
        }
    }

    statements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

struct TableNameRewriter<'a> {
    tables: &'a TableNameMap,
}

impl TableNameRewriter<'_> {
    /// Rewrites `ident` in place, returning the canonical name it now holds.
    fn canonicalize(&self, ident: &mut Ident) -> Option<String> {
        if ident.quote_style.is_some() {
            return None;
        }
        let canonical = self.tables.canonical(&ident.value)?.to_string();
        ident.value = canonical.clone();
        Some(canonical)
    }
}

impl VisitorMut for TableNameRewriter<'_> {
    type Break = Infallible;

    fn pre_visit_table_factor(
        &mut self,
        table_factor: &mut TableFactor,
    ) -> ControlFlow<Infallible> {
        if let TableFactor::Table { name, alias, .. } = table_factor {
            let real_name = match name.0.last_mut() {
                Some(ObjectNamePart::Identifier(ident)) => ident,
                _ => return ControlFlow::Continue(()),
            };
            if let Some(canonical) = self.canonicalize(real_name) {
                let redundant = alias
                    .as_ref()
                    .is_some_and(|a| a.name.value == canonical && a.columns.is_empty());
                if redundant {
                    *alias = None;
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &mut Expr) -> ControlFlow<Infallible> {
        match expr {
            Expr::Identifier(ident) => {
                self.canonicalize(ident);
            }
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                let qualifier = parts.len() - 2;
                self.canonicalize(&mut parts[qualifier]);
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}
