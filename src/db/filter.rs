//! Translation of field predicates into SQL over the `documents` table.

use serde_json::Value;

use crate::models::{Filter, Predicate, ID_FIELD, OID_FIELD};
use crate::{Error, Result};

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Binding {
    Text(String),
    Int(i64),
    Real(f64),
}

/// Bind every value in order.
macro_rules! bind_all {
    ($query:expr, $bindings:expr) => {{
        let mut q = $query;
        for binding in $bindings {
            q = match binding {
                $crate::db::filter::Binding::Text(s) => q.bind(s.clone()),
                $crate::db::filter::Binding::Int(i) => q.bind(*i),
                $crate::db::filter::Binding::Real(f) => q.bind(*f),
            };
        }
        q
    }};
}
pub(crate) use bind_all;

/// WHERE clause (without the keyword) and its bindings.
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    pub sql: String,
    pub bindings: Vec<Binding>,
}

/// JSON path addressing a top-level field.
pub(crate) fn json_path(field: &str) -> Result<String> {
    if field.is_empty() || field.contains('"') {
        return Err(Error::InvalidInput(format!("Invalid field name: {:?}", field)));
    }
    Ok(format!("$.\"{}\"", field))
}

/// Null-safe equality test for one predicate. `IS` never yields NULL, so
/// negated groups keep records that lack the field.
fn predicate_sql(predicate: &Predicate, bindings: &mut Vec<Binding>) -> Result<String> {
    let column = match predicate.field.as_str() {
        ID_FIELD => "id".to_string(),
        OID_FIELD => "oid".to_string(),
        field => {
            bindings.push(Binding::Text(json_path(field)?));
            "json_extract(body, ?)".to_string()
        }
    };

    let sql = match &predicate.value {
        Value::Null => format!("{} IS NULL", column),
        Value::Bool(b) => {
            bindings.push(Binding::Int(i64::from(*b)));
            format!("{} IS ?", column)
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                bindings.push(Binding::Int(i));
            } else {
                bindings.push(Binding::Real(n.as_f64().unwrap_or(f64::NAN)));
            }
            format!("{} IS ?", column)
        }
        Value::String(s) => {
            bindings.push(Binding::Text(s.clone()));
            format!("{} IS ?", column)
        }
        nested @ (Value::Array(_) | Value::Object(_)) => {
            bindings.push(Binding::Text(nested.to_string()));
            format!("{} IS json(?)", column)
        }
    };

    Ok(sql)
}

fn group_sql(
    predicates: &[Predicate],
    joiner: &str,
    bindings: &mut Vec<Binding>,
) -> Result<String> {
    let parts = predicates
        .iter()
        .map(|p| predicate_sql(p, bindings))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("({})", parts.join(joiner)))
}

/// Build `collection = ? AND (any..) AND (all..) AND NOT (exclude..)`.
pub(crate) fn where_clause(collection: &str, filter: &Filter) -> Result<WhereClause> {
    let mut bindings = vec![Binding::Text(collection.to_string())];
    let mut parts = vec!["collection = ?".to_string()];

    if !filter.any.is_empty() {
        parts.push(group_sql(&filter.any, " OR ", &mut bindings)?);
    }
    if !filter.all.is_empty() {
        parts.push(group_sql(&filter.all, " AND ", &mut bindings)?);
    }
    if !filter.exclude.is_empty() {
        parts.push(format!("NOT {}", group_sql(&filter.exclude, " OR ", &mut bindings)?));
    }

    Ok(WhereClause {
        sql: parts.join(" AND "),
        bindings,
    })
}
