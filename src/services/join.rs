//! In-memory joins over already-fetched record sequences.
//!
//! Keys compare by their normalized text, so the integer `3` matches the
//! string `"3"`. Lookups build a hash index once per call instead of
//! scanning the foreign sequence per record.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::Record;

/// Normalized join key of a value. `None` for null, arrays and objects.
pub fn key_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First record whose `field` equals `value`.
pub fn lookup<'a>(records: &'a [Record], field: &str, value: &Value) -> Option<&'a Record> {
    let wanted = key_of(value)?;
    records
        .iter()
        .find(|r| r.get(field).and_then(key_of).as_deref() == Some(wanted.as_str()))
}

/// Every record whose `field` equals `value`.
pub fn filter_by<'a>(records: &'a [Record], field: &str, value: &Value) -> Vec<&'a Record> {
    let Some(wanted) = key_of(value) else {
        return Vec::new();
    };
    records
        .iter()
        .filter(|r| r.get(field).and_then(key_of).as_deref() == Some(wanted.as_str()))
        .collect()
}

/// How to resolve one foreign key of a record.
#[derive(Debug, Clone, Copy)]
pub struct Attach<'a> {
    /// Field of the local record holding the foreign key.
    pub foreign_key: &'a str,
    /// Field of the foreign record the key refers to, usually `id`.
    pub primary_key: &'a str,
    /// Field of the foreign record to copy.
    pub source_field: &'a str,
    /// Field of the local record receiving the copy.
    pub target_field: &'a str,
    /// Value written when no foreign record matches.
    pub missing: &'a str,
}

/// Copy `source_field` of the matching foreign record into every local record.
pub fn attach(records: &mut [Record], foreign: &[Record], link: Attach<'_>) {
    let index: HashMap<String, &Value> = foreign
        .iter()
        .rev()
        .filter_map(|f| {
            let key = f.get(link.primary_key).and_then(key_of)?;
            Some((key, f.get(link.source_field).unwrap_or(&Value::Null)))
        })
        .collect();

    for record in records.iter_mut() {
        let value = record
            .get(link.foreign_key)
            .and_then(key_of)
            .and_then(|k| index.get(&k))
            .map(|v| (*v).clone())
            .unwrap_or_else(|| Value::String(link.missing.to_string()));
        record.insert(link.target_field.to_string(), value);
    }
}

/// One dropdown entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: Value,
    pub text: String,
    pub selected: bool,
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Build dropdown entries from `records`.
///
/// An entry is selected when either its value or its text matches
/// `selected`. With `merged_text_field` the text reads `"text (merged)"`.
pub fn select_options(
    records: &[Record],
    value_field: &str,
    text_field: &str,
    selected: Option<&Value>,
    merged_text_field: Option<&str>,
) -> Vec<SelectOption> {
    let selected_key = selected.and_then(key_of);

    records
        .iter()
        .map(|record| {
            let value = record.get(value_field).cloned().unwrap_or(Value::Null);
            let text = display(record.get(text_field));
            let text = match merged_text_field {
                Some(merged) => format!("{} ({})", text, display(record.get(merged))),
                None => text,
            };
            let selected = selected_key.as_deref().is_some_and(|wanted| {
                key_of(&value).as_deref() == Some(wanted)
                    || record.get(text_field).and_then(key_of).as_deref() == Some(wanted)
            });
            SelectOption { value, text, selected }
        })
        .collect()
}
