//! Loosely-typed records and the field predicates used to select them.

use serde_json::{Map, Value};

/// A document: field name to JSON value.
pub type Record = Map<String, Value>;

/// Field name of the per-collection integer id.
pub const ID_FIELD: &str = "id";

/// Field name of the opaque storage id as rendered to callers.
pub const OID_FIELD: &str = "_id";

/// Field holding the creation timestamp object.
pub const DATE_CREATED_FIELD: &str = "date_created";

/// Field holding the last update timestamp object.
pub const LAST_UPDATED_FIELD: &str = "last_updated";

/// Field computed on read from `date_created`.
pub const TIME_ELAPSED_FIELD: &str = "time_elapsed";

/// Form field carrying an explicit as-of creation date (`YYYY-MM-DD`).
pub const MANUAL_DATE_FIELD: &str = "manual_date_created";

/// Single-field equality test.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub value: Value,
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Check the predicate against an in-memory record. Agrees with the SQL
    /// `IS` test: numbers compare by value, booleans as 1/0, nested values
    /// as JSON text, and a missing field as null.
    pub fn matches(&self, record: &Record) -> bool {
        let stored = record.get(&self.field).map_or(SqlValue::Null, SqlValue::from);
        stored == SqlValue::from(&self.value)
    }
}

/// A JSON value as SQLite sees it after `json_extract`.
#[derive(Debug)]
enum SqlValue {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Int(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Text(s.clone()),
            nested @ (Value::Array(_) | Value::Object(_)) => Self::Text(nested.to_string()),
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int(i), Self::Real(r)) | (Self::Real(r), Self::Int(i)) => *i as f64 == *r,
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

/// Predicate groups combined with AND between groups.
///
/// - `any`: at least one predicate holds (empty = no constraint)
/// - `all`: every predicate holds
/// - `exclude`: no predicate holds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub any: Vec<Predicate>,
    pub all: Vec<Predicate>,
    pub exclude: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            any: predicates.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            all: predicates.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Add an OR alternative.
    pub fn matching(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.any.push(Predicate::eq(field, value));
        self
    }

    /// Add an AND requirement.
    pub fn requiring(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.all.push(Predicate::eq(field, value));
        self
    }

    /// Add a NOR exclusion.
    pub fn excluding(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.exclude.push(Predicate::eq(field, value));
        self
    }

    /// Merge another filter's groups into this one.
    pub fn and(mut self, other: &Filter) -> Self {
        self.any.extend(other.any.iter().cloned());
        self.all.extend(other.all.iter().cloned());
        self.exclude.extend(other.exclude.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.any.is_empty() && self.all.is_empty() && self.exclude.is_empty()
    }

    /// Evaluate against an in-memory record with the same semantics as the store.
    pub fn matches(&self, record: &Record) -> bool {
        (self.any.is_empty() || self.any.iter().any(|p| p.matches(record)))
            && self.all.iter().all(|p| p.matches(record))
            && !self.exclude.iter().any(|p| p.matches(record))
    }
}
