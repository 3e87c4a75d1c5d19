//! Document queries: the strict, error-returning surface of the store.
//!
//! Every function takes the collection name first. Collections are created
//! lazily on first use. Records come back formatted: `_id` (opaque id as a
//! string), `id` (integer), every stored field, and `time_elapsed` computed
//! from `date_created`.

use chrono::NaiveDateTime;
use regex::RegexBuilder;
use serde_json::Value;
use sqlx::{FromRow, Sqlite};
use tracing::{debug, warn};
use uuid::Uuid;

use super::filter::{bind_all, where_clause};
use super::{next_sequence, DbPool};
use crate::models::{
    new_oid, Filter, Predicate, Record, DATE_CREATED_FIELD, ID_FIELD, LAST_UPDATED_FIELD,
    MANUAL_DATE_FIELD, OID_FIELD, TIME_ELAPSED_FIELD,
};
use crate::services::timestamps;
use crate::{Error, Result};

/// Fields a patch can never overwrite.
const PROTECTED_FIELDS: [&str; 4] = [ID_FIELD, OID_FIELD, DATE_CREATED_FIELD, TIME_ELAPSED_FIELD];

/// Raw document row.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub oid: String,
    pub id: i64,
    pub body: String,
}

impl DocumentRow {
    /// Decode the body and add `_id`, `id` and `time_elapsed`.
    pub fn into_record(self, now: NaiveDateTime) -> Result<Record> {
        let mut record = match serde_json::from_str::<Value>(&self.body)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::Internal(format!(
                    "Document {} body is not an object: {}",
                    self.oid, other
                )))
            }
        };

        let elapsed = timestamps::stored_timestamp(&record, DATE_CREATED_FIELD)
            .map(|ts| timestamps::relative_time(&ts, now))
            .unwrap_or_default();

        record.insert(OID_FIELD.to_string(), Value::String(self.oid));
        record.insert(ID_FIELD.to_string(), Value::from(self.id));
        record.insert(TIME_ELAPSED_FIELD.to_string(), Value::String(elapsed));

        Ok(record)
    }
}

fn format_rows(rows: Vec<DocumentRow>) -> Result<Vec<Record>> {
    let now = timestamps::now();
    rows.into_iter().map(|row| row.into_record(now)).collect()
}

fn validate_collection(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("Collection name is required".to_string()));
    }
    Ok(())
}

/// Normalize a caller-supplied opaque id.
pub fn parse_oid(oid: &str) -> Result<String> {
    Ok(Uuid::parse_str(oid.trim())?.simple().to_string())
}

/// Coerce an integer-like value (`5`, `"5"`, `5.0`) to `i64`.
pub fn coerce_integer(value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::InvalidInput(format!("Expected an integer, got {}", value)))
}

/// Canonical text of a value for the uniqueness index. Blank values are not indexed.
fn unique_key_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Register a collection name. Idempotent.
pub async fn ensure_collection(pool: &DbPool, name: &str) -> Result<()> {
    validate_collection(name)?;
    sqlx::query("INSERT OR IGNORE INTO collections (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// All registered collection names.
pub async fn list_collections(pool: &DbPool) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM collections ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(names)
}

/// Prepare a record for insertion: drop caller-supplied ids and update
/// stamps, then attach `date_created`, back-dated when an as-of date is given.
fn prepare_insert(mut record: Record, explicit_date: Option<&str>, now: NaiveDateTime) -> Record {
    record.remove(ID_FIELD);
    record.remove(OID_FIELD);
    record.remove(TIME_ELAPSED_FIELD);
    record.remove(LAST_UPDATED_FIELD);

    let manual = record
        .remove(MANUAL_DATE_FIELD)
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.trim().is_empty());
    let explicit_date = explicit_date.map(str::to_string).or(manual);

    let fields = match explicit_date.as_deref() {
        Some(date) => timestamps::backdated_timestamp_fields(date, now).unwrap_or_else(|| {
            warn!("Unparseable as-of date {:?}, stamping current time", date);
            timestamps::current_timestamp_fields(now)
        }),
        None => timestamps::current_timestamp_fields(now),
    };
    timestamps::stamp(&mut record, DATE_CREATED_FIELD, &fields);

    record
}

/// Insert a record and return its opaque id.
pub async fn insert_document(
    pool: &DbPool,
    collection: &str,
    record: Record,
    explicit_date: Option<&str>,
) -> Result<String> {
    insert_unique_document(pool, collection, record, &[], explicit_date).await
}

/// Insert a record, rejecting it when any of `unique_fields` collides with an
/// existing record of the collection. Document and keys commit together.
pub async fn insert_unique_document(
    pool: &DbPool,
    collection: &str,
    record: Record,
    unique_fields: &[&str],
    explicit_date: Option<&str>,
) -> Result<String> {
    ensure_collection(pool, collection).await?;

    let record = prepare_insert(record, explicit_date, timestamps::now());
    let body = serde_json::to_string(&record)?;
    let oid = new_oid();
    let id = next_sequence(pool, collection).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO documents (oid, collection, id, body) VALUES (?, ?, ?, ?)")
        .bind(&oid)
        .bind(collection)
        .bind(id)
        .bind(&body)
        .execute(&mut *tx)
        .await?;

    for field in unique_fields {
        let Some(value) = record.get(*field).and_then(unique_key_text) else {
            continue;
        };
        sqlx::query("INSERT INTO unique_keys (collection, field, value, oid) VALUES (?, ?, ?, ?)")
            .bind(collection)
            .bind(*field)
            .bind(&value)
            .bind(&oid)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists(format!("A {} with this {} already exists", collection, field))
                } else {
                    Error::Database(e)
                }
            })?;
    }

    tx.commit().await?;

    debug!(collection, id, oid = %oid, "Inserted document");

    Ok(oid)
}

/// Fetch records matching `filter`, newest id first.
pub async fn find_documents(
    pool: &DbPool,
    collection: &str,
    filter: &Filter,
    limit: Option<u64>,
    skip: u64,
) -> Result<Vec<Record>> {
    ensure_collection(pool, collection).await?;

    let clause = where_clause(collection, filter)?;
    let sql = format!(
        "SELECT oid, id, body FROM documents WHERE {} ORDER BY id DESC LIMIT ? OFFSET ?",
        clause.sql
    );
    // SQLite treats a negative LIMIT as unbounded.
    let limit = limit.map(|l| l.min(i64::MAX as u64) as i64).unwrap_or(-1);
    let skip = skip.min(i64::MAX as u64) as i64;

    let rows = bind_all!(sqlx::query_as::<Sqlite, DocumentRow>(&sql), &clause.bindings)
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;

    format_rows(rows)
}

/// The newest record matching `filter`, if any.
pub async fn find_one_document(
    pool: &DbPool,
    collection: &str,
    filter: &Filter,
) -> Result<Option<Record>> {
    let mut records = find_documents(pool, collection, filter, Some(1), 0).await?;
    Ok(records.pop())
}

/// Point lookup by opaque id.
pub async fn get_document_by_oid(pool: &DbPool, collection: &str, oid: &str) -> Result<Record> {
    let oid = parse_oid(oid)?;
    find_one_document(pool, collection, &Filter::new().matching(OID_FIELD, oid.as_str()))
        .await?
        .ok_or_else(|| Error::NotFound(format!("No {} with _id {}", collection, oid)))
}

/// Point lookup by integer id.
pub async fn get_document_by_id(pool: &DbPool, collection: &str, id: i64) -> Result<Record> {
    find_one_document(pool, collection, &Filter::new().matching(ID_FIELD, id))
        .await?
        .ok_or_else(|| Error::NotFound(format!("No {} with id {}", collection, id)))
}

/// Number of records matching `filter`.
pub async fn count_documents(pool: &DbPool, collection: &str, filter: &Filter) -> Result<u64> {
    ensure_collection(pool, collection).await?;

    let clause = where_clause(collection, filter)?;
    let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", clause.sql);

    let count: i64 = bind_all!(sqlx::query_scalar::<Sqlite, i64>(&sql), &clause.bindings)
        .fetch_one(pool)
        .await?;

    Ok(count.max(0) as u64)
}

/// Case-insensitive substring search on one text field, newest id first.
pub async fn search_documents(
    pool: &DbPool,
    collection: &str,
    field: &str,
    text: &str,
) -> Result<Vec<Record>> {
    ensure_collection(pool, collection).await?;

    let pattern = RegexBuilder::new(&regex::escape(text))
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::InvalidInput(format!("Invalid search text: {}", e)))?;

    let path = super::filter::json_path(field)?;
    let rows = sqlx::query_as::<Sqlite, DocumentRow>(
        r#"
        SELECT oid, id, body FROM documents
        WHERE collection = ? AND json_type(body, ?) = 'text'
        ORDER BY id DESC
        "#,
    )
    .bind(collection)
    .bind(&path)
    .fetch_all(pool)
    .await?;

    let records = format_rows(rows)?;
    Ok(records
        .into_iter()
        .filter(|r| r.get(field).and_then(Value::as_str).is_some_and(|s| pattern.is_match(s)))
        .collect())
}

/// Apply `patch` to the newest record matching `selector` and stamp
/// `last_updated`. `id`, `_id` and `date_created` are never overwritten.
/// Unique keys held by the record follow the new values.
pub async fn update_document(
    pool: &DbPool,
    collection: &str,
    patch: Record,
    selector: &Predicate,
) -> Result<Record> {
    ensure_collection(pool, collection).await?;

    let clause = where_clause(collection, &Filter::all([selector.clone()]))?;
    let sql = format!(
        "SELECT oid, id, body FROM documents WHERE {} ORDER BY id DESC LIMIT 1",
        clause.sql
    );

    let mut tx = pool.begin().await?;

    let row = bind_all!(sqlx::query_as::<Sqlite, DocumentRow>(&sql), &clause.bindings)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "No {} where {} = {}",
                collection, selector.field, selector.value
            ))
        })?;

    let mut body = match serde_json::from_str::<Value>(&row.body)? {
        Value::Object(map) => map,
        _ => return Err(Error::Internal(format!("Document {} body is not an object", row.oid))),
    };

    let now = timestamps::now();
    let mut changed = Vec::new();
    for (key, value) in patch {
        if PROTECTED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        changed.push((key.clone(), value.clone()));
        body.insert(key, value);
    }
    timestamps::stamp(&mut body, LAST_UPDATED_FIELD, &timestamps::current_timestamp_fields(now));

    sqlx::query("UPDATE documents SET body = ? WHERE oid = ?")
        .bind(serde_json::to_string(&body)?)
        .bind(&row.oid)
        .execute(&mut *tx)
        .await?;

    for (field, value) in &changed {
        let result = match unique_key_text(value) {
            Some(text) => {
                sqlx::query(
                    "UPDATE unique_keys SET value = ? WHERE collection = ? AND field = ? AND oid = ?",
                )
                .bind(text)
                .bind(collection)
                .bind(field)
                .bind(&row.oid)
                .execute(&mut *tx)
                .await
            }
            None => {
                sqlx::query("DELETE FROM unique_keys WHERE collection = ? AND field = ? AND oid = ?")
                    .bind(collection)
                    .bind(field)
                    .bind(&row.oid)
                    .execute(&mut *tx)
                    .await
            }
        };
        result.map_err(|e| {
            if is_unique_violation(&e) {
                Error::AlreadyExists(format!("A {} with this {} already exists", collection, field))
            } else {
                Error::Database(e)
            }
        })?;
    }

    tx.commit().await?;

    debug!(collection, id = row.id, "Updated document");

    DocumentRow {
        oid: row.oid,
        id: row.id,
        body: serde_json::to_string(&body)?,
    }
    .into_record(now)
}

/// Physically delete one record by opaque id.
pub async fn delete_document(pool: &DbPool, collection: &str, oid: &str) -> Result<()> {
    let oid = parse_oid(oid)?;

    let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND oid = ?")
        .bind(collection)
        .bind(&oid)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("No {} with _id {}", collection, oid)));
    }

    debug!(collection, oid = %oid, "Deleted document");

    Ok(())
}
