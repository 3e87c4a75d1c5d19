//! Fail-soft record store.
//!
//! `RecordStore` wraps the strict functions in [`super::documents`] and never
//! returns an error: failures are logged and mapped to an empty value
//! (`None`, empty `Vec`, `0` or `false`). Use the free functions directly
//! when the caller needs to tell "not found" from "database down".

use serde_json::Value;
use tracing::{debug, error};

use super::documents::{
    coerce_integer, count_documents, delete_document, ensure_collection, find_documents,
    find_one_document, get_document_by_id, get_document_by_oid, insert_document,
    insert_unique_document, search_documents, update_document,
};
use super::{health_check, DbPool};
use crate::models::{Filter, Predicate, Record};
use crate::{Error, Result};

/// Shared handle to the document store.
#[derive(Clone)]
pub struct RecordStore {
    pool: DbPool,
}

/// Collapse a strict result into its fail-soft value.
fn soft<T: Default>(operation: &str, collection: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(Error::NotFound(msg)) => {
            debug!(operation, collection, "{}", msg);
            T::default()
        }
        Err(e) => {
            error!(operation, collection, error = %e, "Record store operation failed");
            T::default()
        }
    }
}

impl RecordStore {
    /// Create a store over an initialized pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Whether the database answers a trivial query.
    pub async fn is_live(&self) -> bool {
        match health_check(&self.pool).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Database health check failed");
                false
            }
        }
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create a collection if it does not exist yet.
    pub async fn ensure_collection(&self, collection: &str) -> bool {
        soft(
            "ensure_collection",
            collection,
            ensure_collection(&self.pool, collection).await.map(|()| true),
        )
    }

    /// Insert a record, returning its opaque id.
    pub async fn insert(
        &self,
        collection: &str,
        record: Record,
        explicit_date: Option<&str>,
    ) -> Option<String> {
        soft(
            "insert",
            collection,
            insert_document(&self.pool, collection, record, explicit_date)
                .await
                .map(Some),
        )
    }

    /// Insert a record unless one of `unique_fields` is already taken.
    pub async fn insert_unique(
        &self,
        collection: &str,
        record: Record,
        unique_fields: &[&str],
        explicit_date: Option<&str>,
    ) -> Option<String> {
        let result =
            insert_unique_document(&self.pool, collection, record, unique_fields, explicit_date)
                .await;
        match result {
            Ok(oid) => Some(oid),
            Err(Error::AlreadyExists(msg)) => {
                debug!(collection, "{}", msg);
                None
            }
            Err(e) => soft("insert_unique", collection, Err(e)),
        }
    }

    /// Newest record matching any of `match_any`; an empty list matches all.
    pub async fn fetch_one(&self, collection: &str, match_any: &[Predicate]) -> Option<Record> {
        let filter = Filter::any(match_any.iter().cloned());
        soft(
            "fetch_one",
            collection,
            find_one_document(&self.pool, collection, &filter).await,
        )
    }

    pub async fn fetch_one_by_opaque_id(&self, collection: &str, oid: &str) -> Option<Record> {
        soft(
            "fetch_one_by_opaque_id",
            collection,
            get_document_by_oid(&self.pool, collection, oid).await.map(Some),
        )
    }

    pub async fn fetch_one_by_integer_id(&self, collection: &str, id: i64) -> Option<Record> {
        soft(
            "fetch_one_by_integer_id",
            collection,
            get_document_by_id(&self.pool, collection, id).await.map(Some),
        )
    }

    /// Records matching `filter`, newest first, at most `limit` of them.
    pub async fn fetch_many(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u64>,
    ) -> Vec<Record> {
        soft(
            "fetch_many",
            collection,
            find_documents(&self.pool, collection, filter, limit, 0).await,
        )
    }

    /// Every record of the collection, newest first.
    pub async fn fetch_all(&self, collection: &str) -> Vec<Record> {
        self.fetch_many(collection, &Filter::new(), None).await
    }

    /// One page of records, newest first. `page_number` is 1-based; values
    /// below 1 are treated as 1.
    pub async fn fetch_page(
        &self,
        collection: &str,
        page_number: i64,
        page_size: i64,
        filter: &Filter,
    ) -> Vec<Record> {
        let page_number = page_number.max(1) as u64;
        let page_size = page_size.max(1) as u64;
        let skip = (page_number - 1).saturating_mul(page_size);

        soft(
            "fetch_page",
            collection,
            find_documents(&self.pool, collection, filter, Some(page_size), skip).await,
        )
    }

    pub async fn count(&self, collection: &str, filter: &Filter) -> u64 {
        soft(
            "count",
            collection,
            count_documents(&self.pool, collection, filter).await,
        )
    }

    /// Case-insensitive substring search on `field`, newest first.
    pub async fn search_text(&self, collection: &str, field: &str, text: &str) -> Vec<Record> {
        soft(
            "search_text",
            collection,
            search_documents(&self.pool, collection, field, text).await,
        )
    }

    /// Patch the record where `match_field == match_value`.
    ///
    /// With `match_is_integer` the match value is coerced to an integer
    /// first, so `"5"` finds the record stored with `5`.
    pub async fn update(
        &self,
        collection: &str,
        patch: Record,
        match_field: &str,
        match_value: Value,
        match_is_integer: bool,
    ) -> bool {
        let result = async {
            let value = if match_is_integer {
                Value::from(coerce_integer(&match_value)?)
            } else {
                match_value
            };
            let selector = Predicate::eq(match_field, value);
            update_document(&self.pool, collection, patch, &selector).await
        }
        .await;

        soft("update", collection, result.map(|_| true))
    }

    /// Delete one record. `false` when nothing was removed.
    pub async fn delete_by_opaque_id(&self, collection: &str, oid: &str) -> bool {
        soft(
            "delete_by_opaque_id",
            collection,
            delete_document(&self.pool, collection, oid).await.map(|()| true),
        )
    }
}
