//! Typed access to one entity collection.

use std::marker::PhantomData;

use serde_json::Value;
use tracing::warn;

use crate::db::{self, RecordStore};
use crate::models::{Entity, Filter, PaginatedResult, Record, Stored, ID_FIELD};
use crate::{Error, Result};

use super::pagination::paginated_result;

/// The record store narrowed to the collection of `E`.
///
/// Follows the store's fail-soft contract. Records that no longer
/// deserialize as `E` are logged and skipped.
pub struct Repository<E> {
    store: RecordStore,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

fn to_record<E: Entity>(entity: &E) -> Option<Record> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            warn!(collection = E::COLLECTION, "Entity serialized to a non-object: {}", other);
            None
        }
        Err(e) => {
            warn!(collection = E::COLLECTION, error = %e, "Failed to serialize entity");
            None
        }
    }
}

fn from_record<E: Entity>(record: Record) -> Option<Stored<E>> {
    match serde_json::from_value(Value::Object(record)) {
        Ok(stored) => Some(stored),
        Err(e) => {
            warn!(collection = E::COLLECTION, error = %e, "Skipping malformed record");
            None
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static str {
        E::COLLECTION
    }

    /// Insert an entity, returning its opaque id.
    pub async fn insert(&self, entity: &E, explicit_date: Option<&str>) -> Option<String> {
        let record = to_record(entity)?;
        self.store.insert(E::COLLECTION, record, explicit_date).await
    }

    /// Insert unless one of `unique_fields` is already taken.
    pub async fn insert_unique(
        &self,
        entity: &E,
        unique_fields: &[&str],
        explicit_date: Option<&str>,
    ) -> Option<String> {
        let record = to_record(entity)?;
        self.store
            .insert_unique(E::COLLECTION, record, unique_fields, explicit_date)
            .await
    }

    /// Look up by integer id.
    pub async fn get(&self, id: i64) -> Option<Stored<E>> {
        let record = self.store.fetch_one_by_integer_id(E::COLLECTION, id).await?;
        from_record(record)
    }

    /// Look up by integer id, failing on a missing record and on one that no
    /// longer decodes as `E`.
    pub async fn fetch(&self, id: i64) -> Result<Stored<E>> {
        let record = db::get_document_by_id(self.store.pool(), E::COLLECTION, id).await?;
        serde_json::from_value(Value::Object(record)).map_err(|e| {
            Error::Internal(format!("{} {} does not decode: {}", E::COLLECTION, id, e))
        })
    }

    pub async fn get_by_oid(&self, oid: &str) -> Option<Stored<E>> {
        let record = self.store.fetch_one_by_opaque_id(E::COLLECTION, oid).await?;
        from_record(record)
    }

    pub async fn list(&self, filter: &Filter, limit: Option<u64>) -> Vec<Stored<E>> {
        self.store
            .fetch_many(E::COLLECTION, filter, limit)
            .await
            .into_iter()
            .filter_map(from_record)
            .collect()
    }

    /// One page of entities with page metadata.
    pub async fn page(
        &self,
        page_number: i64,
        page_size: i64,
        base_url: &str,
        filter: &Filter,
    ) -> PaginatedResult<Stored<E>> {
        let page =
            paginated_result(&self.store, E::COLLECTION, page_number, page_size, base_url, filter)
                .await;
        let PaginatedResult {
            results,
            pagination_details,
            total_count,
        } = page;

        PaginatedResult {
            results: results.into_iter().filter_map(from_record).collect(),
            pagination_details,
            total_count,
        }
    }

    pub async fn count(&self, filter: &Filter) -> u64 {
        self.store.count(E::COLLECTION, filter).await
    }

    pub async fn search(&self, field: &str, text: &str) -> Vec<Stored<E>> {
        self.store
            .search_text(E::COLLECTION, field, text)
            .await
            .into_iter()
            .filter_map(from_record)
            .collect()
    }

    /// Patch the entity with integer id `id`.
    pub async fn update(&self, id: i64, patch: Record) -> bool {
        self.store
            .update(E::COLLECTION, patch, ID_FIELD, Value::from(id), true)
            .await
    }

    pub async fn delete(&self, oid: &str) -> bool {
        self.store.delete_by_opaque_id(E::COLLECTION, oid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool_with_config, initialize_schema, PoolConfig};
    use crate::models::{Category, Product, User, ROOT_ROLE};
    use serde_json::json;

    async fn setup_store() -> RecordStore {
        let pool = create_pool_with_config(":memory:", PoolConfig::test()).await.unwrap();
        initialize_schema(&pool).await.unwrap();
        RecordStore::new(pool)
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let store = setup_store().await;
        let users = Repository::<User>::new(store.clone());

        let user = User {
            fullname: "Jane Doe".to_string(),
            default_role: Some(ROOT_ROLE.to_string()),
            ..Default::default()
        };
        let oid = users.insert(&user, None).await.unwrap();

        let stored = users.get(1).await.unwrap();
        assert_eq!(stored.oid, oid);
        assert_eq!(stored.id, 1);
        assert_eq!(stored.entity.fullname, "Jane Doe");
        assert!(stored.entity.is_root());
        assert!(stored.date_created.is_some());
        assert!(!stored.time_elapsed.is_empty());
        // Bookkeeping fields never leak into the flattened extras.
        assert!(!stored.entity.extra.contains_key("_id"));

        assert_eq!(users.get_by_oid(&oid).await.unwrap().id, 1);
        assert_eq!(users.collection(), "user");
    }

    #[tokio::test]
    async fn test_update_list_and_delete() {
        let store = setup_store().await;
        let categories = Repository::<Category>::new(store);

        for name in ["Solar", "Water", "Solar kits"] {
            let category = Category {
                name: name.to_string(),
                ..Default::default()
            };
            categories.insert(&category, None).await.unwrap();
        }

        let mut patch = Record::new();
        patch.insert("name".to_string(), json!("Wind"));
        assert!(categories.update(2, patch).await);
        assert_eq!(categories.get(2).await.unwrap().entity.name, "Wind");

        let names: Vec<String> = categories
            .list(&Filter::new(), None)
            .await
            .into_iter()
            .map(|c| c.entity.name)
            .collect();
        assert_eq!(names, vec!["Solar kits", "Wind", "Solar"]);

        assert_eq!(categories.search("name", "solar").await.len(), 2);
        assert_eq!(categories.count(&Filter::new()).await, 3);

        let page = categories.page(1, 2, "/c", &Filter::new()).await;
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.pagination_details.total_pages, 2);

        let oid = categories.get(1).await.unwrap().oid;
        assert!(categories.delete(&oid).await);
        assert!(categories.get(1).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let store = setup_store().await;
        // `name` is required on products; this record cannot be typed.
        store
            .insert("product", json!({"user_id": 1}).as_object().cloned().unwrap(), None)
            .await
            .unwrap();

        let products = Repository::<Product>::new(store);
        assert!(products.get(1).await.is_none());
        assert!(products.list(&Filter::new(), None).await.is_empty());
        assert_eq!(products.count(&Filter::new()).await, 1);
    }

    #[tokio::test]
    async fn test_fetch_tells_missing_from_malformed() {
        let store = setup_store().await;
        store
            .insert("product", json!({"name": ["Lamp"]}).as_object().cloned().unwrap(), None)
            .await
            .unwrap();

        let products = Repository::<Product>::new(store);
        assert!(matches!(products.fetch(1).await, Err(Error::Internal(_))));
        assert!(matches!(products.fetch(2).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_unique() {
        let store = setup_store().await;
        let categories = Repository::<Category>::new(store);
        let category = Category {
            name: "Solar".to_string(),
            ..Default::default()
        };

        assert!(categories.insert_unique(&category, &["name"], None).await.is_some());
        assert!(categories.insert_unique(&category, &["name"], None).await.is_none());
    }
}
