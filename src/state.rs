//! Application state for the dreams manager.
//!
//! Contains the shared state that is passed to all handlers.

use crate::db::{self, DbPool, RecordStore};
use crate::services::EntityService;
use crate::{config, Result};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Fail-soft document store over the shared pool.
    pub store: RecordStore,
    /// Entity operations behind the routes.
    pub entities: EntityService,
}

impl AppState {
    /// Open the configured database, apply the schema and build the services.
    pub async fn new() -> Result<Self> {
        let config = config();
        let pool = db::init_pool(&config.database.path).await?;
        db::initialize_schema(&pool).await?;
        Ok(Self::from_pool(pool))
    }

    /// Build the state over an already initialized pool.
    pub fn from_pool(pool: DbPool) -> Self {
        let store = RecordStore::new(pool);
        let entities = EntityService::new(store.clone());
        Self { store, entities }
    }

    /// Close the pool. Called once on shutdown.
    pub async fn shutdown(&self) {
        self.store.close().await;
    }
}
