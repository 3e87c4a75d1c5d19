//! Service layer for the dreams manager.
//!
//! - Timestamps (timestamp objects and relative time)
//! - Pagination (page metadata and paginated fetches)
//! - Join (in-memory lookups across fetched collections)
//! - Repository (typed access to one collection)
//! - Forms (submitted record normalization and validation)
//! - Entities (the per-entity operations behind the routes)

pub mod entities;
pub mod forms;
pub mod join;
pub mod pagination;
mod repository;
pub mod timestamps;

pub use entities::{entity_def, EntityDef, EntityService, Report, ENTITIES};
pub use pagination::{fetch_page_of_records, page_metadata, paginated_result};
pub use repository::Repository;
