//! Data models for the dreams manager service.
//!
//! Defines the loosely-typed record, the predicates that select records,
//! the structured timestamp object, page metadata, and typed entity views.

mod entities;
mod pagination;
mod record;
mod timestamp;

pub use entities::*;
pub use pagination::*;
pub use record::*;
pub use timestamp::*;

use uuid::Uuid;

/// Generate a new opaque storage id (32 lowercase hex digits).
pub fn new_oid() -> String {
    Uuid::new_v4().simple().to_string()
}
