//! Typed views over the entity collections.
//!
//! Each entity names the fields the service relies on and keeps every other
//! field in a flattened map, so documents stay loosely typed in storage while
//! callers get compile-time access to the fields they read.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Record, TimestampFields};

/// A document type bound to one collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
}

/// Check that `record` decodes as `E`.
pub fn conform<E: Entity>(record: &Record) -> Result<(), serde_json::Error> {
    serde_json::from_value::<E>(Value::Object(record.clone())).map(|_| ())
}

/// Text field that also takes the numbers and booleans form
/// normalization produces.
fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        value @ (Value::Number(_) | Value::Bool(_)) => Ok(value.to_string()),
        other => Err(D::Error::custom(format!("expected text, found {}", other))),
    }
}

fn opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        value @ (Value::Number(_) | Value::Bool(_)) => Ok(Some(value.to_string())),
        other => Err(D::Error::custom(format!("expected text, found {}", other))),
    }
}

/// An entity as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<E> {
    #[serde(rename = "_id")]
    pub oid: String,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<TimestampFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<TimestampFields>,
    #[serde(default)]
    pub time_elapsed: String,
    #[serde(flatten)]
    pub entity: E,
}

/// Role given to the first registered user.
pub const ROOT_ROLE: &str = "root";
/// Role given to every later registration until activated.
pub const GUEST_ROLE: &str = "Guest";
/// Role of an activated field agent.
pub const AGENT_ROLE: &str = "agent";

/// Registered user. Agents are users whose role is not `root`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "text")]
    pub fullname: String,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone_number: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_role: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub read_status: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl User {
    pub fn is_root(&self) -> bool {
        self.default_role.as_deref() == Some(ROOT_ROLE)
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "user";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prospect {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl Entity for Prospect {
    const COLLECTION: &'static str = "prospect";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl Entity for Product {
    const COLLECTION: &'static str = "product";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl Entity for Category {
    const COLLECTION: &'static str = "category";
}

/// Sales pipeline stage a prospect sits in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stage {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl Entity for Stage {
    const COLLECTION: &'static str = "stage";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub hiv_status: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl Entity for Participant {
    const COLLECTION: &'static str = "participant";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl Entity for Event {
    const COLLECTION: &'static str = "event";
}

/// Outreach material (leaflets, videos, posters).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Material {
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub material_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_audience: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub material_format: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl Entity for Material {
    const COLLECTION: &'static str = "material";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub hiv_status: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub dob: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub village: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub schooling_status: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl Entity for Enrollment {
    const COLLECTION: &'static str = "enrollment";
}
