//! Entity services.
//!
//! Every entity exposes the same operations over its collection; what
//! differs (required fields, unique fields, report columns, foreign keys)
//! is data in an [`EntityDef`].

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::db::{self, RecordStore};
use crate::models::{
    conform, Category, Enrollment, Event, Filter, Material, PageDetails, Participant, Predicate,
    Product, Prospect, Record, Stage, User, AGENT_ROLE, GUEST_ROLE, ID_FIELD, ROOT_ROLE,
};
use crate::{Error, Result};

use super::forms::{initials, is_blank, is_valid_email, normalize_form, require_fields};
use super::join::{attach, select_options, Attach, SelectOption};
use super::pagination::{group_thousands, paginated_result};
use super::repository::Repository;

/// Shown in report cells for missing fields.
const MISSING_CELL: &str = "---";
/// Written into a joined field whose foreign record does not exist.
const MISSING_JOIN: &str = "Error";

/// Foreign key resolved when rendering reports.
#[derive(Debug, Clone, Copy)]
pub struct Lookup {
    pub foreign_key: &'static str,
    pub collection: &'static str,
    pub source_field: &'static str,
    pub target_field: &'static str,
}

const AGENT_LOOKUP: Lookup = Lookup {
    foreign_key: "user_id",
    collection: "user",
    source_field: "fullname",
    target_field: "agent",
};

/// Report column: header text and the record field it shows.
pub type Column = (&'static str, &'static str);

/// Shape check of a stored record, bound to the entity's typed view.
pub type Conform = fn(&Record) -> std::result::Result<(), serde_json::Error>;

/// Static description of one entity.
#[derive(Debug)]
pub struct EntityDef {
    /// URL prefix of the entity's routes.
    pub prefix: &'static str,
    pub collection: &'static str,
    /// Field naming a record in messages.
    pub display_field: &'static str,
    pub title: &'static str,
    pub sub_title: &'static str,
    pub card_title: &'static str,
    pub required: &'static [&'static str],
    pub unique: &'static [&'static str],
    pub default_status: Option<&'static str>,
    /// Records matching any of these are hidden from every operation.
    pub excluded: &'static [(&'static str, &'static str)],
    pub select_text: &'static str,
    pub columns: &'static [Column],
    pub lookups: &'static [Lookup],
    pub conform: Conform,
}

impl EntityDef {
    /// Filter every query of this entity starts from.
    pub fn base_filter(&self) -> Filter {
        self.excluded
            .iter()
            .fold(Filter::new(), |filter, (field, value)| filter.excluding(*field, *value))
    }

    /// Base URL of the page links of the paginated report.
    pub fn report_url(&self, base: &str) -> String {
        format!("{}/{}/report", base.trim_end_matches('/'), self.prefix)
    }

    /// Reject a record whose fields do not fit the entity's typed view.
    pub fn check_shape(&self, record: &Record) -> Result<()> {
        (self.conform)(record)
            .map_err(|e| Error::Validation(format!("Invalid {}: {}", self.collection, e)))
    }

    fn display_name(&self, record: &Record) -> String {
        match record.get(self.display_field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => self.collection.to_string(),
        }
    }
}

pub static ENTITIES: [EntityDef; 10] = [
    EntityDef {
        prefix: "products",
        collection: "product",
        display_field: "name",
        title: "Products",
        sub_title: "Products registered from field",
        card_title: "Total number of products",
        required: &["name", "user_id", "category_id"],
        unique: &["name"],
        default_status: Some("active"),
        excluded: &[],
        select_text: "name",
        columns: &[
            ("Name", "name"),
            ("Category", "category"),
            ("Registered by", "agent"),
            ("Time", "time_elapsed"),
        ],
        lookups: &[
            AGENT_LOOKUP,
            Lookup {
                foreign_key: "category_id",
                collection: "category",
                source_field: "name",
                target_field: "category",
            },
        ],
        conform: conform::<Product>,
    },
    EntityDef {
        prefix: "categories",
        collection: "category",
        display_field: "name",
        title: "Product Categories",
        sub_title: "Categories registered from field",
        card_title: "Total number of categories",
        required: &["name", "user_id"],
        unique: &["name"],
        default_status: Some("active"),
        excluded: &[],
        select_text: "name",
        columns: &[("Name", "name"), ("Registered by", "agent"), ("Time", "time_elapsed")],
        lookups: &[AGENT_LOOKUP],
        conform: conform::<Category>,
    },
    EntityDef {
        prefix: "stages",
        collection: "stage",
        display_field: "name",
        title: "Stages",
        sub_title: "Stages registered from field",
        card_title: "Total number of stages",
        required: &["name", "user_id"],
        unique: &["name"],
        default_status: Some("active"),
        excluded: &[],
        select_text: "name",
        columns: &[("Name", "name"), ("Registered by", "agent"), ("Time", "time_elapsed")],
        lookups: &[AGENT_LOOKUP],
        conform: conform::<Stage>,
    },
    EntityDef {
        prefix: "prospects",
        collection: "prospect",
        display_field: "name",
        title: "Prospects",
        sub_title: "Prospects registered from field",
        card_title: "Total number of prospects",
        required: &["name", "user_id", "stage_id", "product_id"],
        unique: &["name", "email", "phone"],
        default_status: Some("active"),
        excluded: &[],
        select_text: "name",
        columns: &[
            ("Name", "name"),
            ("Product", "product"),
            ("Stage", "stage"),
            ("Registered by", "agent"),
            ("Time", "time_elapsed"),
        ],
        lookups: &[
            AGENT_LOOKUP,
            Lookup {
                foreign_key: "stage_id",
                collection: "stage",
                source_field: "name",
                target_field: "stage",
            },
            Lookup {
                foreign_key: "product_id",
                collection: "product",
                source_field: "name",
                target_field: "product",
            },
        ],
        conform: conform::<Prospect>,
    },
    EntityDef {
        prefix: "participants",
        collection: "participant",
        display_field: "name",
        title: "Participants",
        sub_title: "Participants registered from field",
        card_title: "Total number of participants",
        required: &["name", "user_id", "hiv_status"],
        unique: &["name", "email", "phone"],
        default_status: Some("active"),
        excluded: &[],
        select_text: "name",
        columns: &[
            ("Name", "name"),
            ("HIV Status", "hiv_status"),
            ("Registered by", "agent"),
            ("Time", "time_elapsed"),
        ],
        lookups: &[AGENT_LOOKUP],
        conform: conform::<Participant>,
    },
    EntityDef {
        prefix: "events",
        collection: "event",
        display_field: "title",
        title: "Events",
        sub_title: "Events scheduled",
        card_title: "Total number of events",
        required: &["title", "event_type", "start_date", "end_date", "location"],
        unique: &["title", "start_date", "location"],
        default_status: Some("planned"),
        excluded: &[],
        select_text: "title",
        columns: &[
            ("Title", "title"),
            ("Type", "event_type"),
            ("Start", "start_date"),
            ("End", "end_date"),
            ("Location", "location"),
            ("Author", "agent"),
            ("Time", "time_elapsed"),
        ],
        lookups: &[AGENT_LOOKUP],
        conform: conform::<Event>,
    },
    EntityDef {
        prefix: "materials",
        collection: "material",
        display_field: "title",
        title: "Materials",
        sub_title: "Materials registered",
        card_title: "Total number of materials",
        required: &["title", "material_type", "target_audience", "material_format"],
        unique: &["title", "publication_date", "url"],
        default_status: None,
        excluded: &[],
        select_text: "title",
        columns: &[
            ("Title", "title"),
            ("Type", "material_type"),
            ("Format", "material_format"),
            ("Audience", "target_audience"),
            ("Registered by", "agent"),
            ("Time", "time_elapsed"),
        ],
        lookups: &[AGENT_LOOKUP],
        conform: conform::<Material>,
    },
    EntityDef {
        prefix: "enrollment",
        collection: "enrollment",
        display_field: "name",
        title: "Enrolled Participants",
        sub_title: "Enrolled participants",
        card_title: "Total number of participants",
        required: &["name", "address", "age", "hiv_status", "dob", "village", "schooling_status"],
        unique: &["name"],
        default_status: Some("active"),
        excluded: &[],
        select_text: "name",
        columns: &[
            ("Name", "name"),
            ("Address", "address"),
            ("Age", "age"),
            ("HIV Status", "hiv_status"),
            ("DOB", "dob"),
            ("Village", "village"),
            ("Schooling Status", "schooling_status"),
        ],
        lookups: &[],
        conform: conform::<Enrollment>,
    },
    EntityDef {
        prefix: "agents",
        collection: "user",
        display_field: "fullname",
        title: "Agents",
        sub_title: "Agents / Staff registered from field",
        card_title: "Total number of agents",
        required: USER_REQUIRED,
        unique: USER_UNIQUE,
        default_status: None,
        excluded: &[("default_role", ROOT_ROLE)],
        select_text: "fullname",
        columns: &[
            ("Name", "fullname"),
            ("role", "default_role"),
            ("Account", "read_status"),
            ("Time", "time_elapsed"),
        ],
        lookups: &[],
        conform: conform::<User>,
    },
    EntityDef {
        prefix: "user",
        collection: "user",
        display_field: "fullname",
        title: "Users",
        sub_title: "Registered accounts",
        card_title: "Total number of users",
        required: USER_REQUIRED,
        unique: USER_UNIQUE,
        default_status: None,
        excluded: &[],
        select_text: "fullname",
        columns: &[
            ("Name", "fullname"),
            ("Phone", "phone_number"),
            ("role", "default_role"),
            ("Time", "time_elapsed"),
        ],
        lookups: &[],
        conform: conform::<User>,
    },
];

const USER_REQUIRED: &[&str] = &["fullname", "phone_country_code", "phone"];
const USER_UNIQUE: &[&str] = &["phone_number"];

/// Look up an entity by URL prefix.
pub fn entity_def(prefix: &str) -> Option<&'static EntityDef> {
    ENTITIES.iter().find(|def| def.prefix == prefix)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub title: String,
    pub content: String,
}

/// Table-shaped paginated report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    pub sub_title: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Value>>,
    pub cards: Vec<Card>,
    pub pagination_details: PageDetails,
}

/// Account change requested through `change_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Activate,
    Suspend,
    Deactivate,
}

impl std::str::FromStr for RoleAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "activate" => Ok(Self::Activate),
            "suspend" => Ok(Self::Suspend),
            "deactivate" => Ok(Self::Deactivate),
            other => Err(Error::Validation(format!("Unknown account action: {}", other))),
        }
    }
}

impl RoleAction {
    fn patch(self) -> (&'static str, &'static str) {
        match self {
            Self::Activate => ("default_role", AGENT_ROLE),
            Self::Suspend => ("read_status", "suspended"),
            Self::Deactivate => ("read_status", "deactivated"),
        }
    }

    fn performed(self) -> &'static str {
        match self {
            Self::Activate => "account activated",
            Self::Suspend => "account suspended",
            Self::Deactivate => "account deactivated",
        }
    }
}

fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Entity operations shared by every route module.
#[derive(Clone)]
pub struct EntityService {
    store: RecordStore,
    users: Repository<User>,
}

impl EntityService {
    pub fn new(store: RecordStore) -> Self {
        let users = Repository::new(store.clone());
        Self { store, users }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Validate and store a submitted record. Returns the success message.
    pub async fn add(&self, def: &EntityDef, form: Record) -> Result<String> {
        if def.collection == "user" {
            return self.register(form).await;
        }

        let mut form = normalize_form(form);
        require_fields(&form, def.required)?;

        if let Some(status) = def.default_status {
            form.insert("status".to_string(), Value::from(status));
        }
        def.check_shape(&form)?;

        let name = def.display_name(&form);
        db::insert_unique_document(self.store.pool(), def.collection, form, def.unique, None)
            .await?;

        info!(collection = def.collection, "{} registered", name);

        Ok(format!("{} has been registered", name))
    }

    /// Create a user account. The first account becomes `root`.
    pub async fn register(&self, form: Record) -> Result<String> {
        let mut form = normalize_form(form);
        require_fields(&form, USER_REQUIRED)?;

        let fullname = text_of(form.get("fullname"));
        let names: Vec<&str> = fullname.split_whitespace().collect();
        if names.len() < 2 {
            return Err(Error::Validation(
                "Full name requires at least 2 names such as Mujabi John".to_string(),
            ));
        }
        if !is_blank(&form, "email") && !is_valid_email(&text_of(form.get("email"))) {
            return Err(Error::Validation("Enter a valid email".to_string()));
        }

        let phone = text_of(form.get("phone"));
        let phone_number = format!(
            "{}{}",
            text_of(form.get("phone_country_code")),
            phone.trim_start_matches('0')
        );

        let first_name = names[0].to_string();
        form.insert("first_name".to_string(), Value::from(first_name.clone()));
        form.insert("last_name".to_string(), Value::from(names[1]));
        form.insert("other_names".to_string(), Value::from(names[2..].join(" ")));
        form.insert("name_abbreviation".to_string(), Value::from(initials(&fullname)));
        form.insert("phone_number".to_string(), Value::from(phone_number));

        let role = if self.users.count(&Filter::new()).await == 0 {
            ROOT_ROLE
        } else {
            GUEST_ROLE
        };
        form.insert("default_role".to_string(), Value::from(role));
        form.insert("read_status".to_string(), Value::from("active"));
        conform::<User>(&form)
            .map_err(|e| Error::Validation(format!("Invalid user: {}", e)))?;

        let result =
            db::insert_unique_document(self.store.pool(), "user", form, USER_UNIQUE, None).await;
        match result {
            Ok(_) => {}
            Err(Error::AlreadyExists(_)) => {
                return Err(Error::AlreadyExists(
                    "Phone number already exists, login if you already have an account"
                        .to_string(),
                ))
            }
            Err(e) => return Err(e),
        }

        info!(role, "Registered user account");

        Ok(format!("{}'s Account Created, You can now login", first_name))
    }

    /// Resolve every foreign key of `records` against its sibling collection.
    async fn attach_lookups(&self, def: &EntityDef, records: &mut [Record]) {
        let mut fetched: HashMap<&str, Vec<Record>> = HashMap::new();
        for lookup in def.lookups {
            if !fetched.contains_key(lookup.collection) {
                let foreign = self.store.fetch_all(lookup.collection).await;
                fetched.insert(lookup.collection, foreign);
            }
            let foreign = fetched.get(lookup.collection).map(Vec::as_slice).unwrap_or(&[]);
            attach(
                records,
                foreign,
                Attach {
                    foreign_key: lookup.foreign_key,
                    primary_key: ID_FIELD,
                    source_field: lookup.source_field,
                    target_field: lookup.target_field,
                    missing: MISSING_JOIN,
                },
            );
        }
    }

    /// One page of the entity as a report table.
    pub async fn report(
        &self,
        def: &EntityDef,
        page_number: i64,
        page_size: i64,
        base_url: &str,
    ) -> Report {
        let page = paginated_result(
            &self.store,
            def.collection,
            page_number,
            page_size,
            &def.report_url(base_url),
            &def.base_filter(),
        )
        .await;

        let mut results = page.results;
        self.attach_lookups(def, &mut results).await;

        let values = results
            .iter()
            .map(|record| {
                def.columns
                    .iter()
                    .map(|(_, field)| {
                        record
                            .get(*field)
                            .cloned()
                            .unwrap_or_else(|| Value::from(MISSING_CELL))
                    })
                    .collect()
            })
            .collect();

        Report {
            title: def.title.to_string(),
            sub_title: def.sub_title.to_string(),
            columns: def.columns.iter().map(|(header, _)| header.to_string()).collect(),
            values,
            cards: vec![Card {
                title: def.card_title.to_string(),
                content: group_thousands(page.total_count),
            }],
            pagination_details: page.pagination_details,
        }
    }

    /// The `limit` newest records with foreign keys resolved.
    pub async fn latest(&self, def: &EntityDef, limit: u64) -> Vec<Record> {
        let mut records = self
            .store
            .fetch_many(def.collection, &def.base_filter(), Some(limit))
            .await;
        self.attach_lookups(def, &mut records).await;
        records
    }

    pub async fn count(&self, def: &EntityDef) -> u64 {
        self.store.count(def.collection, &def.base_filter()).await
    }

    /// Dropdown entries keyed by integer id.
    pub async fn select_array(&self, def: &EntityDef) -> Vec<SelectOption> {
        let records = self
            .store
            .fetch_many(def.collection, &def.base_filter(), None)
            .await;
        select_options(&records, ID_FIELD, def.select_text, None, None)
    }

    /// One record by integer id, with foreign keys resolved.
    pub async fn profile(&self, def: &EntityDef, id: i64) -> Result<Record> {
        let filter = def.base_filter().requiring(ID_FIELD, id);
        let record = db::find_one_document(self.store.pool(), def.collection, &filter)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} with id {} not found", def.prefix, id)))?;

        let mut records = [record];
        self.attach_lookups(def, &mut records).await;
        let [record] = records;
        Ok(record)
    }

    /// Case-insensitive substring search on one field.
    pub async fn search(&self, def: &EntityDef, field: &str, text: &str) -> Vec<Record> {
        let filter = def.base_filter();
        self.store
            .search_text(def.collection, field, text)
            .await
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect()
    }

    /// Patch the record with integer id `id`.
    pub async fn update(&self, def: &EntityDef, id: i64, patch: Record) -> Result<Record> {
        let patch = normalize_form(patch);
        if patch.is_empty() {
            return Err(Error::Validation("Nothing to update".to_string()));
        }
        // Hidden records cannot be modified through this entity.
        let mut merged = self.profile(def, id).await?;
        merged.extend(patch.clone());
        def.check_shape(&merged)?;

        db::update_document(
            self.store.pool(),
            def.collection,
            patch,
            &Predicate::eq(ID_FIELD, id),
        )
        .await
    }

    pub async fn delete(&self, def: &EntityDef, oid: &str) -> Result<()> {
        let record = db::get_document_by_oid(self.store.pool(), def.collection, oid).await?;
        if !def.base_filter().matches(&record) {
            return Err(Error::NotFound(format!("No {} with _id {}", def.collection, oid)));
        }
        db::delete_document(self.store.pool(), def.collection, oid).await
    }

    /// Activate, suspend or deactivate an agent account.
    pub async fn change_role(&self, id: i64, action: &str) -> Result<String> {
        let action: RoleAction = action.parse()?;
        let agent = match self.users.fetch(id).await {
            Err(Error::NotFound(_)) => {
                return Err(Error::NotFound(format!("agent with id {} not found", id)))
            }
            other => other?,
        };

        let (field, value) = action.patch();
        let mut patch = Record::new();
        patch.insert(field.to_string(), Value::from(value));

        if !self.users.update(id, patch).await {
            return Err(Error::Internal(format!("Failed to update agent {}", id)));
        }

        info!(id, action = action.performed(), "Changed agent account");

        Ok(format!("{}'s {}", agent.entity.fullname, action.performed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool_with_config, initialize_schema, PoolConfig};
    use serde_json::json;

    async fn setup_service() -> EntityService {
        let pool = create_pool_with_config(":memory:", PoolConfig::test()).await.unwrap();
        initialize_schema(&pool).await.unwrap();
        EntityService::new(RecordStore::new(pool))
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn def(prefix: &str) -> &'static EntityDef {
        entity_def(prefix).unwrap()
    }

    async fn register(service: &EntityService, name: &str, phone: &str) {
        service
            .register(record(json!({
                "fullname": name,
                "phone_country_code": "+256",
                "phone": phone,
                "password": "secret",
                "confirm_password": "secret"
            })))
            .await
            .unwrap();
    }

    #[test]
    fn test_registry() {
        let prefixes: Vec<&str> = ENTITIES.iter().map(|d| d.prefix).collect();
        assert_eq!(prefixes.len(), 10);
        assert!(entity_def("nothing").is_none());
        assert_eq!(def("agents").collection, "user");
        assert_eq!(
            def("products").report_url("/dashboard/admin/"),
            "/dashboard/admin/products/report"
        );
        for def in &ENTITIES {
            assert!(!def.columns.is_empty(), "{} has no columns", def.prefix);
        }
    }

    #[test]
    fn test_role_action_parse() {
        assert_eq!("activate".parse::<RoleAction>().unwrap(), RoleAction::Activate);
        assert!("promote".parse::<RoleAction>().is_err());
    }

    #[tokio::test]
    async fn test_add_validates_and_rejects_duplicates() {
        let service = setup_service().await;
        let categories = def("categories");

        let err = service
            .add(categories, record(json!({"name": "Solar"})))
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "user_id is required");

        let message = service
            .add(categories, record(json!({"name": "Solar", "user_id": "1"})))
            .await
            .unwrap();
        assert_eq!(message, "Solar has been registered");

        let dup = service
            .add(categories, record(json!({"name": "Solar", "user_id": "2"})))
            .await;
        assert!(matches!(dup, Err(Error::AlreadyExists(_))));

        let stored = service.profile(categories, 1).await.unwrap();
        assert_eq!(stored["status"], "active");
        assert_eq!(stored["user_id"], 1);
    }

    #[tokio::test]
    async fn test_register_roles() {
        let service = setup_service().await;

        register(&service, "Jane Doe", "0772000111").await;
        register(&service, "Mujabi John Paul", "772000222").await;

        let root = service.profile(def("user"), 1).await.unwrap();
        assert_eq!(root["default_role"], ROOT_ROLE);
        assert_eq!(root["phone_number"], "+256772000111");
        assert_eq!(root["first_name"], "Jane");
        assert!(root.get("password").is_none());

        let guest = service.profile(def("user"), 2).await.unwrap();
        assert_eq!(guest["default_role"], GUEST_ROLE);
        assert_eq!(guest["other_names"], "Paul");
        assert_eq!(guest["name_abbreviation"], "MJP");

        // Same number with a leading zero.
        let dup = service
            .register(record(json!({
                "fullname": "Jane Again",
                "phone_country_code": "+256",
                "phone": "772000111"
            })))
            .await;
        assert!(matches!(dup, Err(Error::AlreadyExists(_))));

        let short = service
            .register(record(json!({
                "fullname": "Jane",
                "phone_country_code": "+256",
                "phone": "1"
            })))
            .await;
        assert!(matches!(short, Err(Error::Validation(_))));

        // Agents hide the root account.
        assert_eq!(service.count(def("agents")).await, 1);
        assert_eq!(service.count(def("user")).await, 2);
        assert!(matches!(
            service.profile(def("agents"), 1).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_change_role() {
        let service = setup_service().await;
        register(&service, "Jane Doe", "0772000111").await;
        register(&service, "Ann Field", "0772000333").await;

        let message = service.change_role(2, "activate").await.unwrap();
        assert_eq!(message, "Ann Field's account activated");
        assert_eq!(service.profile(def("agents"), 2).await.unwrap()["default_role"], AGENT_ROLE);

        service.change_role(2, "suspend").await.unwrap();
        assert_eq!(service.profile(def("agents"), 2).await.unwrap()["read_status"], "suspended");

        assert!(matches!(service.change_role(9, "activate").await, Err(Error::NotFound(_))));
        assert!(matches!(service.change_role(2, "promote").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_change_role_after_phone_patch() {
        let service = setup_service().await;
        register(&service, "Jane Doe", "0772000111").await;
        register(&service, "Ann Field", "0772000333").await;

        let updated = service
            .update(def("user"), 2, record(json!({"phone_number": "256772000444"})))
            .await
            .unwrap();
        assert_eq!(updated["phone_number"], 256772000444_i64);

        let message = service.change_role(2, "activate").await.unwrap();
        assert_eq!(message, "Ann Field's account activated");
    }

    #[tokio::test]
    async fn test_change_role_on_undecodable_user() {
        let service = setup_service().await;
        service
            .store()
            .insert("user", record(json!({"fullname": {"first": "Ann"}})), None)
            .await
            .unwrap();

        assert!(matches!(service.change_role(1, "activate").await, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_shape_checked_on_add_and_update() {
        let service = setup_service().await;
        let products = def("products");

        let err = service
            .add(products, record(json!({"name": "Lamp", "user_id": 1, "category_id": "solar"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.detail().starts_with("Invalid product"));
        assert_eq!(service.count(products).await, 0);

        service
            .add(products, record(json!({"name": "2024", "user_id": "1", "category_id": "1"})))
            .await
            .unwrap();
        let err = service
            .update(products, 1, record(json!({"user_id": "Jane"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(service.profile(products, 1).await.unwrap()["user_id"], 1);
    }

    #[tokio::test]
    async fn test_report_resolves_foreign_keys() {
        let service = setup_service().await;
        register(&service, "Jane Doe", "0772000111").await;
        service
            .add(def("categories"), record(json!({"name": "Solar", "user_id": "1"})))
            .await
            .unwrap();
        service
            .add(def("products"), record(json!({"name": "Lamp", "user_id": "1", "category_id": "1"})))
            .await
            .unwrap();
        service
            .add(def("products"), record(json!({"name": "Kettle", "user_id": "1", "category_id": "7"})))
            .await
            .unwrap();

        let report = service.report(def("products"), 1, 10, "/dashboard/admin").await;
        assert_eq!(report.title, "Products");
        assert_eq!(report.columns, vec!["Name", "Category", "Registered by", "Time"]);
        assert_eq!(report.values[0][0], "Kettle");
        assert_eq!(report.values[0][1], "Error");
        assert_eq!(report.values[1][1], "Solar");
        assert_eq!(report.values[1][2], "Jane Doe");
        assert_eq!(report.cards[0].content, "2");
        assert_eq!(
            report.pagination_details.first_page_link,
            "/dashboard/admin/products/report/1/10"
        );

        let latest = service.latest(def("products"), 1).await;
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0]["agent"], "Jane Doe");

        let options = service.select_array(def("categories")).await;
        assert_eq!(options[0].text, "Solar");
        assert_eq!(options[0].value, json!(1));
    }

    #[tokio::test]
    async fn test_update_search_and_delete() {
        let service = setup_service().await;
        let stages = def("stages");
        for name in ["Lead", "Qualified lead", "Won"] {
            service
                .add(stages, record(json!({"name": name, "user_id": 1})))
                .await
                .unwrap();
        }

        let updated = service
            .update(stages, 3, record(json!({"name": "Closed", "id": 50})))
            .await
            .unwrap();
        assert_eq!(updated["name"], "Closed");
        assert_eq!(updated["id"], 3);
        assert!(matches!(
            service.update(stages, 3, Record::new()).await,
            Err(Error::Validation(_))
        ));

        assert_eq!(service.search(stages, "name", "LEAD").await.len(), 2);

        let oid = service.profile(stages, 1).await.unwrap()["_id"]
            .as_str()
            .unwrap()
            .to_string();
        service.delete(stages, &oid).await.unwrap();
        assert!(matches!(service.delete(stages, &oid).await, Err(Error::NotFound(_))));
        assert_eq!(service.count(stages).await, 2);
    }
}
