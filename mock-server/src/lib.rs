//! In-memory stand-in for the PowerGuard admin API.
//!
//! Serves `/core/{endpoint}/` collections with the same shapes the real
//! backend returns: token auth, list filters, partial updates that stamp
//! `updated_at`/`user`, and per-field 400s on create. Records are stored as
//! JSON objects so one store covers every collection.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

pub const RESOURCE_CHOICES: &str = "power-plant-resource-choices";

/// Collections the server knows, with the fields a create must carry.
const COLLECTIONS: &[(&str, &[&str])] = &[
    (
        "power-plant-detail",
        &[
            "system_id",
            "system_name",
            "customer_name",
            "country_name",
            "resource",
            "group",
            "capacity_dc",
            "latitude",
            "longitude",
            "altitude",
            "azimuth",
            "tilt",
        ],
    ),
    ("logger-power-gen", &["date", "logger_name", "power_gen"]),
    ("loggers-plants-group", &["group_name"]),
    ("loggercategories", &["category_name"]),
    ("utility-plants-list", &["plant_id"]),
    (
        "utility-daily-production",
        &["production_date", "plant_id", "power_production_kwh"],
    ),
];

/// Collections whose rows carry `created_at`, `status` and `user`.
const AUDITED: &[&str] = &["logger-power-gen", "utility-daily-production"];

/// Foreign keys sent as strings by form inputs and stored as integers.
const INTEGER_FIELDS: &[&str] = &["group"];

/// Decimal columns. Accepted as JSON numbers or numeric strings.
const DECIMAL_FIELDS: &[&str] = &[
    "capacity_ac",
    "capacity_dc",
    "latitude",
    "longitude",
    "altitude",
    "azimuth",
    "tilt",
    "power_gen",
    "power_production_kwh",
];

fn required_fields(endpoint: &str) -> Option<&'static [&'static str]> {
    COLLECTIONS
        .iter()
        .find(|(name, _)| *name == endpoint)
        .map(|(_, fields)| *fields)
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: i64,
    collections: HashMap<String, BTreeMap<i64, Value>>,
    resource_choices: IndexMap<String, String>,
}

impl Store {
    /// Insert a record as-is, assigning the next id.
    pub fn insert(&mut self, endpoint: &str, mut record: Map<String, Value>) -> Value {
        self.next_id += 1;
        let id = self.next_id;
        record.insert("id".to_string(), json!(id));
        let value = Value::Object(record);
        self.collections
            .entry(endpoint.to_string())
            .or_default()
            .insert(id, value.clone());
        value
    }

    pub fn set_resource_choices(&mut self, choices: IndexMap<String, String>) {
        self.resource_choices = choices;
    }

    pub fn records(&self, endpoint: &str) -> Vec<Value> {
        self.collections
            .get(endpoint)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RwLock<Store>>,
    token: Arc<str>,
    user: Arc<str>,
}

impl AppState {
    /// Empty store with the default resource choices.
    pub fn new(token: &str) -> Self {
        Self::with_store(token, Store::default())
    }

    /// Store pre-filled with a small plant fleet and a few days of readings.
    pub fn seeded(token: &str) -> Self {
        let mut store = Store::default();
        seed(&mut store);
        Self::with_store(token, store)
    }

    fn with_store(token: &str, mut store: Store) -> Self {
        if store.resource_choices.is_empty() {
            store.set_resource_choices(default_choices());
        }
        Self {
            db: Arc::new(RwLock::new(store)),
            token: Arc::from(token),
            user: Arc::from("admin"),
        }
    }
}

fn default_choices() -> IndexMap<String, String> {
    [("SOLAR", "Solar"), ("WIND", "Wind"), ("HYDRO", "Hydro")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn seed(store: &mut Store) {
    let ts = "2024-05-01T06:00:00Z";
    let east = store.insert("loggers-plants-group", object(json!({"group_name": "East"})));
    store.insert("loggers-plants-group", object(json!({"group_name": "West"})));

    store.insert(
        "power-plant-detail",
        object(json!({
            "system_id": "S1", "system_name": "Rooftop A", "customer_name": "Acme",
            "country_name": "Nepal", "resource": "SOLAR", "group": east["id"],
            "capacity_ac": "100.00", "capacity_dc": "120.50",
            "latitude": "27.717245", "longitude": "85.324000",
            "altitude": "1400.00", "azimuth": "180.00", "tilt": "25.00",
            "location": "Kathmandu", "updated_at": ts
        })),
    );

    for (date, power_gen) in [("2024-05-02", "210.40"), ("2024-05-01", "198.75")] {
        store.insert(
            "logger-power-gen",
            object(json!({
                "date": date, "logger_name": "L1", "power_gen": power_gen,
                "status": false, "created_at": ts, "updated_at": ts, "user": null
            })),
        );
    }

    store.insert("utility-plants-list", object(json!({"plant_id": "P-100"})));
    store.insert(
        "utility-daily-production",
        object(json!({
            "production_date": "2024-05-01", "plant_id": "P-100",
            "power_production_kwh": "5120.00", "status": false,
            "created_at": ts, "updated_at": ts, "user": null
        })),
    );
    store.insert("loggercategories", object(json!({"category_name": "Inverter"})));
}

pub fn app(token: &str) -> Router {
    app_with(AppState::new(token))
}

pub fn app_with(state: AppState) -> Router {
    Router::new()
        .route("/core/{endpoint}/", get(list_records).post(create_record))
        .route("/core/{endpoint}/{id}/", get(get_record).patch(patch_record))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

type Reply = (StatusCode, Json<Value>);

fn detail(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "detail": message })))
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Token {}", state.token);
    let accepted = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().is_ok_and(|v| v == expected));
    match accepted {
        Some(true) => next.run(request).await,
        Some(false) => detail(StatusCode::UNAUTHORIZED, "Invalid token.").into_response(),
        None => detail(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided.",
        )
        .into_response(),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Every filter key must match; repeated keys match any of their values.
fn filter_matches(record: &Value, filters: &IndexMap<String, Vec<String>>) -> bool {
    filters.iter().all(|(key, wanted)| {
        record
            .get(key)
            .map(text_of)
            .is_some_and(|actual| wanted.contains(&actual))
    })
}

async fn list_records(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Reply {
    let db = state.db.read().await;
    if endpoint == RESOURCE_CHOICES {
        return (
            StatusCode::OK,
            Json(json!({ "resource_choices": db.resource_choices })),
        );
    }
    if required_fields(&endpoint).is_none() {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    }

    let mut filters: IndexMap<String, Vec<String>> = IndexMap::new();
    for (key, value) in params {
        filters.entry(key).or_default().push(value);
    }
    let rows: Vec<Value> = db
        .records(&endpoint)
        .into_iter()
        .filter(|record| filter_matches(record, &filters))
        .collect();
    (StatusCode::OK, Json(Value::Array(rows)))
}

async fn get_record(
    State(state): State<AppState>,
    Path((endpoint, id)): Path<(String, i64)>,
) -> Reply {
    let db = state.db.read().await;
    match db.collections.get(&endpoint).and_then(|rows| rows.get(&id)) {
        Some(record) => (StatusCode::OK, Json(record.clone())),
        None => detail(StatusCode::NOT_FOUND, "Not found."),
    }
}

/// Form inputs send foreign keys as strings and blanks for unset values.
fn coerce(endpoint: &str, fields: Map<String, Value>) -> Map<String, Value> {
    let required = required_fields(endpoint).unwrap_or(&[]);
    fields
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) if s.is_empty() && !required.contains(&key.as_str()) => Value::Null,
                Value::String(s) if INTEGER_FIELDS.contains(&key.as_str()) => {
                    s.parse::<i64>().map_or(Value::String(s), |n| json!(n))
                }
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// DRF-style messages for coerced values the columns cannot hold.
fn type_errors(endpoint: &str, fields: &Map<String, Value>) -> Map<String, Value> {
    let required = required_fields(endpoint).unwrap_or(&[]);
    let mut errors = Map::new();
    for (key, value) in fields {
        let message = if DECIMAL_FIELDS.contains(&key.as_str()) {
            match value {
                Value::Number(_) => None,
                Value::String(s) if s.parse::<f64>().is_ok_and(f64::is_finite) => None,
                Value::Null if !required.contains(&key.as_str()) => None,
                Value::Null => Some("This field may not be null."),
                _ => Some("A valid number is required."),
            }
        } else if INTEGER_FIELDS.contains(&key.as_str()) {
            match value {
                Value::Number(n) if n.is_i64() => None,
                Value::Null if !required.contains(&key.as_str()) => None,
                Value::Null => Some("This field may not be null."),
                Value::String(_) => Some("Incorrect type. Expected pk value, received str."),
                _ => Some("Incorrect type. Expected pk value."),
            }
        } else {
            None
        };
        if let Some(message) = message {
            errors.insert(key.clone(), json!([message]));
        }
    }
    errors
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn create_record(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let Some(required) = required_fields(&endpoint) else {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    };
    let Value::Object(fields) = body else {
        return detail(StatusCode::BAD_REQUEST, "Expected a JSON object.");
    };

    let mut errors = Map::new();
    for field in required {
        let missing = match fields.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if missing {
            errors.insert(field.to_string(), json!(["This field is required."]));
        }
    }
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(Value::Object(errors)));
    }

    let mut record = coerce(&endpoint, fields);
    let errors = type_errors(&endpoint, &record);
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(Value::Object(errors)));
    }
    record.remove("id");
    let stamp = now();
    record.insert("updated_at".to_string(), json!(stamp));
    if AUDITED.contains(&endpoint.as_str()) {
        record.insert("created_at".to_string(), json!(stamp));
        record.insert("status".to_string(), json!(false));
        record.insert("user".to_string(), json!(&*state.user));
    }

    let created = state.db.write().await.insert(&endpoint, record);
    info!(%endpoint, id = %created["id"], "record created");
    (StatusCode::CREATED, Json(created))
}

async fn patch_record(
    State(state): State<AppState>,
    Path((endpoint, id)): Path<(String, i64)>,
    Json(body): Json<Value>,
) -> Reply {
    let Value::Object(changes) = body else {
        return detail(StatusCode::BAD_REQUEST, "Expected a JSON object.");
    };
    let changes = coerce(&endpoint, changes);
    let errors = type_errors(&endpoint, &changes);
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(Value::Object(errors)));
    }
    let mut db = state.db.write().await;
    let Some(Value::Object(record)) = db.collections.get_mut(&endpoint).and_then(|rows| rows.get_mut(&id))
    else {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    };

    for (key, value) in changes {
        if key != "id" {
            record.insert(key, value);
        }
    }
    record.insert("updated_at".to_string(), json!(now()));
    if AUDITED.contains(&endpoint.as_str()) {
        record.insert("status".to_string(), json!(true));
        record.insert("user".to_string(), json!(&*state.user));
    }
    info!(%endpoint, id, "record updated");
    (StatusCode::OK, Json(Value::Object(record.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_match_any_value_of_a_repeated_key() {
        let record = json!({"logger_name": "L2", "date": "2024-05-01"});
        let mut filters = IndexMap::new();
        filters.insert("logger_name".to_string(), vec!["L1".to_string(), "L2".to_string()]);
        assert!(filter_matches(&record, &filters));
        filters.insert("date".to_string(), vec!["2024-05-02".to_string()]);
        assert!(!filter_matches(&record, &filters));
    }

    #[test]
    fn numeric_filter_values_compare_as_text() {
        let record = json!({"group": 3});
        let mut filters = IndexMap::new();
        filters.insert("group".to_string(), vec!["3".to_string()]);
        assert!(filter_matches(&record, &filters));
    }

    #[test]
    fn coerce_parses_foreign_keys_and_nulls_optional_blanks() {
        let fields = object(json!({"group": "4", "capacity_ac": "", "system_id": ""}));
        let out = coerce("power-plant-detail", fields);
        assert_eq!(out["group"], json!(4));
        assert_eq!(out["capacity_ac"], Value::Null);
        assert_eq!(out["system_id"], json!(""));
    }

    #[test]
    fn type_errors_flag_non_numeric_columns() {
        let fields = object(json!({
            "power_gen": "abc", "tilt": "12.5", "azimuth": 180,
            "capacity_ac": null, "capacity_dc": null, "latitude": "NaN",
            "group": "east", "system_name": "x"
        }));
        let errors = type_errors("power-plant-detail", &fields);
        assert_eq!(errors["power_gen"][0], "A valid number is required.");
        assert_eq!(errors["latitude"][0], "A valid number is required.");
        assert_eq!(errors["capacity_dc"][0], "This field may not be null.");
        assert!(errors["group"][0].as_str().unwrap().starts_with("Incorrect type"));
        for ok in ["tilt", "azimuth", "capacity_ac", "system_name"] {
            assert!(!errors.contains_key(ok), "{ok}");
        }
    }

    #[test]
    fn store_assigns_increasing_ids() {
        let mut store = Store::default();
        let a = store.insert("loggers-plants-group", object(json!({"group_name": "A"})));
        let b = store.insert("utility-plants-list", object(json!({"plant_id": "P"})));
        assert_eq!(a["id"], 1);
        assert_eq!(b["id"], 2);
        assert_eq!(store.records("loggers-plants-group").len(), 1);
    }

    #[test]
    fn seeded_state_has_every_fixture_collection() {
        let state = AppState::seeded("t");
        let store = state.db.try_read().unwrap();
        for endpoint in [
            "loggers-plants-group",
            "power-plant-detail",
            "logger-power-gen",
            "utility-plants-list",
            "utility-daily-production",
            "loggercategories",
        ] {
            assert!(!store.records(endpoint).is_empty(), "{endpoint}");
        }
    }
}
