//! Record schemas mirrored from the backend.
//!
//! # Design
//! Each collection gets an explicit struct so malformed payloads fail at the
//! HTTP boundary with `ApiError::Format` instead of surfacing later as a
//! missing column. Decimal columns use `rust_decimal::Decimal`, which accepts
//! both the string and the numeric JSON form the backend may emit and keeps
//! the server's precision intact.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::add::{ChoiceSource, Creatable, FieldKind, FieldSpec};
use crate::edit::Editable;
use crate::resource::{Endpoint, RecordId, Resource};

/// Decimal places used when rendering coordinates.
pub const COORDINATE_PRECISION: u32 = 6;
/// Decimal places used when rendering altitude, azimuth and tilt.
pub const ORIENTATION_PRECISION: u32 = 2;

/// Render a decimal with exactly `dp` places, rounding half away from zero.
pub fn fixed_point(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.prec$}", prec = dp as usize)
}

/// The user who last touched a row. The backend serializes either the
/// primary key or the username depending on the serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(i64),
    Name(String),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Id(id) => write!(f, "{id}"),
            UserRef::Name(name) => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Power plant detail
// ---------------------------------------------------------------------------

/// A monitored power plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerPlantDetail {
    pub id: RecordId,
    pub system_id: String,
    pub system_name: String,
    pub customer_name: String,
    pub country_name: String,
    /// Code from the resource-choices enum, e.g. `SOLAR`.
    pub resource: String,
    /// Foreign key into `loggers-plants-group`.
    #[serde(default)]
    pub group: Option<RecordId>,
    #[serde(default)]
    pub capacity_ac: Option<Decimal>,
    pub capacity_dc: Decimal,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub altitude: Decimal,
    pub azimuth: Decimal,
    pub tilt: Decimal,
    #[serde(default)]
    pub location: Option<String>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Resource for PowerPlantDetail {
    const ENDPOINT: Endpoint = Endpoint::PowerPlantDetail;

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Editable for PowerPlantDetail {
    const EDITABLE_FIELDS: &'static [&'static str] = &[
        "system_id",
        "system_name",
        "customer_name",
        "country_name",
        "resource",
        "capacity_dc",
        "latitude",
        "longitude",
        "altitude",
        "azimuth",
        "tilt",
        "group",
    ];
    const NUMERIC_FIELDS: &'static [&'static str] =
        &["capacity_dc", "latitude", "longitude", "altitude", "azimuth", "tilt"];

    fn field_text(&self, field: &str) -> Option<String> {
        let text = match field {
            "system_id" => self.system_id.clone(),
            "system_name" => self.system_name.clone(),
            "customer_name" => self.customer_name.clone(),
            "country_name" => self.country_name.clone(),
            "resource" => self.resource.clone(),
            "capacity_dc" => self.capacity_dc.to_string(),
            "latitude" => self.latitude.to_string(),
            "longitude" => self.longitude.to_string(),
            "altitude" => self.altitude.to_string(),
            "azimuth" => self.azimuth.to_string(),
            "tilt" => self.tilt.to_string(),
            "group" => self.group.map(|g| g.to_string()).unwrap_or_default(),
            _ => return None,
        };
        Some(text)
    }
}

impl Creatable for PowerPlantDetail {
    const FORM: &'static [FieldSpec] = &[
        FieldSpec::required("system_id", "System ID", FieldKind::Text),
        FieldSpec::required("system_name", "System Name", FieldKind::Text),
        FieldSpec::required("customer_name", "Customer Name", FieldKind::Text),
        FieldSpec::required("country_name", "Country Name", FieldKind::Text),
        FieldSpec::optional("location", "Location", FieldKind::Text),
        FieldSpec::required("group", "Group", FieldKind::Choice(ChoiceSource::PlantGroups)),
        FieldSpec::required(
            "resource",
            "Resource",
            FieldKind::Choice(ChoiceSource::ResourceChoices),
        ),
        FieldSpec::optional("capacity_ac", "Capacity AC (kW)", FieldKind::Number),
        FieldSpec::required("capacity_dc", "Capacity DC (kW)", FieldKind::Number),
        FieldSpec::required("latitude", "Latitude", FieldKind::Number),
        FieldSpec::required("longitude", "Longitude", FieldKind::Number),
        FieldSpec::required("altitude", "Altitude (m)", FieldKind::Number),
        FieldSpec::required("azimuth", "Azimuth (°)", FieldKind::Number),
        FieldSpec::required("tilt", "Tilt (°)", FieldKind::Number),
    ];
}

// ---------------------------------------------------------------------------
// Logger power generation
// ---------------------------------------------------------------------------

/// Daily generation total reported by one logger. One row per
/// (logger, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerPowerGen {
    pub id: RecordId,
    pub date: NaiveDate,
    pub logger_name: String,
    pub power_gen: Decimal,
    pub status: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl Resource for LoggerPowerGen {
    const ENDPOINT: Endpoint = Endpoint::LoggerPowerGen;

    fn id(&self) -> RecordId {
        self.id
    }

    fn display_cmp(&self, other: &Self) -> Ordering {
        self.date.cmp(&other.date)
    }
}

impl Editable for LoggerPowerGen {
    const EDITABLE_FIELDS: &'static [&'static str] = &["power_gen"];
    const NUMERIC_FIELDS: &'static [&'static str] = &["power_gen"];

    fn field_text(&self, field: &str) -> Option<String> {
        (field == "power_gen").then(|| self.power_gen.to_string())
    }
}

// ---------------------------------------------------------------------------
// Utility daily production
// ---------------------------------------------------------------------------

/// Daily production figure reported by the utility for one plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityDailyProduction {
    pub id: RecordId,
    pub production_date: NaiveDate,
    pub plant_id: String,
    pub power_production_kwh: Decimal,
    pub status: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl Resource for UtilityDailyProduction {
    const ENDPOINT: Endpoint = Endpoint::UtilityDailyProduction;

    fn id(&self) -> RecordId {
        self.id
    }

    fn display_cmp(&self, other: &Self) -> Ordering {
        self.production_date.cmp(&other.production_date)
    }
}

impl Editable for UtilityDailyProduction {
    const EDITABLE_FIELDS: &'static [&'static str] = &["power_production_kwh"];
    const NUMERIC_FIELDS: &'static [&'static str] = &["power_production_kwh"];

    fn field_text(&self, field: &str) -> Option<String> {
        (field == "power_production_kwh").then(|| self.power_production_kwh.to_string())
    }
}

// ---------------------------------------------------------------------------
// Reference collections
// ---------------------------------------------------------------------------

/// Grouping of loggers and plants. Plants point at one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerPlantGroup {
    pub id: RecordId,
    pub group_name: String,
}

impl Resource for LoggerPlantGroup {
    const ENDPOINT: Endpoint = Endpoint::LoggersPlantsGroup;

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Creatable for LoggerPlantGroup {
    const FORM: &'static [FieldSpec] =
        &[FieldSpec::required("group_name", "Group Name", FieldKind::Text)];
}

/// Category a logger can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerCategory {
    pub id: RecordId,
    pub category_name: String,
}

impl Resource for LoggerCategory {
    const ENDPOINT: Endpoint = Endpoint::LoggerCategories;

    fn id(&self) -> RecordId {
        self.id
    }

    fn display_cmp(&self, other: &Self) -> Ordering {
        self.category_name.cmp(&other.category_name)
    }
}

impl Creatable for LoggerCategory {
    const FORM: &'static [FieldSpec] =
        &[FieldSpec::required("category_name", "Category Name", FieldKind::Text)];
}

/// A plant identifier known to the utility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityPlant {
    pub id: RecordId,
    pub plant_id: String,
}

impl Resource for UtilityPlant {
    const ENDPOINT: Endpoint = Endpoint::UtilityPlantsList;

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Creatable for UtilityPlant {
    const FORM: &'static [FieldSpec] =
        &[FieldSpec::required("plant_id", "Plant ID", FieldKind::Text)];
}

/// Payload of `power-plant-resource-choices`: code → label, in server order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChoices {
    pub resource_choices: IndexMap<String, String>,
}

/// Resolve a group id to its display name.
pub fn group_name(groups: &[LoggerPlantGroup], id: Option<RecordId>) -> Option<&str> {
    let id = id?;
    groups
        .iter()
        .find(|g| g.id == id)
        .map(|g| g.group_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn plant_json() -> serde_json::Value {
        serde_json::json!({
            "id": 1,
            "system_id": "S1",
            "system_name": "Rooftop A",
            "customer_name": "Acme",
            "country_name": "Nepal",
            "resource": "SOLAR",
            "group": 3,
            "capacity_ac": null,
            "capacity_dc": "120.50",
            "latitude": "27.7172453",
            "longitude": 85.324,
            "altitude": "1400.005",
            "azimuth": "180.00",
            "tilt": "25",
            "location": "Kathmandu",
            "updated_at": "2024-05-01T10:00:00+05:45"
        })
    }

    #[test]
    fn plant_accepts_string_and_numeric_decimals() {
        let plant: PowerPlantDetail = serde_json::from_value(plant_json()).unwrap();
        assert_eq!(plant.capacity_dc, Decimal::from_str("120.50").unwrap());
        assert_eq!(plant.longitude, Decimal::from_str("85.324").unwrap());
        assert!(plant.capacity_ac.is_none());
        assert_eq!(plant.group, Some(3));
    }

    #[test]
    fn plant_missing_required_field_is_rejected() {
        let mut value = plant_json();
        value.as_object_mut().unwrap().remove("system_id");
        assert!(serde_json::from_value::<PowerPlantDetail>(value).is_err());
    }

    #[test]
    fn fixed_point_pads_and_rounds() {
        let lat = Decimal::from_str("27.7172453").unwrap();
        assert_eq!(fixed_point(lat, COORDINATE_PRECISION), "27.717245");
        let lon = Decimal::from_str("85.324").unwrap();
        assert_eq!(fixed_point(lon, COORDINATE_PRECISION), "85.324000");
        let alt = Decimal::from_str("1400.005").unwrap();
        assert_eq!(fixed_point(alt, ORIENTATION_PRECISION), "1400.01");
        assert_eq!(fixed_point(Decimal::from(25), ORIENTATION_PRECISION), "25.00");
    }

    #[test]
    fn plant_field_text_covers_every_editable_field() {
        let plant: PowerPlantDetail = serde_json::from_value(plant_json()).unwrap();
        for field in PowerPlantDetail::EDITABLE_FIELDS {
            assert!(plant.field_text(field).is_some(), "{field}");
        }
        assert_eq!(plant.field_text("group").as_deref(), Some("3"));
        assert!(plant.field_text("id").is_none());
    }

    #[test]
    fn user_ref_accepts_id_or_name() {
        let id: UserRef = serde_json::from_value(serde_json::json!(7)).unwrap();
        let name: UserRef = serde_json::from_value(serde_json::json!("ops")).unwrap();
        assert_eq!(id.to_string(), "7");
        assert_eq!(name.to_string(), "ops");
    }

    #[test]
    fn readings_sort_by_date() {
        let row = |id: i64, date: &str| -> LoggerPowerGen {
            serde_json::from_value(serde_json::json!({
                "id": id,
                "date": date,
                "logger_name": "L1",
                "power_gen": 10,
                "status": true,
                "created_at": "2024-05-01T00:00:00Z",
                "updated_at": "2024-05-01T00:00:00Z",
                "user": null
            }))
            .unwrap()
        };
        let mut rows = vec![row(1, "2024-05-03"), row(2, "2024-05-01"), row(3, "2024-05-02")];
        crate::resource::sort_for_display(&mut rows);
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn resource_choices_keep_server_order() {
        let choices: ResourceChoices = serde_json::from_str(
            r#"{"resource_choices":{"WIND":"Wind","SOLAR":"Solar","HYDRO":"Hydro"}}"#,
        )
        .unwrap();
        let codes: Vec<_> = choices.resource_choices.keys().cloned().collect();
        assert_eq!(codes, vec!["WIND", "SOLAR", "HYDRO"]);
    }

    #[test]
    fn numeric_fields_are_editable() {
        for field in PowerPlantDetail::NUMERIC_FIELDS {
            assert!(PowerPlantDetail::EDITABLE_FIELDS.contains(field), "{field}");
            assert_eq!(PowerPlantDetail::field(field).unwrap().kind, FieldKind::Number);
        }
        assert!(!PowerPlantDetail::NUMERIC_FIELDS.contains(&"group"));
    }

    #[test]
    fn categories_sort_by_name() {
        let mut rows = vec![
            LoggerCategory { id: 1, category_name: "Weather".into() },
            LoggerCategory { id: 2, category_name: "Inverter".into() },
        ];
        crate::resource::sort_for_display(&mut rows);
        assert_eq!(rows[0].category_name, "Inverter");
        assert_eq!(LoggerCategory::FORM[0].name, "category_name");
    }

    #[test]
    fn group_name_lookup() {
        let groups = vec![LoggerPlantGroup { id: 3, group_name: "East".into() }];
        assert_eq!(group_name(&groups, Some(3)), Some("East"));
        assert_eq!(group_name(&groups, Some(4)), None);
        assert_eq!(group_name(&groups, None), None);
    }
}
