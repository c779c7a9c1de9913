//! Text renderings of the list and form views.
//!
//! Purely presentational: every function takes controller state and
//! returns a string. Rows are numbered from 1 in display order, which is
//! the number `edit`/`update` commands take.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use powerguard_core::types::{fixed_point, group_name, COORDINATE_PRECISION, ORIENTATION_PRECISION};
use powerguard_core::{
    ApiError, EditSession, Editable, FieldErrors, FieldSpec, LoggerCategory, LoggerPlantGroup,
    LoggerPowerGen,
    PowerPlantDetail, SelectOption, UtilityDailyProduction, UtilityPlant,
};

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_PLANTS: &str = "No plant details available";
pub const NO_DATA: &str = "No data available";
pub const SAVE_FAILED: &str = "An error occurred while saving. Please try again.";

/// Column-aligned plain-text table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let width = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(width),
                    None => widths.push(width),
                }
            }
        }
        widths
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let mut line = String::new();
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        let pad = width.saturating_sub(cell.chars().count());
        line.extend(std::iter::repeat(' ').take(pad));
    }
    writeln!(f, "{}", line.trim_end())
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        write_line(f, &self.headers, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_line(f, &rule, &widths)?;
        for row in &self.rows {
            write_line(f, row, &widths)?;
        }
        Ok(())
    }
}

fn or_na(text: &str) -> String {
    if text.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        text.to_string()
    }
}

pub fn timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn status_mark(status: bool) -> &'static str {
    if status {
        "✔"
    } else {
        "✘"
    }
}

/// Cell text for `field`: the draft in brackets when row `index` is being
/// edited, otherwise `shown`.
fn cell<R: Editable>(
    session: Option<&EditSession<R>>,
    index: usize,
    field: &str,
    shown: String,
) -> String {
    match session.filter(|s| s.index() == index).and_then(|s| s.value(field)) {
        Some(draft) => format!("[{draft}]"),
        None => shown,
    }
}

/// Group cell of a plant row. A draft group id is shown by name when the
/// id is known.
fn group_cell(
    session: Option<&EditSession<PowerPlantDetail>>,
    index: usize,
    groups: &[LoggerPlantGroup],
    shown: &str,
) -> String {
    match session.filter(|s| s.index() == index).and_then(|s| s.value("group")) {
        Some(draft) => {
            let name = draft
                .trim()
                .parse()
                .ok()
                .and_then(|id| group_name(groups, Some(id)))
                .unwrap_or(draft);
            format!("[{name}]")
        }
        None => shown.to_string(),
    }
}

pub fn plants(
    rows: &[PowerPlantDetail],
    groups: &[LoggerPlantGroup],
    session: Option<&EditSession<PowerPlantDetail>>,
) -> String {
    if rows.is_empty() {
        return format!("{NO_PLANTS}\n");
    }
    let mut table = Table::new(&[
        "#",
        "ID",
        "System ID",
        "System Name",
        "Customer Name",
        "Country",
        "Resource",
        "Capacity DC",
        "Latitude",
        "Longitude",
        "Altitude",
        "Azimuth",
        "Tilt",
        "Group",
        "Updated At",
    ]);
    for (index, plant) in rows.iter().enumerate() {
        let group = group_name(groups, plant.group).unwrap_or(NOT_AVAILABLE);
        table.push(vec![
            (index + 1).to_string(),
            plant.id.to_string(),
            cell(session, index, "system_id", or_na(&plant.system_id)),
            cell(session, index, "system_name", or_na(&plant.system_name)),
            cell(session, index, "customer_name", or_na(&plant.customer_name)),
            cell(session, index, "country_name", or_na(&plant.country_name)),
            cell(session, index, "resource", or_na(&plant.resource)),
            cell(session, index, "capacity_dc", plant.capacity_dc.to_string()),
            cell(session, index, "latitude", fixed_point(plant.latitude, COORDINATE_PRECISION)),
            cell(session, index, "longitude", fixed_point(plant.longitude, COORDINATE_PRECISION)),
            cell(session, index, "altitude", fixed_point(plant.altitude, ORIENTATION_PRECISION)),
            cell(session, index, "azimuth", fixed_point(plant.azimuth, ORIENTATION_PRECISION)),
            cell(session, index, "tilt", fixed_point(plant.tilt, ORIENTATION_PRECISION)),
            group_cell(session, index, groups, group),
            timestamp(&plant.updated_at),
        ]);
    }
    table.to_string()
}

pub fn power_gen(rows: &[LoggerPowerGen], session: Option<&EditSession<LoggerPowerGen>>) -> String {
    if rows.is_empty() {
        return format!("{NO_DATA}\n");
    }
    let mut table = Table::new(&[
        "#",
        "Date",
        "Logger Name",
        "Power Generation",
        "Status",
        "Created At",
        "Updated At",
        "User",
    ]);
    for (index, item) in rows.iter().enumerate() {
        table.push(vec![
            (index + 1).to_string(),
            item.date.to_string(),
            item.logger_name.clone(),
            cell(session, index, "power_gen", item.power_gen.to_string()),
            status_mark(item.status).to_string(),
            timestamp(&item.created_at),
            timestamp(&item.updated_at),
            item.user.as_ref().map(ToString::to_string).unwrap_or_default(),
        ]);
    }
    table.to_string()
}

pub fn productions(
    rows: &[UtilityDailyProduction],
    session: Option<&EditSession<UtilityDailyProduction>>,
) -> String {
    if rows.is_empty() {
        return format!("{NO_DATA}\n");
    }
    let mut table = Table::new(&[
        "#",
        "Production Date",
        "Plant ID",
        "Production (kWh)",
        "Status",
        "Created At",
        "Updated At",
        "User",
    ]);
    for (index, item) in rows.iter().enumerate() {
        table.push(vec![
            (index + 1).to_string(),
            item.production_date.to_string(),
            item.plant_id.clone(),
            cell(session, index, "power_production_kwh", item.power_production_kwh.to_string()),
            status_mark(item.status).to_string(),
            timestamp(&item.created_at),
            timestamp(&item.updated_at),
            item.user.as_ref().map(ToString::to_string).unwrap_or_default(),
        ]);
    }
    table.to_string()
}

pub fn groups(rows: &[LoggerPlantGroup]) -> String {
    if rows.is_empty() {
        return format!("{NO_DATA}\n");
    }
    let mut table = Table::new(&["ID", "Group Name"]);
    for group in rows {
        table.push(vec![group.id.to_string(), group.group_name.clone()]);
    }
    table.to_string()
}

pub fn categories(rows: &[LoggerCategory]) -> String {
    if rows.is_empty() {
        return format!("{NO_DATA}\n");
    }
    let mut table = Table::new(&["ID", "Category Name"]);
    for category in rows {
        table.push(vec![category.id.to_string(), category.category_name.clone()]);
    }
    table.to_string()
}

pub fn utility_plants(rows: &[UtilityPlant]) -> String {
    if rows.is_empty() {
        return format!("{NO_DATA}\n");
    }
    let mut table = Table::new(&["ID", "Plant ID"]);
    for plant in rows {
        table.push(vec![plant.id.to_string(), plant.plant_id.clone()]);
    }
    table.to_string()
}

pub fn choices(options: &[SelectOption]) -> String {
    if options.is_empty() {
        return format!("{NO_DATA}\n");
    }
    let mut table = Table::new(&["Code", "Label"]);
    for option in options {
        table.push(vec![option.value.clone(), option.label.clone()]);
    }
    table.to_string()
}

/// Field messages keyed by label, in form order. Messages for fields the
/// form does not know (server-side only) follow under their raw name.
pub fn form_errors(schema: &[FieldSpec], errors: &FieldErrors) -> String {
    let mut out = String::new();
    for spec in schema {
        if let Some(message) = errors.get(spec.name) {
            out.push_str(&format!("  {}: {message}\n", spec.label));
        }
    }
    for (field, message) in errors {
        if !schema.iter().any(|spec| spec.name == field) {
            out.push_str(&format!("  {field}: {message}\n"));
        }
    }
    out
}

pub fn fetch_error(err: &ApiError) -> String {
    format!("Error loading data: {err}")
}
