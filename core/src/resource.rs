//! Endpoint names and the `Resource` trait tying a record schema to its
//! REST collection.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;

/// Server-assigned primary key. Immutable once assigned.
pub type RecordId = i64;

/// Collections exposed under `{base}/core/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    PowerPlantDetail,
    LoggerPowerGen,
    LoggersPlantsGroup,
    LoggerCategories,
    UtilityPlantsList,
    UtilityDailyProduction,
    PowerPlantResourceChoices,
}

impl Endpoint {
    pub const ALL: [Endpoint; 7] = [
        Endpoint::PowerPlantDetail,
        Endpoint::LoggerPowerGen,
        Endpoint::LoggersPlantsGroup,
        Endpoint::LoggerCategories,
        Endpoint::UtilityPlantsList,
        Endpoint::UtilityDailyProduction,
        Endpoint::PowerPlantResourceChoices,
    ];

    /// Path segment as it appears in the URL.
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::PowerPlantDetail => "power-plant-detail",
            Endpoint::LoggerPowerGen => "logger-power-gen",
            Endpoint::LoggersPlantsGroup => "loggers-plants-group",
            Endpoint::LoggerCategories => "loggercategories",
            Endpoint::UtilityPlantsList => "utility-plants-list",
            Endpoint::UtilityDailyProduction => "utility-daily-production",
            Endpoint::PowerPlantResourceChoices => "power-plant-resource-choices",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim_matches('/');
        Endpoint::ALL
            .into_iter()
            .find(|e| e.as_str() == name)
            .ok_or_else(|| format!("unknown endpoint: {s}"))
    }
}

/// A record schema served by one REST collection.
pub trait Resource: DeserializeOwned + Clone {
    const ENDPOINT: Endpoint;

    fn id(&self) -> RecordId;

    /// Ordering used by list views. Server order unless overridden.
    fn display_cmp(&self, _other: &Self) -> Ordering {
        Ordering::Equal
    }
}

/// Sort rows into display order. Stable, so ties keep server order.
pub fn sort_for_display<R: Resource>(rows: &mut [R]) {
    rows.sort_by(|a, b| a.display_cmp(b));
}
