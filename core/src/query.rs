//! List filters.
//!
//! `ListQuery` is compared by value: a fetch re-runs only when the pairs
//! actually change, not when an equal query is rebuilt.

use chrono::NaiveDate;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pairs: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Percent-encoded `k=v&k=v` form, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Search box state for the power-generation update view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerGenFilter {
    pub date: Option<NaiveDate>,
    pub loggers: Vec<String>,
}

impl From<&PowerGenFilter> for ListQuery {
    fn from(filter: &PowerGenFilter) -> Self {
        let mut query = ListQuery::new();
        if let Some(date) = filter.date {
            query.push("date", date.format("%Y-%m-%d").to_string());
        }
        for logger in &filter.loggers {
            query.push("logger_name", logger.as_str());
        }
        query
    }
}

/// Search box state for the daily-production update view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductionFilter {
    pub date: Option<NaiveDate>,
    pub plant_ids: Vec<String>,
}

impl From<&ProductionFilter> for ListQuery {
    fn from(filter: &ProductionFilter) -> Self {
        let mut query = ListQuery::new();
        if let Some(date) = filter.date {
            query.push("production_date", date.format("%Y-%m-%d").to_string());
        }
        for plant in &filter.plant_ids {
            query.push("plant_id", plant.as_str());
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_encodes_values() {
        let q = ListQuery::new().with("logger_name", "Site A/1").with("date", "2024-05-01");
        assert_eq!(q.to_query_string(), "logger_name=Site%20A%2F1&date=2024-05-01");
    }

    #[test]
    fn power_gen_filter_repeats_logger_key() {
        let filter = PowerGenFilter {
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            loggers: vec!["L1".into(), "L2".into()],
        };
        let q = ListQuery::from(&filter);
        assert_eq!(q.to_query_string(), "date=2024-05-01&logger_name=L1&logger_name=L2");
    }

    #[test]
    fn empty_filter_is_empty_query() {
        assert!(ListQuery::from(&ProductionFilter::default()).is_empty());
    }

    #[test]
    fn equal_queries_compare_equal() {
        let a = ListQuery::from(&ProductionFilter {
            date: None,
            plant_ids: vec!["P-1".into()],
        });
        let b = ListQuery::new().with("plant_id", "P-1");
        assert_eq!(a, b);
    }
}
