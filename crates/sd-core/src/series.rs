//! Canonical time-series types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation granularity of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    /// Wire name used by the analytics provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single point of a canonical series.
///
/// Canonical series are ordered ascending by `date` with no duplicate dates.
/// Numeric fields are either finite numbers or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
}

impl TimeSeriesPoint {
    /// Create a point with no values
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            actual: None,
            predicted: None,
            upper_bound: None,
            lower_bound: None,
        }
    }

    pub fn with_actual(mut self, value: f64) -> Self {
        self.actual = Some(value);
        self
    }

    pub fn with_predicted(mut self, value: f64) -> Self {
        self.predicted = Some(value);
        self
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = Some(lower);
        self.upper_bound = Some(upper);
        self
    }

    /// Get the value of a field, if present
    pub fn value(&self, field: SeriesField) -> Option<f64> {
        match field {
            SeriesField::Actual => self.actual,
            SeriesField::Predicted => self.predicted,
            SeriesField::UpperBound => self.upper_bound,
            SeriesField::LowerBound => self.lower_bound,
        }
    }
}

/// Numeric fields carried by a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesField {
    Actual,
    Predicted,
    UpperBound,
    LowerBound,
}

impl SeriesField {
    pub const ALL: [SeriesField; 4] = [
        SeriesField::Actual,
        SeriesField::Predicted,
        SeriesField::UpperBound,
        SeriesField::LowerBound,
    ];

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            SeriesField::Actual => "Actual Sales",
            SeriesField::Predicted => "Predicted Sales",
            SeriesField::UpperBound => "Upper Bound",
            SeriesField::LowerBound => "Lower Bound",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_serializes_without_missing_fields() {
        let point = TimeSeriesPoint::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .with_actual(150.0);
        let json = serde_json::to_value(&point).unwrap();

        assert_eq!(json, serde_json::json!({"date": "2025-03-01", "actual": 150.0}));
    }

    #[test]
    fn test_value_lookup() {
        let point = TimeSeriesPoint::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .with_predicted(10.0)
            .with_bounds(8.0, 12.0);

        assert_eq!(point.value(SeriesField::Actual), None);
        assert_eq!(point.value(SeriesField::Predicted), Some(10.0));
        assert_eq!(point.value(SeriesField::LowerBound), Some(8.0));
        assert_eq!(point.value(SeriesField::UpperBound), Some(12.0));
    }
}
