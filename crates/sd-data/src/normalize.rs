//! Normalization of provider payloads into canonical types
//!
//! Series payloads arrive either as a bare array of points or wrapped as
//! `{"data": [...]}`. Both decode through [`SeriesPayload`] and normalize to
//! the same canonical series. Anything matching neither shape is a
//! [`DataError::Parse`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sd_core::{Dimension, TimeSeriesPoint};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::model::{KpiSnapshot, Narrative};
use crate::DataError;

/// Accepted series payload shapes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeriesPayload {
    Bare(Vec<RawPoint>),
    Wrapped { data: Vec<RawPoint> },
}

impl SeriesPayload {
    fn into_points(self) -> Vec<RawPoint> {
        match self {
            SeriesPayload::Bare(points) | SeriesPayload::Wrapped { data: points } => points,
        }
    }
}

/// A point as the provider sends it
#[derive(Debug, Deserialize)]
struct RawPoint {
    #[serde(default)]
    date: Option<Value>,
    #[serde(default, alias = "actual_sales")]
    actual: Option<Value>,
    #[serde(default, alias = "predicted_sales", alias = "pred_sale")]
    predicted: Option<Value>,
    #[serde(default, alias = "upperBound")]
    upper_bound: Option<Value>,
    #[serde(default, alias = "lowerBound")]
    lower_bound: Option<Value>,
}

/// Normalize a series payload into a canonical series: sorted ascending,
/// one point per date, numeric fields finite or absent.
pub fn normalize_series(payload: Value) -> Result<Vec<TimeSeriesPoint>, DataError> {
    let payload = SeriesPayload::deserialize(payload).map_err(|e| {
        DataError::Parse(format!(
            "series payload is neither an array of points nor {{\"data\": [...]}}: {}",
            e
        ))
    })?;

    let mut by_date: BTreeMap<NaiveDate, TimeSeriesPoint> = BTreeMap::new();
    for (idx, raw) in payload.into_points().into_iter().enumerate() {
        let date = match &raw.date {
            Some(Value::String(s)) => parse_date(s)
                .ok_or_else(|| DataError::Parse(format!("point {} has an invalid date '{}'", idx, s)))?,
            Some(Value::Null) | None => {
                return Err(DataError::Parse(format!("point {} is missing its date", idx)))
            }
            Some(other) => {
                return Err(DataError::Parse(format!("point {} has a non-string date {}", idx, other)))
            }
        };

        let point = TimeSeriesPoint {
            date,
            actual: coerce_number(raw.actual.as_ref()),
            predicted: coerce_number(raw.predicted.as_ref()),
            upper_bound: coerce_number(raw.upper_bound.as_ref()),
            lower_bound: coerce_number(raw.lower_bound.as_ref()),
        };

        if by_date.insert(date, point).is_some() {
            warn!(%date, "duplicate date in series, keeping the later point");
        }
    }

    Ok(by_date.into_values().collect())
}

/// Normalize a KPI payload
pub fn normalize_kpi(payload: Value) -> Result<KpiSnapshot, DataError> {
    if !payload.is_object() {
        return Err(DataError::Parse(format!("KPI payload must be an object, got {}", kind(&payload))));
    }
    serde_json::from_value(payload).map_err(|e| DataError::Parse(format!("KPI payload: {}", e)))
}

/// Normalize a narrative payload
pub fn normalize_narrative(payload: Value) -> Result<Narrative, DataError> {
    if !payload.is_object() {
        return Err(DataError::Parse(format!(
            "narrative payload must be an object, got {}",
            kind(&payload)
        )));
    }
    serde_json::from_value(payload).map_err(|e| DataError::Parse(format!("narrative payload: {}", e)))
}

/// Normalize a lookup list. Items are either plain strings or objects keyed
/// by the dimension name (`{"sector": "office"}`). Blank and repeated labels
/// are skipped; order is preserved.
pub fn normalize_lookup(dimension: Dimension, payload: Value) -> Result<Vec<String>, DataError> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(DataError::Parse(format!(
                    "{} lookup must be an array or {{\"data\": [...]}}",
                    dimension
                )))
            }
        },
        other => {
            return Err(DataError::Parse(format!(
                "{} lookup must be an array, got {}",
                dimension,
                kind(&other)
            )))
        }
    };

    let mut labels: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let label = match item {
            Value::String(s) => s,
            Value::Object(mut map) => match map.remove(dimension.as_str()) {
                Some(Value::String(s)) => s,
                _ => {
                    return Err(DataError::Parse(format!(
                        "{} lookup item is missing '{}'",
                        dimension,
                        dimension.as_str()
                    )))
                }
            },
            other => {
                return Err(DataError::Parse(format!(
                    "{} lookup item must be a string or object, got {}",
                    dimension,
                    kind(&other)
                )))
            }
        };

        let label = label.trim().to_string();
        if !label.is_empty() && !labels.contains(&label) {
            labels.push(label);
        }
    }

    Ok(labels)
}

/// Coerce a JSON value to a finite number. Numeric strings are accepted;
/// anything else is dropped.
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Serde adapter for optional numbers that may arrive as strings
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(coerce_number(value.as_ref()))
}

/// Parse the date formats the provider emits: `YYYY-MM-DD`, `YYYY-MM`
/// (monthly buckets) and full timestamps.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(timestamp.date());
        }
    }
    None
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_bare_and_wrapped_normalize_identically() {
        let points = json!([
            {"date": "2025-02-01", "actual_sales": 120, "predicted_sales": 118.5},
            {"date": "2025-01-01", "actual_sales": "100", "upper_bound": 130, "lower_bound": 90}
        ]);

        let bare = normalize_series(points.clone()).unwrap();
        let wrapped = normalize_series(json!({"data": points, "aggregation": "monthly"})).unwrap();

        assert_eq!(bare, wrapped);
        assert_eq!(bare.len(), 2);
        assert_eq!(bare[0].date, date("2025-01-01"));
        assert_eq!(bare[0].actual, Some(100.0));
        assert_eq!(bare[0].upper_bound, Some(130.0));
        assert_eq!(bare[1].predicted, Some(118.5));
    }

    #[test]
    fn test_canonical_field_names_accepted() {
        let series = normalize_series(json!([
            {"date": "2025-03-01", "actual": 1, "predicted": 2, "upperBound": 3, "lowerBound": 0.5}
        ]))
        .unwrap();

        assert_eq!(series[0].actual, Some(1.0));
        assert_eq!(series[0].predicted, Some(2.0));
        assert_eq!(series[0].upper_bound, Some(3.0));
        assert_eq!(series[0].lower_bound, Some(0.5));
    }

    #[test]
    fn test_missing_date_is_parse_error() {
        let err = normalize_series(json!([{"actual_sales": 1}])).unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));

        let err = normalize_series(json!({"data": [{"date": null, "actual_sales": 1}]})).unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));

        let err = normalize_series(json!([{"date": "someday"}])).unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
    }

    #[test]
    fn test_unknown_shapes_rejected() {
        for payload in [
            json!({"rows": []}),
            json!({"data": null}),
            json!("2025-01-01"),
            json!([1, 2, 3]),
            json!(null),
        ] {
            let err = normalize_series(payload).unwrap_err();
            assert!(matches!(err, DataError::Parse(_)));
        }
    }

    #[test]
    fn test_non_numeric_values_dropped() {
        let series = normalize_series(json!([
            {"date": "2025-01-01", "actual_sales": "n/a", "predicted_sales": null, "upper_bound": true},
            {"date": "2025-01-02", "actual_sales": "NaN", "predicted_sales": "inf"}
        ]))
        .unwrap();

        for point in &series {
            assert_eq!(point.actual, None);
            assert_eq!(point.predicted, None);
            assert_eq!(point.upper_bound, None);
        }
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        let series = normalize_series(json!([
            {"date": "2025-03-01", "actual_sales": 3},
            {"date": "2025-01-01", "actual_sales": 1},
            {"date": "2025-03-01", "actual_sales": 30}
        ]))
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, date("2025-01-01"));
        assert_eq!(series[1].actual, Some(30.0));
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(parse_date("2025-04-09"), Some(date("2025-04-09")));
        assert_eq!(parse_date("2025-04"), Some(date("2025-04-01")));
        assert_eq!(parse_date("2025-04-09T10:15:00Z"), Some(date("2025-04-09")));
        assert_eq!(parse_date("2025-04-09T10:15:00.123"), Some(date("2025-04-09")));
        assert_eq!(parse_date("2025-04-09 10:15:00"), Some(date("2025-04-09")));
        assert_eq!(parse_date("April"), None);
        assert_eq!(parse_date("2025-13"), None);
    }

    #[test]
    fn test_lookup_shapes() {
        let labels = normalize_lookup(
            Dimension::Sector,
            json!([{"sector": "office"}, {"sector": " home-owner "}, {"sector": "office"}, {"sector": ""}]),
        )
        .unwrap();
        assert_eq!(labels, vec!["office".to_string(), "home-owner".to_string()]);

        let labels = normalize_lookup(Dimension::Region, json!({"data": ["chessington"]})).unwrap();
        assert_eq!(labels, vec!["chessington".to_string()]);

        let err = normalize_lookup(Dimension::Region, json!([{"sector": "office"}])).unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
    }

    #[test]
    fn test_kpi_and_narrative_shapes() {
        assert!(normalize_kpi(json!([])).is_err());
        assert!(normalize_narrative(json!("text")).is_err());

        let narrative = normalize_narrative(json!({
            "narrative": "Steady growth.",
            "generated_at": "2025-05-01T00:00:00Z",
            "execution_id": "abc"
        }))
        .unwrap();
        assert_eq!(narrative.execution_id, "abc");
    }
}
