//! Provider response types

use sd_core::TimeSeriesPoint;
use serde::{Deserialize, Serialize};

use crate::normalize::lenient_number;

/// One side of a month-on-month comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodValue {
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Change between the two compared periods
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiChange {
    #[serde(default, deserialize_with = "lenient_number")]
    pub absolute: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub direction: Option<String>,
}

/// Month-on-month KPI snapshot. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub current_period: Option<PeriodValue>,
    #[serde(default)]
    pub comparison_period: Option<PeriodValue>,
    #[serde(default)]
    pub change: Option<KpiChange>,
    #[serde(default)]
    pub trend: Option<serde_json::Value>,
    #[serde(default)]
    pub filters: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub execution_timestamp: Option<String>,
}

impl KpiSnapshot {
    /// Snapshot shown when nothing has loaded
    pub fn empty() -> Self {
        Self {
            success: Some(false),
            metric: Some("sales".to_string()),
            current_period: Some(PeriodValue {
                value: Some(0.0),
                ..PeriodValue::default()
            }),
            comparison_period: Some(PeriodValue {
                value: Some(0.0),
                ..PeriodValue::default()
            }),
            change: Some(KpiChange {
                absolute: Some(0.0),
                percentage: Some(0.0),
                direction: None,
            }),
            ..Self::default()
        }
    }

    pub fn current_value(&self) -> Option<f64> {
        self.current_period.as_ref().and_then(|p| p.value)
    }

    pub fn comparison_value(&self) -> Option<f64> {
        self.comparison_period.as_ref().and_then(|p| p.value)
    }

    pub fn change_percentage(&self) -> Option<f64> {
        self.change.as_ref().and_then(|c| c.percentage)
    }
}

/// Generated narrative text for a selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub execution_id: String,
}

/// Everything the sales page shows for one selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub kpi: KpiSnapshot,
    pub narrative: Narrative,
    pub monthly: Vec<TimeSeriesPoint>,
    pub daily: Vec<TimeSeriesPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kpi_tolerates_partial_payload() {
        let kpi: KpiSnapshot = serde_json::from_value(json!({
            "success": true,
            "current_period": {"value": "1250.5", "label": "May 2025"},
            "change": {"percentage": 12.5, "direction": "up", "absolute": null},
            "unknown_field": 1
        }))
        .unwrap();

        assert_eq!(kpi.current_value(), Some(1250.5));
        assert_eq!(kpi.comparison_value(), None);
        assert_eq!(kpi.change_percentage(), Some(12.5));
        assert_eq!(kpi.change.unwrap().absolute, None);
    }

    #[test]
    fn test_narrative_defaults() {
        let narrative: Narrative = serde_json::from_value(json!({"narrative": "Sales grew."})).unwrap();
        assert_eq!(narrative.narrative, "Sales grew.");
        assert!(narrative.execution_id.is_empty());
    }

    #[test]
    fn test_empty_kpi() {
        let kpi = KpiSnapshot::empty();
        assert_eq!(kpi.success, Some(false));
        assert_eq!(kpi.current_value(), Some(0.0));
    }
}
