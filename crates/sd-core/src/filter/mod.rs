use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

mod state;
mod subscriber;

pub use state::FilterState;
pub use subscriber::FilterSubscriber;

/// Filter dimensions exposed by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Sector,
    Region,
    Service,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Sector, Dimension::Region, Dimension::Service];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Sector => "sector",
            Dimension::Region => "region",
            Dimension::Service => "service",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sector" | "sectors" => Ok(Dimension::Sector),
            "region" | "regions" => Ok(Dimension::Region),
            "service" | "services" => Ok(Dimension::Service),
            other => Err(ValidationError::UnknownDimension(other.to_string())),
        }
    }
}

/// The user's dimension selection. `None` means "All".
///
/// Equality and hashing are structural, so equal selections always produce
/// equal cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSelection {
    pub sector: Option<String>,
    pub region: Option<String>,
    pub service: Option<String>,
}

impl FilterSelection {
    /// Get the selected value for a dimension
    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Sector => self.sector.as_deref(),
            Dimension::Region => self.region.as_deref(),
            Dimension::Service => self.service.as_deref(),
        }
    }

    /// Return a copy with one dimension replaced. Blank values collapse to `None`.
    pub fn with(mut self, dimension: Dimension, value: Option<String>) -> Self {
        self.set(dimension, value);
        self
    }

    pub(crate) fn set(&mut self, dimension: Dimension, value: Option<String>) {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        match dimension {
            Dimension::Sector => self.sector = value,
            Dimension::Region => self.region = value,
            Dimension::Service => self.service = value,
        }
    }

    /// Whether at least one dimension is selected
    pub fn has_any(&self) -> bool {
        Dimension::ALL.iter().any(|d| self.get(*d).is_some())
    }
}

impl fmt::Display for FilterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = Dimension::ALL
            .iter()
            .map(|d| format!("{}={}", d, self.get(*d).unwrap_or("*")))
            .collect();
        f.write_str(&parts.join(","))
    }
}

/// Snapshot passed to subscribers on every filter change
#[derive(Debug, Clone, PartialEq)]
pub struct FilterContext {
    pub selection: FilterSelection,
    pub interacted: bool,
    pub fetch_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_mean_all() {
        let selection = FilterSelection::default()
            .with(Dimension::Sector, Some("  ".to_string()))
            .with(Dimension::Region, Some("south-west".to_string()));

        assert_eq!(selection.sector, None);
        assert_eq!(selection.get(Dimension::Region), Some("south-west"));
        assert!(selection.has_any());
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!("Region".parse::<Dimension>().unwrap(), Dimension::Region);
        assert_eq!("services".parse::<Dimension>().unwrap(), Dimension::Service);
        assert!("colour".parse::<Dimension>().is_err());
    }

    #[test]
    fn test_display() {
        let selection = FilterSelection::default().with(Dimension::Service, Some("plastering".into()));
        assert_eq!(selection.to_string(), "sector=*,region=*,service=plastering");
    }
}
