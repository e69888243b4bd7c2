//! Display window selection over canonical series

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::series::SeriesField;
use crate::ValidationError;

mod windower;

pub use windower::{window, window_at, WindowBounds};

/// Calendar period a window counts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowUnit {
    Day,
    Month,
}

/// Which side of the anchor a window extends to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Backward,
    Forward,
}

/// Reference date the window boundaries are computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    /// Latest date among qualifying points
    LatestData,
    /// The current day or month
    Today,
    /// Earliest qualifying date (forward windows only)
    EarliestQualifying,
}

/// A validated window specification. `count` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowSpec {
    unit: WindowUnit,
    count: NonZeroU32,
    direction: Direction,
    anchor: Anchor,
    required: Option<SeriesField>,
}

impl WindowSpec {
    /// Create a window specification
    pub fn new(
        unit: WindowUnit,
        count: i64,
        direction: Direction,
        anchor: Anchor,
    ) -> Result<Self, ValidationError> {
        let count = u32::try_from(count)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(ValidationError::NonPositiveCount(count))?;

        if direction == Direction::Backward && anchor == Anchor::EarliestQualifying {
            return Err(ValidationError::UnsupportedAnchor { direction, anchor });
        }

        Ok(Self {
            unit,
            count,
            direction,
            anchor,
            required: None,
        })
    }

    /// The last `count` months up to the latest data point
    pub fn last_months(count: i64) -> Result<Self, ValidationError> {
        Self::new(WindowUnit::Month, count, Direction::Backward, Anchor::LatestData)
    }

    /// The last `count` days up to the latest data point
    pub fn last_days(count: i64) -> Result<Self, ValidationError> {
        Self::new(WindowUnit::Day, count, Direction::Backward, Anchor::LatestData)
    }

    /// Only points carrying `field` qualify
    pub fn with_required(mut self, field: SeriesField) -> Self {
        self.required = Some(field);
        self
    }

    /// Same shape with a different period count
    pub fn with_count(self, count: i64) -> Result<Self, ValidationError> {
        let spec = Self::new(self.unit, count, self.direction, self.anchor)?;
        Ok(Self {
            required: self.required,
            ..spec
        })
    }

    pub fn unit(&self) -> WindowUnit {
        self.unit
    }

    pub fn count(&self) -> u32 {
        self.count.get()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn required(&self) -> Option<SeriesField> {
        self.required
    }

    /// Human readable description, e.g. "Last 6 months"
    pub fn label(&self) -> String {
        let side = match self.direction {
            Direction::Backward => "Last",
            Direction::Forward => "Next",
        };
        let unit = match (self.unit, self.count()) {
            (WindowUnit::Day, 1) => "day",
            (WindowUnit::Day, _) => "days",
            (WindowUnit::Month, 1) => "month",
            (WindowUnit::Month, _) => "months",
        };
        format!("{} {} {}", side, self.count(), unit)
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.unit {
            WindowUnit::Day => 'd',
            WindowUnit::Month => 'm',
        };
        write!(f, "{}{}", self.count(), suffix)
    }
}

/// Parses time-range presets such as `6m` or `30d` into backward windows
/// anchored at the latest data point.
impl FromStr for WindowSpec {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unknown = || ValidationError::UnknownPreset(s.to_string());

        let (digits, unit) = match s.char_indices().last() {
            Some((idx, 'm')) | Some((idx, 'M')) => (&s[..idx], WindowUnit::Month),
            Some((idx, 'd')) | Some((idx, 'D')) => (&s[..idx], WindowUnit::Day),
            _ => return Err(unknown()),
        };
        let count: i64 = digits.parse().map_err(|_| unknown())?;

        Self::new(unit, count, Direction::Backward, Anchor::LatestData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_count_rejected() {
        assert_eq!(
            WindowSpec::last_months(0),
            Err(ValidationError::NonPositiveCount(0))
        );
        assert_eq!(
            WindowSpec::last_days(-3),
            Err(ValidationError::NonPositiveCount(-3))
        );
    }

    #[test]
    fn test_backward_earliest_rejected() {
        let err = WindowSpec::new(
            WindowUnit::Month,
            3,
            Direction::Backward,
            Anchor::EarliestQualifying,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedAnchor { .. }));
    }

    #[test]
    fn test_presets() {
        let spec: WindowSpec = "6m".parse().unwrap();
        assert_eq!(spec.unit(), WindowUnit::Month);
        assert_eq!(spec.count(), 6);
        assert_eq!(spec.direction(), Direction::Backward);
        assert_eq!(spec.anchor(), Anchor::LatestData);
        assert_eq!(spec.to_string(), "6m");

        let spec: WindowSpec = "360d".parse().unwrap();
        assert_eq!(spec.unit(), WindowUnit::Day);
        assert_eq!(spec.label(), "Last 360 days");

        assert!(matches!("12w".parse::<WindowSpec>(), Err(ValidationError::UnknownPreset(_))));
        assert!(matches!("m".parse::<WindowSpec>(), Err(ValidationError::UnknownPreset(_))));
        assert_eq!("0d".parse::<WindowSpec>(), Err(ValidationError::NonPositiveCount(0)));
    }

    #[test]
    fn test_with_count_keeps_required_field() {
        let spec = WindowSpec::last_months(12)
            .unwrap()
            .with_required(SeriesField::Actual)
            .with_count(3)
            .unwrap();

        assert_eq!(spec.count(), 3);
        assert_eq!(spec.required(), Some(SeriesField::Actual));
    }
}
