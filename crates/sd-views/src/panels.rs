//! Chart panels of the sales page

use chrono::NaiveDate;
use sd_core::{
    window_at, Anchor, Direction, Granularity, SeriesField, TimeSeriesPoint, ValidationError,
    WindowSpec, WindowUnit,
};
use sd_data::DashboardData;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The charts shown for a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanelKind {
    /// Monthly actual vs predicted
    Monthly,
    /// Daily actual vs predicted
    Daily,
    /// Past months with actual sales
    History,
    /// Upcoming months with predictions
    Forecast,
    /// Upcoming days with predictions
    DailyForecast,
}

impl PanelKind {
    pub const ALL: [PanelKind; 5] = [
        PanelKind::Monthly,
        PanelKind::Daily,
        PanelKind::History,
        PanelKind::Forecast,
        PanelKind::DailyForecast,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            PanelKind::Monthly => "monthly",
            PanelKind::Daily => "daily",
            PanelKind::History => "history",
            PanelKind::Forecast => "forecast",
            PanelKind::DailyForecast => "daily-forecast",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PanelKind::Monthly => "Actual vs Predicted (monthly)",
            PanelKind::Daily => "Actual vs Predicted (daily)",
            PanelKind::History => "Sales history",
            PanelKind::Forecast => "Sales forecast",
            PanelKind::DailyForecast => "Daily forecast",
        }
    }

    /// Which series the panel windows
    pub fn granularity(&self) -> Granularity {
        match self {
            PanelKind::Monthly | PanelKind::History | PanelKind::Forecast => Granularity::Monthly,
            PanelKind::Daily | PanelKind::DailyForecast => Granularity::Daily,
        }
    }

    /// Window the panel opens with
    pub fn default_window(&self) -> Result<WindowSpec, ValidationError> {
        let spec = match self {
            PanelKind::Monthly => WindowSpec::last_months(12)?,
            PanelKind::Daily => WindowSpec::last_days(360)?,
            PanelKind::History => {
                WindowSpec::new(WindowUnit::Month, 12, Direction::Backward, Anchor::Today)?
                    .with_required(SeriesField::Actual)
            }
            PanelKind::Forecast => WindowSpec::new(
                WindowUnit::Month,
                12,
                Direction::Forward,
                Anchor::EarliestQualifying,
            )?
            .with_required(SeriesField::Predicted),
            PanelKind::DailyForecast => {
                WindowSpec::new(WindowUnit::Day, 30, Direction::Forward, Anchor::Today)?
                    .with_required(SeriesField::Predicted)
            }
        };
        Ok(spec)
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PanelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        PanelKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == s)
            .ok_or(s)
    }
}

/// One chart and its current window
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPanel {
    kind: PanelKind,
    spec: WindowSpec,
}

impl ChartPanel {
    /// Create a new panel with its default window
    pub fn new(kind: PanelKind) -> Result<Self, ValidationError> {
        Ok(Self {
            kind,
            spec: kind.default_window()?,
        })
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    pub fn set_window(&mut self, spec: WindowSpec) {
        self.spec = spec;
    }

    /// Apply a range preset such as `6m` or `90d`, keeping the panel's
    /// direction, anchor and required field. The preset unit must match the
    /// panel's unit.
    pub fn set_range(&mut self, preset: &str) -> Result<(), ValidationError> {
        let parsed: WindowSpec = preset.parse()?;
        if parsed.unit() != self.spec.unit() {
            return Err(ValidationError::UnknownPreset(preset.trim().to_string()));
        }
        self.spec = self.spec.with_count(i64::from(parsed.count()))?;
        Ok(())
    }

    /// Select this panel's points from `data`
    pub fn render(&self, data: Option<&DashboardData>, today: NaiveDate) -> PanelView {
        let points = match data {
            Some(data) => {
                let series = match self.kind.granularity() {
                    Granularity::Monthly => &data.monthly,
                    Granularity::Daily => &data.daily,
                };
                window_at(series, &self.spec, today)
            }
            None => Vec::new(),
        };

        PanelView {
            kind: self.kind,
            title: self.kind.title(),
            range: self.spec.label(),
            points,
        }
    }
}

/// Panels of the sales page in display order
pub fn default_panels() -> Result<Vec<ChartPanel>, ValidationError> {
    PanelKind::ALL.iter().map(|kind| ChartPanel::new(*kind)).collect()
}

/// Rendered panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub kind: PanelKind,
    pub title: &'static str,
    pub range: String,
    pub points: Vec<TimeSeriesPoint>,
}
