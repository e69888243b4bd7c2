//! Window selection algorithm

use chrono::{Datelike, Days, Local, Months, NaiveDate};

use super::{Anchor, Direction, WindowSpec, WindowUnit};
use crate::series::TimeSeriesPoint;

/// Inclusive calendar bounds of a window.
///
/// The window starts at 00:00:00 on `start` and ends at 23:59:59 on `end`.
/// Month windows always start on day 1 and end on the last day of a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WindowBounds {
    /// Compute the bounds spanning `spec.count()` whole periods from `anchor`
    pub fn from_anchor(anchor: NaiveDate, spec: &WindowSpec) -> Self {
        let span = spec.count() - 1;
        match spec.direction() {
            Direction::Backward => {
                let end = period_end(anchor, spec.unit());
                let start = shift_back(period_start(anchor, spec.unit()), spec.unit(), span);
                Self { start, end }
            }
            Direction::Forward => {
                let start = period_start(anchor, spec.unit());
                let last = shift_forward(start, spec.unit(), span);
                Self {
                    start,
                    end: period_end(last, spec.unit()),
                }
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Select the display window of `series` relative to the local current day.
pub fn window(series: &[TimeSeriesPoint], spec: &WindowSpec) -> Vec<TimeSeriesPoint> {
    window_at(series, spec, Local::now().date_naive())
}

/// Select the display window of `series`, with `today` supplied by the caller.
///
/// Returns the qualifying points inside the window, ascending by date and
/// otherwise untouched. Gaps are preserved. An empty qualifying set yields an
/// empty window.
pub fn window_at(
    series: &[TimeSeriesPoint],
    spec: &WindowSpec,
    today: NaiveDate,
) -> Vec<TimeSeriesPoint> {
    let qualifying: Vec<&TimeSeriesPoint> = series
        .iter()
        .filter(|point| qualifies(point, spec, today))
        .collect();

    let anchor = match resolve_anchor(&qualifying, spec, today) {
        Some(anchor) => anchor,
        None => return Vec::new(),
    };
    let bounds = WindowBounds::from_anchor(anchor, spec);

    let mut selected: Vec<TimeSeriesPoint> = qualifying
        .into_iter()
        .filter(|point| bounds.contains(point.date))
        .cloned()
        .collect();
    selected.sort_by_key(|point| point.date);
    selected
}

fn qualifies(point: &TimeSeriesPoint, spec: &WindowSpec, today: NaiveDate) -> bool {
    if let Some(field) = spec.required() {
        if point.value(field).is_none() {
            return false;
        }
    }

    match (spec.direction(), spec.anchor()) {
        (_, Anchor::LatestData) => true,
        (Direction::Backward, _) => point.date <= period_end(today, spec.unit()),
        (Direction::Forward, _) => point.date >= period_start(today, spec.unit()),
    }
}

fn resolve_anchor(
    qualifying: &[&TimeSeriesPoint],
    spec: &WindowSpec,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let latest = qualifying.iter().map(|p| p.date).max()?;
    let anchor = match (spec.direction(), spec.anchor()) {
        (Direction::Backward, _) | (Direction::Forward, Anchor::LatestData) => latest,
        (Direction::Forward, Anchor::Today) => today,
        (Direction::Forward, Anchor::EarliestQualifying) => {
            qualifying.iter().map(|p| p.date).min()?
        }
    };
    Some(anchor)
}

fn period_start(date: NaiveDate, unit: WindowUnit) -> NaiveDate {
    match unit {
        WindowUnit::Day => date,
        WindowUnit::Month => date.with_day(1).unwrap_or(date),
    }
}

fn period_end(date: NaiveDate, unit: WindowUnit) -> NaiveDate {
    match unit {
        WindowUnit::Day => date,
        WindowUnit::Month => period_start(date, unit)
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX),
    }
}

fn shift_back(date: NaiveDate, unit: WindowUnit, periods: u32) -> NaiveDate {
    let shifted = match unit {
        WindowUnit::Day => date.checked_sub_days(Days::new(u64::from(periods))),
        WindowUnit::Month => date.checked_sub_months(Months::new(periods)),
    };
    shifted.unwrap_or(NaiveDate::MIN)
}

fn shift_forward(date: NaiveDate, unit: WindowUnit, periods: u32) -> NaiveDate {
    let shifted = match unit {
        WindowUnit::Day => date.checked_add_days(Days::new(u64::from(periods))),
        WindowUnit::Month => date.checked_add_months(Months::new(periods)),
    };
    shifted.unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesField;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn actual(s: &str, value: f64) -> TimeSeriesPoint {
        TimeSeriesPoint::new(date(s)).with_actual(value)
    }

    fn predicted(s: &str, value: f64) -> TimeSeriesPoint {
        TimeSeriesPoint::new(date(s)).with_predicted(value)
    }

    fn dates(points: &[TimeSeriesPoint]) -> Vec<String> {
        points.iter().map(|p| p.date.to_string()).collect()
    }

    #[test]
    fn test_last_two_months_excludes_january() {
        let series = vec![
            actual("2025-01-05", 100.0),
            actual("2025-02-10", 120.0),
            actual("2025-03-20", 150.0),
        ];
        let spec = WindowSpec::last_months(2).unwrap();

        let result = window_at(&series, &spec, date("2020-01-01"));
        assert_eq!(result, vec![series[1].clone(), series[2].clone()]);
    }

    #[test]
    fn test_empty_series() {
        let today = date("2025-06-15");
        for spec in [
            WindowSpec::last_months(3).unwrap(),
            WindowSpec::last_days(7).unwrap(),
            WindowSpec::new(WindowUnit::Day, 7, Direction::Forward, Anchor::Today).unwrap(),
            WindowSpec::new(WindowUnit::Month, 3, Direction::Forward, Anchor::EarliestQualifying)
                .unwrap(),
        ] {
            assert!(window_at(&[], &spec, today).is_empty());
        }
    }

    #[test]
    fn test_month_window_uses_whole_calendar_months() {
        // Anchor on the 2nd still pulls in every day of the earlier month.
        let series = vec![
            actual("2024-12-31", 1.0),
            actual("2025-01-01", 2.0),
            actual("2025-01-31", 3.0),
            actual("2025-02-02", 4.0),
        ];
        let spec = WindowSpec::last_months(2).unwrap();

        let result = window_at(&series, &spec, date("2025-02-02"));
        assert_eq!(dates(&result), vec!["2025-01-01", "2025-01-31", "2025-02-02"]);

        let bounds = WindowBounds::from_anchor(date("2025-02-02"), &spec);
        assert_eq!(bounds.start, date("2025-01-01"));
        assert_eq!(bounds.end, date("2025-02-28"));
    }

    #[test]
    fn test_final_month_matches_latest_point_and_months_bounded() {
        let series: Vec<TimeSeriesPoint> = (1..=12)
            .flat_map(|m| {
                vec![
                    actual(&format!("2024-{:02}-01", m), m as f64),
                    actual(&format!("2024-{:02}-15", m), m as f64),
                ]
            })
            .collect();

        for n in 1..=14 {
            let spec = WindowSpec::last_months(n).unwrap();
            let result = window_at(&series, &spec, date("2030-01-01"));

            let last = result.last().unwrap();
            assert_eq!(last.date.month(), 12);
            assert_eq!(last.date.year(), 2024);

            let mut months: Vec<u32> = result.iter().map(|p| p.date.month()).collect();
            months.dedup();
            assert!(months.len() <= n as usize);
            assert!(months.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_day_window_midnight_boundaries() {
        let series = vec![
            actual("2025-03-03", 1.0),
            actual("2025-03-04", 2.0),
            actual("2025-03-10", 3.0),
        ];
        let spec = WindowSpec::last_days(7).unwrap();

        let result = window_at(&series, &spec, date("2025-01-01"));
        assert_eq!(dates(&result), vec!["2025-03-04", "2025-03-10"]);
    }

    #[test]
    fn test_gaps_preserved_and_output_sorted() {
        let series = vec![
            actual("2025-03-10", 3.0),
            actual("2025-03-01", 1.0),
            actual("2025-03-05", 2.0),
        ];
        let spec = WindowSpec::last_days(30).unwrap();

        let result = window_at(&series, &spec, date("2025-03-10"));
        assert_eq!(dates(&result), vec!["2025-03-01", "2025-03-05", "2025-03-10"]);
    }

    #[test]
    fn test_single_point() {
        let series = vec![actual("2025-05-17", 9.0)];
        let spec = WindowSpec::last_months(6).unwrap();

        let result = window_at(&series, &spec, date("2025-06-01"));
        assert_eq!(result, series);
    }

    #[test]
    fn test_idempotent() {
        let series = vec![
            actual("2025-01-05", 100.0),
            predicted("2025-04-01", 160.0),
            actual("2025-02-10", 120.0),
        ];
        let spec = WindowSpec::last_months(3).unwrap();
        let today = date("2025-03-01");

        let first = window_at(&series, &spec, today);
        let second = window_at(&series, &spec, today);
        assert_eq!(first, second);
        assert_eq!(window_at(&first, &spec, today), first);
    }

    #[test]
    fn test_forward_from_today_days() {
        let series = vec![
            predicted("2025-06-14", 1.0),
            predicted("2025-06-15", 2.0),
            predicted("2025-06-21", 3.0),
            predicted("2025-06-22", 4.0),
        ];
        let spec = WindowSpec::new(WindowUnit::Day, 7, Direction::Forward, Anchor::Today).unwrap();

        let result = window_at(&series, &spec, date("2025-06-15"));
        assert_eq!(dates(&result), vec!["2025-06-15", "2025-06-21"]);
    }

    #[test]
    fn test_forward_from_earliest_qualifying_month() {
        let series = vec![
            actual("2025-05-01", 10.0),
            predicted("2025-05-01", 11.0),
            predicted("2025-08-01", 12.0),
            predicted("2025-09-01", 13.0),
            predicted("2025-11-01", 14.0),
        ];
        let spec = WindowSpec::new(
            WindowUnit::Month,
            3,
            Direction::Forward,
            Anchor::EarliestQualifying,
        )
        .unwrap()
        .with_required(SeriesField::Predicted);

        // Current month is June, so the earliest qualifying month is August.
        let result = window_at(&series, &spec, date("2025-06-20"));
        assert_eq!(dates(&result), vec!["2025-08-01", "2025-09-01"]);
    }

    #[test]
    fn test_backward_to_today_requires_field() {
        let series = vec![
            actual("2025-03-01", 1.0),
            actual("2025-04-01", 2.0),
            predicted("2025-05-01", 3.0),
            actual("2025-07-01", 4.0),
        ];
        let spec = WindowSpec::new(WindowUnit::Month, 12, Direction::Backward, Anchor::Today)
            .unwrap()
            .with_required(SeriesField::Actual);

        let result = window_at(&series, &spec, date("2025-05-20"));
        assert_eq!(dates(&result), vec!["2025-03-01", "2025-04-01"]);
    }

    #[test]
    fn test_huge_count_saturates() {
        let series = vec![actual("2025-01-05", 1.0), actual("1999-02-10", 2.0)];
        let spec = WindowSpec::last_months(i64::from(u32::MAX)).unwrap();

        let result = window_at(&series, &spec, date("2025-01-05"));
        assert_eq!(result.len(), 2);
    }
}
