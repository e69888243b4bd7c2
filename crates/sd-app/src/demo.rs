//! Demo mode
//! Serves synthetic sales data so the dashboard runs without a provider

use chrono::{Datelike, Days, Months, NaiveDate};
use sd_core::Dimension;
use sd_data::orchestrator::{lookup_path, KPI_PATH, NARRATIVE_PATH, SERIES_PATH};
use sd_data::{Route, StaticProvider};
use serde_json::{json, Value};
use std::time::Duration;

const SECTORS: [&str; 3] = ["food-and-beverage", "home-owner", "office"];
const REGIONS: [&str; 2] = ["chessington", "south-west"];
const SERVICES: [&str; 2] = ["heating-hot-water", "plastering"];

/// Simulated provider latency
const LATENCY: Duration = Duration::from_millis(250);

/// Build the demo provider around `today`
pub fn provider(today: NaiveDate) -> StaticProvider {
    let mut routes = vec![
        Route::get(lookup_path(Dimension::Sector)).json(labels("sector", &SECTORS)),
        Route::get(lookup_path(Dimension::Region)).json(labels("region", &REGIONS)),
        Route::get(lookup_path(Dimension::Service)).json(labels("service", &SERVICES)),
    ];

    // Each sector gets its own scale so filter changes are visible
    for (idx, sector) in SECTORS.iter().enumerate() {
        let scale = 0.6 + 0.3 * idx as f64;
        routes.push(Route::post(KPI_PATH).when("sector", *sector).json(kpi(today, scale)).delay(LATENCY));
        routes.push(
            Route::post(SERIES_PATH)
                .when("sector", *sector)
                .when("aggregation", "monthly")
                .json(monthly(today, scale))
                .delay(LATENCY),
        );
        routes.push(
            Route::post(SERIES_PATH)
                .when("sector", *sector)
                .when("aggregation", "daily")
                .json(daily(today, scale))
                .delay(LATENCY),
        );
    }

    routes.extend([
        Route::post(KPI_PATH).json(kpi(today, 1.0)).delay(LATENCY),
        Route::post(SERIES_PATH)
            .when("aggregation", "monthly")
            .json(monthly(today, 1.0))
            .delay(LATENCY),
        Route::post(SERIES_PATH)
            .when("aggregation", "daily")
            .json(daily(today, 1.0))
            .delay(LATENCY),
        Route::post(NARRATIVE_PATH)
            .json(json!({
                "narrative": "Sales are tracking close to forecast, with a seasonal lift expected over the next two months.",
                "generated_at": today.format("%Y-%m-%d").to_string(),
                "execution_id": "demo"
            }))
            .delay(LATENCY),
    ]);

    StaticProvider::new(routes)
}

fn labels(field: &str, values: &[&str]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|v| {
                let mut item = serde_json::Map::new();
                item.insert(field.to_string(), Value::from(*v));
                Value::Object(item)
            })
            .collect(),
    )
}

/// Seasonal monthly sales figure
fn monthly_sales(date: NaiveDate, scale: f64) -> f64 {
    let season = (f64::from(date.month0()) / 12.0 * std::f64::consts::TAU).sin();
    ((120_000.0 + 25_000.0 * season) * scale).round()
}

fn kpi(today: NaiveDate, scale: f64) -> Value {
    let current = monthly_sales(today, scale);
    let previous_date = today.checked_sub_months(Months::new(1)).unwrap_or(today);
    let previous = monthly_sales(previous_date, scale);
    let change = current - previous;

    json!({
        "success": true,
        "metric": "sales",
        "current_period": {"value": current, "period": "month", "label": today.format("%B %Y").to_string()},
        "comparison_period": {"value": previous, "period": "month", "label": previous_date.format("%B %Y").to_string()},
        "change": {
            "absolute": change,
            "percentage": if previous != 0.0 { change / previous * 100.0 } else { 0.0 },
            "direction": if change >= 0.0 { "up" } else { "down" }
        }
    })
}

fn monthly(today: NaiveDate, scale: f64) -> Value {
    let this_month = today.with_day(1).unwrap_or(today);
    let points: Vec<Value> = (-12i32..=2)
        .filter_map(|offset| {
            let date = if offset < 0 {
                this_month.checked_sub_months(Months::new(offset.unsigned_abs()))
            } else {
                this_month.checked_add_months(Months::new(offset.unsigned_abs()))
            }?;
            let predicted = monthly_sales(date, scale);
            let mut point = json!({
                "date": date.format("%Y-%m").to_string(),
                "predicted_sales": predicted,
                "upper_bound": (predicted * 1.1).round(),
                "lower_bound": (predicted * 0.9).round()
            });
            if offset < 0 {
                point["actual_sales"] = json!((predicted * (0.97 + 0.01 * f64::from(offset.rem_euclid(5)))).round());
            }
            Some(point)
        })
        .collect();

    json!({ "data": points, "aggregation": "monthly" })
}

fn daily(today: NaiveDate, scale: f64) -> Value {
    let start = today.checked_sub_days(Days::new(360)).unwrap_or(today);
    let points: Vec<Value> = (0u64..=420)
        .filter_map(|offset| {
            let date = start.checked_add_days(Days::new(offset))?;
            let base = monthly_sales(date, scale) / 30.0;
            let weekday = f64::from(date.weekday().num_days_from_monday());
            let predicted = (base * (1.1 - 0.04 * weekday)).round();

            let mut point = json!({ "date": date.format("%Y-%m-%d").to_string(), "pred_sale": predicted });
            if date < today {
                point["actual_sales"] = json!((predicted * (0.95 + 0.02 * f64::from((offset % 5) as u32))).round());
            }
            Some(point)
        })
        .collect();

    Value::Array(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_core::{FilterSelection, Granularity};
    use sd_data::FetchOrchestrator;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_demo_data_normalizes() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let orchestrator =
            FetchOrchestrator::with_timeout(Arc::new(provider(today)), Duration::from_secs(5)).with_today(today);

        let selection = FilterSelection::default().with(Dimension::Sector, Some("office".into()));
        let data = orchestrator.fetch_dashboard(&selection).await.unwrap();

        assert_eq!(data.monthly.len(), 15);
        assert!(data.monthly.iter().filter(|p| p.actual.is_some()).count() == 12);
        assert!(data.daily.iter().all(|p| p.predicted.is_some()));
        assert!(data.kpi.current_value().is_some());

        let regions = orchestrator.fetch_lookup(Dimension::Region).await.unwrap();
        assert_eq!(regions, vec!["chessington".to_string(), "south-west".to_string()]);

        let all = orchestrator
            .fetch_series(&FilterSelection::default(), Granularity::Daily)
            .await
            .unwrap();
        assert_eq!(all.len(), 421);
    }
}
