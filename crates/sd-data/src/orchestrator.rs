//! Translates filter selections into provider calls

use chrono::{Local, Months, NaiveDate};
use sd_core::{Dimension, FilterSelection, Granularity, TimeSeriesPoint};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::model::{DashboardData, KpiSnapshot, Narrative};
use crate::normalize::{normalize_kpi, normalize_lookup, normalize_narrative, normalize_series};
use crate::sources::AnalyticsProvider;
use crate::DataError;

pub const KPI_PATH: &str = "/api/v1/analysis/kpi";
pub const NARRATIVE_PATH: &str = "/api/v1/analytics/narative";
pub const SERIES_PATH: &str = "/api/v1/analytics/actual-vs-predicted";

/// Lookup endpoint for a dimension's option list
pub fn lookup_path(dimension: Dimension) -> String {
    format!("/api/v1/analysis/{}", dimension.as_str())
}

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Serialize)]
struct KpiRequest<'a> {
    metric: &'static str,
    period: &'static str,
    comparison_type: &'static str,
    current_date: String,
    sector: &'a str,
    region: &'a str,
    service: &'a str,
    include_trend: bool,
}

#[derive(Debug, Serialize)]
struct NarrativeRequest<'a> {
    current_date: String,
    sector: &'a str,
    region: &'a str,
    service: &'a str,
}

#[derive(Debug, Serialize)]
struct SeriesRequest<'a> {
    start_date: String,
    end_date: String,
    aggregation: &'static str,
    sector: &'a str,
    region: &'a str,
    service: &'a str,
}

/// Issues the provider calls for a selection and normalizes the results.
///
/// Every call is bounded by the configured request timeout.
#[derive(Clone)]
pub struct FetchOrchestrator {
    provider: Arc<dyn AnalyticsProvider>,
    request_timeout: Duration,
    today: Option<NaiveDate>,
}

impl FetchOrchestrator {
    /// Create a new orchestrator over `provider`
    pub fn new(provider: Arc<dyn AnalyticsProvider>, config: &ProviderConfig) -> Self {
        Self::with_timeout(provider, config.request_timeout)
    }

    pub fn with_timeout(provider: Arc<dyn AnalyticsProvider>, request_timeout: Duration) -> Self {
        Self {
            provider,
            request_timeout,
            today: None,
        }
    }

    /// Fix the date used for request ranges instead of the local current day
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    async fn bounded<F>(&self, path: &str, call: F) -> Result<Value, DataError>
    where
        F: Future<Output = Result<Value, DataError>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(path, timeout = ?self.request_timeout, "provider call timed out");
                Err(DataError::Timeout {
                    path: path.to_string(),
                    after: self.request_timeout,
                })
            }
        }
    }

    /// Fetch the month-on-month KPI snapshot
    pub async fn fetch_kpi(&self, selection: &FilterSelection) -> Result<KpiSnapshot, DataError> {
        let request = KpiRequest {
            metric: "sales",
            period: "month",
            comparison_type: "sequential",
            current_date: self.today().format(DATE_FORMAT).to_string(),
            sector: dim(selection, Dimension::Sector),
            region: dim(selection, Dimension::Region),
            service: dim(selection, Dimension::Service),
            include_trend: false,
        };
        let body = self
            .bounded(KPI_PATH, self.provider.post_json(KPI_PATH, to_value(&request)?))
            .await?;
        normalize_kpi(body)
    }

    /// Fetch the narrative text block
    pub async fn fetch_narrative(&self, selection: &FilterSelection) -> Result<Narrative, DataError> {
        let request = NarrativeRequest {
            current_date: self.today().format(DATE_FORMAT).to_string(),
            sector: dim(selection, Dimension::Sector),
            region: dim(selection, Dimension::Region),
            service: dim(selection, Dimension::Service),
        };
        let body = self
            .bounded(
                NARRATIVE_PATH,
                self.provider.post_json(NARRATIVE_PATH, to_value(&request)?),
            )
            .await?;
        normalize_narrative(body)
    }

    /// Fetch one actual-vs-predicted series, from a year back to two months ahead
    pub async fn fetch_series(
        &self,
        selection: &FilterSelection,
        granularity: Granularity,
    ) -> Result<Vec<TimeSeriesPoint>, DataError> {
        let today = self.today();
        let start = today.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN);
        let end = today.checked_add_months(Months::new(2)).unwrap_or(NaiveDate::MAX);

        let request = SeriesRequest {
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: end.format(DATE_FORMAT).to_string(),
            aggregation: granularity.as_str(),
            sector: dim(selection, Dimension::Sector),
            region: dim(selection, Dimension::Region),
            service: dim(selection, Dimension::Service),
        };
        let body = self
            .bounded(SERIES_PATH, self.provider.post_json(SERIES_PATH, to_value(&request)?))
            .await?;
        let series = normalize_series(body)?;
        debug!(%granularity, points = series.len(), "series normalized");
        Ok(series)
    }

    /// Fetch everything the dashboard shows for `selection`.
    ///
    /// The four calls run concurrently. Any one failing fails the whole
    /// selection.
    pub async fn fetch_dashboard(&self, selection: &FilterSelection) -> Result<DashboardData, DataError> {
        info!(%selection, provider = self.provider_name(), "Loading dashboard");

        let result = tokio::try_join!(
            self.fetch_kpi(selection),
            self.fetch_narrative(selection),
            self.fetch_series(selection, Granularity::Monthly),
            self.fetch_series(selection, Granularity::Daily),
        );

        match result {
            Ok((kpi, narrative, monthly, daily)) => {
                info!(
                    %selection,
                    monthly = monthly.len(),
                    daily = daily.len(),
                    "Dashboard loaded"
                );
                Ok(DashboardData {
                    kpi,
                    narrative,
                    monthly,
                    daily,
                })
            }
            Err(e) => {
                warn!(%selection, error = %e, "Failed to load dashboard");
                Err(e)
            }
        }
    }

    /// Fetch the option list for a dimension
    pub async fn fetch_lookup(&self, dimension: Dimension) -> Result<Vec<String>, DataError> {
        let path = lookup_path(dimension);
        let body = self.bounded(&path, self.provider.get_json(&path)).await?;
        let labels = normalize_lookup(dimension, body)?;
        info!(%dimension, count = labels.len(), "Loaded lookup");
        Ok(labels)
    }
}

fn dim(selection: &FilterSelection, dimension: Dimension) -> &str {
    selection.get(dimension).unwrap_or("")
}

fn to_value<T: Serialize>(request: &T) -> Result<Value, DataError> {
    serde_json::to_value(request).map_err(|e| DataError::Parse(format!("failed to encode request: {}", e)))
}
