//! Dashboard session: filters, cached data and panels for one user

use chrono::{DateTime, Local, NaiveDate, Utc};
use futures::future::{join_all, BoxFuture, FutureExt};
use parking_lot::RwLock;
use sd_core::{Dimension, FilterContext, FilterSelection, FilterState, FilterSubscriber, WindowSpec};
use sd_data::{
    CacheConfig, CacheEntry, CacheKey, CacheStore, DashboardData, DataError, FetchOrchestrator,
    KpiSnapshot, Narrative, PreferenceStore, QueryObserver, UserPreferences,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::panels::{default_panels, ChartPanel, PanelKind, PanelView};
use crate::status::StatusLine;
use crate::ViewError;

/// Keeps the dashboard observer on the key of the current filter selection
struct FilterBinding {
    observer: Arc<QueryObserver<DashboardData>>,
    orchestrator: FetchOrchestrator,
}

impl FilterSubscriber for FilterBinding {
    fn on_filter_change(&self, context: &FilterContext) {
        self.observer.set_key(CacheKey::dashboard(context.selection.clone()));
        self.observer.set_enabled(context.fetch_enabled);
        self.observer.current(dashboard_fetcher(&self.orchestrator));
    }
}

fn dashboard_fetcher(
    orchestrator: &FetchOrchestrator,
) -> impl FnOnce(&CacheKey) -> BoxFuture<'static, Result<DashboardData, DataError>> {
    let orchestrator = orchestrator.clone();
    move |key: &CacheKey| {
        let selection = key.selection.clone();
        async move { orchestrator.fetch_dashboard(&selection).await }.boxed()
    }
}

/// Everything needed to draw the sales page
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub selection: FilterSelection,
    pub status: StatusLine,
    /// Message of the last failure, shown next to the retained data
    pub error: Option<String>,
    /// Data belongs to a previous selection
    pub is_placeholder: bool,
    /// Nothing has loaded yet; draw the skeleton
    pub is_empty: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub kpi: KpiSnapshot,
    pub narrative: Option<Narrative>,
    pub panels: Vec<PanelView>,
}

/// One user's dashboard.
///
/// Filter changes flow through [`FilterState`] to the dashboard observer,
/// which reads the shared [`CacheStore`].
pub struct DashboardSession {
    filters: Arc<FilterState>,
    orchestrator: FetchOrchestrator,
    store: Arc<CacheStore>,
    observer: Arc<QueryObserver<DashboardData>>,
    preferences: Arc<dyn PreferenceStore>,
    panels: RwLock<Vec<ChartPanel>>,
    lookup_config: CacheConfig,
    today: Option<NaiveDate>,
    _binding: Arc<FilterBinding>,
}

impl DashboardSession {
    /// Create a new session
    pub fn new(
        orchestrator: FetchOrchestrator,
        store: Arc<CacheStore>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Result<Self, ViewError> {
        let filters = Arc::new(FilterState::new());
        let observer = Arc::new(QueryObserver::new(
            store.dashboards.clone(),
            CacheKey::dashboard(filters.current()),
            CacheConfig::dashboard(),
        ));

        let binding = Arc::new(FilterBinding {
            observer: observer.clone(),
            orchestrator: orchestrator.clone(),
        });
        filters.add_subscriber(binding.clone());

        Ok(Self {
            filters,
            orchestrator,
            store,
            observer,
            preferences,
            panels: RwLock::new(default_panels()?),
            lookup_config: CacheConfig::lookups(),
            today: None,
            _binding: binding,
        })
    }

    /// Fix the date panels are windowed against
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn filters(&self) -> &Arc<FilterState> {
        &self.filters
    }

    /// Load preferences and lookup lists, then seed the initial dashboard.
    ///
    /// Failures here are logged and leave the session usable: missing
    /// preferences start from "All", missing lookups leave options empty and
    /// a failed initial load leaves the dashboard empty.
    pub async fn start(&self) -> FilterSelection {
        let preferences = match self.preferences.load().await {
            Ok(found) => found.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load preferences: {}", e);
                UserPreferences::default()
            }
        };

        let defaults = preferences.defaults();
        self.filters.initialize(defaults.clone());

        self.load_lookups().await;

        match self.orchestrator.fetch_dashboard(&defaults).await {
            Ok(data) => {
                self.store
                    .dashboards
                    .set_query_data(&CacheKey::dashboard(defaults.clone()), data);
            }
            Err(e) => warn!(selection = %defaults, "Initial dashboard load failed: {}", e),
        }

        info!(selection = %defaults, "Session started");
        defaults
    }

    async fn load_lookups(&self) {
        let loads = Dimension::ALL.iter().map(|dimension| {
            let dimension = *dimension;
            let orchestrator = self.orchestrator.clone();
            async move {
                let result = self
                    .store
                    .lookups
                    .fetch(
                        &CacheKey::lookup(dimension),
                        move || async move { orchestrator.fetch_lookup(dimension).await },
                        &self.lookup_config,
                    )
                    .await;
                (dimension, result)
            }
        });

        for (dimension, result) in join_all(loads).await {
            match result {
                Ok(options) => self.filters.set_options(dimension, options.to_vec()),
                Err(e) => warn!(%dimension, "Failed to load options: {}", e),
            }
        }
    }

    /// Set one filter dimension. `None` or a blank value selects "All".
    pub fn set_filter(&self, dimension: Dimension, value: Option<String>) {
        self.filters.set_dimension(dimension, value);
    }

    pub fn options(&self, dimension: Dimension) -> Vec<String> {
        self.filters.options(dimension)
    }

    /// Apply a range preset to a panel
    pub fn set_panel_range(&self, kind: PanelKind, preset: &str) -> Result<WindowSpec, ViewError> {
        let mut panels = self.panels.write();
        let panel = panels
            .iter_mut()
            .find(|p| p.kind() == kind)
            .ok_or_else(|| ViewError::UnknownPanel(kind.to_string()))?;
        panel.set_range(preset)?;
        Ok(*panel.spec())
    }

    /// Replace a panel's window
    pub fn set_panel_window(&self, kind: PanelKind, spec: WindowSpec) -> Result<(), ViewError> {
        let mut panels = self.panels.write();
        let panel = panels
            .iter_mut()
            .find(|p| p.kind() == kind)
            .ok_or_else(|| ViewError::UnknownPanel(kind.to_string()))?;
        panel.set_window(spec);
        Ok(())
    }

    /// Store the current selection as the user's preferences
    pub async fn save_preferences(&self) -> Result<UserPreferences, ViewError> {
        let preferences = UserPreferences::from_selection(&self.filters.current());
        self.preferences.save(&preferences).await?;
        Ok(preferences)
    }

    /// Build the current view, starting a fetch if the cache needs one
    pub fn view(&self) -> DashboardView {
        let context = self.filters.context();
        let entry = self.observer.current(dashboard_fetcher(&self.orchestrator));
        self.render(&context, entry)
    }

    /// Wait for the current selection to finish loading, then build the view
    pub async fn settle(&self) -> DashboardView {
        let entry = self.observer.settled().await;
        self.render(&self.filters.context(), entry)
    }

    fn render(&self, context: &FilterContext, entry: CacheEntry<DashboardData>) -> DashboardView {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let status = StatusLine::from_entry(context.fetch_enabled, &entry);
        let data = entry.data.as_deref();

        let panels = self
            .panels
            .read()
            .iter()
            .map(|panel| panel.render(data, today))
            .collect();

        DashboardView {
            selection: context.selection.clone(),
            status,
            error: match (&entry.error, status) {
                (Some(e), StatusLine::Failed) => Some(e.to_string()),
                _ => None,
            },
            is_placeholder: entry.is_placeholder,
            is_empty: data.is_none(),
            last_updated: entry.last_fetched_at,
            kpi: data.map(|d| d.kpi.clone()).unwrap_or_else(KpiSnapshot::empty),
            narrative: data.map(|d| d.narrative.clone()),
            panels,
        }
    }
}
