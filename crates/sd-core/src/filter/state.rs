//! Filter state implementation

use super::{Dimension, FilterContext, FilterSelection, FilterSubscriber};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Filter state stored internally
#[derive(Debug, Clone, Default)]
struct FilterInner {
    selection: FilterSelection,
    /// Set by the first explicit `set_dimension` call
    interacted: bool,
    options: AHashMap<Dimension, Vec<String>>,
}

/// Holds the user's current dimension selection.
///
/// Fetching stays disabled until the user has explicitly changed a dimension,
/// so data rendered at startup is not fetched a second time. After that it is
/// enabled whenever at least one dimension is selected.
pub struct FilterState {
    state: Arc<RwLock<FilterInner>>,
    subscribers: Arc<RwLock<Vec<Weak<dyn FilterSubscriber>>>>,
}

impl FilterState {
    /// Create an empty filter state
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(FilterInner::default())),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed the selection from preference defaults. Does not count as interaction.
    pub fn initialize(&self, defaults: FilterSelection) {
        let mut state = self.state.write();
        let mut selection = FilterSelection::default();
        for dimension in Dimension::ALL {
            selection.set(dimension, defaults.get(dimension).map(str::to_string));
        }
        state.selection = selection;
        state.interacted = false;
        debug!(selection = %state.selection, "filter state initialized");

        drop(state);
        self.notify_subscribers();
    }

    /// Set one dimension. `None` (or a blank string) selects "All".
    pub fn set_dimension(&self, dimension: Dimension, value: Option<String>) {
        let mut state = self.state.write();
        state.selection.set(dimension, value);
        state.interacted = true;
        debug!(%dimension, selection = %state.selection, "filter changed");

        drop(state);
        self.notify_subscribers();
    }

    /// Current selection
    pub fn current(&self) -> FilterSelection {
        self.state.read().selection.clone()
    }

    /// Whether the user has explicitly changed a dimension
    pub fn has_interacted(&self) -> bool {
        self.state.read().interacted
    }

    /// Whether downstream fetching is allowed for the current selection
    pub fn fetch_enabled(&self) -> bool {
        let state = self.state.read();
        state.interacted && state.selection.has_any()
    }

    /// Snapshot of the current state
    pub fn context(&self) -> FilterContext {
        let state = self.state.read();
        FilterContext {
            selection: state.selection.clone(),
            interacted: state.interacted,
            fetch_enabled: state.interacted && state.selection.has_any(),
        }
    }

    /// Replace the option list offered for a dimension
    pub fn set_options(&self, dimension: Dimension, options: Vec<String>) {
        self.state.write().options.insert(dimension, options);
    }

    /// Options offered for a dimension (empty until lookups arrive)
    pub fn options(&self, dimension: Dimension) -> Vec<String> {
        self.state
            .read()
            .options
            .get(&dimension)
            .cloned()
            .unwrap_or_default()
    }

    /// Add a subscriber. Only a weak reference is kept.
    pub fn add_subscriber(&self, subscriber: Arc<dyn FilterSubscriber>) {
        self.subscribers.write().push(Arc::downgrade(&subscriber));
    }

    fn notify_subscribers(&self) {
        let context = self.context();
        let live: Vec<Arc<dyn FilterSubscriber>> = {
            let mut subscribers = self.subscribers.write();
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        for subscriber in live {
            subscriber.on_filter_change(&context);
        }
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        seen: Mutex<Vec<FilterContext>>,
    }

    impl FilterSubscriber for Recorder {
        fn on_filter_change(&self, context: &FilterContext) {
            self.seen.lock().push(context.clone());
        }
    }

    #[test]
    fn test_fetch_disabled_before_interaction() {
        let filters = FilterState::new();
        filters.initialize(FilterSelection {
            sector: Some("office".into()),
            region: None,
            service: None,
        });

        assert!(!filters.has_interacted());
        assert!(!filters.fetch_enabled());
        assert_eq!(filters.current().sector.as_deref(), Some("office"));
    }

    #[test]
    fn test_all_null_stays_disabled_until_value_set() {
        let filters = FilterState::new();
        filters.initialize(FilterSelection::default());
        assert!(!filters.fetch_enabled());

        filters.set_dimension(Dimension::Region, None);
        assert!(filters.has_interacted());
        assert!(!filters.fetch_enabled());

        filters.set_dimension(Dimension::Region, Some("chessington".into()));
        assert!(filters.fetch_enabled());
    }

    #[test]
    fn test_clearing_every_dimension_disables_again() {
        let filters = FilterState::new();
        filters.set_dimension(Dimension::Sector, Some("office".into()));
        filters.set_dimension(Dimension::Service, Some("plastering".into()));
        assert!(filters.fetch_enabled());

        filters.set_dimension(Dimension::Sector, None);
        assert!(filters.fetch_enabled());

        filters.set_dimension(Dimension::Service, Some(String::new()));
        assert!(!filters.fetch_enabled());
        assert_eq!(filters.current(), FilterSelection::default());
    }

    #[test]
    fn test_initialize_resets_interaction() {
        let filters = FilterState::new();
        filters.set_dimension(Dimension::Sector, Some("office".into()));
        filters.initialize(FilterSelection::default());

        assert!(!filters.has_interacted());
    }

    #[test]
    fn test_subscribers_notified_and_pruned() {
        let filters = FilterState::new();
        let recorder = Arc::new(Recorder { seen: Mutex::new(Vec::new()) });
        filters.add_subscriber(recorder.clone());

        filters.set_dimension(Dimension::Sector, Some("home-owner".into()));
        {
            let seen = recorder.seen.lock();
            assert_eq!(seen.len(), 1);
            assert!(seen[0].fetch_enabled);
            assert_eq!(seen[0].selection.sector.as_deref(), Some("home-owner"));
        }

        drop(recorder);
        filters.set_dimension(Dimension::Sector, None);
        assert!(filters.subscribers.read().is_empty());
    }

    #[test]
    fn test_options() {
        let filters = FilterState::new();
        assert!(filters.options(Dimension::Service).is_empty());

        filters.set_options(Dimension::Service, vec!["plastering".into()]);
        assert_eq!(filters.options(Dimension::Service), vec!["plastering".to_string()]);
    }
}
