//! Filter subscriber trait

use super::FilterContext;

/// Trait for components that need to respond to filter changes
pub trait FilterSubscriber: Send + Sync {
    /// Called after the selection or the interaction flag changes
    fn on_filter_change(&self, context: &FilterContext);
}
