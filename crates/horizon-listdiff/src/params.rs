//! Per-request filter parameters.

use std::sync::Arc;
use std::time::Duration;

use crate::diff::EditScript;
use crate::item::{ListItem, Payload};

/// Replaces the default batch dispatch for one request.
///
/// Receives the edit script and the newly displayed list.
pub type DispatchOverride<I> = Arc<dyn Fn(&EditScript, &[Arc<I>]) + Send + Sync>;

/// Parameters describing a single update request.
///
/// A snapshot is bound to each scheduled task and never changes afterwards.
///
/// # Example
///
/// ```
/// use horizon_listdiff::FilterParams;
/// # use horizon_listdiff::ListItem;
/// # struct Row;
/// # impl ListItem for Row {
/// #     fn same_content(&self, _: &Self, _: Option<&Self>) -> bool { true }
/// # }
/// use std::time::Duration;
///
/// let params = FilterParams::<Row>::new()
///     .with_run_immediately(false)
///     .with_debounce(Duration::from_millis(16));
/// assert!(!params.run_immediately);
///
/// let only = FilterParams::<Row>::new().with_async(true).with_filter_only(true).normalized();
/// assert!(!only.async_diff);
/// assert!(only.run_immediately);
/// ```
pub struct FilterParams<I> {
    /// The item whose change triggered this update, used to target dependents.
    pub trigger: Option<Arc<I>>,
    /// Skip the filter pass entirely.
    pub skip: bool,
    /// Run the filter+diff computation on the background worker pool.
    pub async_diff: bool,
    /// Run now instead of after the debounce window.
    pub run_immediately: bool,
    /// Only refresh the displayed list; never touch the batch sink.
    pub filter_only: bool,
    /// Dispatch the full batch even when no dependents exist and sizes match.
    pub update_dependents_with_empty: bool,
    /// Partial-update payload.
    pub payload: Option<Payload>,
    /// Caller-defined data, untouched by the pipeline.
    pub extension: Option<Payload>,
    /// Debounce window. `None` uses the configured default.
    pub debounce_delay: Option<Duration>,
    /// Extra delay between commit and UI delivery.
    pub notify_delay: Option<Duration>,
    /// Custom dispatch in place of the default batch update.
    pub dispatch_override: Option<DispatchOverride<I>>,
}

impl<I> Default for FilterParams<I> {
    fn default() -> Self {
        Self {
            trigger: None,
            skip: false,
            async_diff: false,
            run_immediately: true,
            filter_only: false,
            update_dependents_with_empty: true,
            payload: None,
            extension: None,
            debounce_delay: None,
            notify_delay: None,
            dispatch_override: None,
        }
    }
}

impl<I> Clone for FilterParams<I> {
    fn clone(&self) -> Self {
        Self {
            trigger: self.trigger.clone(),
            skip: self.skip,
            async_diff: self.async_diff,
            run_immediately: self.run_immediately,
            filter_only: self.filter_only,
            update_dependents_with_empty: self.update_dependents_with_empty,
            payload: self.payload.clone(),
            extension: self.extension.clone(),
            debounce_delay: self.debounce_delay,
            notify_delay: self.notify_delay,
            dispatch_override: self.dispatch_override.clone(),
        }
    }
}

impl<I: ListItem> FilterParams<I> {
    /// Parameters with the defaults: run immediately, synchronously.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters for an update triggered by `item`.
    pub fn from_item(item: Arc<I>) -> Self {
        Self::default().with_trigger(item)
    }

    /// Sets the triggering item.
    pub fn with_trigger(mut self, item: Arc<I>) -> Self {
        self.trigger = Some(item);
        self
    }

    /// Sets the skip flag.
    pub fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    /// Sets whether the computation runs on the worker pool.
    pub fn with_async(mut self, async_diff: bool) -> Self {
        self.async_diff = async_diff;
        self
    }

    /// Sets whether the request bypasses the debounce window.
    pub fn with_run_immediately(mut self, run_immediately: bool) -> Self {
        self.run_immediately = run_immediately;
        self
    }

    /// Sets the filter-only flag.
    pub fn with_filter_only(mut self, filter_only: bool) -> Self {
        self.filter_only = filter_only;
        self
    }

    /// Sets the update-dependents-with-empty flag.
    pub fn with_update_dependents_with_empty(mut self, enabled: bool) -> Self {
        self.update_dependents_with_empty = enabled;
        self
    }

    /// Sets the partial-update payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets caller-defined extension data.
    pub fn with_extension(mut self, extension: Payload) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Sets the debounce window.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_delay = Some(delay);
        self
    }

    /// Sets the delay between commit and UI delivery.
    pub fn with_notify_delay(mut self, delay: Duration) -> Self {
        self.notify_delay = Some(delay);
        self
    }

    /// Replaces the default batch dispatch for this request.
    pub fn with_dispatch_override<F>(mut self, dispatch: F) -> Self
    where
        F: Fn(&EditScript, &[Arc<I>]) + Send + Sync + 'static,
    {
        self.dispatch_override = Some(Arc::new(dispatch));
        self
    }

    /// The effective parameters for scheduling.
    ///
    /// A filter-only request always runs immediately and synchronously.
    pub fn normalized(mut self) -> Self {
        if self.filter_only {
            self.run_immediately = true;
            self.async_diff = false;
        }
        self
    }

    /// Debounce window, falling back to `default` when unset.
    pub fn effective_debounce(&self, default: Duration) -> Duration {
        self.debounce_delay.unwrap_or(default)
    }

    /// The triggering item as a plain reference.
    pub fn trigger_ref(&self) -> Option<&I> {
        self.trigger.as_deref()
    }
}

impl<I> std::fmt::Debug for FilterParams<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterParams")
            .field("has_trigger", &self.trigger.is_some())
            .field("skip", &self.skip)
            .field("async_diff", &self.async_diff)
            .field("run_immediately", &self.run_immediately)
            .field("filter_only", &self.filter_only)
            .field("update_dependents_with_empty", &self.update_dependents_with_empty)
            .field("has_payload", &self.payload.is_some())
            .field("debounce_delay", &self.debounce_delay)
            .field("notify_delay", &self.notify_delay)
            .field("has_dispatch_override", &self.dispatch_override.is_some())
            .finish()
    }
}
