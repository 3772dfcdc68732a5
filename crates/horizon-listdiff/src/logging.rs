//! Logging facilities for the filter pipeline.
//!
//! The crate uses `tracing` for instrumentation. Install a subscriber in the
//! host application to see the output:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_listdiff=debug")
//!     .init();
//! ```
//!
//! Per-cycle timing and dependency logs are only emitted when
//! [`FilterConfig::debug_logging`](crate::FilterConfig::debug_logging) is set.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Crate-wide target.
    pub const CORE: &str = "horizon_listdiff";
    /// Interceptor chains and the filter engine.
    pub const FILTER: &str = "horizon_listdiff::filter";
    /// Debounce, cancellation and task lifecycle.
    pub const TASK: &str = "horizon_listdiff::task";
    /// Diff delivery, dispatch and dependent notification.
    pub const NOTIFY: &str = "horizon_listdiff::notify";
    /// UI event loop.
    pub const EVENT_LOOP: &str = "horizon_listdiff::event_loop";
}

/// A guard for performance tracing spans.
///
/// When dropped, the span is exited. Useful for timing a filter+diff cycle
/// in a profiler attached to the subscriber.
///
/// # Example
///
/// ```ignore
/// use horizon_listdiff::logging::PerfSpan;
///
/// fn expensive_operation() {
///     let _span = PerfSpan::new("expensive_operation");
///     // ... work ...
/// } // span ends here
/// ```
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "horizon_listdiff::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

impl std::fmt::Debug for PerfSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerfSpan").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        // Just ensure it doesn't panic without a subscriber
        let _span = PerfSpan::new("test_operation");
    }
}
