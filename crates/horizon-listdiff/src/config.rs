//! Construction-time configuration for a [`ListFilter`](crate::ListFilter).
//!
//! Every knob that would otherwise be process-wide (debounce default, debug
//! logging, pool sizing) lives here and is handed to the filter when it is
//! built.
//!
//! # Example
//!
//! ```
//! use horizon_listdiff::FilterConfig;
//! use std::time::Duration;
//!
//! let config = FilterConfig::from_toml_str(
//!     r#"
//!     default_debounce_ms = 16
//!     debug_logging = true
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.default_debounce(), Duration::from_millis(16));
//! assert_eq!(config.worker_threads, None);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::{FilterError, Result};

/// Default debounce window applied when a request does not carry its own.
pub const DEFAULT_DEBOUNCE_MS: u64 = 6;

/// Filter+diff cycles slower than this are reported when debug logging is on.
pub const DEFAULT_NOTIFY_LOG_THRESHOLD_MS: u64 = 20;

/// Configuration for the filter pipeline and its execution contexts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Debounce window in milliseconds for requests without an explicit delay.
    pub default_debounce_ms: u64,
    /// Threshold in milliseconds above which slow cycles are logged.
    pub notify_log_threshold_ms: u64,
    /// Emit per-cycle timing and dependency logs at debug level.
    pub debug_logging: bool,
    /// Only take the lightweight self-refresh path when the edit script is
    /// empty, instead of relying on the old/new size comparison alone.
    pub strict_refresh_check: bool,
    /// Number of background worker threads. `None` lets rayon decide.
    pub worker_threads: Option<usize>,
    /// Name prefix for background worker threads.
    pub worker_thread_name: String,
    /// Name of the dedicated UI event loop thread.
    pub ui_thread_name: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_debounce_ms: DEFAULT_DEBOUNCE_MS,
            notify_log_threshold_ms: DEFAULT_NOTIFY_LOG_THRESHOLD_MS,
            debug_logging: false,
            strict_refresh_check: false,
            worker_threads: None,
            worker_thread_name: "listdiff-worker".to_string(),
            ui_thread_name: "listdiff-ui".to_string(),
        }
    }
}

impl FilterConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| FilterError::Config(e.to_string()))
    }

    /// The default debounce window.
    pub fn default_debounce(&self) -> Duration {
        Duration::from_millis(self.default_debounce_ms)
    }

    /// The slow-cycle logging threshold.
    pub fn notify_log_threshold(&self) -> Duration {
        Duration::from_millis(self.notify_log_threshold_ms)
    }

    /// Set the default debounce window.
    pub fn with_default_debounce(mut self, delay: Duration) -> Self {
        self.default_debounce_ms = delay.as_millis() as u64;
        self
    }

    /// Enable or disable debug logging.
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Enable or disable the strict self-refresh check.
    pub fn with_strict_refresh_check(mut self, enabled: bool) -> Self {
        self.strict_refresh_check = enabled;
        self
    }

    /// Set the number of background worker threads.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FilterConfig::default();
        assert_eq!(config.default_debounce(), Duration::from_millis(6));
        assert_eq!(config.notify_log_threshold(), Duration::from_millis(20));
        assert!(!config.debug_logging);
        assert!(!config.strict_refresh_check);
    }

    #[test]
    fn test_partial_toml() {
        let config = FilterConfig::from_toml_str("worker_threads = 3\nui_thread_name = \"ui\"")
            .unwrap();
        assert_eq!(config.worker_threads, Some(3));
        assert_eq!(config.ui_thread_name, "ui");
        assert_eq!(config.default_debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn test_invalid_toml() {
        let err = FilterConfig::from_toml_str("default_debounce_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, FilterError::Config(_)));
    }

    #[test]
    fn test_builder() {
        let config = FilterConfig::default()
            .with_default_debounce(Duration::from_millis(40))
            .with_worker_threads(2)
            .with_debug_logging(true);
        assert_eq!(config.default_debounce_ms, 40);
        assert_eq!(config.worker_threads, Some(2));
        assert!(config.debug_logging);
    }
}
