//! Debounced, cancellable filter-and-diff pipeline for list views.
//!
//! This crate keeps an on-screen list in step with a mutable source list:
//!
//! - **Interceptors**: ordered filtering stages (before, main, after,
//!   post-diff) that turn the source list into the list to display
//! - **Filter Engine**: runs the stages, with group folding, sub-item
//!   flattening and hidden-item removal built in
//! - **Scheduler**: debounces requests, supersedes stale ones and runs
//!   passes inline, on the UI context or on a background worker pool
//! - **Diff**: computes an edit script against the displayed list
//! - **Notifier**: delivers the script to the consumer on the UI context,
//!   or a lighter single-item refresh, then notifies dependent items
//!
//! # Example
//!
//! ```
//! use horizon_listdiff::{
//!     EventLoop, FilterParams, ListConsumer, ListFilter, ListItem, ListUpdateSink, Payload,
//!     SourceList, Stage,
//! };
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Row {
//!     name: &'static str,
//!     done: bool,
//! }
//!
//! impl ListItem for Row {
//!     fn same_content(&self, other: &Self, _: Option<&Self>) -> bool {
//!         self.name == other.name && self.done == other.done
//!     }
//! }
//!
//! #[derive(Default)]
//! struct View {
//!     log: Mutex<Vec<String>>,
//! }
//!
//! impl ListUpdateSink for View {
//!     fn on_inserted(&self, position: usize, count: usize) {
//!         self.log.lock().push(format!("insert {position}+{count}"));
//!     }
//!     fn on_removed(&self, position: usize, count: usize) {
//!         self.log.lock().push(format!("remove {position}+{count}"));
//!     }
//!     fn on_moved(&self, from: usize, to: usize) {
//!         self.log.lock().push(format!("move {from}->{to}"));
//!     }
//!     fn on_changed(&self, position: usize, count: usize, _: Option<&Payload>) {
//!         self.log.lock().push(format!("change {position}+{count}"));
//!     }
//! }
//!
//! impl ListConsumer<Row> for View {
//!     fn notify_changed(&self, _: &Arc<Row>, _: Option<usize>, _: Option<&Payload>) {}
//! }
//!
//! let source = Arc::new(SourceList::new(vec![
//!     Arc::new(Row { name: "write docs", done: true }),
//!     Arc::new(Row { name: "ship it", done: false }),
//! ]));
//! let view = Arc::new(View::default());
//! let event_loop = Arc::new(EventLoop::new("example-ui").unwrap());
//!
//! let filter = ListFilter::builder(source, view.clone())
//!     .ui_context(event_loop.clone())
//!     .build()
//!     .unwrap();
//!
//! filter.update();
//! event_loop.flush(Duration::from_secs(1));
//! assert_eq!(*view.log.lock(), vec!["insert 0+2"]);
//!
//! // Hide finished rows from now on.
//! filter.add_interceptor_fn(Stage::After, |chain| {
//!     Ok(chain.requested().iter().filter(|row| !row.done).cloned().collect())
//! });
//! filter.request_update(FilterParams::new());
//! event_loop.flush(Duration::from_secs(1));
//! assert_eq!(view.log.lock().last().map(String::as_str), Some("remove 0+1"));
//! ```

mod config;
mod consumer;
pub mod diff;
mod engine;
mod error;
pub mod event_loop;
mod filter;
pub mod interceptor;
mod item;
pub mod logging;
mod notify;
mod params;
mod scheduler;
pub mod signal;
mod task;
pub mod threadpool;

pub use config::{DEFAULT_DEBOUNCE_MS, DEFAULT_NOTIFY_LOG_THRESHOLD_MS, FilterConfig};
pub use consumer::{DispatchListener, ListConsumer, ListUpdateSink};
pub use diff::{DiffAlgorithm, DiffCallbacks, EditOp, EditScript, LcsDiff};
pub use engine::{AfterFilterHook, FilterEngine};
pub use error::{FilterError, Result};
pub use event_loop::{EventLoop, Job, UiContext};
pub use filter::{ListFilter, ListFilterBuilder};
pub use interceptor::{
    Chain, FnInterceptor, Interceptor, InterceptorId, InterceptorRegistry, ListStatus, Stage,
};
pub use item::{ItemHost, ItemList, ListItem, Payload, SourceList};
pub use logging::PerfSpan;
pub use notify::DispatchListenerId;
pub use params::{DispatchOverride, FilterParams};
pub use signal::{ConnectionId, Signal};
pub use task::{Commit, DisplayedList, TaskId, TaskRegistry, UpdateTask};
pub use threadpool::{CancellationToken, WorkerPool};
