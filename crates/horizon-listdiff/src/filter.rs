//! The list filter: the public entry point tying the pipeline together.
//!
//! A [`ListFilter`] owns the filter engine, the displayed list, the tracked
//! tasks and the dispatch listeners of one list view. Update requests are
//! debounced, filtered, diffed and committed as described in
//! [`request_update`](ListFilter::request_update); results reach the
//! consumer on the UI context.

use std::sync::Arc;

use crate::config::FilterConfig;
use crate::consumer::{DispatchListener, ListConsumer, position_of};
use crate::diff::{DiffAlgorithm, LcsDiff};
use crate::engine::FilterEngine;
use crate::error::Result;
use crate::event_loop::{EventLoop, UiContext};
use crate::interceptor::{
    Chain, FnInterceptor, Interceptor, InterceptorId, InterceptorRegistry, LoadMoreInterceptor,
    Stage, StatusInterceptor,
};
use crate::item::{ItemHost, ItemList, ListItem};
use crate::logging::targets;
use crate::notify::{self, DispatchListenerId, Notifier};
use crate::params::FilterParams;
use crate::scheduler;
use crate::task::{DisplayedList, TaskId, TaskRegistry};
use crate::threadpool::WorkerPool;

/// State shared between a list filter and its in-flight tasks.
pub(crate) struct Shared<I: ListItem> {
    pub(crate) config: FilterConfig,
    pub(crate) engine: FilterEngine<I>,
    pub(crate) host: Arc<dyn ItemHost<I>>,
    pub(crate) consumer: Arc<dyn ListConsumer<I>>,
    pub(crate) differ: Arc<dyn DiffAlgorithm<I>>,
    pub(crate) displayed: DisplayedList<I>,
    pub(crate) tasks: TaskRegistry<I>,
    pub(crate) notifier: Notifier<I>,
    pub(crate) ui: Arc<dyn UiContext>,
    pub(crate) pool: Arc<WorkerPool>,
}

/// Builds a [`ListFilter`].
///
/// Only the host and the consumer are required. Without an explicit UI
/// context the filter starts its own [`EventLoop`]; without an explicit
/// worker pool it builds one from the configuration.
pub struct ListFilterBuilder<I: ListItem> {
    host: Arc<dyn ItemHost<I>>,
    consumer: Arc<dyn ListConsumer<I>>,
    config: FilterConfig,
    ui: Option<Arc<dyn UiContext>>,
    pool: Option<Arc<WorkerPool>>,
    differ: Option<Arc<dyn DiffAlgorithm<I>>>,
    status_item: Option<Arc<I>>,
    load_more_item: Option<Arc<I>>,
}

impl<I: ListItem> ListFilterBuilder<I> {
    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    /// Deliver results on `ui` instead of a private event loop.
    pub fn ui_context<U: UiContext + 'static>(mut self, ui: Arc<U>) -> Self {
        self.ui = Some(ui);
        self
    }

    /// Run asynchronous passes on a shared `pool`.
    pub fn worker_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Diff with `differ` instead of [`LcsDiff`].
    pub fn diff_algorithm<D: DiffAlgorithm<I> + 'static>(mut self, differ: Arc<D>) -> Self {
        self.differ = Some(differ);
        self
    }

    /// Show `item` in place of the list while a status is set.
    pub fn status_item(mut self, item: Arc<I>) -> Self {
        self.status_item = Some(item);
        self
    }

    /// Append `item` to every non-empty list.
    pub fn load_more_item(mut self, item: Arc<I>) -> Self {
        self.load_more_item = Some(item);
        self
    }

    /// Build the filter.
    pub fn build(self) -> Result<ListFilter<I>> {
        let ui: Arc<dyn UiContext> = match self.ui {
            Some(ui) => ui,
            None => Arc::new(EventLoop::new(&self.config.ui_thread_name)?),
        };
        let pool = match self.pool {
            Some(pool) => pool,
            None => Arc::new(WorkerPool::from_config(&self.config)?),
        };
        let differ: Arc<dyn DiffAlgorithm<I>> = match self.differ {
            Some(differ) => differ,
            None => Arc::new(LcsDiff),
        };

        let engine = FilterEngine::new();
        let status = self.status_item.map(|item| {
            let status = Arc::new(StatusInterceptor::new(item));
            engine.registry(Stage::PostDiff).add(status.clone());
            status
        });
        let load_more = self.load_more_item.map(|item| {
            let load_more = Arc::new(LoadMoreInterceptor::new(item));
            engine.registry(Stage::After).add(load_more.clone());
            load_more
        });

        tracing::debug!(
            target: targets::CORE,
            debounce_ms = self.config.default_debounce_ms,
            workers = pool.num_threads(),
            "list filter created"
        );

        Ok(ListFilter {
            shared: Arc::new(Shared {
                config: self.config,
                engine,
                host: self.host,
                consumer: self.consumer,
                differ,
                displayed: DisplayedList::default(),
                tasks: TaskRegistry::new(),
                notifier: Notifier::new(),
                ui,
                pool,
            }),
            status,
            load_more,
        })
    }
}

/// A debounced, cancellable filter-and-diff pipeline for one list view.
///
/// # Example
///
/// ```
/// use horizon_listdiff::{
///     FilterParams, ListConsumer, ListFilter, ListItem, ListUpdateSink, Payload, SourceList,
/// };
/// use std::sync::Arc;
///
/// struct Row(&'static str);
/// impl ListItem for Row {
///     fn same_content(&self, other: &Self, _: Option<&Self>) -> bool { self.0 == other.0 }
/// }
///
/// struct View;
/// impl ListUpdateSink for View {
///     fn on_inserted(&self, position: usize, count: usize) { println!("+{count} at {position}"); }
///     fn on_removed(&self, position: usize, count: usize) { println!("-{count} at {position}"); }
///     fn on_moved(&self, from: usize, to: usize) { println!("{from} -> {to}"); }
///     fn on_changed(&self, _: usize, _: usize, _: Option<&Payload>) {}
/// }
/// impl ListConsumer<Row> for View {
///     fn notify_changed(&self, _: &Arc<Row>, _: Option<usize>, _: Option<&Payload>) {}
/// }
///
/// let source = Arc::new(SourceList::new(vec![Arc::new(Row("a")), Arc::new(Row("b"))]));
/// let filter = ListFilter::builder(source, Arc::new(View)).build().unwrap();
///
/// filter.request_update(FilterParams::new());
/// assert_eq!(filter.displayed_len(), 2);
/// ```
pub struct ListFilter<I: ListItem> {
    pub(crate) shared: Arc<Shared<I>>,
    status: Option<Arc<StatusInterceptor<I>>>,
    load_more: Option<Arc<LoadMoreInterceptor<I>>>,
}

impl<I: ListItem> ListFilter<I> {
    /// Start building a filter over `host`'s items that updates `consumer`.
    pub fn builder<H, C>(host: Arc<H>, consumer: Arc<C>) -> ListFilterBuilder<I>
    where
        H: ItemHost<I> + 'static,
        C: ListConsumer<I> + 'static,
    {
        ListFilterBuilder {
            host,
            consumer,
            config: FilterConfig::default(),
            ui: None,
            pool: None,
            differ: None,
            status_item: None,
            load_more_item: None,
        }
    }

    /// Request an update.
    ///
    /// Every task still tracked is cancelled first. The new task then runs
    /// on the calling thread when `run_immediately` is set, or on the UI
    /// context once the debounce window has passed. Depending on
    /// `async_diff` the filter and diff run on the worker pool.
    ///
    /// The displayed list is replaced as soon as the diff is computed; the
    /// consumer is updated on the UI context afterwards.
    pub fn request_update(&self, params: FilterParams<I>) -> TaskId {
        scheduler::request_update(&self.shared, params)
    }

    /// Request an immediate update with default parameters.
    pub fn update(&self) -> TaskId {
        self.request_update(FilterParams::new())
    }

    /// Request an immediate update triggered by `item`.
    pub fn update_item(&self, item: Arc<I>) -> TaskId {
        self.request_update(FilterParams::from_item(item))
    }

    /// Cancel every tracked task. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.shared.tasks.cancel_all();
        if cancelled > 0 {
            tracing::trace!(target: targets::TASK, cancelled, "tasks cancelled");
        }
        cancelled
    }

    /// Number of tasks that have neither completed nor been cancelled.
    pub fn pending_tasks(&self) -> usize {
        self.shared.tasks.len()
    }

    /// Committed results not yet delivered to the consumer.
    pub fn pending_deliveries(&self) -> usize {
        self.shared.notifier.backlog()
    }

    /// Run the before, main and after stages over `source`.
    ///
    /// Uses the parameters of the latest tracked task, or the defaults.
    pub fn filter(&self, source: &[Arc<I>]) -> Result<ItemList<I>> {
        let params = self.shared.tasks.latest_params().unwrap_or_default();
        self.shared.engine.filter(source, &params)
    }

    /// Run the post-diff stage and the after-filter hook over `candidate`.
    ///
    /// Uses the parameters of the latest tracked task, or the defaults.
    pub fn filter_after_diff(
        &self,
        displayed: &[Arc<I>],
        candidate: ItemList<I>,
    ) -> Result<ItemList<I>> {
        let params = self.shared.tasks.latest_params().unwrap_or_default();
        self.shared
            .engine
            .filter_after_diff(displayed, candidate, &params)
    }

    /// The list as of the last commit.
    pub fn displayed(&self) -> ItemList<I> {
        self.shared.displayed.items()
    }

    /// Number of displayed items.
    pub fn displayed_len(&self) -> usize {
        self.shared.displayed.len()
    }

    /// Index of `item` in the displayed list.
    pub fn position_of(&self, item: &Arc<I>) -> Option<usize> {
        position_of(&self.shared.displayed.items(), item)
    }

    /// Notify the dependents of `trigger` without filtering.
    ///
    /// Runs inline on the UI context, or is posted there.
    pub fn notify_dependents(&self, trigger: Arc<I>) -> Result<()> {
        if self.shared.ui.is_current() {
            notify_dependents_now(&self.shared, &trigger);
            return Ok(());
        }

        let shared = self.shared.clone();
        self.shared
            .ui
            .post(Box::new(move || notify_dependents_now(&shared, &trigger)))
    }

    /// Register a dispatch listener.
    pub fn add_dispatch_listener(&self, listener: Arc<dyn DispatchListener<I>>) -> DispatchListenerId {
        self.shared.notifier.add_listener(listener)
    }

    /// Unregister a dispatch listener. Returns `true` if it was registered.
    pub fn remove_dispatch_listener(&self, id: DispatchListenerId) -> bool {
        self.shared.notifier.remove_listener(id)
    }

    /// Number of registered dispatch listeners.
    pub fn dispatch_listener_count(&self) -> usize {
        self.shared.notifier.listener_count()
    }

    /// Append an interceptor to `stage`.
    pub fn add_interceptor(&self, stage: Stage, interceptor: Arc<dyn Interceptor<I>>) -> InterceptorId {
        self.shared.engine.registry(stage).add(interceptor)
    }

    /// Append a closure interceptor to `stage`.
    pub fn add_interceptor_fn<F>(&self, stage: Stage, intercept: F) -> InterceptorId
    where
        F: Fn(&mut Chain<'_, I>) -> Result<ItemList<I>> + Send + Sync + 'static,
    {
        self.add_interceptor(stage, Arc::new(FnInterceptor::new(intercept)))
    }

    /// Remove an interceptor from `stage`. Returns `true` if it was there.
    pub fn remove_interceptor(&self, stage: Stage, id: InterceptorId) -> bool {
        self.shared.engine.registry(stage).remove(id)
    }

    /// The interceptors of `stage`.
    pub fn interceptors(&self, stage: Stage) -> &InterceptorRegistry<I> {
        self.shared.engine.registry(stage)
    }

    /// Install the after-filter hook.
    pub fn set_after_filter_hook<F>(&self, hook: F)
    where
        F: Fn(&[Arc<I>], &[Arc<I>]) -> ItemList<I> + Send + Sync + 'static,
    {
        self.shared.engine.set_after_filter_hook(Arc::new(hook));
    }

    /// Remove the after-filter hook.
    pub fn clear_after_filter_hook(&self) {
        self.shared.engine.clear_after_filter_hook();
    }

    /// The status interceptor, if the filter was built with a status item.
    pub fn status(&self) -> Option<&Arc<StatusInterceptor<I>>> {
        self.status.as_ref()
    }

    /// The load-more interceptor, if the filter was built with a sentinel.
    pub fn load_more(&self) -> Option<&Arc<LoadMoreInterceptor<I>>> {
        self.load_more.as_ref()
    }

    /// The active configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.shared.config
    }

    /// The UI context results are delivered on.
    pub fn ui_context(&self) -> &Arc<dyn UiContext> {
        &self.shared.ui
    }
}

fn notify_dependents_now<I: ListItem>(shared: &Shared<I>, trigger: &Arc<I>) {
    let dependents = shared.host.dependents_of(trigger);
    notify::notify_dependents(shared, trigger, &dependents, &shared.displayed.items());
}

impl<I: ListItem> Drop for ListFilter<I> {
    fn drop(&mut self) {
        self.shared.tasks.cancel_all();
    }
}

impl<I: ListItem> std::fmt::Debug for ListFilter<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListFilter")
            .field("displayed", &self.shared.displayed)
            .field("pending_tasks", &self.shared.tasks.len())
            .field("engine", &self.shared.engine)
            .field("pool", &self.shared.pool)
            .finish_non_exhaustive()
    }
}
