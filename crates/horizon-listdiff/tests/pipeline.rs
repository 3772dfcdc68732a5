//! Integration tests for the full request -> filter -> diff -> deliver cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use horizon_listdiff::{
    Chain, DispatchListener, EventLoop, FilterConfig, FilterError, FilterParams, Job, ListConsumer,
    ListFilter, ListItem, ListStatus, ListUpdateSink, Payload, Signal, SourceList, Stage,
    UiContext,
};
use parking_lot::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug)]
struct Row {
    name: &'static str,
    version: u32,
    hidden: AtomicBool,
    parent: Option<&'static str>,
    affected: bool,
    updates: Signal<Arc<Row>>,
    diff_results: AtomicUsize,
}

impl Row {
    fn build(name: &'static str, version: u32, parent: Option<&'static str>, affected: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            version,
            hidden: AtomicBool::new(false),
            parent,
            affected,
            updates: Signal::new(),
            diff_results: AtomicUsize::new(0),
        })
    }

    fn new(name: &'static str) -> Arc<Self> {
        Self::build(name, 0, None, true)
    }

    fn versioned(name: &'static str, version: u32) -> Arc<Self> {
        Self::build(name, version, None, true)
    }

    fn dependent(name: &'static str, parent: &'static str, affected: bool) -> Arc<Self> {
        Self::build(name, 0, Some(parent), affected)
    }
}

impl ListItem for Row {
    fn same_identity(&self, other: &Self, _trigger: Option<&Self>) -> bool {
        self.name == other.name
    }

    fn same_content(&self, other: &Self, _trigger: Option<&Self>) -> bool {
        self.version == other.version
    }

    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    fn depends_on(&self, trigger: &Self) -> bool {
        self.parent == Some(trigger.name)
    }

    fn is_affected_by(&self, _trigger: &Self) -> bool {
        self.affected
    }

    fn update_from_signal(&self) -> Option<&Signal<Arc<Self>>> {
        Some(&self.updates)
    }

    fn on_diff_result(&self, _params: &FilterParams<Self>) {
        self.diff_results.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Inserted(usize, usize),
    Removed(usize, usize),
    Moved(usize, usize),
    Changed(usize, usize),
    Refreshed(&'static str, Option<usize>),
    Before,
    After,
}

type LayoutHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
    mid_layout: AtomicBool,
    /// Runs whenever the filter asks whether a layout pass is in progress.
    layout_hook: Mutex<Option<LayoutHook>>,
}

impl Recorder {
    fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl ListUpdateSink for Recorder {
    fn on_inserted(&self, position: usize, count: usize) {
        self.push(Event::Inserted(position, count));
    }

    fn on_removed(&self, position: usize, count: usize) {
        self.push(Event::Removed(position, count));
    }

    fn on_moved(&self, from: usize, to: usize) {
        self.push(Event::Moved(from, to));
    }

    fn on_changed(&self, position: usize, count: usize, _payload: Option<&Payload>) {
        self.push(Event::Changed(position, count));
    }
}

impl ListConsumer<Row> for Recorder {
    fn is_mid_layout(&self) -> bool {
        let hook = self.layout_hook.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
        self.mid_layout.load(Ordering::SeqCst)
    }

    fn notify_changed(&self, item: &Arc<Row>, position: Option<usize>, _payload: Option<&Payload>) {
        self.push(Event::Refreshed(item.name, position));
    }
}

struct Hooks(Arc<Recorder>);

impl DispatchListener<Row> for Hooks {
    fn before_dispatch(&self, _consumer: &dyn ListConsumer<Row>) {
        self.0.push(Event::Before);
    }

    fn after_dispatch(&self, _consumer: &dyn ListConsumer<Row>) {
        self.0.push(Event::After);
    }
}

/// Forwards to an event loop but refuses the next immediate post.
struct FlakyUi {
    inner: Arc<EventLoop>,
    reject_next: AtomicBool,
}

impl UiContext for FlakyUi {
    fn post(&self, job: Job) -> horizon_listdiff::Result<()> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(FilterError::ContextStopped);
        }
        self.inner.post(job)
    }

    fn post_delayed(&self, delay: Duration, job: Job) -> horizon_listdiff::Result<()> {
        self.inner.post_delayed(delay, job)
    }

    fn is_current(&self) -> bool {
        self.inner.is_current()
    }
}

struct Fixture {
    source: Arc<SourceList<Row>>,
    view: Arc<Recorder>,
    ui: Arc<EventLoop>,
    filter: Arc<ListFilter<Row>>,
}

impl Fixture {
    fn new(rows: Vec<Arc<Row>>) -> Self {
        Self::with_config(rows, FilterConfig::default())
    }

    fn with_config(rows: Vec<Arc<Row>>, config: FilterConfig) -> Self {
        Self::with_ui(rows, config, |ui| ui)
    }

    /// Build with the UI context produced by `wrap` around the test event loop.
    fn with_ui<U, F>(rows: Vec<Arc<Row>>, config: FilterConfig, wrap: F) -> Self
    where
        U: UiContext + 'static,
        F: FnOnce(Arc<EventLoop>) -> Arc<U>,
    {
        init_tracing();
        let source = Arc::new(SourceList::new(rows));
        let view = Arc::new(Recorder::default());
        let ui = Arc::new(EventLoop::new("test-ui").unwrap());
        let filter = ListFilter::builder(source.clone(), view.clone())
            .config(config.with_worker_threads(2))
            .ui_context(wrap(ui.clone()))
            .build()
            .unwrap();
        let filter = Arc::new(filter);
        filter.add_dispatch_listener(Arc::new(Hooks(view.clone())));

        Self {
            source,
            view,
            ui,
            filter,
        }
    }

    /// Wait until no task is tracked and every delivery has run.
    fn settle(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            assert!(self.ui.flush(Duration::from_secs(5)));
            if self.filter.pending_tasks() == 0 && self.filter.pending_deliveries() == 0 {
                break;
            }
            assert!(Instant::now() < deadline, "pipeline did not settle");
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(self.ui.flush(Duration::from_secs(5)));
    }

    /// Run the initial update and drop its events.
    fn prime(&self) {
        self.filter.update();
        self.settle();
        self.view.take();
    }

    fn displayed_names(&self) -> Vec<&'static str> {
        self.filter.displayed().iter().map(|row| row.name).collect()
    }
}

fn counting_interceptor(counter: &Arc<AtomicUsize>) -> impl Fn(&mut Chain<'_, Row>) -> horizon_listdiff::Result<Vec<Arc<Row>>> + Send + Sync + 'static {
    let counter = counter.clone();
    move |chain: &mut Chain<'_, Row>| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(chain.requested().to_vec())
    }
}

#[test]
fn test_initial_update_inserts_everything() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b"), Row::new("c")]);

    fx.filter.update();
    assert_eq!(fx.displayed_names(), vec!["a", "b", "c"]);

    fx.settle();
    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Inserted(0, 3), Event::After]
    );
    assert_eq!(fx.filter.pending_tasks(), 0);
}

#[test]
fn test_debounced_burst_completes_once() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b"), Row::new("c")]);
    let passes = Arc::new(AtomicUsize::new(0));
    fx.filter
        .add_interceptor_fn(Stage::Before, counting_interceptor(&passes));

    let params = FilterParams::new()
        .with_run_immediately(false)
        .with_debounce(Duration::from_millis(30));
    for _ in 0..10 {
        fx.filter.request_update(params.clone());
    }
    assert_eq!(fx.filter.pending_tasks(), 1);
    assert_eq!(fx.filter.displayed_len(), 0);

    std::thread::sleep(Duration::from_millis(80));
    fx.settle();

    assert_eq!(passes.load(Ordering::SeqCst), 1);
    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Inserted(0, 3), Event::After]
    );
}

#[test]
fn test_debounce_uses_configured_default() {
    let config = FilterConfig::default().with_default_debounce(Duration::from_millis(40));
    let fx = Fixture::with_config(vec![Row::new("a")], config);

    fx.filter
        .request_update(FilterParams::new().with_run_immediately(false));
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(fx.filter.displayed_len(), 0);

    std::thread::sleep(Duration::from_millis(80));
    fx.settle();
    assert_eq!(fx.filter.displayed_len(), 1);
}

#[test]
fn test_removing_middle_item_emits_single_remove() {
    let b = Row::new("b");
    let fx = Fixture::new(vec![Row::new("a"), b.clone(), Row::new("c")]);
    fx.prime();

    fx.source.remove(&b);
    fx.filter.update();
    fx.settle();

    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Removed(1, 1), Event::After]
    );
    assert_eq!(fx.displayed_names(), vec!["a", "c"]);
}

#[test]
fn test_unchanged_source_emits_no_operations() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b")]);
    fx.prime();

    fx.filter.update();
    fx.settle();
    assert_eq!(fx.view.take(), vec![Event::Before, Event::After]);
}

#[test]
fn test_filter_is_idempotent() {
    let fx = Fixture::new(Vec::new());

    let rows = vec![Row::new("a"), Row::new("x"), Row::new("b")];
    rows[1].hidden.store(true, Ordering::SeqCst);
    let first = fx.filter.filter(&rows).unwrap();
    let second = fx.filter.filter(&rows).unwrap();

    assert_eq!(first.len(), 2);
    assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
    assert_eq!(rows.len(), 3);
}

#[test]
fn test_filter_only_commits_without_dispatch() {
    let parent = Row::new("parent");
    let child = Row::dependent("child", "parent", true);
    let extra = Row::new("extra");
    let fx = Fixture::new(vec![parent.clone(), child.clone(), extra.clone()]);
    fx.prime();

    let signalled = Arc::new(AtomicUsize::new(0));
    let counter = signalled.clone();
    child.updates.connect(move |from: &Arc<Row>| {
        assert_eq!(from.name, "parent");
        counter.fetch_add(1, Ordering::SeqCst);
    });

    extra.hidden.store(true, Ordering::SeqCst);
    fx.filter.request_update(
        FilterParams::from_item(parent.clone())
            .with_filter_only(true)
            .with_async(true),
    );
    fx.settle();

    assert_eq!(fx.displayed_names(), vec!["parent", "child"]);
    assert_eq!(fx.view.take(), vec![Event::Refreshed("child", Some(1))]);
    assert_eq!(signalled.load(Ordering::SeqCst), 1);
}

#[test]
fn test_equal_size_without_dependents_self_refreshes() {
    let fx = Fixture::new(vec![Row::new("a"), Row::versioned("b", 0)]);
    fx.prime();

    let b2 = Row::versioned("b", 1);
    fx.source.set(vec![Row::new("a"), b2.clone()]);
    fx.filter.request_update(
        FilterParams::from_item(b2)
            .with_update_dependents_with_empty(false)
            .with_payload(Arc::new("title")),
    );
    fx.settle();

    assert_eq!(fx.view.take(), vec![Event::Refreshed("b", Some(1))]);
}

#[test]
fn test_strict_refresh_check_dispatches_content_changes() {
    let config = FilterConfig::default().with_strict_refresh_check(true);
    let fx = Fixture::with_config(vec![Row::new("a"), Row::versioned("b", 0)], config);
    fx.prime();

    let b2 = Row::versioned("b", 1);
    fx.source.set(vec![Row::new("a"), b2.clone()]);
    fx.filter.request_update(
        FilterParams::from_item(b2).with_update_dependents_with_empty(false),
    );
    fx.settle();

    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Changed(1, 1), Event::After]
    );
}

#[test]
fn test_only_affected_dependents_are_notified() {
    let trigger = Row::new("t");
    let d1 = Row::dependent("d1", "t", true);
    let d2 = Row::dependent("d2", "t", false);
    let fx = Fixture::new(vec![trigger.clone(), d1.clone(), d2.clone()]);
    fx.prime();

    let d1_signals = Arc::new(AtomicUsize::new(0));
    let d2_signals = Arc::new(AtomicUsize::new(0));
    let counter = d1_signals.clone();
    d1.updates.connect(move |_: &Arc<Row>| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = d2_signals.clone();
    d2.updates.connect(move |_: &Arc<Row>| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    fx.filter.update_item(trigger);
    fx.settle();

    let events = fx.view.take();
    assert!(events.contains(&Event::Refreshed("d1", Some(1))));
    assert!(!events.iter().any(|e| matches!(e, Event::Refreshed("d2", _))));
    assert_eq!(d1_signals.load(Ordering::SeqCst), 1);
    assert_eq!(d2_signals.load(Ordering::SeqCst), 0);

    // Dependents exist, so the batch path runs even with equal sizes.
    assert_eq!(events[0], Event::Before);
}

#[test]
fn test_notify_dependents_without_filtering() {
    let trigger = Row::new("t");
    let fx = Fixture::new(vec![trigger.clone(), Row::dependent("d", "t", true)]);
    fx.prime();

    fx.filter.notify_dependents(trigger).unwrap();
    fx.settle();
    assert_eq!(fx.view.take(), vec![Event::Refreshed("d", Some(1))]);
}

#[test]
fn test_interceptor_failure_leaves_displayed_list() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b")]);
    fx.prime();

    let id = fx
        .filter
        .add_interceptor_fn(Stage::Main, |chain: &mut Chain<'_, Row>| {
            Err(chain.fail("corrupt row"))
        });
    fx.source.push(Row::new("c"));
    fx.filter.update();
    fx.settle();

    assert_eq!(fx.displayed_names(), vec!["a", "b"]);
    assert!(fx.view.take().is_empty());
    assert_eq!(fx.filter.pending_tasks(), 0);

    let err = fx.filter.filter(&fx.filter.displayed()).unwrap_err();
    assert_eq!(err, FilterError::interceptor(Stage::Main, "corrupt row"));

    assert!(fx.filter.remove_interceptor(Stage::Main, id));
    fx.filter.update();
    fx.settle();
    assert_eq!(fx.displayed_names(), vec!["a", "b", "c"]);
}

#[test]
fn test_interrupt_stops_remaining_interceptors() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b"), Row::new("c")]);
    let calls = Arc::new(AtomicUsize::new(0));

    fx.filter.interceptors(Stage::Main).clear();
    for index in 0..5 {
        if index == 2 {
            fx.filter
                .add_interceptor_fn(Stage::Main, |chain: &mut Chain<'_, Row>| {
                    chain.interrupt();
                    Ok(chain.requested()[..1].to_vec())
                });
        } else {
            fx.filter
                .add_interceptor_fn(Stage::Main, counting_interceptor(&calls));
        }
    }
    fx.filter
        .add_interceptor_fn(Stage::After, counting_interceptor(&calls));
    fx.filter
        .add_interceptor_fn(Stage::After, counting_interceptor(&calls));

    fx.filter.update();
    fx.settle();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(fx.displayed_names(), vec!["a"]);
}

#[test]
fn test_async_update_runs_on_worker_pool() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b")]);
    let thread_name = Arc::new(Mutex::new(None));
    let seen = thread_name.clone();
    fx.filter
        .add_interceptor_fn(Stage::Before, move |chain: &mut Chain<'_, Row>| {
            *seen.lock() = std::thread::current().name().map(str::to_string);
            Ok(chain.requested().to_vec())
        });

    fx.filter
        .request_update(FilterParams::new().with_async(true));
    fx.settle();

    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Inserted(0, 2), Event::After]
    );
    let name = thread_name.lock().clone().unwrap_or_default();
    assert!(name.starts_with("listdiff-worker"), "ran on {name}");
}

#[test]
fn test_mid_layout_defers_immediate_run() {
    let fx = Fixture::new(vec![Row::new("a")]);
    fx.view.mid_layout.store(true, Ordering::SeqCst);

    fx.filter.update();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(fx.filter.displayed_len(), 0);
    assert_eq!(fx.filter.pending_tasks(), 1);

    fx.view.mid_layout.store(false, Ordering::SeqCst);
    fx.settle();
    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Inserted(0, 1), Event::After]
    );
}

#[test]
fn test_mid_layout_defers_dispatch() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b")]);
    fx.view.mid_layout.store(true, Ordering::SeqCst);

    fx.filter
        .request_update(FilterParams::new().with_async(true));
    let deadline = Instant::now() + Duration::from_secs(5);
    while fx.filter.displayed_len() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(fx.filter.displayed_len(), 2);
    assert!(fx.view.take().is_empty());

    fx.view.mid_layout.store(false, Ordering::SeqCst);
    fx.settle();
    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Inserted(0, 2), Event::After]
    );
}

#[test]
fn test_consumer_may_query_filter_from_layout_check() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b")]);
    let queries = Arc::new(AtomicUsize::new(0));
    let filter = Arc::downgrade(&fx.filter);
    let seen = queries.clone();
    let hook: LayoutHook = Arc::new(move || {
        if let Some(filter) = filter.upgrade() {
            let _ = filter.pending_deliveries();
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });
    *fx.view.layout_hook.lock() = Some(hook);

    fx.filter
        .request_update(FilterParams::new().with_async(true));
    fx.settle();

    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Inserted(0, 2), Event::After]
    );
    assert!(queries.load(Ordering::SeqCst) > 0);
}

#[test]
fn test_rejected_delivery_does_not_stall_later_updates() {
    let fx = Fixture::with_ui(vec![Row::new("a")], FilterConfig::default(), |ui| {
        Arc::new(FlakyUi {
            inner: ui,
            reject_next: AtomicBool::new(true),
        })
    });

    fx.filter.update();
    fx.settle();
    assert_eq!(fx.filter.displayed_len(), 1);
    assert_eq!(fx.filter.pending_tasks(), 0);
    assert!(fx.view.take().is_empty());

    fx.source.push(Row::new("b"));
    fx.filter.update();
    fx.settle();

    assert_eq!(fx.displayed_names(), vec!["a", "b"]);
    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Inserted(1, 1), Event::After]
    );
    assert_eq!(fx.filter.pending_deliveries(), 0);
}

#[test]
fn test_panicking_background_pass_releases_task() {
    let fx = Fixture::new(vec![Row::new("a")]);
    fx.prime();

    let id = fx
        .filter
        .add_interceptor_fn(Stage::Main, |_chain: &mut Chain<'_, Row>| {
            panic!("interceptor bug")
        });
    fx.source.push(Row::new("b"));
    fx.filter
        .request_update(FilterParams::new().with_async(true));
    fx.settle();

    assert_eq!(fx.displayed_names(), vec!["a"]);
    assert!(fx.view.take().is_empty());

    assert!(fx.filter.remove_interceptor(Stage::Main, id));
    fx.filter.update();
    fx.settle();
    assert_eq!(fx.displayed_names(), vec!["a", "b"]);
}

#[test]
fn test_deliveries_arrive_in_commit_order() {
    let fx = Fixture::new(vec![Row::new("a")]);

    fx.filter
        .request_update(FilterParams::new().with_notify_delay(Duration::from_millis(60)));
    fx.source.push(Row::new("b"));
    fx.filter.update();
    assert_eq!(fx.displayed_names(), vec!["a", "b"]);

    fx.settle();
    assert_eq!(
        fx.view.take(),
        vec![
            Event::Before,
            Event::Inserted(0, 1),
            Event::After,
            Event::Before,
            Event::Inserted(1, 1),
            Event::After,
        ]
    );
}

#[test]
fn test_dispatch_override_replaces_batch_update() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b")]);
    let seen = Arc::new(Mutex::new(None));
    let record = seen.clone();

    fx.filter.request_update(FilterParams::new().with_dispatch_override(
        move |script, list: &[Arc<Row>]| {
            *record.lock() = Some((script.len(), list.len()));
        },
    ));
    fx.settle();

    assert_eq!(*seen.lock(), Some((1, 2)));
    assert_eq!(fx.view.take(), vec![Event::Before, Event::After]);
}

#[test]
fn test_cancel_all_drops_debounced_request() {
    let fx = Fixture::new(vec![Row::new("a")]);

    fx.filter.request_update(
        FilterParams::new()
            .with_run_immediately(false)
            .with_debounce(Duration::from_millis(20)),
    );
    assert_eq!(fx.filter.cancel_all(), 1);
    assert_eq!(fx.filter.pending_tasks(), 0);

    std::thread::sleep(Duration::from_millis(60));
    fx.settle();
    assert_eq!(fx.filter.displayed_len(), 0);
    assert!(fx.view.take().is_empty());
}

#[test]
fn test_skip_request_does_nothing() {
    let fx = Fixture::new(vec![Row::new("a")]);

    fx.filter
        .request_update(FilterParams::new().with_skip(true));
    fx.settle();

    assert_eq!(fx.filter.displayed_len(), 0);
    assert!(fx.view.take().is_empty());
}

#[test]
fn test_diff_result_hook_runs_for_displayed_items() {
    let a = Row::new("a");
    let hidden = Row::new("hidden");
    hidden.hidden.store(true, Ordering::SeqCst);
    let fx = Fixture::new(vec![a.clone(), hidden.clone()]);

    fx.filter.update();
    fx.settle();

    assert_eq!(a.diff_results.load(Ordering::SeqCst), 1);
    assert_eq!(hidden.diff_results.load(Ordering::SeqCst), 0);
}

#[test]
fn test_removed_listener_is_not_called() {
    let fx = Fixture::new(vec![Row::new("a")]);
    let extra = fx
        .filter
        .add_dispatch_listener(Arc::new(Hooks(fx.view.clone())));
    assert_eq!(fx.filter.dispatch_listener_count(), 2);

    assert!(fx.filter.remove_dispatch_listener(extra));
    assert!(!fx.filter.remove_dispatch_listener(extra));

    fx.filter.update();
    fx.settle();
    assert_eq!(
        fx.view.take(),
        vec![Event::Before, Event::Inserted(0, 1), Event::After]
    );
}

#[test]
fn test_status_item_replaces_list() {
    init_tracing();
    let source = Arc::new(SourceList::new(vec![Row::new("a"), Row::new("b")]));
    let view = Arc::new(Recorder::default());
    let ui = Arc::new(EventLoop::new("test-ui").unwrap());
    let filter = ListFilter::builder(source, view)
        .ui_context(ui.clone())
        .status_item(Row::new("status"))
        .load_more_item(Row::new("more"))
        .build()
        .unwrap();

    filter.update();
    let names: Vec<_> = filter.displayed().iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["a", "b", "more"]);

    let status = filter.status().unwrap();
    status.set_status(ListStatus::Loading);
    filter.update();
    let names: Vec<_> = filter.displayed().iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["status"]);

    status.set_status(ListStatus::None);
    filter.load_more().unwrap().set_enabled(false);
    filter.update();
    assert_eq!(filter.displayed_len(), 2);

    assert!(ui.flush(Duration::from_secs(5)));
}

#[test]
fn test_after_filter_hook_sees_displayed_list() {
    let fx = Fixture::new(vec![Row::new("a"), Row::new("b")]);
    fx.prime();

    let old_len = Arc::new(AtomicUsize::new(usize::MAX));
    let seen = old_len.clone();
    fx.filter
        .set_after_filter_hook(move |old: &[Arc<Row>], candidate: &[Arc<Row>]| {
            seen.store(old.len(), Ordering::SeqCst);
            candidate.iter().rev().cloned().collect()
        });
    fx.filter.update();
    fx.settle();

    assert_eq!(old_len.load(Ordering::SeqCst), 2);
    assert_eq!(fx.displayed_names(), vec!["b", "a"]);

    fx.filter.clear_after_filter_hook();
    fx.filter.update();
    fx.settle();
    assert_eq!(fx.displayed_names(), vec!["a", "b"]);
}
