//! Diff delivery and dependency notification.
//!
//! Every committed diff result reaches the UI context as a [`Delivery`]
//! tagged with the displayed-list generation it produced. Deliveries are
//! processed strictly in generation order, whatever delay they were posted
//! with, so the consumer sees edit scripts in the order they were committed.
//!
//! Processing a delivery either dispatches the edit script to the consumer
//! (bracketed by the dispatch listeners), issues a single self-refresh for
//! the triggering item, or does nothing visual for filter-only requests.
//! Dependents of the triggering item are notified afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::consumer::{DispatchListener, position_of};
use crate::diff::EditScript;
use crate::filter::Shared;
use crate::item::{ItemList, ListItem};
use crate::logging::targets;
use crate::params::FilterParams;
use crate::task::{RetireGuard, UpdateTask};

/// Delay between checks while the consumer is mid-layout.
pub(crate) const LAYOUT_RETRY_DELAY: Duration = Duration::from_millis(1);

new_key_type! {
    /// Identifies a registered dispatch listener.
    pub struct DispatchListenerId;
}

/// A committed diff result on its way to the consumer.
pub(crate) struct Delivery<I> {
    pub(crate) task: Arc<UpdateTask<I>>,
    pub(crate) generation: u64,
    pub(crate) script: EditScript,
    pub(crate) list: ItemList<I>,
}

struct DeliveryQueue<I> {
    next_generation: u64,
    /// `None` marks a committed generation whose delivery never arrives.
    ready: BTreeMap<u64, Option<Delivery<I>>>,
    retry_scheduled: bool,
    draining: bool,
}

/// Dispatch listeners and the ordered delivery queue of one list filter.
pub(crate) struct Notifier<I> {
    listeners: Mutex<SlotMap<DispatchListenerId, Arc<dyn DispatchListener<I>>>>,
    queue: Mutex<DeliveryQueue<I>>,
}

impl<I: ListItem> Notifier<I> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Mutex::new(SlotMap::with_key()),
            queue: Mutex::new(DeliveryQueue {
                next_generation: 1,
                ready: BTreeMap::new(),
                retry_scheduled: false,
                draining: false,
            }),
        }
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn DispatchListener<I>>) -> DispatchListenerId {
        self.listeners.lock().insert(listener)
    }

    pub(crate) fn remove_listener(&self, id: DispatchListenerId) -> bool {
        self.listeners.lock().remove(id).is_some()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliveries committed but not yet processed.
    pub(crate) fn backlog(&self) -> usize {
        self.queue.lock().ready.values().flatten().count()
    }

    fn listeners(&self) -> Vec<Arc<dyn DispatchListener<I>>> {
        self.listeners.lock().values().cloned().collect()
    }
}

/// Resets the draining flag even if a consumer callback panics.
struct DrainGuard<'a, I: ListItem>(&'a Notifier<I>);

impl<I: ListItem> Drop for DrainGuard<'_, I> {
    fn drop(&mut self) {
        self.0.queue.lock().draining = false;
    }
}

/// Queue `delivery` and process every delivery that is now in order.
///
/// Must run on the UI context.
pub(crate) fn enqueue<I: ListItem>(shared: &Arc<Shared<I>>, delivery: Delivery<I>) {
    shared
        .notifier
        .queue
        .lock()
        .ready
        .insert(delivery.generation, Some(delivery));
    drain(shared);
}

/// Mark `generation` as never delivered so later generations are not held
/// back waiting for it.
///
/// Callable from any thread. The gap is consumed by the next drain.
pub(crate) fn skip<I: ListItem>(shared: &Shared<I>, generation: u64) {
    tracing::trace!(target: targets::NOTIFY, generation, "skipping undelivered generation");
    shared.notifier.queue.lock().ready.insert(generation, None);
}

fn drain<I: ListItem>(shared: &Arc<Shared<I>>) {
    {
        let mut queue = shared.notifier.queue.lock();
        if queue.draining {
            // A consumer callback requested an update; the outer loop
            // picks the new delivery up.
            return;
        }
        queue.draining = true;
    }
    let _guard = DrainGuard(&shared.notifier);

    loop {
        // Queried outside the queue lock: the consumer may call back into
        // the filter.
        let mid_layout = shared.consumer.is_mid_layout();
        let step = {
            let mut queue = shared.notifier.queue.lock();
            let next = queue.next_generation;
            let head = queue
                .ready
                .get(&next)
                .map(|entry| entry.as_ref().is_some_and(needs_safe_apply));
            match head {
                None => Step::Idle,
                Some(true) if mid_layout => {
                    if queue.retry_scheduled {
                        Step::Idle
                    } else {
                        queue.retry_scheduled = true;
                        Step::Retry
                    }
                }
                Some(_) => {
                    queue.next_generation += 1;
                    match queue.ready.remove(&next) {
                        Some(Some(delivery)) => Step::Process(delivery),
                        _ => Step::Skipped,
                    }
                }
            }
        };

        match step {
            Step::Process(delivery) => process(shared, delivery),
            Step::Retry => {
                schedule_retry(shared);
                return;
            }
            Step::Skipped => {}
            Step::Idle => return,
        }
    }
}

enum Step<I> {
    Process(Delivery<I>),
    Skipped,
    Retry,
    Idle,
}

/// Whether the delivery may end in a default batch apply.
fn needs_safe_apply<I: ListItem>(delivery: &Delivery<I>) -> bool {
    delivery
        .task
        .params()
        .is_some_and(|params| !params.filter_only && params.dispatch_override.is_none())
}

fn schedule_retry<I: ListItem>(shared: &Arc<Shared<I>>) {
    tracing::trace!(target: targets::NOTIFY, "consumer is mid-layout, deferring dispatch");

    let retry_shared = shared.clone();
    let posted = shared.ui.post_delayed(
        LAYOUT_RETRY_DELAY,
        Box::new(move || {
            retry_shared.notifier.queue.lock().retry_scheduled = false;
            drain(&retry_shared);
        }),
    );

    if let Err(err) = posted {
        shared.notifier.queue.lock().retry_scheduled = false;
        tracing::warn!(target: targets::NOTIFY, error = %err, "could not schedule dispatch retry");
    }
}

#[tracing::instrument(
    skip(shared, delivery),
    fields(task = delivery.task.id().as_u64(), generation = delivery.generation),
    target = "horizon_listdiff::notify",
    level = "trace"
)]
fn process<I: ListItem>(shared: &Arc<Shared<I>>, delivery: Delivery<I>) {
    let Delivery {
        task, script, list, ..
    } = delivery;
    let retire = RetireGuard::new(&shared.tasks, &task);
    let Some(params) = task.params() else {
        return;
    };

    // Superseded after commit: the script is still applied so the consumer
    // matches the displayed list, but item and dependent callbacks are dropped.
    let superseded = task.is_cancelled();

    if !superseded {
        for item in &list {
            item.on_diff_result(params);
        }
    }

    let dependents = match &params.trigger {
        Some(trigger) => shared.host.dependents_of(trigger),
        None => Vec::new(),
    };

    if params.filter_only {
        tracing::trace!(target: targets::NOTIFY, "filter-only request, no dispatch");
    } else if is_self_refresh(shared, params, &dependents, &script) {
        if let Some(trigger) = &params.trigger {
            let position = position_of(&list, trigger);
            shared
                .consumer
                .notify_changed(trigger, position, params.payload.as_ref());
        }
    } else {
        dispatch(shared, params, &script, &list);
    }

    if let Some(trigger) = params.trigger.as_ref().filter(|_| !superseded) {
        notify_dependents(shared, trigger, &dependents, &list);
    }

    drop(retire);

    let elapsed = task.elapsed();
    if shared.config.debug_logging && elapsed > shared.config.notify_log_threshold() {
        tracing::debug!(
            target: targets::NOTIFY,
            task = task.id().as_u64(),
            elapsed_ms = elapsed.as_millis() as u64,
            operations = script.len(),
            "slow update cycle"
        );
    }
}

fn is_self_refresh<I: ListItem>(
    shared: &Shared<I>,
    params: &FilterParams<I>,
    dependents: &[Arc<I>],
    script: &EditScript,
) -> bool {
    dependents.is_empty()
        && !params.update_dependents_with_empty
        && script.old_len() == script.new_len()
        && (!shared.config.strict_refresh_check || script.is_empty())
}

fn dispatch<I: ListItem>(
    shared: &Shared<I>,
    params: &FilterParams<I>,
    script: &EditScript,
    list: &[Arc<I>],
) {
    let listeners = shared.notifier.listeners();
    let consumer = &*shared.consumer;

    for listener in &listeners {
        listener.before_dispatch(consumer);
    }

    match &params.dispatch_override {
        Some(custom) => custom(script, list),
        None => script.apply(consumer),
    }

    for listener in &listeners {
        listener.after_dispatch(consumer);
    }

    tracing::trace!(
        target: targets::NOTIFY,
        operations = script.len(),
        listeners = listeners.len(),
        "dispatched"
    );
}

/// Refresh affected dependents and fire their update-from signals.
pub(crate) fn notify_dependents<I: ListItem>(
    shared: &Shared<I>,
    trigger: &Arc<I>,
    dependents: &[Arc<I>],
    displayed: &[Arc<I>],
) {
    if dependents.is_empty() {
        return;
    }

    if shared.config.debug_logging {
        tracing::debug!(
            target: targets::NOTIFY,
            dependents = dependents.len(),
            "notifying dependents"
        );
    }

    for dependent in dependents {
        if !dependent.is_affected_by(trigger) {
            continue;
        }

        shared
            .consumer
            .notify_changed(dependent, position_of(displayed, dependent), None);
        if let Some(signal) = dependent.update_from_signal() {
            signal.emit(trigger);
        }
    }
}
