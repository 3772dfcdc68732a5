//! Debouncing, execution-mode fan-out and the filter+diff computation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::diff::DiffCallbacks;
use crate::error::FilterError;
use crate::event_loop::Job;
use crate::filter::Shared;
use crate::item::ListItem;
use crate::logging::{PerfSpan, targets};
use crate::notify::{self, Delivery, LAYOUT_RETRY_DELAY};
use crate::params::FilterParams;
use crate::task::{Commit, RetireGuard, TaskId, UpdateTask};

/// Supersede every tracked task and schedule a new one for `params`.
pub(crate) fn request_update<I: ListItem>(shared: &Arc<Shared<I>>, params: FilterParams<I>) -> TaskId {
    let superseded = shared.tasks.cancel_all();
    let params = params.normalized();
    let immediate = params.run_immediately;
    let delay = params.effective_debounce(shared.config.default_debounce());

    let task = Arc::new(UpdateTask::new(params));
    let id = task.id();
    shared.tasks.track(task.clone());

    tracing::trace!(
        target: targets::TASK,
        task = id.as_u64(),
        superseded,
        immediate,
        "update requested"
    );

    if immediate {
        run_task(shared, task);
    } else {
        post_run(shared, task, delay);
    }
    id
}

fn missing_parameters<I: ListItem>(task: &UpdateTask<I>) {
    tracing::warn!(
        target: targets::TASK,
        task = task.id().as_u64(),
        error = %FilterError::MissingParameters,
        "task dropped"
    );
}

fn post<I: ListItem>(shared: &Shared<I>, task: &UpdateTask<I>, delay: Duration, job: Job) {
    if let Err(err) = shared.ui.post_delayed(delay, job) {
        tracing::warn!(
            target: targets::TASK,
            task = task.id().as_u64(),
            error = %err,
            "could not post to the UI context"
        );
        shared.tasks.retire(task);
    }
}

fn post_run<I: ListItem>(shared: &Arc<Shared<I>>, task: Arc<UpdateTask<I>>, delay: Duration) {
    let job_shared = shared.clone();
    let job_task = task.clone();
    post(shared, &task, delay, Box::new(move || run_task(&job_shared, job_task)));
}

fn run_task<I: ListItem>(shared: &Arc<Shared<I>>, task: Arc<UpdateTask<I>>) {
    let Some(params) = task.params() else {
        missing_parameters(&task);
        shared.tasks.retire(&task);
        return;
    };
    if task.is_cancelled() {
        tracing::trace!(target: targets::TASK, task = task.id().as_u64(), "task cancelled before run");
        shared.tasks.retire(&task);
        return;
    }
    let (async_diff, immediate) = (params.async_diff, params.run_immediately);

    if async_diff {
        let job_shared = shared.clone();
        shared.pool.spawn(move || compute(&job_shared, &task));
    } else if immediate {
        if shared.consumer.is_mid_layout() {
            tracing::trace!(target: targets::TASK, task = task.id().as_u64(), "consumer is mid-layout, retrying");
            post_run(shared, task, LAYOUT_RETRY_DELAY);
        } else {
            compute(shared, &task);
        }
    } else {
        let job_shared = shared.clone();
        let job_task = task.clone();
        post(
            shared,
            &task,
            Duration::ZERO,
            Box::new(move || compute(&job_shared, &job_task)),
        );
    }
}

/// Filter, diff and commit, then hand the result to the UI context.
///
/// The commit is refused if the task was cancelled, or if another task
/// committed after the displayed list was snapshotted. In the second case
/// the pass runs again against the newer list. Unless the result is handed
/// on, the task is retired on return or unwind.
fn compute<I: ListItem>(shared: &Arc<Shared<I>>, task: &Arc<UpdateTask<I>>) {
    let _span = PerfSpan::new("filter_diff");
    let retire = RetireGuard::new(&shared.tasks, task);
    let Some(params) = task.params() else {
        missing_parameters(task);
        return;
    };
    let started = Instant::now();

    loop {
        if task.is_cancelled() {
            tracing::trace!(target: targets::TASK, task = task.id().as_u64(), "task cancelled before filtering");
            return;
        }

        let (displayed, generation) = shared.displayed.snapshot();
        let source = shared.host.source_items();
        let filtered = shared
            .engine
            .filter(&source, params)
            .and_then(|candidate| shared.engine.filter_after_diff(&displayed, candidate, params));

        let list = match filtered {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(
                    target: targets::TASK,
                    task = task.id().as_u64(),
                    error = %err,
                    "filter pass failed, displayed list unchanged"
                );
                return;
            }
        };

        let callbacks = DiffCallbacks::new(params.trigger_ref(), params.payload.as_ref());
        let script = shared.differ.compute(&displayed, &list, &callbacks);

        match shared
            .displayed
            .commit(generation, list.clone(), || task.is_cancelled())
        {
            Commit::Committed(generation) => {
                let elapsed = started.elapsed();
                if shared.config.debug_logging && elapsed > shared.config.notify_log_threshold() {
                    tracing::debug!(
                        target: targets::TASK,
                        task = task.id().as_u64(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        items = list.len(),
                        "slow filter and diff"
                    );
                }

                let delivery = Delivery {
                    task: task.clone(),
                    generation,
                    script,
                    list,
                };
                retire.disarm();
                deliver(shared, delivery, params.notify_delay);
                return;
            }
            Commit::Cancelled => {
                tracing::trace!(target: targets::TASK, task = task.id().as_u64(), "task cancelled before commit");
                return;
            }
            Commit::Stale => {
                tracing::trace!(
                    target: targets::TASK,
                    task = task.id().as_u64(),
                    "displayed list changed during diff, recomputing"
                );
            }
        }
    }
}

fn deliver<I: ListItem>(shared: &Arc<Shared<I>>, delivery: Delivery<I>, delay: Option<Duration>) {
    if delay.is_none() && shared.ui.is_current() {
        notify::enqueue(shared, delivery);
        return;
    }

    let (task, generation) = (delivery.task.clone(), delivery.generation);
    let job_shared = shared.clone();
    let job: Job = Box::new(move || notify::enqueue(&job_shared, delivery));
    let posted = match delay {
        Some(delay) => shared.ui.post_delayed(delay, job),
        None => shared.ui.post(job),
    };

    if let Err(err) = posted {
        tracing::warn!(
            target: targets::NOTIFY,
            task = task.id().as_u64(),
            generation,
            error = %err,
            "could not deliver diff result to the UI context"
        );
        notify::skip(shared, generation);
        shared.tasks.retire(&task);
    }
}
