//! Update tasks, the tracked-task registry and the displayed list.
//!
//! Every update request becomes an [`UpdateTask`] bound to an immutable
//! parameter snapshot. A new request cancels every tracked task before its
//! own is tracked, so at most one task makes progress at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::item::{ItemList, ListItem};
use crate::params::FilterParams;
use crate::threadpool::CancellationToken;

/// Unique identifier for an update task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task ids.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// One scheduled unit of filter+diff work.
pub struct UpdateTask<I> {
    id: TaskId,
    params: Option<FilterParams<I>>,
    started: Instant,
    token: CancellationToken,
}

impl<I: ListItem> UpdateTask<I> {
    /// A task bound to `params`.
    pub fn new(params: FilterParams<I>) -> Self {
        Self::with_params(Some(params))
    }

    /// A task with an optional parameter snapshot.
    ///
    /// A task without parameters is cancelled from the start.
    pub fn with_params(params: Option<FilterParams<I>>) -> Self {
        Self {
            id: next_task_id(),
            params,
            started: Instant::now(),
            token: CancellationToken::new(),
        }
    }

    /// The task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The parameter snapshot.
    pub fn params(&self) -> Option<&FilterParams<I>> {
        self.params.as_ref()
    }

    /// Time since the task was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The task's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the task must not make further progress.
    ///
    /// True once cancelled, when the request asked to skip filtering, or
    /// when there is no parameter snapshot.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.params.as_ref().is_none_or(|p| p.skip)
    }

    /// Cancel the task. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl<I> std::fmt::Debug for UpdateTask<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateTask")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// The set of tasks not yet completed or cancelled.
pub struct TaskRegistry<I> {
    tasks: Mutex<Vec<Arc<UpdateTask<I>>>>,
}

impl<I: ListItem> Default for TaskRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ListItem> TaskRegistry<I> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Track a task.
    pub fn track(&self, task: Arc<UpdateTask<I>>) {
        self.tasks.lock().push(task);
    }

    /// Stop tracking a task. Returns `true` if it was tracked.
    pub fn remove(&self, id: TaskId) -> bool {
        let mut tasks = self.tasks.lock();
        match tasks.iter().position(|task| task.id() == id) {
            Some(pos) => {
                tasks.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Stop tracking `task` and cancel it. Idempotent.
    pub fn retire(&self, task: &UpdateTask<I>) {
        self.remove(task.id());
        task.cancel();
    }

    /// Cancel and forget every tracked task. Returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in &drained {
            task.cancel();
        }
        drained.len()
    }

    /// Whether a task is tracked.
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.lock().iter().any(|task| task.id() == id)
    }

    /// Parameters of the most recently tracked task that has them.
    pub fn latest_params(&self) -> Option<FilterParams<I>> {
        self.tasks
            .lock()
            .iter()
            .rev()
            .find_map(|task| task.params().cloned())
    }

    /// Number of tracked tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

/// Retires a task when dropped, including during a panic unwind, unless
/// [`disarm`](Self::disarm)ed first.
pub(crate) struct RetireGuard<'a, I: ListItem> {
    tasks: &'a TaskRegistry<I>,
    task: &'a UpdateTask<I>,
    armed: bool,
}

impl<'a, I: ListItem> RetireGuard<'a, I> {
    pub(crate) fn new(tasks: &'a TaskRegistry<I>, task: &'a UpdateTask<I>) -> Self {
        Self {
            tasks,
            task,
            armed: true,
        }
    }

    /// Keep the task tracked; its delivery retires it later.
    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl<I: ListItem> Drop for RetireGuard<'_, I> {
    fn drop(&mut self) {
        if self.armed {
            self.tasks.retire(self.task);
        }
    }
}

/// Result of trying to replace the displayed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// The list was replaced; carries the new generation.
    Committed(u64),
    /// The task was cancelled; nothing changed.
    Cancelled,
    /// Another task committed since the snapshot was taken.
    Stale,
}

/// The list currently shown, with a generation bumped on every commit.
pub struct DisplayedList<I> {
    inner: RwLock<(ItemList<I>, u64)>,
}

impl<I> Default for DisplayedList<I> {
    fn default() -> Self {
        Self {
            inner: RwLock::new((Vec::new(), 0)),
        }
    }
}

impl<I: ListItem> DisplayedList<I> {
    /// The current list and its generation.
    pub fn snapshot(&self) -> (ItemList<I>, u64) {
        let inner = self.inner.read();
        (inner.0.clone(), inner.1)
    }

    /// The current list.
    pub fn items(&self) -> ItemList<I> {
        self.inner.read().0.clone()
    }

    /// The current generation.
    pub fn generation(&self) -> u64 {
        self.inner.read().1
    }

    /// Number of displayed items.
    pub fn len(&self) -> usize {
        self.inner.read().0.len()
    }

    /// Whether nothing is displayed.
    pub fn is_empty(&self) -> bool {
        self.inner.read().0.is_empty()
    }

    /// Replace the list if it is still at generation `expected` and
    /// `cancelled` reports false. Both checks happen under the write lock.
    pub fn commit(
        &self,
        expected: u64,
        list: ItemList<I>,
        cancelled: impl FnOnce() -> bool,
    ) -> Commit {
        let mut inner = self.inner.write();
        if cancelled() {
            return Commit::Cancelled;
        }
        if inner.1 != expected {
            return Commit::Stale;
        }
        inner.0 = list;
        inner.1 += 1;
        Commit::Committed(inner.1)
    }
}

impl<I> std::fmt::Debug for DisplayedList<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("DisplayedList")
            .field("len", &inner.0.len())
            .field("generation", &inner.1)
            .finish()
    }
}
