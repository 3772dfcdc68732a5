//! The UI context: a single thread that owns every consumer-facing call.
//!
//! The pipeline never touches the consumer from arbitrary threads. It posts
//! closures to a [`UiContext`], either right away or after a delay, and asks
//! it whether the caller already runs on it. [`EventLoop`] is the bundled
//! implementation: a dedicated thread draining a job channel plus a
//! min-heap of delayed jobs.
//!
//! Applications with their own UI thread implement [`UiContext`] on top of
//! it instead.
//!
//! # Example
//!
//! ```
//! use horizon_listdiff::{EventLoop, UiContext};
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::new("docs-ui").unwrap();
//! let on_loop = event_loop.invoke(|| std::thread::current().name().map(str::to_string)).unwrap();
//! assert_eq!(on_loop.as_deref(), Some("docs-ui"));
//!
//! event_loop.post_delayed(Duration::from_millis(5), Box::new(|| {})).unwrap();
//! event_loop.stop_and_join();
//! ```

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use parking_lot::Mutex;

use crate::error::{FilterError, Result};
use crate::logging::targets;

/// A unit of work posted to a UI context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The thread consumer-facing work is serialized on.
pub trait UiContext: Send + Sync {
    /// Run `job` on the context as soon as possible, after jobs posted
    /// before it.
    fn post(&self, job: Job) -> Result<()>;

    /// Run `job` on the context once `delay` has elapsed.
    fn post_delayed(&self, delay: Duration, job: Job) -> Result<()>;

    /// Whether the calling thread is the context's thread.
    fn is_current(&self) -> bool;
}

enum Message {
    Run(Job),
    RunAt(Instant, Job),
    Shutdown,
}

/// A delayed job in the min-heap, ordered by due time then post order.
struct DelayedEntry {
    run_at: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for DelayedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.run_at == other.run_at && self.seq == other.seq
    }
}

impl Eq for DelayedEntry {}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .run_at
            .cmp(&self.run_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A dedicated UI thread with immediate and delayed job queues.
///
/// Dropping the loop stops it; jobs still queued at that point are dropped
/// without running.
pub struct EventLoop {
    sender: Sender<Message>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
}

impl EventLoop {
    /// Start a loop on a new thread called `name`.
    pub fn new(name: &str) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                run_loop(&receiver);
                thread_running.store(false, Ordering::Release);
            })
            .map_err(|e| FilterError::EventLoop(e.to_string()))?;

        Ok(Self {
            sender,
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
            running,
        })
    }

    /// Check if the loop still accepts jobs.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The loop thread's id.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Run `f` on the loop and wait for its result.
    ///
    /// Runs inline when called from the loop thread.
    pub fn invoke<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_current() {
            return Ok(f());
        }

        let (result_sender, result_receiver) = bounded(1);
        self.post(Box::new(move || {
            let _ = result_sender.send(f());
        }))?;
        result_receiver.recv().map_err(|_| FilterError::ContextStopped)
    }

    /// Wait until every job posted before this call has run.
    ///
    /// Delayed jobs that are not due yet are not waited for. Returns `false`
    /// on timeout, when the loop has stopped, or when called from the loop
    /// thread itself.
    pub fn flush(&self, timeout: Duration) -> bool {
        if self.is_current() {
            return false;
        }

        let (done_sender, done_receiver) = bounded(1);
        let posted = self.post(Box::new(move || {
            let _ = done_sender.send(());
        }));
        posted.is_ok() && done_receiver.recv_timeout(timeout).is_ok()
    }

    /// Request the loop to stop after the job it is currently running.
    ///
    /// This is a non-blocking call. Jobs posted afterwards are rejected with
    /// [`FilterError::ContextStopped`].
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let _ = self.sender.send(Message::Shutdown);
    }

    /// Wait for the loop thread to finish.
    ///
    /// Returns `true` if the thread was joined successfully, `false` if
    /// already joined, called from the loop thread, or the thread panicked.
    pub fn join(&self) -> bool {
        if self.is_current() {
            return false;
        }
        match self.handle.lock().take() {
            Some(handle) => handle.join().is_ok(),
            None => false,
        }
    }

    /// Stop the loop and wait for it to finish.
    pub fn stop_and_join(&self) -> bool {
        self.stop();
        self.join()
    }

    fn send(&self, message: Message) -> Result<()> {
        if !self.is_running() {
            return Err(FilterError::ContextStopped);
        }
        self.sender
            .send(message)
            .map_err(|_| FilterError::ContextStopped)
    }
}

impl UiContext for EventLoop {
    fn post(&self, job: Job) -> Result<()> {
        self.send(Message::Run(job))
    }

    fn post_delayed(&self, delay: Duration, job: Job) -> Result<()> {
        if delay.is_zero() {
            return self.post(job);
        }
        self.send(Message::RunAt(Instant::now() + delay, job))
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("thread_id", &self.thread_id)
            .field("running", &self.is_running())
            .finish()
    }
}

static_assertions::assert_impl_all!(EventLoop: Send, Sync);

fn run_job(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::error!(target: targets::EVENT_LOOP, "job panicked on the UI context");
    }
}

fn run_loop(receiver: &Receiver<Message>) {
    let mut delayed: BinaryHeap<DelayedEntry> = BinaryHeap::new();
    let mut seq = 0u64;

    tracing::debug!(target: targets::EVENT_LOOP, "event loop started");

    loop {
        let now = Instant::now();
        while delayed.peek().is_some_and(|entry| entry.run_at <= now) {
            if let Some(entry) = delayed.pop() {
                run_job(entry.job);
            }
        }

        let message = match delayed.peek() {
            Some(entry) => receiver.recv_timeout(entry.run_at.saturating_duration_since(Instant::now())),
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match message {
            Ok(Message::Run(job)) => run_job(job),
            Ok(Message::RunAt(run_at, job)) => {
                seq += 1;
                delayed.push(DelayedEntry { run_at, seq, job });
            }
            Ok(Message::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    tracing::debug!(
        target: targets::EVENT_LOOP,
        dropped = delayed.len(),
        "event loop stopped"
    );
}
