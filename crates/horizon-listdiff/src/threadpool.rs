//! Background worker pool and cooperative cancellation.
//!
//! Asynchronous filter+diff passes run on a [`WorkerPool`] built on rayon.
//! Work is never interrupted mid-flight; it checks a [`CancellationToken`]
//! at its suspension points and drops its result once cancelled.
//!
//! # Example
//!
//! ```
//! use horizon_listdiff::threadpool::{CancellationToken, WorkerPool};
//! use std::sync::mpsc;
//!
//! let pool = WorkerPool::new(Some(2), "docs-worker").unwrap();
//! let token = CancellationToken::new();
//! let (tx, rx) = mpsc::channel();
//!
//! let task_token = token.clone();
//! pool.spawn(move || {
//!     if !task_token.is_cancelled() {
//!         tx.send(42).unwrap();
//!     }
//! });
//!
//! assert_eq!(rx.recv().unwrap(), 42);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};

use crate::config::FilterConfig;
use crate::error::{FilterError, Result};
use crate::logging::targets;

/// A cancellation token for cooperative task cancellation.
///
/// Clones share the same flag. Cancellation is one-way.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    ///
    /// Returns `true` if this call flipped the token.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }
}

/// A pool of background threads for filter+diff passes.
pub struct WorkerPool {
    pool: RayonThreadPool,
    active_tasks: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Create a pool with `num_threads` workers named `{thread_name}-{index}`.
    ///
    /// `None` uses one thread per CPU core.
    pub fn new(num_threads: Option<usize>, thread_name: &str) -> Result<Self> {
        let prefix = thread_name.to_string();
        let mut builder = ThreadPoolBuilder::new()
            .thread_name(move |index| format!("{prefix}-{index}"))
            .panic_handler(|_| {
                tracing::error!(target: targets::TASK, "background filter pass panicked");
            });

        if let Some(num_threads) = num_threads {
            builder = builder.num_threads(num_threads);
        }

        let pool = builder
            .build()
            .map_err(|e| FilterError::WorkerPool(e.to_string()))?;

        Ok(Self {
            pool,
            active_tasks: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Create a pool from the worker settings in `config`.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::new(config.worker_threads, &config.worker_thread_name)
    }

    /// Get the number of threads in the pool.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Get the number of spawned tasks that have not finished yet.
    pub fn active_tasks(&self) -> usize {
        self.active_tasks.load(Ordering::Acquire)
    }

    /// Run `task` on a worker thread.
    pub fn spawn<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.active_tasks.fetch_add(1, Ordering::AcqRel);
        let active_tasks = self.active_tasks.clone();

        self.pool.spawn(move || {
            let _guard = ActiveGuard(active_tasks);
            task();
        });
    }
}

/// Decrements the active count even when the task panics.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.num_threads())
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}

static_assertions::assert_impl_all!(WorkerPool: Send, Sync);
static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
