//! Ordered interceptor pipelines.
//!
//! An interceptor receives the [`Chain`] for the current pass and returns
//! the list the next interceptor should see. Interceptors are grouped into
//! [`Stage`]s; the filter engine runs the before, main and after stages to
//! build the candidate list, then the post-diff stage right before diffing.
//!
//! # Example
//!
//! ```
//! use horizon_listdiff::interceptor::{Chain, FnInterceptor, Interceptor, InterceptorRegistry};
//! use horizon_listdiff::ListItem;
//! use std::sync::Arc;
//!
//! struct Row(u32);
//! impl ListItem for Row {
//!     fn same_content(&self, other: &Self, _: Option<&Self>) -> bool { self.0 == other.0 }
//! }
//!
//! let registry = InterceptorRegistry::<Row>::new();
//! let id = registry.add(Arc::new(FnInterceptor::new(|chain: &mut Chain<'_, Row>| {
//!     Ok(chain.requested().iter().filter(|r| r.0 > 1).cloned().collect())
//! })));
//!
//! assert_eq!(registry.len(), 1);
//! assert!(registry.remove(id));
//! ```

mod builtin;
mod chain;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::Result;
use crate::item::{ItemList, ListItem};

pub use builtin::{
    GroupInterceptor, HiddenInterceptor, ListStatus, LoadMoreInterceptor, StatusInterceptor,
    SubItemInterceptor,
};
pub use chain::{Chain, run_stage};

/// The pipeline stage an interceptor is registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Runs first, before any built-in filtering.
    Before,
    /// Group folding, sub-item flattening and hidden-item removal.
    Main,
    /// Runs last before diffing; load-more sentinels belong here.
    After,
    /// Runs on the candidate list against the displayed list.
    PostDiff,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "before",
            Self::Main => "main",
            Self::After => "after",
            Self::PostDiff => "post-diff",
        };
        f.write_str(name)
    }
}

/// A single step in a filtering stage.
pub trait Interceptor<I: ListItem>: Send + Sync {
    /// Disabled interceptors are skipped.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Produce the list handed to the next interceptor.
    ///
    /// Call [`Chain::interrupt`] to stop the rest of the pass.
    fn intercept(&self, chain: &mut Chain<'_, I>) -> Result<ItemList<I>>;
}

/// Wraps a closure as an [`Interceptor`].
pub struct FnInterceptor<F> {
    intercept: F,
    enabled: AtomicBool,
}

impl<F> FnInterceptor<F> {
    /// Wrap `intercept`. The interceptor starts enabled.
    pub fn new(intercept: F) -> Self {
        Self {
            intercept,
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable or disable the interceptor.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl<I, F> Interceptor<I> for FnInterceptor<F>
where
    I: ListItem,
    F: Fn(&mut Chain<'_, I>) -> Result<ItemList<I>> + Send + Sync,
{
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn intercept(&self, chain: &mut Chain<'_, I>) -> Result<ItemList<I>> {
        (self.intercept)(chain)
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor")
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Identifies a registered interceptor for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

impl InterceptorId {
    /// Get the raw u64 value of this id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique interceptor ids.
static NEXT_INTERCEPTOR_ID: AtomicU64 = AtomicU64::new(1);

fn next_interceptor_id() -> InterceptorId {
    InterceptorId(NEXT_INTERCEPTOR_ID.fetch_add(1, Ordering::Relaxed))
}

type Entry<I> = (InterceptorId, Arc<dyn Interceptor<I>>);

/// An ordered, mutable list of interceptors for one stage.
///
/// Each pass works on a [`snapshot`](Self::snapshot), so changes made while
/// a pass is running take effect on the next one.
pub struct InterceptorRegistry<I> {
    entries: RwLock<Vec<Entry<I>>>,
}

impl<I: ListItem> Default for InterceptorRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ListItem> InterceptorRegistry<I> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// A registry seeded with `interceptors`, in order.
    pub fn with_interceptors(interceptors: Vec<Arc<dyn Interceptor<I>>>) -> Self {
        let registry = Self::new();
        for interceptor in interceptors {
            registry.add(interceptor);
        }
        registry
    }

    /// Append an interceptor.
    pub fn add(&self, interceptor: Arc<dyn Interceptor<I>>) -> InterceptorId {
        let id = next_interceptor_id();
        self.entries.write().push((id, interceptor));
        id
    }

    /// Insert an interceptor at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, interceptor: Arc<dyn Interceptor<I>>) -> InterceptorId {
        let id = next_interceptor_id();
        let mut entries = self.entries.write();
        let index = index.min(entries.len());
        entries.insert(index, (id, interceptor));
        id
    }

    /// Remove an interceptor. Returns `true` if it was registered.
    pub fn remove(&self, id: InterceptorId) -> bool {
        let mut entries = self.entries.write();
        match entries.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove every interceptor.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of registered interceptors.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no interceptor is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The interceptors in order, detached from the registry.
    pub fn snapshot(&self) -> Vec<Arc<dyn Interceptor<I>>> {
        self.entries
            .read()
            .iter()
            .map(|(_, interceptor)| interceptor.clone())
            .collect()
    }
}

impl<I> fmt::Debug for InterceptorRegistry<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<u64> = self.entries.read().iter().map(|(id, _)| id.0).collect();
        f.debug_struct("InterceptorRegistry").field("ids", &ids).finish()
    }
}
