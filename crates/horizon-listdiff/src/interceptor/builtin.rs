//! Built-in interceptors.
//!
//! The main stage is seeded with [`GroupInterceptor`], [`SubItemInterceptor`]
//! and [`HiddenInterceptor`]; the post-diff stage with a
//! [`StatusInterceptor`] when the filter is given a status item.
//! [`LoadMoreInterceptor`] is opt-in and belongs in the after stage.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::Result;
use crate::item::{ItemList, ListItem};

use super::{Chain, Interceptor};

/// Removes members of collapsed groups.
///
/// A group is collapsed when any item in the list heads it and reports
/// `is_group_expanded() == false`. Group heads themselves are always kept.
#[derive(Debug, Default)]
pub struct GroupInterceptor;

impl<I: ListItem> Interceptor<I> for GroupInterceptor {
    fn intercept(&self, chain: &mut Chain<'_, I>) -> Result<ItemList<I>> {
        let collapsed: HashSet<&str> = chain
            .requested()
            .iter()
            .filter(|item| item.is_group_head() && !item.is_group_expanded())
            .flat_map(|item| item.group_keys().iter().map(String::as_str))
            .collect();

        if collapsed.is_empty() {
            return Ok(chain.requested().to_vec());
        }

        Ok(chain
            .requested()
            .iter()
            .filter(|item| {
                item.is_group_head()
                    || !item
                        .group_keys()
                        .iter()
                        .any(|key| collapsed.contains(key.as_str()))
            })
            .cloned()
            .collect())
    }
}

/// Flattens expanded items' children in after their parent, depth first.
#[derive(Debug, Default)]
pub struct SubItemInterceptor;

impl SubItemInterceptor {
    fn flatten_into<I: ListItem>(item: &Arc<I>, out: &mut ItemList<I>) {
        out.push(item.clone());
        if item.is_expanded() {
            for child in item.sub_items() {
                Self::flatten_into(&child, out);
            }
        }
    }
}

impl<I: ListItem> Interceptor<I> for SubItemInterceptor {
    fn intercept(&self, chain: &mut Chain<'_, I>) -> Result<ItemList<I>> {
        let mut out = Vec::with_capacity(chain.requested().len());
        for item in chain.requested() {
            Self::flatten_into(item, &mut out);
        }
        Ok(out)
    }
}

/// Removes hidden items.
#[derive(Debug, Default)]
pub struct HiddenInterceptor;

impl<I: ListItem> Interceptor<I> for HiddenInterceptor {
    fn intercept(&self, chain: &mut Chain<'_, I>) -> Result<ItemList<I>> {
        Ok(chain
            .requested()
            .iter()
            .filter(|item| !item.is_hidden())
            .cloned()
            .collect())
    }
}

/// Appends a load-more sentinel item to every non-empty list.
pub struct LoadMoreInterceptor<I> {
    sentinel: Arc<I>,
    enabled: AtomicBool,
}

impl<I: ListItem> LoadMoreInterceptor<I> {
    /// Use `sentinel` as the load-more item. Starts enabled.
    pub fn new(sentinel: Arc<I>) -> Self {
        Self {
            sentinel,
            enabled: AtomicBool::new(true),
        }
    }

    /// The sentinel item.
    pub fn sentinel(&self) -> &Arc<I> {
        &self.sentinel
    }

    /// Enable or disable load-more.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl<I: ListItem> Interceptor<I> for LoadMoreInterceptor<I> {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn intercept(&self, chain: &mut Chain<'_, I>) -> Result<ItemList<I>> {
        let requested = chain.requested();
        if requested.is_empty() || requested.iter().any(|it| Arc::ptr_eq(it, &self.sentinel)) {
            return Ok(requested.to_vec());
        }

        let mut out = requested.to_vec();
        out.push(self.sentinel.clone());
        Ok(out)
    }
}

impl<I> std::fmt::Debug for LoadMoreInterceptor<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadMoreInterceptor")
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Whole-list state shown in place of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ListStatus {
    /// Show the data.
    #[default]
    None,
    /// Nothing to show.
    Empty,
    /// Data is being loaded.
    Loading,
    /// Loading failed.
    Error,
}

/// Replaces the candidate list with a status item while a status is active.
///
/// With `auto_empty` set, an empty candidate list is reported as
/// [`ListStatus::Empty`] even when no status was set explicitly.
pub struct StatusInterceptor<I> {
    status_item: Arc<I>,
    status: RwLock<ListStatus>,
    auto_empty: AtomicBool,
}

impl<I: ListItem> StatusInterceptor<I> {
    /// Use `status_item` to render the list status.
    pub fn new(status_item: Arc<I>) -> Self {
        Self {
            status_item,
            status: RwLock::new(ListStatus::None),
            auto_empty: AtomicBool::new(false),
        }
    }

    /// The status item.
    pub fn status_item(&self) -> &Arc<I> {
        &self.status_item
    }

    /// The explicitly set status.
    pub fn status(&self) -> ListStatus {
        *self.status.read()
    }

    /// Set the status shown on the next pass.
    pub fn set_status(&self, status: ListStatus) {
        *self.status.write() = status;
    }

    /// Report empty candidate lists as [`ListStatus::Empty`].
    pub fn set_auto_empty(&self, enabled: bool) {
        self.auto_empty.store(enabled, Ordering::Release);
    }

    /// The status that applies to `candidate`.
    pub fn effective_status(&self, candidate: &[Arc<I>]) -> ListStatus {
        match self.status() {
            ListStatus::None
                if candidate.is_empty() && self.auto_empty.load(Ordering::Acquire) =>
            {
                ListStatus::Empty
            }
            status => status,
        }
    }
}

impl<I: ListItem> Interceptor<I> for StatusInterceptor<I> {
    fn intercept(&self, chain: &mut Chain<'_, I>) -> Result<ItemList<I>> {
        if self.effective_status(chain.requested()) == ListStatus::None {
            return Ok(chain.requested().to_vec());
        }

        chain.interrupt();
        Ok(vec![self.status_item.clone()])
    }
}

impl<I> std::fmt::Debug for StatusInterceptor<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusInterceptor")
            .field("status", &*self.status.read())
            .field("auto_empty", &self.auto_empty.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::{Stage, run_stage};
    use crate::params::FilterParams;

    #[derive(Default)]
    struct Entry {
        name: &'static str,
        hidden: bool,
        groups: Vec<String>,
        head: bool,
        group_open: bool,
        children: Vec<Arc<Entry>>,
        open: bool,
    }

    impl ListItem for Entry {
        fn same_content(&self, other: &Self, _trigger: Option<&Self>) -> bool {
            self.name == other.name
        }

        fn is_hidden(&self) -> bool {
            self.hidden
        }

        fn sub_items(&self) -> Vec<Arc<Self>> {
            self.children.clone()
        }

        fn is_expanded(&self) -> bool {
            self.open
        }

        fn group_keys(&self) -> &[String] {
            &self.groups
        }

        fn is_group_head(&self) -> bool {
            self.head
        }

        fn is_group_expanded(&self) -> bool {
            self.group_open
        }
    }

    fn entry(name: &'static str) -> Entry {
        Entry {
            name,
            open: true,
            group_open: true,
            ..Default::default()
        }
    }

    fn names(list: &[Arc<Entry>]) -> Vec<&'static str> {
        list.iter().map(|e| e.name).collect()
    }

    fn run(
        interceptor: Arc<dyn Interceptor<Entry>>,
        source: &[Arc<Entry>],
    ) -> (ItemList<Entry>, bool) {
        let params = FilterParams::new();
        let mut chain = Chain::new(source, &params);
        run_stage(&mut chain, Stage::Main, &[interceptor]).unwrap();
        let interrupted = chain.is_interrupted();
        (chain.into_requested(), interrupted)
    }

    #[test]
    fn test_hidden_items_removed() {
        let source = vec![
            Arc::new(entry("a")),
            Arc::new(Entry {
                hidden: true,
                ..entry("b")
            }),
            Arc::new(entry("c")),
        ];
        let (out, _) = run(Arc::new(HiddenInterceptor), &source);
        assert_eq!(names(&out), vec!["a", "c"]);
    }

    #[test]
    fn test_sub_items_flattened_when_expanded() {
        let grandchild = Arc::new(entry("a.1.x"));
        let child = Arc::new(Entry {
            children: vec![grandchild],
            ..entry("a.1")
        });
        let closed_child = Arc::new(entry("b.1"));
        let source = vec![
            Arc::new(Entry {
                children: vec![child, Arc::new(entry("a.2"))],
                ..entry("a")
            }),
            Arc::new(Entry {
                children: vec![closed_child],
                open: false,
                ..entry("b")
            }),
        ];

        let (out, _) = run(Arc::new(SubItemInterceptor), &source);
        assert_eq!(names(&out), vec!["a", "a.1", "a.1.x", "a.2", "b"]);
    }

    #[test]
    fn test_collapsed_group_members_removed() {
        let group = |name, head, open| {
            Arc::new(Entry {
                groups: vec!["g".to_string()],
                head,
                group_open: open,
                ..entry(name)
            })
        };
        let source = vec![
            group("head", true, false),
            group("m1", false, true),
            Arc::new(entry("loose")),
            group("m2", false, true),
        ];

        let (out, _) = run(Arc::new(GroupInterceptor), &source);
        assert_eq!(names(&out), vec!["head", "loose"]);

        let source = vec![group("head", true, true), group("m1", false, true)];
        let (out, _) = run(Arc::new(GroupInterceptor), &source);
        assert_eq!(names(&out), vec!["head", "m1"]);
    }

    #[test]
    fn test_load_more_appended_once() {
        let sentinel = Arc::new(entry("more"));
        let interceptor = Arc::new(LoadMoreInterceptor::new(sentinel.clone()));

        let (out, _) = run(interceptor.clone(), &[Arc::new(entry("a"))]);
        assert_eq!(names(&out), vec!["a", "more"]);

        let (out, _) = run(interceptor.clone(), &[Arc::new(entry("a")), sentinel]);
        assert_eq!(names(&out), vec!["a", "more"]);

        let (out, _) = run(interceptor, &[]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_status_replaces_list_and_interrupts() {
        let status_item = Arc::new(entry("status"));
        let interceptor = Arc::new(StatusInterceptor::new(status_item));
        let source = vec![Arc::new(entry("a"))];

        let (out, interrupted) = run(interceptor.clone(), &source);
        assert_eq!(names(&out), vec!["a"]);
        assert!(!interrupted);

        interceptor.set_status(ListStatus::Loading);
        let (out, interrupted) = run(interceptor.clone(), &source);
        assert_eq!(names(&out), vec!["status"]);
        assert!(interrupted);
    }

    #[test]
    fn test_status_auto_empty() {
        let interceptor = StatusInterceptor::new(Arc::new(entry("status")));
        assert_eq!(interceptor.effective_status(&[]), ListStatus::None);

        interceptor.set_auto_empty(true);
        assert_eq!(interceptor.effective_status(&[]), ListStatus::Empty);
        assert_eq!(
            interceptor.effective_status(&[Arc::new(entry("a"))]),
            ListStatus::None
        );
    }
}
