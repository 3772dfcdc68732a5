//! The item contract and the host that owns the source list.
//!
//! Items are owned by the caller and shared with the pipeline as `Arc<I>`.
//! The pipeline never creates or destroys items; it only filters and
//! reorders references to them.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::params::FilterParams;
use crate::signal::Signal;

/// Opaque payload attached to a request or to a change operation.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// An ordered list of shared items.
pub type ItemList<I> = Vec<Arc<I>>;

/// The capabilities the pipeline requires from a list item.
///
/// Every comparison receives the item that triggered the update (if any),
/// so an item can tailor its identity, content or payload semantics to the
/// reason the update was requested.
///
/// Only [`same_content`](ListItem::same_content) is required. The remaining
/// hooks drive the built-in interceptors and dependency propagation and
/// default to "plain flat item".
pub trait ListItem: Send + Sync + Sized + 'static {
    /// Whether `self` and `other` represent the same logical entry.
    ///
    /// Defaults to reference identity.
    fn same_identity(&self, other: &Self, trigger: Option<&Self>) -> bool {
        let _ = trigger;
        std::ptr::eq(self, other)
    }

    /// Whether two entries of the same identity render identically.
    fn same_content(&self, other: &Self, trigger: Option<&Self>) -> bool;

    /// Partial-update payload for a changed entry.
    ///
    /// Defaults to the request payload.
    fn change_payload(
        &self,
        other: &Self,
        trigger: Option<&Self>,
        payload: Option<&Payload>,
    ) -> Option<Payload> {
        let _ = (other, trigger);
        payload.cloned()
    }

    /// Hidden items are removed by the main filter stage.
    fn is_hidden(&self) -> bool {
        false
    }

    /// Child items flattened in after this item while it is expanded.
    fn sub_items(&self) -> Vec<Arc<Self>> {
        Vec::new()
    }

    /// Whether [`sub_items`](ListItem::sub_items) are currently shown.
    fn is_expanded(&self) -> bool {
        true
    }

    /// Groups this item belongs to.
    fn group_keys(&self) -> &[String] {
        &[]
    }

    /// Whether this item heads the groups in [`group_keys`](ListItem::group_keys).
    fn is_group_head(&self) -> bool {
        false
    }

    /// Whether a group head shows its members.
    fn is_group_expanded(&self) -> bool {
        true
    }

    /// Whether this item declares a dependency on `trigger`.
    fn depends_on(&self, trigger: &Self) -> bool {
        let _ = trigger;
        false
    }

    /// Whether this dependent wants to be refreshed because `trigger` changed.
    fn is_affected_by(&self, trigger: &Self) -> bool {
        let _ = trigger;
        true
    }

    /// Observers notified when this item is updated because of another item.
    fn update_from_signal(&self) -> Option<&Signal<Arc<Self>>> {
        None
    }

    /// Called on every displayed item after a diff result is delivered.
    fn on_diff_result(&self, params: &FilterParams<Self>) {
        let _ = params;
    }
}

/// Provides the raw source list and reverse-dependency lookups.
pub trait ItemHost<I: ListItem>: Send + Sync {
    /// Snapshot of the unfiltered source list.
    fn source_items(&self) -> ItemList<I>;

    /// Every item that declares a dependency on `trigger`.
    fn dependents_of(&self, trigger: &Arc<I>) -> ItemList<I> {
        self.source_items()
            .into_iter()
            .filter(|item| !Arc::ptr_eq(item, trigger) && item.depends_on(trigger))
            .collect()
    }
}

/// A plain mutable source list that can serve as an [`ItemHost`].
pub struct SourceList<I> {
    items: RwLock<ItemList<I>>,
}

impl<I> Default for SourceList<I> {
    fn default() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }
}

impl<I: ListItem> SourceList<I> {
    /// Creates a source list from the given items.
    pub fn new(items: ItemList<I>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Replaces the whole list.
    pub fn set(&self, items: ItemList<I>) {
        *self.items.write() = items;
    }

    /// Appends an item.
    pub fn push(&self, item: Arc<I>) {
        self.items.write().push(item);
    }

    /// Inserts an item at `index`, clamped to the list length.
    pub fn insert(&self, index: usize, item: Arc<I>) {
        let mut items = self.items.write();
        let index = index.min(items.len());
        items.insert(index, item);
    }

    /// Removes `item` by reference. Returns `true` if it was present.
    pub fn remove(&self, item: &Arc<I>) -> bool {
        let mut items = self.items.write();
        match items.iter().position(|it| Arc::ptr_eq(it, item)) {
            Some(pos) => {
                items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl<I: ListItem> ItemHost<I> for SourceList<I> {
    fn source_items(&self) -> ItemList<I> {
        self.items.read().clone()
    }
}

impl<I> std::fmt::Debug for SourceList<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceList")
            .field("len", &self.items.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        name: &'static str,
        parent: Option<&'static str>,
    }

    impl ListItem for Node {
        fn same_content(&self, other: &Self, _trigger: Option<&Self>) -> bool {
            self.name == other.name
        }

        fn depends_on(&self, trigger: &Self) -> bool {
            self.parent == Some(trigger.name)
        }
    }

    fn node(name: &'static str, parent: Option<&'static str>) -> Arc<Node> {
        Arc::new(Node { name, parent })
    }

    #[test]
    fn test_default_identity_is_reference() {
        let a = node("a", None);
        let a2 = node("a", None);
        assert!(a.same_identity(&a, None));
        assert!(!a.same_identity(&a2, None));
        assert!(a.same_content(&a2, None));
    }

    #[test]
    fn test_default_payload_is_request_payload() {
        let a = node("a", None);
        let payload: Payload = Arc::new(7_u32);
        let result = a.change_payload(&a, None, Some(&payload)).unwrap();
        assert_eq!(result.downcast_ref::<u32>(), Some(&7));
        assert!(a.change_payload(&a, None, None).is_none());
    }

    #[test]
    fn test_source_list_dependents() {
        let root = node("root", None);
        let child = node("child", Some("root"));
        let other = node("other", Some("elsewhere"));
        let list = SourceList::new(vec![root.clone(), child.clone(), other]);

        let dependents = list.dependents_of(&root);
        assert_eq!(dependents.len(), 1);
        assert!(Arc::ptr_eq(&dependents[0], &child));
    }

    #[test]
    fn test_source_list_mutation() {
        let list = SourceList::default();
        let a = node("a", None);
        let b = node("b", None);
        list.push(a.clone());
        list.insert(0, b.clone());
        assert_eq!(list.len(), 2);
        assert!(Arc::ptr_eq(&list.source_items()[0], &b));

        assert!(list.remove(&b));
        assert!(!list.remove(&b));
        assert_eq!(list.len(), 1);
        assert!(!list.is_empty());
    }
}
