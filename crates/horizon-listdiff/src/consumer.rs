//! The visual side of the pipeline: update sinks, consumers and dispatch
//! listeners.

use std::sync::Arc;

use crate::item::{ListItem, Payload};

/// Receives the batch operations of an edit script, in order.
///
/// Positions refer to the list as it stands after every previously
/// delivered operation has been applied.
pub trait ListUpdateSink: Send + Sync {
    /// `count` items were inserted at `position`.
    fn on_inserted(&self, position: usize, count: usize);

    /// `count` items were removed starting at `position`.
    fn on_removed(&self, position: usize, count: usize);

    /// The item at `from` moved so that it now sits at `to`.
    fn on_moved(&self, from: usize, to: usize);

    /// `count` items starting at `position` changed content.
    fn on_changed(&self, position: usize, count: usize, payload: Option<&Payload>);
}

/// The on-screen view a list filter keeps up to date.
///
/// Updates and refreshes are always delivered on the UI context.
pub trait ListConsumer<I: ListItem>: ListUpdateSink {
    /// Whether the view is in the middle of a layout pass and must not be
    /// updated right now. Updates are retried on the UI context until this
    /// returns `false`.
    ///
    /// May be queried from any thread.
    fn is_mid_layout(&self) -> bool {
        false
    }

    /// Refresh a single item without a batch update.
    ///
    /// `position` is the item's index in the displayed list, if it is shown.
    fn notify_changed(&self, item: &Arc<I>, position: Option<usize>, payload: Option<&Payload>);
}

/// Observes batch dispatches to the consumer.
///
/// Neither hook runs for lightweight single-item refreshes.
pub trait DispatchListener<I: ListItem>: Send + Sync {
    /// Called right before a batch update is applied.
    fn before_dispatch(&self, consumer: &dyn ListConsumer<I>) {
        let _ = consumer;
    }

    /// Called right after a batch update was applied.
    fn after_dispatch(&self, consumer: &dyn ListConsumer<I>) {
        let _ = consumer;
    }
}

/// Index of `item` in `list`, by reference.
pub(crate) fn position_of<I>(list: &[Arc<I>], item: &Arc<I>) -> Option<usize> {
    list.iter().position(|it| Arc::ptr_eq(it, item))
}
