//! Edit scripts and the diff algorithm seam.
//!
//! The pipeline only talks to [`DiffAlgorithm`]. [`LcsDiff`] is the default
//! implementation: a linear-space longest-common-subsequence match over
//! item identity, with unmatched identities paired up as moves.
//!
//! # Example
//!
//! ```
//! use horizon_listdiff::{DiffAlgorithm, DiffCallbacks, EditOp, LcsDiff, ListItem};
//! use std::sync::Arc;
//!
//! struct Row(&'static str);
//! impl ListItem for Row {
//!     fn same_content(&self, other: &Self, _: Option<&Self>) -> bool { self.0 == other.0 }
//! }
//!
//! let a = Arc::new(Row("a"));
//! let b = Arc::new(Row("b"));
//! let c = Arc::new(Row("c"));
//!
//! let script = LcsDiff.compute(
//!     &[a.clone(), b, c.clone()],
//!     &[a, c],
//!     &DiffCallbacks::new(None, None),
//! );
//! assert_eq!(script.ops(), &[EditOp::Remove { position: 1, count: 1 }]);
//! ```

use std::ops::Range;
use std::sync::Arc;

use crate::consumer::ListUpdateSink;
use crate::item::{ListItem, Payload};

/// Item comparison callbacks handed to a [`DiffAlgorithm`].
///
/// Each callback forwards to the old item's [`ListItem`] hooks together with
/// the request's triggering item and payload.
pub struct DiffCallbacks<'a, I> {
    trigger: Option<&'a I>,
    payload: Option<&'a Payload>,
}

impl<'a, I: ListItem> DiffCallbacks<'a, I> {
    /// Callbacks for a request with the given trigger and payload.
    pub fn new(trigger: Option<&'a I>, payload: Option<&'a Payload>) -> Self {
        Self { trigger, payload }
    }

    /// Whether `old` and `new` are the same logical entry.
    pub fn items_match(&self, old: &I, new: &I) -> bool {
        old.same_identity(new, self.trigger)
    }

    /// Whether two matched entries render identically.
    pub fn contents_match(&self, old: &I, new: &I) -> bool {
        old.same_content(new, self.trigger)
    }

    /// Partial-update payload for a changed entry.
    pub fn payload_of(&self, old: &I, new: &I) -> Option<Payload> {
        old.change_payload(new, self.trigger, self.payload)
    }
}

/// Computes an edit script turning one list into another.
pub trait DiffAlgorithm<I: ListItem>: Send + Sync {
    /// Diff `old` against `new`.
    fn compute(&self, old: &[Arc<I>], new: &[Arc<I>], callbacks: &DiffCallbacks<'_, I>)
    -> EditScript;
}

/// A single batch operation.
#[derive(Debug, Clone)]
pub enum EditOp {
    /// Insert `count` items at `position`.
    Insert { position: usize, count: usize },
    /// Remove `count` items starting at `position`.
    Remove { position: usize, count: usize },
    /// Move the item at `from` to `to`.
    Move { from: usize, to: usize },
    /// `count` items starting at `position` changed content.
    Change {
        position: usize,
        count: usize,
        payload: Option<Payload>,
    },
}

impl PartialEq for EditOp {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Insert { position, count },
                Self::Insert {
                    position: p,
                    count: c,
                },
            )
            | (
                Self::Remove { position, count },
                Self::Remove {
                    position: p,
                    count: c,
                },
            ) => position == p && count == c,
            (Self::Move { from, to }, Self::Move { from: f, to: t }) => from == f && to == t,
            (
                Self::Change {
                    position,
                    count,
                    payload,
                },
                Self::Change {
                    position: p,
                    count: c,
                    payload: pl,
                },
            ) => position == p && count == c && same_payload(payload.as_ref(), pl.as_ref()),
            _ => false,
        }
    }
}

fn same_payload(a: Option<&Payload>, b: Option<&Payload>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// An ordered list of batch operations.
#[derive(Debug, Clone, Default)]
pub struct EditScript {
    ops: Vec<EditOp>,
    old_len: usize,
    new_len: usize,
}

impl EditScript {
    /// An empty script between two lists of the given lengths.
    pub fn new(old_len: usize, new_len: usize) -> Self {
        Self {
            ops: Vec::new(),
            old_len,
            new_len,
        }
    }

    /// The operations, in application order.
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    /// Length of the list the script applies to.
    pub fn old_len(&self) -> usize {
        self.old_len
    }

    /// Length of the list the script produces.
    pub fn new_len(&self) -> usize {
        self.new_len
    }

    /// Whether the script contains no operation at all.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether any insert, remove or move is present.
    pub fn has_structural_changes(&self) -> bool {
        self.ops
            .iter()
            .any(|op| !matches!(op, EditOp::Change { .. }))
    }

    /// Append an operation, merging it into the previous one when adjacent.
    pub fn push(&mut self, op: EditOp) {
        let merged = match (self.ops.last_mut(), &op) {
            (
                Some(EditOp::Insert { position, count }),
                EditOp::Insert {
                    position: next, ..
                },
            ) if *position + *count == *next => {
                *count += 1;
                true
            }
            (
                Some(EditOp::Remove { position, count }),
                EditOp::Remove {
                    position: next, ..
                },
            ) if *next + 1 == *position => {
                *position = *next;
                *count += 1;
                true
            }
            (
                Some(EditOp::Change {
                    position,
                    count,
                    payload,
                }),
                EditOp::Change {
                    position: next,
                    payload: next_payload,
                    ..
                },
            ) if *position + *count == *next
                && same_payload(payload.as_ref(), next_payload.as_ref()) =>
            {
                *count += 1;
                true
            }
            _ => false,
        };

        if !merged {
            self.ops.push(op);
        }
    }

    /// Deliver every operation to `sink`, in order.
    pub fn apply(&self, sink: &dyn ListUpdateSink) {
        for op in &self.ops {
            match op {
                EditOp::Insert { position, count } => sink.on_inserted(*position, *count),
                EditOp::Remove { position, count } => sink.on_removed(*position, *count),
                EditOp::Move { from, to } => sink.on_moved(*from, *to),
                EditOp::Change {
                    position,
                    count,
                    payload,
                } => sink.on_changed(*position, *count, payload.as_ref()),
            }
        }
    }
}

/// Longest-common-subsequence diff over item identity.
///
/// Common prefixes and suffixes are matched first. The rest is split
/// recursively around the row where the forward and backward LCS lengths
/// meet, so only two rows of scores are held at a time. Identities left out
/// of the subsequence become moves; items inside it never move. Operations
/// are emitted as removals (back to front), then moves, then inserts (front
/// to back), then content changes at their final positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct LcsDiff;

/// Old/new pairing produced by [`LcsDiff`].
struct Matcher<'m, 'c, I> {
    old: &'m [Arc<I>],
    new: &'m [Arc<I>],
    callbacks: &'m DiffCallbacks<'c, I>,
    old_to_new: Vec<Option<usize>>,
    new_to_old: Vec<Option<usize>>,
}

impl<'m, 'c, I: ListItem> Matcher<'m, 'c, I> {
    fn new(old: &'m [Arc<I>], new: &'m [Arc<I>], callbacks: &'m DiffCallbacks<'c, I>) -> Self {
        Self {
            old,
            new,
            callbacks,
            old_to_new: vec![None; old.len()],
            new_to_old: vec![None; new.len()],
        }
    }

    fn matches(&self, i: usize, j: usize) -> bool {
        self.callbacks.items_match(&self.old[i], &self.new[j])
    }

    fn pair(&mut self, i: usize, j: usize) {
        self.old_to_new[i] = Some(j);
        self.new_to_old[j] = Some(i);
    }

    fn conquer(&mut self, mut old: Range<usize>, mut new: Range<usize>) {
        while !old.is_empty() && !new.is_empty() && self.matches(old.start, new.start) {
            self.pair(old.start, new.start);
            old.start += 1;
            new.start += 1;
        }
        while !old.is_empty() && !new.is_empty() && self.matches(old.end - 1, new.end - 1) {
            old.end -= 1;
            new.end -= 1;
            self.pair(old.end, new.end);
        }
        if old.is_empty() || new.is_empty() {
            return;
        }

        if old.len() == 1 {
            if let Some(j) = new.clone().find(|&j| self.matches(old.start, j)) {
                self.pair(old.start, j);
            }
            return;
        }

        let mid = old.start + old.len() / 2;
        let split = {
            let forward = self.forward_row(old.start..mid, new.clone());
            let backward = self.backward_row(mid..old.end, new.clone());
            (0..=new.len())
                .max_by_key(|&k| forward[k] + backward[new.len() - k])
                .unwrap_or(0)
        };

        self.conquer(old.start..mid, new.start..new.start + split);
        self.conquer(mid..old.end, new.start + split..new.end);
    }

    /// `row[k]` is the LCS length of `old` and the first `k` items of `new`.
    fn forward_row(&self, old: Range<usize>, new: Range<usize>) -> Vec<usize> {
        let mut row = vec![0; new.len() + 1];
        for i in old {
            let mut diagonal = 0;
            for (k, j) in new.clone().enumerate() {
                let above = row[k + 1];
                row[k + 1] = if self.matches(i, j) {
                    diagonal + 1
                } else {
                    above.max(row[k])
                };
                diagonal = above;
            }
        }
        row
    }

    /// `row[k]` is the LCS length of `old` and the last `k` items of `new`.
    fn backward_row(&self, old: Range<usize>, new: Range<usize>) -> Vec<usize> {
        let mut row = vec![0; new.len() + 1];
        for i in old.rev() {
            let mut diagonal = 0;
            for (k, j) in new.clone().rev().enumerate() {
                let above = row[k + 1];
                row[k + 1] = if self.matches(i, j) {
                    diagonal + 1
                } else {
                    above.max(row[k])
                };
                diagonal = above;
            }
        }
        row
    }

    /// Pair identities left outside the subsequence. Returns which old
    /// items are part of the subsequence.
    fn pair_moves(&mut self) -> Vec<bool> {
        let stable: Vec<bool> = self.old_to_new.iter().map(Option::is_some).collect();
        for i in 0..self.old.len() {
            if stable[i] {
                continue;
            }
            let found = (0..self.new.len())
                .find(|&j| self.new_to_old[j].is_none() && self.matches(i, j));
            if let Some(j) = found {
                self.pair(i, j);
            }
        }
        stable
    }
}

impl<I: ListItem> DiffAlgorithm<I> for LcsDiff {
    fn compute(
        &self,
        old: &[Arc<I>],
        new: &[Arc<I>],
        callbacks: &DiffCallbacks<'_, I>,
    ) -> EditScript {
        let mut script = EditScript::new(old.len(), new.len());
        let mut matcher = Matcher::new(old, new, callbacks);
        matcher.conquer(0..old.len(), 0..new.len());
        let stable = matcher.pair_moves();
        let Matcher {
            old_to_new,
            new_to_old,
            ..
        } = matcher;

        for i in (0..old.len()).rev() {
            if old_to_new[i].is_none() {
                script.push(EditOp::Remove {
                    position: i,
                    count: 1,
                });
            }
        }

        // Surviving old indices as the view holds them. Each moved item is
        // placed right after the item preceding it in the new list, so the
        // survivors end up in new-list order.
        let mut current: Vec<usize> = (0..old.len()).filter(|&i| old_to_new[i].is_some()).collect();
        let mut previous: Option<usize> = None;
        for &i in new_to_old.iter().flatten() {
            if !stable[i] {
                if let Some(from) = current.iter().position(|&slot| slot == i) {
                    current.remove(from);
                    let to = previous
                        .and_then(|p| current.iter().position(|&slot| slot == p))
                        .map_or(0, |p| p + 1);
                    current.insert(to, i);
                    if from != to {
                        script.push(EditOp::Move { from, to });
                    }
                }
            }
            previous = Some(i);
        }

        for (j, source) in new_to_old.iter().enumerate() {
            if source.is_none() {
                script.push(EditOp::Insert {
                    position: j,
                    count: 1,
                });
            }
        }

        for (j, source) in new_to_old.iter().enumerate() {
            let Some(i) = *source else { continue };
            if !callbacks.contents_match(&old[i], &new[j]) {
                script.push(EditOp::Change {
                    position: j,
                    count: 1,
                    payload: callbacks.payload_of(&old[i], &new[j]),
                });
            }
        }

        script
    }
}
