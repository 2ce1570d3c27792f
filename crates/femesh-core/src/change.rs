//! Change flags and the generic [`ChangeLog`].
//!
//! A region keeps one log per object kind (fields, nodes, elements). Each
//! log maps a changed object to the accumulated [`ChangeFlags`] for the
//! current change window. When the window closes the region drains the
//! logs and hands them to its clients.

use indexmap::IndexMap;

bitflags::bitflags! {
    /// What happened to an object during a change window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangeFlags: u8 {
        /// The object was added to the region.
        const ADDED = 1 << 0;
        /// The object was removed from the region.
        const REMOVED = 1 << 1;
        /// The object's identifier changed.
        const IDENTIFIER_CHANGED = 1 << 2;
        /// The object's contents (fields, values, topology) changed.
        const CONTENTS_CHANGED = 1 << 3;
        /// An object this one depends on changed, e.g. a node whose
        /// layout stores a field that was redefined.
        const RELATED_OBJECT_CHANGED = 1 << 4;
        /// Any change to the object itself.
        const OBJECT_CHANGED = Self::IDENTIFIER_CHANGED.bits() | Self::CONTENTS_CHANGED.bits();
    }
}

impl ChangeFlags {
    /// Fold a newly recorded change into a previously recorded one.
    ///
    /// REMOVED overrides everything. ADDED absorbs every later change
    /// short of removal, so an object added and then edited in the same
    /// window is reported as simply added. Changes to an object already
    /// removed are dropped unless it is added again.
    pub fn combine(self, new: ChangeFlags) -> ChangeFlags {
        if new.contains(ChangeFlags::REMOVED) {
            ChangeFlags::REMOVED
        } else if new.contains(ChangeFlags::ADDED) || self.contains(ChangeFlags::ADDED) {
            ChangeFlags::ADDED
        } else if self.contains(ChangeFlags::REMOVED) {
            ChangeFlags::REMOVED
        } else {
            self | new
        }
    }
}

/// Objects that can be recorded in a [`ChangeLog`].
///
/// The key identifies the object, not its value: two handles to the same
/// node share a key, two distinct nodes with equal contents do not.
pub trait Tracked: Clone {
    /// Identity key, stable for the lifetime of the object.
    fn tracking_key(&self) -> usize;
}

/// Accumulated changes for one kind of object.
///
/// Entries keep the object alive until the log is drained, so a removed
/// node can still be inspected by the clients notified of its removal.
/// Iteration follows the order in which objects were first recorded.
#[derive(Clone, Debug)]
pub struct ChangeLog<T: Tracked> {
    entries: IndexMap<usize, (T, ChangeFlags)>,
    all_changed: Option<ChangeFlags>,
    max_changes: Option<usize>,
}

impl<T: Tracked> Default for ChangeLog<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<T: Tracked> ChangeLog<T> {
    /// Create an empty log.
    ///
    /// Once more than `max_changes` distinct objects are recorded the log
    /// stops enumerating them and reports every object as changed.
    pub fn new(max_changes: Option<usize>) -> Self {
        Self {
            entries: IndexMap::new(),
            all_changed: None,
            max_changes,
        }
    }

    /// Record `change` against `object`.
    pub fn record(&mut self, object: &T, change: ChangeFlags) {
        if change.is_empty() {
            return;
        }
        if let Some(all) = self.all_changed.as_mut() {
            *all |= change;
            return;
        }
        let key = object.tracking_key();
        if let Some((_, flags)) = self.entries.get_mut(&key) {
            *flags = flags.combine(change);
            return;
        }
        self.entries
            .insert(key, (object.clone(), ChangeFlags::empty().combine(change)));
        if self.max_changes.is_some_and(|max| self.entries.len() > max) {
            self.collapse();
        }
    }

    /// Mark every object of this kind as changed with `change`.
    pub fn record_all(&mut self, change: ChangeFlags) {
        self.collapse();
        if let Some(all) = self.all_changed.as_mut() {
            *all |= change;
        }
    }

    /// Fold every change of `other` into this log.
    pub fn merge(&mut self, other: &ChangeLog<T>) {
        self.merge_where(other, |_| true);
    }

    /// Fold the changes of `other` whose object satisfies `keep`.
    ///
    /// If `other` has collapsed to "all changed", the filter cannot be
    /// applied per object and this log collapses too.
    pub fn merge_where(&mut self, other: &ChangeLog<T>, mut keep: impl FnMut(&T) -> bool) {
        if let Some(all) = other.all_changed {
            self.record_all(all);
            return;
        }
        for (object, change) in other.entries.values() {
            if keep(object) {
                self.record(object, *change);
            }
        }
    }

    /// Take the accumulated changes, leaving an empty log with the same
    /// limit in place.
    pub fn drain(&mut self) -> ChangeLog<T> {
        let empty = ChangeLog::new(self.max_changes);
        std::mem::replace(self, empty)
    }

    /// Bitwise OR of every recorded change.
    pub fn summary(&self) -> ChangeFlags {
        if let Some(all) = self.all_changed {
            return all;
        }
        self.entries
            .values()
            .fold(ChangeFlags::empty(), |acc, (_, change)| acc | *change)
    }

    /// Changes recorded against `object`. In the "all changed" state this
    /// is the summary.
    pub fn change(&self, object: &T) -> ChangeFlags {
        if let Some(all) = self.all_changed {
            return all;
        }
        self.entries
            .get(&object.tracking_key())
            .map(|(_, change)| *change)
            .unwrap_or_default()
    }

    /// True when the log no longer enumerates objects individually.
    pub fn is_all_changed(&self) -> bool {
        self.all_changed.is_some()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.all_changed.is_none() && self.entries.is_empty()
    }

    /// Number of individually recorded objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Individually recorded objects and their changes.
    pub fn iter(&self) -> impl Iterator<Item = (&T, ChangeFlags)> {
        self.entries.values().map(|(object, change)| (object, *change))
    }

    fn collapse(&mut self) {
        if self.all_changed.is_none() {
            let summary = self.summary();
            self.entries.clear();
            self.all_changed = Some(summary);
        }
    }
}
