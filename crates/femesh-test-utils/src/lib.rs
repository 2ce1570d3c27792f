//! Test utilities for femesh development.
//!
//! Provides a [`RecordingSink`] that keeps every notification a region
//! sends, and mesh builders in [`fixtures`] for setting up regions with
//! nodes, elements and a coordinate field.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::cell::RefCell;
use std::rc::Rc;

use femesh_region::{CallbackId, ChangeSink, ChangeSummary, Region, RegionChanges};

/// Change sink that records a [`ChangeSummary`] of every notification.
///
/// Clones share the same record, so keep one clone for assertions and
/// hand the other to [`RecordingSink::attach`].
#[derive(Clone, Default)]
pub struct RecordingSink {
    received: Rc<RefCell<Vec<ChangeSummary>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clone of this sink on `region`.
    pub fn attach(&self, region: &Region) -> CallbackId {
        region.add_callback(Rc::new(self.clone()))
    }

    /// Number of notifications received so far.
    pub fn count(&self) -> usize {
        self.received.borrow().len()
    }

    /// All summaries received, oldest first.
    pub fn summaries(&self) -> Vec<ChangeSummary> {
        self.received.borrow().clone()
    }

    /// The most recent summary.
    pub fn last(&self) -> Option<ChangeSummary> {
        self.received.borrow().last().cloned()
    }

    /// Forget everything received so far.
    pub fn clear(&self) {
        self.received.borrow_mut().clear();
    }
}

impl ChangeSink for RecordingSink {
    fn region_changed(&self, _region: &Region, changes: &RegionChanges) {
        self.received.borrow_mut().push(changes.summary());
    }
}
