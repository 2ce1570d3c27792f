//! Keeping views consistent with their master.
//!
//! Every slave and point set registers a [`SlaveLink`] on its master.
//! When the master's change window closes, the link replays the relevant
//! part of the master's changes into the view and repairs its membership.

use std::rc::Weak;

use femesh_core::ChangeFlags;

use crate::element::Element;
use crate::node::Node;
use crate::notify::{ChangeSink, RegionChanges};
use crate::region::{Region, RegionRole, RegionShared};

/// Master-side callback forwarding changes to one view.
pub(crate) struct SlaveLink {
    view: Weak<RegionShared>,
}

impl SlaveLink {
    pub(crate) fn new(view: Weak<RegionShared>) -> Self {
        Self { view }
    }
}

impl ChangeSink for SlaveLink {
    fn region_changed(&self, master: &Region, changes: &RegionChanges) {
        if let Some(shared) = self.view.upgrade() {
            Region(shared).absorb_master_changes(master, changes);
        }
    }
}

impl Region {
    /// Apply a master's notification to this view.
    ///
    /// Field changes are forwarded whole. Node and element changes are
    /// forwarded only for objects this view holds. Objects the master no
    /// longer has are dropped, and faces newly attached to this view's
    /// elements are added.
    pub(crate) fn absorb_master_changes(&self, master: &Region, changes: &RegionChanges) {
        self.state_mut().change_level += 1;
        let shares_nodes = self.role() != RegionRole::PointSet;
        {
            let mut guard = self.state_mut();
            let state = &mut *guard;
            if state.tracking() {
                state.changes.fields.merge(&changes.fields);
                let nodes = &state.nodes;
                let elements = &state.elements;
                if shares_nodes {
                    state.changes.nodes.merge_where(&changes.nodes, |n| {
                        nodes.get(&n.identifier()).is_some_and(|m| Node::ptr_eq(m, n))
                    });
                }
                state.changes.elements.merge_where(&changes.elements, |e| {
                    elements
                        .get(&e.identifier())
                        .is_some_and(|m| Element::ptr_eq(m, e))
                });
            }
        }
        let node_changes = changes.nodes.summary();
        let element_changes = changes.elements.summary();
        if shares_nodes && node_changes.contains(ChangeFlags::REMOVED) {
            self.drop_nodes_missing_from(master);
        }
        if element_changes.contains(ChangeFlags::REMOVED) {
            self.drop_elements_missing_from(master);
        }
        if element_changes.intersects(ChangeFlags::ADDED | ChangeFlags::CONTENTS_CHANGED) {
            self.add_missing_faces(master);
        }
        tracing::trace!(
            view = %self.namespace(),
            master = %master.namespace(),
            "absorbed master changes"
        );
        self.release_change_level();
    }

    fn drop_nodes_missing_from(&self, master: &Region) {
        for node in self.nodes() {
            if !master.contains_node(&node) {
                self.detach_node(&node);
            }
        }
    }

    fn drop_elements_missing_from(&self, master: &Region) {
        let mut state = self.state_mut();
        let missing: Vec<Element> = state
            .elements
            .values()
            .filter(|e| !master.contains_element(e))
            .cloned()
            .collect();
        for element in missing {
            state.elements.remove(&element.identifier());
            state.record_element(&element, ChangeFlags::REMOVED);
        }
    }

    fn add_missing_faces(&self, master: &Region) {
        let mut pending = self.elements();
        while let Some(element) = pending.pop() {
            for face in element.faces().into_iter().flatten() {
                if !self.contains_element(&face) && master.contains_element(&face) {
                    let mut state = self.state_mut();
                    state.elements.insert(face.identifier(), face.clone());
                    state.record_element(&face, ChangeFlags::ADDED);
                    drop(state);
                    pending.push(face);
                }
            }
        }
    }
}
