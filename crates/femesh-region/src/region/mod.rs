//! The [`Region`]: containers, lifecycle, change windows and callbacks.
//!
//! A region is either a root, which owns the field table, layout tables
//! and the canonical node and element sets, or a view onto a master:
//!
//! - a **slave** holds a subset of its master's nodes and elements and
//!   forwards every mutation to it;
//! - a **point set** shares its master's fields, layouts and elements
//!   but owns a separate node namespace (data points kept apart from
//!   mesh nodes).
//!
//! The owners of each namespace are resolved once, when the view is
//! created, and cached.

mod elements;
mod fields;
mod nodes;

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use femesh_core::{
    BasisRegistry, ChangeFlags, ElementId, Field, MeshError, NamespaceId, NodeId, ShapeRegistry,
    TimeSequenceRegistry,
};
use femesh_layout::{ElementField, ElementLayout, FieldStorage, LayoutTable, NodeField, NodeLayout};

use crate::config::RegionConfig;
use crate::element::Element;
use crate::faces::FaceIndex;
use crate::identifier::IdentifierCache;
use crate::node::Node;
use crate::notify::{CallbackId, ChangeSink, RegionChanges};
use crate::propagate::SlaveLink;

/// How a region relates to its master.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionRole {
    /// No master; owns every namespace.
    Root,
    /// Subset view of its master.
    Slave,
    /// Shares its master's fields and elements, owns its own nodes.
    PointSet,
}

/// Storage held only by a root region.
#[derive(Debug, Default)]
pub(crate) struct Store {
    pub(crate) fields: IndexMap<String, Field>,
    pub(crate) node_layouts: LayoutTable<NodeField>,
    pub(crate) element_layouts: LayoutTable<ElementField>,
    pub(crate) bases: BasisRegistry,
    pub(crate) time_sequences: TimeSequenceRegistry,
    pub(crate) shapes: ShapeRegistry,
    pub(crate) element_ids: [IdentifierCache; 3],
    pub(crate) faces: Option<FaceIndex>,
}

pub(crate) struct RegionState {
    pub(crate) store: Option<Store>,
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) elements: BTreeMap<ElementId, Element>,
    pub(crate) node_ids: IdentifierCache,
    pub(crate) changes: RegionChanges,
    pub(crate) change_level: u32,
    pub(crate) callbacks: Vec<(CallbackId, Rc<dyn ChangeSink>)>,
    pub(crate) dependents: Vec<Weak<RegionShared>>,
    next_callback: u64,
    last_node_layout: Option<Weak<NodeLayout>>,
    last_element_layout: Option<Weak<ElementLayout>>,
}

impl RegionState {
    fn new(store: Option<Store>, config: &RegionConfig) -> Self {
        Self {
            store,
            nodes: BTreeMap::new(),
            elements: BTreeMap::new(),
            node_ids: IdentifierCache::new(),
            changes: RegionChanges::new(config),
            change_level: 0,
            callbacks: Vec::new(),
            dependents: Vec::new(),
            next_callback: 1,
            last_node_layout: None,
            last_element_layout: None,
        }
    }

    pub(crate) fn store(&self) -> Result<&Store, MeshError> {
        self.store
            .as_ref()
            .ok_or_else(|| MeshError::structural("region does not own a field store"))
    }

    pub(crate) fn store_mut(&mut self) -> Result<&mut Store, MeshError> {
        self.store
            .as_mut()
            .ok_or_else(|| MeshError::structural("region does not own a field store"))
    }

    /// With no clients there is nobody to tell, so logs are not kept.
    pub(crate) fn tracking(&self) -> bool {
        !self.callbacks.is_empty()
    }

    pub(crate) fn record_field(&mut self, field: &Field, change: ChangeFlags) {
        if self.tracking() {
            self.changes.fields.record(field, change);
        }
    }

    /// Record a node change. The fields stored at the node are marked
    /// RELATED_OBJECT_CHANGED unless they were already marked for the
    /// same layout.
    pub(crate) fn record_node(&mut self, node: &Node, change: ChangeFlags) {
        if !self.tracking() {
            return;
        }
        self.changes.nodes.record(node, change);
        let layout = node.layout();
        let seen = self
            .last_node_layout
            .as_ref()
            .is_some_and(|last| std::ptr::eq(last.as_ptr(), Rc::as_ptr(&layout)));
        if !seen {
            for storage in layout.fields() {
                self.changes
                    .fields
                    .record(storage.field(), ChangeFlags::RELATED_OBJECT_CHANGED);
            }
            self.last_node_layout = Some(Rc::downgrade(&layout));
        }
    }

    /// Element counterpart of [`RegionState::record_node`].
    pub(crate) fn record_element(&mut self, element: &Element, change: ChangeFlags) {
        if !self.tracking() {
            return;
        }
        self.changes.elements.record(element, change);
        let layout = element.layout();
        let seen = self
            .last_element_layout
            .as_ref()
            .is_some_and(|last| std::ptr::eq(last.as_ptr(), Rc::as_ptr(&layout)));
        if !seen {
            for storage in layout.fields() {
                self.changes
                    .fields
                    .record(storage.field(), ChangeFlags::RELATED_OBJECT_CHANGED);
            }
            self.last_element_layout = Some(Rc::downgrade(&layout));
        }
    }

    pub(crate) fn contains_node(&self, node: &Node) -> bool {
        self.nodes
            .get(&node.identifier())
            .is_some_and(|n| Node::ptr_eq(n, node))
    }

    pub(crate) fn contains_element(&self, element: &Element) -> bool {
        self.elements
            .get(&element.identifier())
            .is_some_and(|e| Element::ptr_eq(e, element))
    }

    fn drain_changes(&mut self) -> RegionChanges {
        self.last_node_layout = None;
        self.last_element_layout = None;
        self.changes.drain()
    }
}

pub(crate) struct RegionShared {
    role: RegionRole,
    namespace: NamespaceId,
    config: RegionConfig,
    master: Option<Region>,
    field_owner: Option<Region>,
    node_owner: Option<Region>,
    master_link: Cell<Option<CallbackId>>,
    pub(crate) state: RefCell<RegionState>,
}

impl Drop for RegionShared {
    fn drop(&mut self) {
        let (Some(master), Some(link)) = (&self.master, self.master_link.get()) else {
            return;
        };
        match master.0.state.try_borrow_mut() {
            Ok(mut state) => {
                state.callbacks.retain(|(id, _)| *id != link);
                state.dependents.retain(|d| d.strong_count() > 0);
            }
            Err(_) => {
                tracing::warn!(
                    region = %self.namespace,
                    "master busy while detaching dropped region; its link goes stale"
                );
            }
        }
    }
}

/// Shared handle to a finite-element region.
///
/// Cloning the handle does not copy the region. All mutation goes
/// through methods on this type; each mutating method brackets itself in
/// a change window, so callers only need [`Region::begin_change`] to
/// batch several operations into one notification.
#[derive(Clone)]
pub struct Region(pub(crate) Rc<RegionShared>);

impl Region {
    /// Create a root region.
    pub fn new(config: RegionConfig) -> Result<Region, MeshError> {
        config.validate()?;
        let state = RegionState::new(Some(Store::default()), &config);
        Ok(Region(Rc::new(RegionShared {
            role: RegionRole::Root,
            namespace: NamespaceId::next(),
            config,
            master: None,
            field_owner: None,
            node_owner: None,
            master_link: Cell::new(None),
            state: RefCell::new(state),
        })))
    }

    /// Create a slave view of `master`.
    ///
    /// The slave starts empty; objects merged into it are merged into the
    /// master and become visible in the slave.
    pub fn new_slave(master: &Region) -> Region {
        Self::attach(master, RegionRole::Slave)
    }

    /// Create an auxiliary point-set region on `master`.
    ///
    /// The point set uses the master's fields and elements (so its nodes
    /// can embed locations in the master's mesh) but keeps its nodes in a
    /// namespace of its own.
    pub fn new_point_set(master: &Region) -> Region {
        Self::attach(master, RegionRole::PointSet)
    }

    fn attach(master: &Region, role: RegionRole) -> Region {
        let config = master.0.config.clone();
        let node_owner = match role {
            RegionRole::PointSet => None,
            _ => Some(master.node_owner().clone()),
        };
        let state = RegionState::new(None, &config);
        let region = Region(Rc::new(RegionShared {
            role,
            namespace: NamespaceId::next(),
            config,
            master: Some(master.clone()),
            field_owner: Some(master.field_owner().clone()),
            node_owner,
            master_link: Cell::new(None),
            state: RefCell::new(state),
        }));
        let link = master.add_callback(Rc::new(SlaveLink::new(Rc::downgrade(&region.0))));
        region.0.master_link.set(Some(link));
        master
            .state_mut()
            .dependents
            .push(Rc::downgrade(&region.0));
        region
    }

    /// Destroy this handle's region.
    ///
    /// Fails with [`MeshError::InUse`] while any other handle (including a
    /// slave's reference to its master) is alive; the region then stays
    /// alive through those handles. Destroying inside an open change
    /// window indicates unbalanced begin/end calls and is logged.
    pub fn destroy(self) -> Result<(), MeshError> {
        let others = Rc::strong_count(&self.0) - 1;
        if others > 0 {
            return Err(MeshError::in_use(format!(
                "region {} ({others} other handles)",
                self.0.namespace
            )));
        }
        let level = self.state().change_level;
        if level != 0 {
            tracing::warn!(
                region = %self.0.namespace,
                change_level = level,
                "destroying region inside an unbalanced change window"
            );
        }
        Ok(())
    }

    /// Number of live handles to this region.
    pub fn access_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Identity comparison.
    pub fn ptr_eq(a: &Region, b: &Region) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Relationship to the master.
    pub fn role(&self) -> RegionRole {
        self.0.role
    }

    /// This region's own namespace id.
    pub fn namespace(&self) -> NamespaceId {
        self.0.namespace
    }

    /// Configuration, inherited from the master for views.
    pub fn config(&self) -> &RegionConfig {
        &self.0.config
    }

    /// Immediate master, if this is a view.
    pub fn master(&self) -> Option<&Region> {
        self.0.master.as_ref()
    }

    /// The root whose field table, layouts and elements this region uses.
    pub fn ultimate_master(&self) -> &Region {
        self.field_owner()
    }

    pub(crate) fn field_owner(&self) -> &Region {
        self.0.field_owner.as_ref().unwrap_or(self)
    }

    /// Region owning the node namespace this region's nodes live in.
    pub fn node_owner(&self) -> &Region {
        self.0.node_owner.as_ref().unwrap_or(self)
    }

    pub(crate) fn is_field_owner(&self) -> bool {
        self.0.field_owner.is_none()
    }

    pub(crate) fn is_node_owner(&self) -> bool {
        self.0.node_owner.is_none()
    }

    /// Namespace fields and elements are created for.
    pub fn field_namespace(&self) -> NamespaceId {
        self.field_owner().0.namespace
    }

    /// Namespace nodes are created for.
    pub fn node_namespace(&self) -> NamespaceId {
        self.node_owner().0.namespace
    }

    pub(crate) fn state(&self) -> Ref<'_, RegionState> {
        self.0.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, RegionState> {
        self.0.state.borrow_mut()
    }

    /// Run `f` on the field owner's store.
    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&Store) -> R) -> Result<R, MeshError> {
        let state = self.field_owner().state();
        Ok(f(state.store()?))
    }

    /// Run `f` on the field owner's store, mutably.
    pub(crate) fn with_store_mut<R>(
        &self,
        f: impl FnOnce(&mut Store) -> R,
    ) -> Result<R, MeshError> {
        let mut state = self.field_owner().state_mut();
        Ok(f(state.store_mut()?))
    }

    /// Live views registered on this region.
    pub(crate) fn dependents(&self) -> Vec<Region> {
        self.state()
            .dependents
            .iter()
            .filter_map(Weak::upgrade)
            .map(Region)
            .collect()
    }

    // ── Change windows ─────────────────────────────────────────────

    /// Open a change window. Windows nest; the master's window is opened
    /// too so that its notification waits for ours.
    pub fn begin_change(&self) {
        self.state_mut().change_level += 1;
        if let Some(master) = &self.0.master {
            master.begin_change();
        }
    }

    /// Close a change window. Closing the outermost window delivers one
    /// notification if anything changed.
    pub fn end_change(&self) -> Result<(), MeshError> {
        if self.state().change_level == 0 {
            return Err(MeshError::invalid_argument(
                "end_change without matching begin_change",
            ));
        }
        self.close_change();
        Ok(())
    }

    /// Current nesting depth of change windows.
    pub fn change_level(&self) -> u32 {
        self.state().change_level
    }

    fn close_change(&self) {
        if let Some(master) = &self.0.master {
            master.close_change();
        }
        self.release_change_level();
    }

    pub(crate) fn release_change_level(&self) {
        let level = {
            let mut state = self.state_mut();
            state.change_level = state.change_level.saturating_sub(1);
            state.change_level
        };
        if level == 0 {
            self.update();
        }
    }

    /// Run `f` inside a change window.
    pub(crate) fn bracket<R>(
        &self,
        f: impl FnOnce() -> Result<R, MeshError>,
    ) -> Result<R, MeshError> {
        self.begin_change();
        let result = f();
        self.close_change();
        result
    }

    fn update(&self) {
        let (changes, sinks) = {
            let mut state = self.state_mut();
            if state.change_level != 0 || state.changes.is_empty() {
                return;
            }
            let changes = state.drain_changes();
            let sinks: Vec<Rc<dyn ChangeSink>> =
                state.callbacks.iter().map(|(_, sink)| Rc::clone(sink)).collect();
            (changes, sinks)
        };
        tracing::trace!(
            region = %self.0.namespace,
            sinks = sinks.len(),
            fields = ?changes.fields().summary(),
            nodes = ?changes.nodes().summary(),
            elements = ?changes.elements().summary(),
            "dispatching region changes"
        );
        for sink in sinks {
            sink.region_changed(self, &changes);
        }
    }

    // ── Callbacks ──────────────────────────────────────────────────

    /// Register a sink for change notifications.
    pub fn add_callback(&self, sink: Rc<dyn ChangeSink>) -> CallbackId {
        let mut state = self.state_mut();
        let id = CallbackId(state.next_callback);
        state.next_callback += 1;
        state.callbacks.push((id, sink));
        id
    }

    /// Register a closure for change notifications.
    pub fn add_callback_fn(&self, f: impl Fn(&Region, &RegionChanges) + 'static) -> CallbackId {
        self.add_callback(Rc::new(f))
    }

    /// Unregister a sink.
    pub fn remove_callback(&self, id: CallbackId) -> Result<(), MeshError> {
        let mut state = self.state_mut();
        let before = state.callbacks.len();
        state.callbacks.retain(|(cid, _)| *cid != id);
        if state.callbacks.len() == before {
            return Err(MeshError::invalid_argument(format!("no {id} registered")));
        }
        Ok(())
    }

    /// Number of registered sinks, including views of this region.
    pub fn number_of_callbacks(&self) -> usize {
        self.state().callbacks.len()
    }

    // ── Whole-region operations ────────────────────────────────────

    /// Remove every element, node and (for a root) field.
    ///
    /// Elements go top-down so faces disappear with their last parent.
    /// Fields still used as indexers are removed after the fields they
    /// index.
    pub fn clear(&self) -> Result<(), MeshError> {
        self.bracket(|| {
            let mut elements = self.elements();
            elements.sort_by_key(|e| std::cmp::Reverse(e.dimension()));
            for element in elements {
                if self.contains_element(&element) {
                    self.remove_element(&element)?;
                }
            }
            for node in self.nodes() {
                self.remove_node(&node)?;
            }
            if self.is_field_owner() {
                let mut remaining = self.fields();
                while !remaining.is_empty() {
                    let before = remaining.len();
                    let mut kept = Vec::new();
                    for field in remaining {
                        if self.is_field_in_use(&field) {
                            kept.push(field);
                        } else {
                            self.remove_field(&field)?;
                        }
                    }
                    if kept.len() == before {
                        return Err(MeshError::in_use(format!(
                            "{} fields still referenced after clearing",
                            kept.len()
                        )));
                    }
                    remaining = kept;
                }
            }
            Ok(())
        })
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Region")
            .field("namespace", &self.0.namespace)
            .field("role", &self.0.role)
            .field("nodes", &state.nodes.len())
            .field("elements", &state.elements.len())
            .field("change_level", &state.change_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use femesh_core::{FieldDefinition, ValueType};
    use std::cell::Cell;

    fn counting_callback(region: &Region) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        region.add_callback_fn(move |_, _| seen.set(seen.get() + 1));
        count
    }

    #[test]
    fn empty_window_sends_nothing() {
        let region = Region::new(RegionConfig::default()).unwrap();
        let count = counting_callback(&region);
        region.begin_change();
        region.end_change().unwrap();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn nested_windows_send_one_notification() {
        let region = Region::new(RegionConfig::default()).unwrap();
        let count = counting_callback(&region);
        region.begin_change();
        region.begin_change();
        region.merge_node(&region.create_node(NodeId(1)).unwrap()).unwrap();
        region.end_change().unwrap();
        assert_eq!(count.get(), 0);
        region.merge_node(&region.create_node(NodeId(2)).unwrap()).unwrap();
        region.end_change().unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn unbalanced_end_is_rejected() {
        let region = Region::new(RegionConfig::default()).unwrap();
        assert!(matches!(
            region.end_change(),
            Err(MeshError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn removing_unknown_callback_fails() {
        let region = Region::new(RegionConfig::default()).unwrap();
        let id = region.add_callback_fn(|_, _| {});
        assert!(region.remove_callback(id).is_ok());
        assert!(region.remove_callback(id).is_err());
    }

    #[test]
    fn destroy_fails_while_slave_holds_master() {
        let master = Region::new(RegionConfig::default()).unwrap();
        let slave = Region::new_slave(&master);
        assert_eq!(master.number_of_callbacks(), 1);
        assert!(master.clone().destroy().is_err());
        slave.destroy().unwrap();
        assert_eq!(master.number_of_callbacks(), 0);
        assert_eq!(master.access_count(), 1);
        master.destroy().unwrap();
    }

    #[test]
    fn views_resolve_owners_at_creation() {
        let root = Region::new(RegionConfig::default()).unwrap();
        let slave = Region::new_slave(&root);
        let nested = Region::new_slave(&slave);
        let points = Region::new_point_set(&root);
        let point_slave = Region::new_slave(&points);
        assert!(Region::ptr_eq(nested.ultimate_master(), &root));
        assert!(Region::ptr_eq(nested.node_owner(), &root));
        assert!(Region::ptr_eq(points.ultimate_master(), &root));
        assert!(Region::ptr_eq(points.node_owner(), &points));
        assert!(Region::ptr_eq(point_slave.node_owner(), &points));
        assert_ne!(points.node_namespace(), root.node_namespace());
        assert_eq!(points.field_namespace(), root.field_namespace());
    }

    #[test]
    fn clear_removes_everything() {
        let region = Region::new(RegionConfig::default()).unwrap();
        let field = region
            .merge_field(
                &region
                    .create_field("temperature", FieldDefinition::new(ValueType::Real, 1))
                    .unwrap(),
            )
            .unwrap();
        let node = region.create_node(NodeId(1)).unwrap();
        region
            .define_field_at_node(&node, NodeField::values_only(field))
            .unwrap();
        region.merge_node(&node).unwrap();
        let count = counting_callback(&region);
        region.clear().unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(region.number_of_nodes(), 0);
        assert_eq!(region.number_of_fields(), 0);
    }
}
