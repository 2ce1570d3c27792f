//! Node membership, identifiers, field definition and values.

use std::rc::Rc;

use femesh_core::{ChangeFlags, Field, MeshError, NodeId, TimeSequence, ValueType};
use femesh_layout::{FieldStorage, NodalValueType, NodeField};

use super::Region;
use crate::node::Node;
use crate::value::{copy_values, FieldValue};

impl Region {
    /// The interned time sequence holding exactly `times`.
    pub fn time_sequence(&self, times: &[f64]) -> Result<Rc<TimeSequence>, MeshError> {
        self.with_store_mut(|store| store.time_sequences.get_matching(times))?
    }

    /// The interned time sequence holding the times of both `a` and `b`.
    pub fn time_sequence_union(
        &self,
        a: &TimeSequence,
        b: &TimeSequence,
    ) -> Result<Rc<TimeSequence>, MeshError> {
        self.with_store_mut(|store| store.time_sequences.get_union(a, b))
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Node with `identifier` in this region.
    pub fn get_node_from_identifier(&self, identifier: NodeId) -> Option<Node> {
        self.state().nodes.get(&identifier).cloned()
    }

    /// True if this exact node object is in the region.
    pub fn contains_node(&self, node: &Node) -> bool {
        self.state().contains_node(node)
    }

    /// Number of nodes.
    pub fn number_of_nodes(&self) -> usize {
        self.state().nodes.len()
    }

    /// Snapshot of the nodes in identifier order.
    pub fn nodes(&self) -> Vec<Node> {
        self.state().nodes.values().cloned().collect()
    }

    /// Call `f` for each node in identifier order, stopping at the first
    /// error.
    ///
    /// Iterates a snapshot, so `f` may modify the region.
    pub fn for_each_node<E>(&self, mut f: impl FnMut(&Node) -> Result<(), E>) -> Result<(), E> {
        for node in self.nodes() {
            f(&node)?;
        }
        Ok(())
    }

    /// First node, in identifier order, satisfying `predicate`.
    pub fn first_node_that(&self, mut predicate: impl FnMut(&Node) -> bool) -> Option<Node> {
        self.state().nodes.values().find(|n| predicate(n)).cloned()
    }

    /// Smallest unused node identifier `>= start` in the node namespace.
    ///
    /// With a start of 0 or 1, consecutive calls interleaved with merges
    /// return strictly increasing identifiers.
    pub fn next_free_node_identifier(&self, start: u32) -> Result<u32, MeshError> {
        let mut guard = self.node_owner().state_mut();
        let state = &mut *guard;
        let nodes = &state.nodes;
        state
            .node_ids
            .next_free(start, |id| nodes.contains_key(&NodeId(id)))
    }

    // ── Creation ───────────────────────────────────────────────────

    /// Create a node with no fields, ready to merge into this region.
    pub fn create_node(&self, identifier: NodeId) -> Result<Node, MeshError> {
        let layout = self.with_store_mut(|store| store.node_layouts.empty_layout())?;
        Ok(Node::new(identifier, self.node_namespace(), layout, Vec::new()))
    }

    /// Create a node with the fields and values of `template`.
    pub fn create_node_from_template(
        &self,
        identifier: NodeId,
        template: &Node,
    ) -> Result<Node, MeshError> {
        self.check_node_namespace(template)?;
        let values = template.values().to_vec();
        Ok(Node::new(
            identifier,
            self.node_namespace(),
            template.layout(),
            values,
        ))
    }

    /// The node with `identifier`, created empty and merged in if absent.
    pub fn get_or_create_node_with_identifier(
        &self,
        identifier: NodeId,
    ) -> Result<Node, MeshError> {
        if let Some(node) = self.get_node_from_identifier(identifier) {
            return Ok(node);
        }
        let node = self.create_node(identifier)?;
        self.merge_node(&node)
    }

    // ── Membership ─────────────────────────────────────────────────

    /// Merge `node` into this region and return the canonical node.
    ///
    /// If the node owner already holds a different node with the same
    /// identifier, `node`'s fields and values are merged into it and the
    /// existing node is returned. Merging into a slave also merges into
    /// its master.
    pub fn merge_node(&self, node: &Node) -> Result<Node, MeshError> {
        self.check_node_namespace(node)?;
        self.bracket(|| {
            let master = match (&self.0.master, self.is_node_owner()) {
                (Some(master), false) => master,
                _ => return self.merge_owned_node(node),
            };
            let canonical = master.merge_node(node)?;
            let mut state = self.state_mut();
            if !state.nodes.contains_key(&canonical.identifier()) {
                state.nodes.insert(canonical.identifier(), canonical.clone());
                state.record_node(&canonical, ChangeFlags::ADDED);
            }
            Ok(canonical)
        })
    }

    fn merge_owned_node(&self, node: &Node) -> Result<Node, MeshError> {
        self.check_own_fields(node.layout().fields())?;
        let existing = self.get_node_from_identifier(node.identifier());
        match existing {
            Some(existing) if Node::ptr_eq(&existing, node) => Ok(existing),
            Some(existing) => {
                if self.merge_node_contents(&existing, node)? {
                    self.state_mut()
                        .record_node(&existing, ChangeFlags::CONTENTS_CHANGED);
                }
                Ok(existing)
            }
            None => {
                let mut state = self.state_mut();
                state.nodes.insert(node.identifier(), node.clone());
                state.record_node(node, ChangeFlags::ADDED);
                Ok(node.clone())
            }
        }
    }

    /// Merge the fields and values of `source` into `target`.
    ///
    /// Both nodes must use this region's field handles. Returns whether
    /// `target` changed; on error `target` is untouched.
    pub(crate) fn merge_node_contents(
        &self,
        target: &Node,
        source: &Node,
    ) -> Result<bool, MeshError> {
        let plan = target.layout().plan_merge(&source.layout())?;
        let layout = match plan.layout {
            Some(layout) => {
                Some(self.with_store_mut(|store| store.node_layouts.intern(layout))?)
            }
            None => None,
        };
        let mut values = target.values().to_vec();
        if let Some(layout) = &layout {
            values.resize(layout.number_of_values(), FieldValue::Real(0.0));
        }
        let mut changed = copy_values(&mut values, &source.values(), &plan.copies)?;
        if let Some(layout) = layout {
            *target.layout_mut() = layout;
            changed = true;
        }
        *target.values_mut() = values;
        Ok(changed)
    }

    /// Remove `node` from this region.
    ///
    /// Fails with [`MeshError::InUse`] while an element of this region
    /// refers to it. Removing from a slave leaves the master untouched.
    pub fn remove_node(&self, node: &Node) -> Result<(), MeshError> {
        if !self.contains_node(node) {
            return Err(MeshError::invalid_argument(format!(
                "node {} is not in this region",
                node.identifier()
            )));
        }
        self.bracket(|| {
            if self.node_in_use(node) {
                return Err(MeshError::in_use(format!("node {}", node.identifier())));
            }
            self.detach_node(node);
            Ok(())
        })
    }

    /// Remove every node of `nodes` that can be removed.
    ///
    /// Nodes that are not in this region or are still in use stay in
    /// `nodes`, and the call then fails.
    pub fn remove_node_list(&self, nodes: &mut Vec<Node>) -> Result<(), MeshError> {
        self.bracket(|| {
            let mut in_use = 0;
            let mut foreign = 0;
            nodes.retain(|node| {
                if !self.contains_node(node) {
                    foreign += 1;
                    true
                } else if self.node_in_use(node) {
                    in_use += 1;
                    true
                } else {
                    self.detach_node(node);
                    false
                }
            });
            if in_use > 0 {
                Err(MeshError::in_use(format!("{in_use} nodes")))
            } else if foreign > 0 {
                Err(MeshError::invalid_argument(format!(
                    "{foreign} nodes are not in this region"
                )))
            } else {
                Ok(())
            }
        })
    }

    fn node_in_use(&self, node: &Node) -> bool {
        self.state().elements.values().any(|e| e.uses_node(node))
    }

    pub(crate) fn detach_node(&self, node: &Node) {
        let mut state = self.state_mut();
        state.nodes.remove(&node.identifier());
        state.record_node(node, ChangeFlags::REMOVED);
        if self.is_node_owner() {
            state.node_ids.invalidate();
        }
    }

    /// Give `node` a new identifier.
    ///
    /// Applied in the node owner and every view holding the node; fails
    /// with [`MeshError::IdentifierCollision`] if the identifier is taken.
    pub fn change_node_identifier(
        &self,
        node: &Node,
        identifier: NodeId,
    ) -> Result<(), MeshError> {
        if !self.contains_node(node) {
            return Err(MeshError::invalid_argument(format!(
                "node {} is not in this region",
                node.identifier()
            )));
        }
        if node.identifier() == identifier {
            return Ok(());
        }
        let owner = self.node_owner();
        if let Some(other) = owner.get_node_from_identifier(identifier) {
            return Err(MeshError::collision(format!("{other:?}")));
        }
        self.bracket(|| {
            let old = node.identifier();
            owner.rekey_node(old, identifier, node);
            node.set_identifier(identifier);
            let mut state = owner.state_mut();
            state.node_ids.invalidate();
            state.record_node(node, ChangeFlags::IDENTIFIER_CHANGED);
            Ok(())
        })
    }

    fn rekey_node(&self, old: NodeId, new: NodeId, node: &Node) {
        {
            let mut state = self.state_mut();
            if state.nodes.get(&old).is_some_and(|n| Node::ptr_eq(n, node)) {
                state.nodes.remove(&old);
                state.nodes.insert(new, node.clone());
            }
        }
        for dependent in self.dependents() {
            dependent.rekey_node(old, new, node);
        }
    }

    // ── Fields and values ──────────────────────────────────────────

    /// Define a field at `node` with the given storage.
    ///
    /// New values start at zero. The node may or may not be merged yet.
    /// A time sequence must come from [`Region::time_sequence`].
    pub fn define_field_at_node(&self, node: &Node, storage: NodeField) -> Result<(), MeshError> {
        self.check_node_namespace(node)?;
        let field = storage.field().clone();
        self.check_own_field(&field)?;
        if let Some(sequence) = storage.time_sequence() {
            let registered = self.with_store(|store| store.time_sequences.contains(sequence))?;
            if !registered {
                return Err(MeshError::invalid_argument(format!(
                    "time sequence of field '{}' belongs to another region",
                    field.name()
                )));
            }
        }
        if node.has_field(&field) {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' is already defined at node {}",
                field.name(),
                node.identifier()
            )));
        }
        self.bracket(|| {
            let range = self.with_store_mut(|store| {
                store.node_layouts.add_field(&mut node.layout_mut(), storage)
            })?;
            node.values_mut()
                .resize(range.end, FieldValue::default_for(field.value_type()));
            self.note_node_change(node, ChangeFlags::CONTENTS_CHANGED);
            Ok(())
        })
    }

    /// Remove `field` from `node`.
    ///
    /// Fails with [`MeshError::InUse`] while an element defining `field`
    /// interpolates from the node.
    pub fn undefine_field_at_node(&self, node: &Node, field: &Field) -> Result<(), MeshError> {
        self.check_node_namespace(node)?;
        if !node.has_field(field) {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' is not defined at node {}",
                field.name(),
                node.identifier()
            )));
        }
        self.bracket(|| {
            if self.field_owner().elements_use_node_for_field(node, field) {
                return Err(MeshError::in_use(format!(
                    "field '{}' at node {}",
                    field.name(),
                    node.identifier()
                )));
            }
            let range = self.with_store_mut(|store| {
                store.node_layouts.remove_field(&mut node.layout_mut(), field)
            })?;
            if let Some(range) = range {
                node.values_mut().drain(range);
            }
            self.note_node_change(node, ChangeFlags::CONTENTS_CHANGED);
            Ok(())
        })
    }

    /// Undefine `field` at every node of `nodes` that has it.
    ///
    /// Returns how many nodes kept the field because elements still use
    /// it there.
    pub fn undefine_field_in_node_list(
        &self,
        field: &Field,
        nodes: &[Node],
    ) -> Result<usize, MeshError> {
        self.bracket(|| {
            let mut still_in_use = 0;
            for node in nodes.iter().filter(|n| n.has_field(field)) {
                match self.undefine_field_at_node(node, field) {
                    Ok(()) => {}
                    Err(MeshError::InUse { .. }) => still_in_use += 1,
                    Err(err) => return Err(err),
                }
            }
            Ok(still_in_use)
        })
    }

    /// Set one value of `field` at `node`.
    ///
    /// For a time-varying field this sets the value at the first time.
    pub fn set_node_value(
        &self,
        node: &Node,
        field: &Field,
        component: usize,
        version: u32,
        value_type: NodalValueType,
        value: FieldValue,
    ) -> Result<(), MeshError> {
        self.check_node_namespace(node)?;
        let index = node
            .value_index(field, component, version, value_type)
            .ok_or_else(|| {
                MeshError::invalid_argument(format!(
                    "node {} stores no {value_type:?} value for component {component} \
                     version {version} of '{}'",
                    node.identifier(),
                    field.name()
                ))
            })?;
        self.set_node_value_at_index(node, field, index, value)
    }

    /// Set the value of a time-varying `field` at one of its stored times.
    #[allow(clippy::too_many_arguments)]
    pub fn set_node_value_at_time(
        &self,
        node: &Node,
        field: &Field,
        component: usize,
        version: u32,
        value_type: NodalValueType,
        time: f64,
        value: FieldValue,
    ) -> Result<(), MeshError> {
        self.check_node_namespace(node)?;
        let index = {
            let layout = node.layout();
            let storage = layout.get(field).ok_or_else(|| {
                MeshError::invalid_argument(format!(
                    "field '{}' is not defined at node {}",
                    field.name(),
                    node.identifier()
                ))
            })?;
            let time_index = storage
                .time_sequence()
                .and_then(|sequence| sequence.index_of(time))
                .ok_or_else(|| {
                    MeshError::invalid_argument(format!(
                        "field '{}' at node {} stores no values at time {time}",
                        field.name(),
                        node.identifier()
                    ))
                })?;
            storage
                .value_index_at_time(component, version, value_type, time_index)
                .ok_or_else(|| {
                    MeshError::invalid_argument(format!(
                        "node {} stores no {value_type:?} value for component {component} \
                         version {version} of '{}'",
                        node.identifier(),
                        field.name()
                    ))
                })?
        };
        self.set_node_value_at_index(node, field, index, value)
    }

    fn set_node_value_at_index(
        &self,
        node: &Node,
        field: &Field,
        index: usize,
        value: FieldValue,
    ) -> Result<(), MeshError> {
        if value.value_type() != field.value_type() {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' holds {:?} values",
                field.name(),
                field.value_type()
            )));
        }
        if let Some(location) = value.as_element_xi() {
            if location.element.namespace() != self.field_namespace() {
                return Err(MeshError::invalid_argument(
                    "element_xi host belongs to another region",
                ));
            }
        }
        self.bracket(|| {
            let changed = {
                let mut values = node.values_mut();
                let slot = values
                    .get_mut(index)
                    .ok_or_else(|| MeshError::structural("node values shorter than layout"))?;
                if *slot == value {
                    false
                } else {
                    *slot = value;
                    true
                }
            };
            if changed {
                self.note_node_change(node, ChangeFlags::CONTENTS_CHANGED);
            }
            Ok(())
        })
    }

    /// Set the version 0 value of every component of a real field.
    pub fn set_node_real_values(
        &self,
        node: &Node,
        field: &Field,
        values: &[f64],
    ) -> Result<(), MeshError> {
        if field.value_type() != ValueType::Real || values.len() != field.number_of_components() {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' needs {} real values",
                field.name(),
                field.number_of_components()
            )));
        }
        self.bracket(|| {
            for (component, value) in values.iter().enumerate() {
                self.set_node_value(
                    node,
                    field,
                    component,
                    0,
                    NodalValueType::Value,
                    FieldValue::Real(*value),
                )?;
            }
            Ok(())
        })
    }

    // ── Helpers ────────────────────────────────────────────────────

    pub(crate) fn check_node_namespace(&self, node: &Node) -> Result<(), MeshError> {
        if node.namespace() != self.node_namespace() {
            return Err(MeshError::invalid_argument(format!(
                "node {} was created for another region",
                node.identifier()
            )));
        }
        Ok(())
    }

    /// Record `change` against `node` in the node owner, if it holds it.
    /// Views pick the change up through propagation.
    pub(crate) fn note_node_change(&self, node: &Node, change: ChangeFlags) {
        let mut state = self.node_owner().state_mut();
        if state.contains_node(node) {
            state.record_node(node, change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;
    use femesh_core::FieldDefinition;

    fn region_with_field() -> (Region, Field) {
        let region = Region::new(RegionConfig::default()).unwrap();
        let field = region
            .merge_field(
                &region
                    .create_field("coordinates", FieldDefinition::coordinates(3))
                    .unwrap(),
            )
            .unwrap();
        (region, field)
    }

    #[test]
    fn merge_is_idempotent() {
        let (region, _) = region_with_field();
        let node = region.create_node(NodeId(7)).unwrap();
        let first = region.merge_node(&node).unwrap();
        let second = region.merge_node(&node).unwrap();
        assert!(Node::ptr_eq(&first, &second));
        assert_eq!(region.number_of_nodes(), 1);
    }

    #[test]
    fn merging_same_identifier_merges_contents() {
        let (region, field) = region_with_field();
        let existing = region.create_node(NodeId(1)).unwrap();
        region.merge_node(&existing).unwrap();
        let incoming = region.create_node(NodeId(1)).unwrap();
        region
            .define_field_at_node(&incoming, NodeField::values_only(field.clone()))
            .unwrap();
        region
            .set_node_real_values(&incoming, &field, &[1.0, 2.0, 3.0])
            .unwrap();
        let canonical = region.merge_node(&incoming).unwrap();
        assert!(Node::ptr_eq(&canonical, &existing));
        assert_eq!(existing.real_values(&field), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn foreign_node_is_rejected() {
        let (region, _) = region_with_field();
        let (other, _) = region_with_field();
        let node = other.create_node(NodeId(1)).unwrap();
        assert!(matches!(
            region.merge_node(&node),
            Err(MeshError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn identifier_change_rekeys_and_detects_collision() {
        let (region, _) = region_with_field();
        let a = region.merge_node(&region.create_node(NodeId(1)).unwrap()).unwrap();
        region.merge_node(&region.create_node(NodeId(2)).unwrap()).unwrap();
        assert!(matches!(
            region.change_node_identifier(&a, NodeId(2)),
            Err(MeshError::IdentifierCollision { .. })
        ));
        region.change_node_identifier(&a, NodeId(10)).unwrap();
        assert!(region.get_node_from_identifier(NodeId(1)).is_none());
        assert!(Node::ptr_eq(
            &region.get_node_from_identifier(NodeId(10)).unwrap(),
            &a
        ));
        assert_eq!(region.next_free_node_identifier(1), Ok(1));
    }

    #[test]
    fn value_type_is_checked() {
        let (region, field) = region_with_field();
        let node = region.create_node(NodeId(1)).unwrap();
        region
            .define_field_at_node(&node, NodeField::values_only(field.clone()))
            .unwrap();
        let result = region.set_node_value(
            &node,
            &field,
            0,
            0,
            NodalValueType::Value,
            FieldValue::Integer(3),
        );
        assert!(matches!(result, Err(MeshError::InvalidArgument { .. })));
    }

    #[test]
    fn undefine_drops_values() {
        let (region, field) = region_with_field();
        let node = region.create_node(NodeId(1)).unwrap();
        region
            .define_field_at_node(&node, NodeField::values_only(field.clone()))
            .unwrap();
        region.merge_node(&node).unwrap();
        region.undefine_field_at_node(&node, &field).unwrap();
        assert!(!node.has_field(&field));
        assert!(node.values().is_empty());
    }

    #[test]
    fn time_varying_field_interpolates_between_times() {
        let (region, _) = region_with_field();
        let field = region
            .merge_field(
                &region
                    .create_field("temperature", FieldDefinition::new(ValueType::Real, 1))
                    .unwrap(),
            )
            .unwrap();
        let times = region.time_sequence(&[0.0, 2.0]).unwrap();
        let node = region.merge_node(&region.create_node(NodeId(1)).unwrap()).unwrap();
        region
            .define_field_at_node(
                &node,
                NodeField::values_only(field.clone()).with_time_sequence(times),
            )
            .unwrap();
        assert_eq!(node.values().len(), 2);
        for (time, value) in [(0.0, 10.0), (2.0, 30.0)] {
            region
                .set_node_value_at_time(
                    &node,
                    &field,
                    0,
                    0,
                    NodalValueType::Value,
                    time,
                    FieldValue::Real(value),
                )
                .unwrap();
        }
        let at = |time| node.real_value_at_time(&field, 0, 0, NodalValueType::Value, time);
        assert_eq!(at(1.0), Some(20.0));
        assert_eq!(at(5.0), Some(30.0));
        assert!(region
            .set_node_value_at_time(
                &node,
                &field,
                0,
                0,
                NodalValueType::Value,
                1.0,
                FieldValue::Real(0.0),
            )
            .is_err());
    }

    #[test]
    fn foreign_time_sequence_is_rejected() {
        let (region, field) = region_with_field();
        let other = Region::new(RegionConfig::default()).unwrap();
        let times = other.time_sequence(&[0.0, 1.0]).unwrap();
        let node = region.create_node(NodeId(1)).unwrap();
        let storage = NodeField::values_only(field).with_time_sequence(times);
        assert!(matches!(
            region.define_field_at_node(&node, storage),
            Err(MeshError::InvalidArgument { .. })
        ));
        assert!(node.values().is_empty());
    }
}
