//! Element membership, topology, field definition and removal.

use std::rc::Rc;

use femesh_core::{
    BasisType, ChangeFlags, ElementId, ElementKind, ElementShape, Field, MeshError, ShapeKind,
};
use femesh_layout::{ElementField, FieldStorage};

use super::{Region, RegionRole};
use crate::element::Element;
use crate::node::Node;
use crate::value::{copy_values, FieldValue};

impl Region {
    /// The interned shape of `kind`.
    pub fn shape(&self, kind: ShapeKind) -> Result<Rc<ElementShape>, MeshError> {
        self.with_store_mut(|store| store.shapes.get(kind))
    }

    /// The interned copy of `basis`.
    pub fn basis(&self, basis: BasisType) -> Result<Rc<BasisType>, MeshError> {
        self.with_store_mut(|store| store.bases.get(basis))
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Element, face or line with `identifier` in this region.
    pub fn get_element_from_identifier(&self, identifier: ElementId) -> Option<Element> {
        self.state().elements.get(&identifier).cloned()
    }

    /// True if this exact element object is in the region.
    pub fn contains_element(&self, element: &Element) -> bool {
        self.state().contains_element(element)
    }

    /// Number of elements, faces and lines.
    pub fn number_of_elements(&self) -> usize {
        self.state().elements.len()
    }

    /// Number of elements of one identifier kind.
    pub fn number_of_elements_of_kind(&self, kind: ElementKind) -> usize {
        self.state()
            .elements
            .keys()
            .filter(|id| id.kind == kind)
            .count()
    }

    /// Snapshot of the elements in identifier order (elements, then
    /// faces, then lines).
    pub fn elements(&self) -> Vec<Element> {
        self.state().elements.values().cloned().collect()
    }

    /// Call `f` for each element in identifier order, stopping at the
    /// first error. Iterates a snapshot.
    pub fn for_each_element<E>(
        &self,
        mut f: impl FnMut(&Element) -> Result<(), E>,
    ) -> Result<(), E> {
        for element in self.elements() {
            f(&element)?;
        }
        Ok(())
    }

    /// First element, in identifier order, satisfying `predicate`.
    pub fn first_element_that(
        &self,
        mut predicate: impl FnMut(&Element) -> bool,
    ) -> Option<Element> {
        self.state().elements.values().find(|e| predicate(e)).cloned()
    }

    /// Smallest unused number `>= start` for identifiers of `kind`.
    pub fn next_free_element_identifier(
        &self,
        kind: ElementKind,
        start: u32,
    ) -> Result<u32, MeshError> {
        let mut guard = self.field_owner().state_mut();
        let state = &mut *guard;
        let elements = &state.elements;
        let store = state
            .store
            .as_mut()
            .ok_or_else(|| MeshError::structural("region does not own a field store"))?;
        store.element_ids[kind.index()]
            .next_free(start, |n| elements.contains_key(&ElementId::new(kind, n)))
    }

    // ── Creation ───────────────────────────────────────────────────

    /// Create an element of `kind` with empty node and face slots.
    pub fn create_element(
        &self,
        identifier: ElementId,
        kind: ShapeKind,
    ) -> Result<Element, MeshError> {
        let shape = self.shape(kind)?;
        let layout = self.with_store_mut(|store| store.element_layouts.empty_layout())?;
        Ok(Element::new(identifier, self.field_namespace(), shape, layout))
    }

    /// The element with `identifier`, created as an unspecified
    /// placeholder of `dimension` and merged in if absent.
    pub fn get_or_create_element_with_identifier(
        &self,
        identifier: ElementId,
        dimension: u8,
    ) -> Result<Element, MeshError> {
        if let Some(element) = self.get_element_from_identifier(identifier) {
            return Ok(element);
        }
        if !(1..=3).contains(&dimension) {
            return Err(MeshError::invalid_argument(format!(
                "element dimension {dimension} out of range"
            )));
        }
        let element = self.create_element(identifier, ShapeKind::Unspecified { dimension })?;
        self.merge_element(&element)
    }

    // ── Topology ───────────────────────────────────────────────────

    /// Put `node` in local slot `index` of `element`.
    ///
    /// If the element is already merged, the node must be in the region.
    pub fn set_element_node(
        &self,
        element: &Element,
        index: usize,
        node: &Node,
    ) -> Result<(), MeshError> {
        self.check_element_namespace(element)?;
        if node.namespace() != self.field_owner().node_namespace() {
            return Err(MeshError::invalid_argument(format!(
                "node {} is not a mesh node of this region",
                node.identifier()
            )));
        }
        if index >= element.number_of_node_slots() {
            return Err(MeshError::invalid_argument(format!(
                "{} has no local node {index}",
                element.identifier()
            )));
        }
        let merged = self.field_owner().contains_element(element);
        if merged && !self.field_owner().contains_node(node) {
            return Err(MeshError::invalid_argument(format!(
                "node {} must be merged before it is used by {}",
                node.identifier(),
                element.identifier()
            )));
        }
        self.bracket(|| {
            element.set_node(index, Some(node.clone()));
            self.note_element_change(element, ChangeFlags::CONTENTS_CHANGED);
            Ok(())
        })
    }

    /// Put `face` in slot `face_number` of `element`.
    pub fn set_element_face(
        &self,
        element: &Element,
        face_number: usize,
        face: Option<&Element>,
    ) -> Result<(), MeshError> {
        self.check_element_namespace(element)?;
        if face_number >= element.number_of_face_slots() {
            return Err(MeshError::invalid_argument(format!(
                "{} has no face {face_number}",
                element.identifier()
            )));
        }
        if let Some(face) = face {
            self.check_element_namespace(face)?;
            if face.dimension() + 1 != element.dimension() {
                return Err(MeshError::invalid_argument(format!(
                    "{} cannot be a face of {}",
                    face.identifier(),
                    element.identifier()
                )));
            }
            let owner = self.field_owner();
            if owner.contains_element(element) && !owner.contains_element(face) {
                return Err(MeshError::invalid_argument(format!(
                    "{} must be merged before it is used as a face",
                    face.identifier()
                )));
            }
        }
        self.bracket(|| {
            element.set_face(face_number, face.cloned());
            self.note_element_change(element, ChangeFlags::CONTENTS_CHANGED);
            Ok(())
        })
    }

    // ── Membership ─────────────────────────────────────────────────

    /// Merge `element` into this region and return the canonical
    /// element.
    ///
    /// The element's nodes and faces must already be in the region. If
    /// an element with the same identifier exists, `element` must have
    /// the same shape (or the existing one must be a placeholder) and its
    /// topology, fields and values are merged into the existing element.
    pub fn merge_element(&self, element: &Element) -> Result<Element, MeshError> {
        self.check_element_namespace(element)?;
        if self.role() == RegionRole::PointSet {
            return Err(MeshError::invalid_argument(
                "point set regions hold no elements",
            ));
        }
        self.bracket(|| {
            let Some(master) = &self.0.master else {
                return self.merge_owned_element(element);
            };
            let canonical = master.merge_element(element)?;
            let mut state = self.state_mut();
            if !state.elements.contains_key(&canonical.identifier()) {
                state.elements.insert(canonical.identifier(), canonical.clone());
                state.record_element(&canonical, ChangeFlags::ADDED);
            }
            Ok(canonical)
        })
    }

    fn merge_owned_element(&self, element: &Element) -> Result<Element, MeshError> {
        self.check_own_fields(element.layout().fields())?;
        for node in element.nodes().into_iter().flatten() {
            if !self.contains_node(&node) {
                return Err(MeshError::invalid_argument(format!(
                    "node {} of {} is not in this region",
                    node.identifier(),
                    element.identifier()
                )));
            }
        }
        for face in element.faces().into_iter().flatten() {
            if !self.contains_element(&face) {
                return Err(MeshError::invalid_argument(format!(
                    "face {} of {} is not in this region",
                    face.identifier(),
                    element.identifier()
                )));
            }
        }
        let existing = self.get_element_from_identifier(element.identifier());
        match existing {
            Some(existing) if Element::ptr_eq(&existing, element) => Ok(existing),
            Some(existing) => {
                if self.merge_element_contents(&existing, element)? {
                    self.state_mut()
                        .record_element(&existing, ChangeFlags::CONTENTS_CHANGED);
                }
                Ok(existing)
            }
            None => {
                let mut state = self.state_mut();
                state.elements.insert(element.identifier(), element.clone());
                state.record_element(element, ChangeFlags::ADDED);
                Ok(element.clone())
            }
        }
    }

    /// Merge shape, topology, fields and values of `source` into
    /// `target`. Returns whether `target` changed.
    ///
    /// Everything that can fail is checked before `target` is touched.
    pub(crate) fn merge_element_contents(
        &self,
        target: &Element,
        source: &Element,
    ) -> Result<bool, MeshError> {
        let target_shape = target.shape();
        let source_shape = source.shape();
        let specified = if Rc::ptr_eq(&target_shape, &source_shape) {
            None
        } else if target_shape.dimension() != source_shape.dimension() {
            return Err(MeshError::incompatible(format!(
                "{} has a different dimension",
                source.identifier()
            )));
        } else if target_shape.is_unspecified() {
            Some(source_shape)
        } else if source_shape.is_unspecified() {
            None
        } else {
            return Err(MeshError::incompatible(format!(
                "{} has a different shape",
                source.identifier()
            )));
        };
        let plan = target.layout().plan_merge(&source.layout())?;
        let layout = match plan.layout {
            Some(layout) => {
                Some(self.with_store_mut(|store| store.element_layouts.intern(layout))?)
            }
            None => None,
        };
        let mut values = target.values().to_vec();
        if let Some(layout) = &layout {
            values.resize(layout.number_of_values(), FieldValue::Real(0.0));
        }
        let mut changed = copy_values(&mut values, &source.values(), &plan.copies)?;

        if let Some(shape) = specified {
            target.specify_shape(shape);
            changed = true;
        }
        for (index, node) in source.nodes().into_iter().enumerate() {
            if let Some(node) = node {
                if !target.node(index).is_some_and(|n| Node::ptr_eq(&n, &node)) {
                    target.set_node(index, Some(node));
                    changed = true;
                }
            }
        }
        for (face_number, face) in source.faces().into_iter().enumerate() {
            if let Some(face) = face {
                if !target.face(face_number).is_some_and(|f| Element::ptr_eq(&f, &face)) {
                    target.set_face(face_number, Some(face));
                    changed = true;
                }
            }
        }
        if let Some(layout) = layout {
            *target.layout_mut() = layout;
            changed = true;
        }
        *target.values_mut() = values;
        Ok(changed)
    }

    /// Remove `element` from this region.
    ///
    /// Fails with [`MeshError::InUse`] while a parent of the element is in
    /// the region. In the root, faces left without any parent in the
    /// region are removed with it.
    pub fn remove_element(&self, element: &Element) -> Result<(), MeshError> {
        if !self.contains_element(element) {
            return Err(MeshError::invalid_argument(format!(
                "{} is not in this region",
                element.identifier()
            )));
        }
        self.bracket(|| {
            if self.has_parent_in_region(element) {
                return Err(MeshError::in_use(format!(
                    "{} (a face of another element)",
                    element.identifier()
                )));
            }
            self.detach_element_tree(element);
            Ok(())
        })
    }

    /// Remove every element of `elements` that can be removed, highest
    /// dimension first.
    ///
    /// Elements that are still in use or not in the region stay in
    /// `elements`, and the call then fails.
    pub fn remove_element_list(&self, elements: &mut Vec<Element>) -> Result<(), MeshError> {
        self.bracket(|| {
            let mut ordered = std::mem::take(elements);
            ordered.sort_by_key(|e| std::cmp::Reverse(e.dimension()));
            let initially: Vec<bool> = ordered.iter().map(|e| self.contains_element(e)).collect();
            let mut in_use = 0;
            let mut foreign = 0;
            for (element, was_contained) in ordered.into_iter().zip(initially) {
                if !was_contained {
                    foreign += 1;
                    elements.push(element);
                } else if !self.contains_element(&element) {
                    continue;
                } else if self.has_parent_in_region(&element) {
                    in_use += 1;
                    elements.push(element);
                } else {
                    self.detach_element_tree(&element);
                }
            }
            if in_use > 0 {
                Err(MeshError::in_use(format!("{in_use} elements")))
            } else if foreign > 0 {
                Err(MeshError::invalid_argument(format!(
                    "{foreign} elements are not in this region"
                )))
            } else {
                Ok(())
            }
        })
    }

    fn has_parent_in_region(&self, element: &Element) -> bool {
        element.parents().iter().any(|p| self.contains_element(p))
    }

    fn detach_element_tree(&self, element: &Element) {
        {
            let mut state = self.state_mut();
            state.elements.remove(&element.identifier());
            state.record_element(element, ChangeFlags::REMOVED);
            if let Some(store) = state.store.as_mut() {
                for cache in &mut store.element_ids {
                    cache.invalidate();
                }
            }
        }
        let faces: Vec<Element> = element.faces().into_iter().flatten().collect();
        if self.is_field_owner() {
            for face_number in 0..element.number_of_face_slots() {
                element.set_face(face_number, None);
            }
        }
        for face in faces {
            if self.contains_element(&face) && !self.has_parent_in_region(&face) {
                self.detach_element_tree(&face);
            }
        }
    }

    /// Give `element` a new number within its identifier kind.
    pub fn change_element_identifier(
        &self,
        element: &Element,
        identifier: ElementId,
    ) -> Result<(), MeshError> {
        if !self.contains_element(element) {
            return Err(MeshError::invalid_argument(format!(
                "{} is not in this region",
                element.identifier()
            )));
        }
        let old = element.identifier();
        if identifier == old {
            return Ok(());
        }
        if identifier.kind != old.kind {
            return Err(MeshError::invalid_argument(format!(
                "cannot renumber {old} as {identifier}"
            )));
        }
        let owner = self.field_owner();
        if let Some(other) = owner.get_element_from_identifier(identifier) {
            return Err(MeshError::collision(format!("{other:?}")));
        }
        self.bracket(|| {
            owner.rekey_element(old, identifier, element);
            element.set_identifier(identifier);
            let mut state = owner.state_mut();
            if let Some(store) = state.store.as_mut() {
                store.element_ids[identifier.kind.index()].invalidate();
            }
            state.record_element(element, ChangeFlags::IDENTIFIER_CHANGED);
            Ok(())
        })
    }

    fn rekey_element(&self, old: ElementId, new: ElementId, element: &Element) {
        {
            let mut state = self.state_mut();
            if state
                .elements
                .get(&old)
                .is_some_and(|e| Element::ptr_eq(e, element))
            {
                state.elements.remove(&old);
                state.elements.insert(new, element.clone());
            }
        }
        for dependent in self.dependents() {
            dependent.rekey_element(old, new, element);
        }
    }

    // ── Fields and values ──────────────────────────────────────────

    /// Define a field on `element` with the given storage.
    pub fn define_field_at_element(
        &self,
        element: &Element,
        storage: ElementField,
    ) -> Result<(), MeshError> {
        self.check_element_namespace(element)?;
        let field = storage.field().clone();
        self.check_own_field(&field)?;
        if element.has_field(&field) {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' is already defined on {}",
                field.name(),
                element.identifier()
            )));
        }
        if let Some(slot) = storage
            .local_nodes()
            .into_iter()
            .find(|&slot| slot >= element.number_of_node_slots())
        {
            return Err(MeshError::invalid_argument(format!(
                "{} has no local node {slot}",
                element.identifier()
            )));
        }
        self.bracket(|| {
            let range = self.with_store_mut(|store| {
                store
                    .element_layouts
                    .add_field(&mut element.layout_mut(), storage)
            })?;
            element
                .values_mut()
                .resize(range.end, FieldValue::default_for(field.value_type()));
            self.note_element_change(element, ChangeFlags::CONTENTS_CHANGED);
            Ok(())
        })
    }

    /// Set constant `component` of `field` on `element`.
    pub fn set_element_constant(
        &self,
        element: &Element,
        field: &Field,
        component: usize,
        value: FieldValue,
    ) -> Result<(), MeshError> {
        self.check_element_namespace(element)?;
        let index = element
            .layout()
            .get(field)
            .and_then(|s| s.constant_index(component))
            .ok_or_else(|| {
                MeshError::invalid_argument(format!(
                    "component {component} of '{}' is not constant on {}",
                    field.name(),
                    element.identifier()
                ))
            })?;
        if value.value_type() != field.value_type() {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' holds {:?} values",
                field.name(),
                field.value_type()
            )));
        }
        self.bracket(|| {
            let changed = {
                let mut values = element.values_mut();
                let slot = values
                    .get_mut(index)
                    .ok_or_else(|| MeshError::structural("element values shorter than layout"))?;
                if *slot == value {
                    false
                } else {
                    *slot = value;
                    true
                }
            };
            if changed {
                self.note_element_change(element, ChangeFlags::CONTENTS_CHANGED);
            }
            Ok(())
        })
    }

    /// True if `field` is defined on `element` or on any ancestor of it
    /// that is in this region.
    pub fn element_or_parent_has_field(&self, element: &Element, field: &Field) -> bool {
        element.has_field(field)
            || element
                .parents()
                .iter()
                .filter(|p| self.contains_element(p))
                .any(|p| self.element_or_parent_has_field(p, field))
    }

    /// True if an element of this region interpolates `field` from
    /// `node`.
    pub(crate) fn elements_use_node_for_field(&self, node: &Node, field: &Field) -> bool {
        self.state().elements.values().any(|element| {
            element.layout().get(field).is_some_and(|storage| {
                storage
                    .local_nodes()
                    .into_iter()
                    .any(|slot| element.node(slot).is_some_and(|n| Node::ptr_eq(&n, node)))
            })
        })
    }

    // ── Helpers ────────────────────────────────────────────────────

    pub(crate) fn check_element_namespace(&self, element: &Element) -> Result<(), MeshError> {
        if element.namespace() != self.field_namespace() {
            return Err(MeshError::invalid_argument(format!(
                "{} was created for another region",
                element.identifier()
            )));
        }
        Ok(())
    }

    /// Record `change` against `element` in the field owner, if it holds
    /// it.
    pub(crate) fn note_element_change(&self, element: &Element, change: ChangeFlags) {
        let mut state = self.field_owner().state_mut();
        if state.contains_element(element) {
            state.record_element(element, change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;
    use femesh_core::{FieldDefinition, NodeId, ValueType};

    fn square_mesh() -> (Region, Element) {
        let region = Region::new(RegionConfig::default()).unwrap();
        let element = region
            .create_element(ElementId::element(1), ShapeKind::Square)
            .unwrap();
        for i in 0..4 {
            let node = region
                .merge_node(&region.create_node(NodeId(i + 1)).unwrap())
                .unwrap();
            region.set_element_node(&element, i as usize, &node).unwrap();
        }
        let element = region.merge_element(&element).unwrap();
        (region, element)
    }

    #[test]
    fn element_needs_merged_nodes() {
        let region = Region::new(RegionConfig::default()).unwrap();
        let element = region
            .create_element(ElementId::element(1), ShapeKind::Line)
            .unwrap();
        let node = region.create_node(NodeId(1)).unwrap();
        region.set_element_node(&element, 0, &node).unwrap();
        assert!(matches!(
            region.merge_element(&element),
            Err(MeshError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn node_in_use_cannot_be_removed() {
        let (region, element) = square_mesh();
        let node = region.get_node_from_identifier(NodeId(1)).unwrap();
        assert!(matches!(
            region.remove_node(&node),
            Err(MeshError::InUse { .. })
        ));
        region.remove_element(&element).unwrap();
        region.remove_node(&node).unwrap();
    }

    #[test]
    fn placeholder_takes_real_shape() {
        let region = Region::new(RegionConfig::default()).unwrap();
        let placeholder = region
            .get_or_create_element_with_identifier(ElementId::element(3), 2)
            .unwrap();
        assert!(placeholder.shape().is_unspecified());
        let triangle = region
            .create_element(ElementId::element(3), ShapeKind::Triangle)
            .unwrap();
        let canonical = region.merge_element(&triangle).unwrap();
        assert!(Element::ptr_eq(&canonical, &placeholder));
        assert_eq!(placeholder.shape().kind(), ShapeKind::Triangle);
        let square = region
            .create_element(ElementId::element(3), ShapeKind::Square)
            .unwrap();
        assert!(matches!(
            region.merge_element(&square),
            Err(MeshError::IncompatibleDefinition { .. })
        ));
    }

    fn real_field(region: &Region, name: &str) -> Field {
        region
            .get_field_with_properties(name, FieldDefinition::new(ValueType::Real, 1))
            .unwrap()
    }

    fn interpolated(region: &Region, field: &Field) -> ElementField {
        let basis = region.basis(BasisType::linear_lagrange(2).unwrap()).unwrap();
        ElementField::uniform(field.clone(), basis, &[0, 1, 2, 3]).unwrap()
    }

    #[test]
    fn failed_contents_merge_leaves_element_untouched() {
        let (region, element) = square_mesh();
        let m = real_field(&region, "m");
        region
            .define_field_at_element(&element, ElementField::constant(m.clone()))
            .unwrap();
        let extra = region
            .merge_node(&region.create_node(NodeId(5)).unwrap())
            .unwrap();
        let line = region
            .create_element(ElementId::line(1), ShapeKind::Line)
            .unwrap();
        region.set_element_node(&line, 0, &extra).unwrap();
        let line = region.merge_element(&line).unwrap();

        let incoming = region
            .create_element(ElementId::element(1), ShapeKind::Square)
            .unwrap();
        region.set_element_node(&incoming, 0, &extra).unwrap();
        region.set_element_face(&incoming, 0, Some(&line)).unwrap();
        region
            .define_field_at_element(&incoming, interpolated(&region, &m))
            .unwrap();
        let layout = element.layout();
        let values = element.values().to_vec();

        assert!(matches!(
            region.merge_element(&incoming),
            Err(MeshError::IncompatibleDefinition { .. })
        ));
        assert_eq!(element.node(0).unwrap().identifier(), NodeId(1));
        assert!(element.face(0).is_none());
        assert!(!line.parents().iter().any(|p| Element::ptr_eq(p, &element)));
        assert!(Rc::ptr_eq(&element.layout(), &layout));
        assert_eq!(&*element.values(), values.as_slice());
    }

    #[test]
    fn failed_merge_keeps_placeholder_unspecified() {
        let region = Region::new(RegionConfig::default()).unwrap();
        let m = real_field(&region, "m");
        let placeholder = region
            .get_or_create_element_with_identifier(ElementId::element(3), 2)
            .unwrap();
        region
            .define_field_at_element(&placeholder, ElementField::constant(m.clone()))
            .unwrap();
        let square = region
            .create_element(ElementId::element(3), ShapeKind::Square)
            .unwrap();
        region
            .define_field_at_element(&square, interpolated(&region, &m))
            .unwrap();
        assert!(region.merge_element(&square).is_err());
        assert!(placeholder.shape().is_unspecified());
        assert_eq!(placeholder.nodes().len(), 0);
    }

    #[test]
    fn element_storing_removed_field_is_not_merged() {
        let region = Region::new(RegionConfig::default()).unwrap();
        let m = real_field(&region, "m");
        let element = region
            .create_element(ElementId::element(1), ShapeKind::Square)
            .unwrap();
        region
            .define_field_at_element(&element, ElementField::constant(m.clone()))
            .unwrap();
        region.remove_field(&m).unwrap();
        assert!(matches!(
            region.merge_element(&element),
            Err(MeshError::InvalidArgument { .. })
        ));
        assert_eq!(region.number_of_elements(), 0);
    }

    #[test]
    fn constant_values_are_stored_on_element() {
        let (region, element) = square_mesh();
        let material = region
            .get_field_with_properties(
                "material",
                femesh_core::FieldDefinition::new(femesh_core::ValueType::Integer, 1),
            )
            .unwrap();
        region
            .define_field_at_element(&element, ElementField::constant(material.clone()))
            .unwrap();
        region
            .set_element_constant(&element, &material, 0, FieldValue::Integer(4))
            .unwrap();
        assert_eq!(element.constant_value(&material, 0), Some(FieldValue::Integer(4)));
        assert!(region.element_or_parent_has_field(&element, &material));
    }

    #[test]
    fn element_identifier_must_keep_kind() {
        let (region, element) = square_mesh();
        assert!(region
            .change_element_identifier(&element, ElementId::face(1))
            .is_err());
        region
            .change_element_identifier(&element, ElementId::element(9))
            .unwrap();
        assert_eq!(
            region.next_free_element_identifier(ElementKind::Element, 1),
            Ok(1)
        );
        assert!(region
            .get_element_from_identifier(ElementId::element(9))
            .is_some());
    }

    #[test]
    fn point_set_rejects_elements() {
        let (region, _) = square_mesh();
        let points = Region::new_point_set(&region);
        let element = region
            .create_element(ElementId::element(2), ShapeKind::Line)
            .unwrap();
        assert!(points.merge_element(&element).is_err());
    }
}
