//! Merging the contents of one region into another.
//!
//! The source is never modified. Fields are matched by name, nodes and
//! elements by identifier; objects the target already has are merged
//! into, everything else is copied. Copies are built against the
//! target's field table and layout table before being merged, so the
//! source and target share no handles afterwards (apart from what the
//! target already shared).

use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;

use femesh_core::{ChangeFlags, ElementId, Field, FieldKind, MeshError, TimeSequence, ValueType};
use femesh_layout::{ElementField, FieldLayout, FieldStorage, NodeField, RehomeCache};

use crate::element::Element;
use crate::node::Node;
use crate::region::{Region, RegionRole};
use crate::value::{ElementXi, FieldValue};

/// True if [`merge`] of `source` into `target` would succeed.
pub fn can_be_merged(target: &Region, source: &Region) -> bool {
    check_mergeable(target, source).is_ok()
}

/// Check that `source` can be merged into `target`, reporting the first
/// conflict found.
///
/// - A view can only merge into a view of the same role.
/// - Same-named fields must agree on kind, value type, component count
///   and coordinate system.
/// - Same-identifier nodes and elements must store shared fields the same
///   way, and elements must have the same shape unless one of them is an
///   unspecified placeholder of the same dimension.
/// - A placeholder element in the source must already exist in the
///   target.
/// - Every node an element interpolates a field from must have that
///   field in one of the regions, and every embedded location must name
///   an element present in one of the regions.
///
/// A slave source is checked for fields only. Its nodes and elements are
/// taken from the target's master, so merging it succeeds only once the
/// masters have been merged, which is the order [`crate::merge_trees`]
/// uses.
pub fn check_mergeable(target: &Region, source: &Region) -> Result<(), MeshError> {
    if source.role() != RegionRole::Root && source.role() != target.role() {
        return Err(MeshError::incompatible(format!(
            "{:?} region cannot be merged into a {:?} region",
            source.role(),
            target.role()
        )));
    }
    for field in source.fields() {
        if let Some(existing) = target.get_field_from_name(field.name()) {
            existing.matches_basic_definition(&field)?;
        }
    }
    if source.role() == RegionRole::Slave {
        return Ok(());
    }
    let mut compatible = CompatibilityCache::default();
    for node in source.nodes() {
        if let Some(existing) = target.get_node_from_identifier(node.identifier()) {
            compatible.check_nodes(&existing.layout(), &node.layout())?;
        }
        check_embedded_hosts(target, source, &node.layout(), &node.values())?;
    }
    for element in source.elements() {
        check_element(target, source, &element, &mut compatible)?;
        check_embedded_hosts(target, source, &element.layout(), &element.values())?;
    }
    Ok(())
}

fn check_element(
    target: &Region,
    source: &Region,
    element: &Element,
    compatible: &mut CompatibilityCache,
) -> Result<(), MeshError> {
    let shape = element.shape();
    match target.get_element_from_identifier(element.identifier()) {
        Some(existing) => {
            let existing_shape = existing.shape();
            let same_shape = existing_shape.kind() == shape.kind()
                || ((existing_shape.is_unspecified() || shape.is_unspecified())
                    && existing_shape.dimension() == shape.dimension());
            if !same_shape {
                return Err(MeshError::incompatible(format!(
                    "{} has a different shape in each region",
                    element.identifier()
                )));
            }
            compatible.check_elements(&existing.layout(), &element.layout())?;
        }
        None if shape.is_unspecified() => {
            return Err(MeshError::incompatible(format!(
                "{} is only a placeholder and the target does not define it",
                element.identifier()
            )));
        }
        None => {}
    }
    for storage in element.layout().fields() {
        let name = storage.field().name();
        for slot in storage.local_nodes() {
            let Some(node) = element.node(slot) else {
                return Err(MeshError::invalid_argument(format!(
                    "{} has no node in local slot {slot} for field '{name}'",
                    element.identifier()
                )));
            };
            let in_source = source.contains_node(&node) && node.has_field_named(name);
            let in_target = target
                .get_node_from_identifier(node.identifier())
                .is_some_and(|n| n.has_field_named(name));
            if !in_source && !in_target {
                return Err(MeshError::incompatible(format!(
                    "node {} lacks field '{name}' used by {}",
                    node.identifier(),
                    element.identifier()
                )));
            }
        }
    }
    Ok(())
}

fn check_embedded_hosts<S: FieldStorage>(
    target: &Region,
    source: &Region,
    layout: &FieldLayout<S>,
    values: &[FieldValue],
) -> Result<(), MeshError> {
    for storage in embedded_fields(layout) {
        for value in values.get(storage.value_range()).unwrap_or_default() {
            let Some(location) = value.as_element_xi() else {
                continue;
            };
            let host = location.element.identifier();
            let known = target
                .ultimate_master()
                .get_element_from_identifier(host)
                .is_some()
                || source
                    .ultimate_master()
                    .get_element_from_identifier(host)
                    .is_some();
            if !known {
                return Err(MeshError::invalid_argument(format!(
                    "embedded location in field '{}' refers to missing {host}",
                    storage.field().name()
                )));
            }
        }
    }
    Ok(())
}

fn embedded_fields<S: FieldStorage>(layout: &FieldLayout<S>) -> impl Iterator<Item = &S> {
    layout
        .fields()
        .iter()
        .filter(|s| s.field().value_type() == ValueType::ElementXi)
}

/// Layout pairs already found compatible.
#[derive(Default)]
struct CompatibilityCache {
    nodes: Vec<(Rc<FieldLayout<NodeField>>, Rc<FieldLayout<NodeField>>)>,
    elements: Vec<(Rc<FieldLayout<ElementField>>, Rc<FieldLayout<ElementField>>)>,
}

impl CompatibilityCache {
    fn check_nodes(
        &mut self,
        target: &Rc<FieldLayout<NodeField>>,
        source: &Rc<FieldLayout<NodeField>>,
    ) -> Result<(), MeshError> {
        if self
            .nodes
            .iter()
            .any(|(t, s)| Rc::ptr_eq(t, target) && Rc::ptr_eq(s, source))
        {
            return Ok(());
        }
        target.check_compatible(source)?;
        self.nodes.push((Rc::clone(target), Rc::clone(source)));
        Ok(())
    }

    fn check_elements(
        &mut self,
        target: &Rc<FieldLayout<ElementField>>,
        source: &Rc<FieldLayout<ElementField>>,
    ) -> Result<(), MeshError> {
        if self
            .elements
            .iter()
            .any(|(t, s)| Rc::ptr_eq(t, target) && Rc::ptr_eq(s, source))
        {
            return Ok(());
        }
        target.check_compatible(source)?;
        self.elements.push((Rc::clone(target), Rc::clone(source)));
        Ok(())
    }
}

/// Merge the contents of `source` into `target`.
///
/// Runs [`check_mergeable`] first, so a failed check leaves the target
/// untouched. The whole merge happens in one change window of the
/// target.
pub fn merge(target: &Region, source: &Region) -> Result<(), MeshError> {
    if let Err(err) = check_mergeable(target, source) {
        tracing::debug!(
            into = %target.namespace(),
            from = %source.namespace(),
            %err,
            "merge rejected"
        );
        return Err(err);
    }
    tracing::debug!(
        into = %target.namespace(),
        from = %source.namespace(),
        nodes = source.number_of_nodes(),
        elements = source.number_of_elements(),
        "merging region"
    );
    target.bracket(|| {
        if source.role() == RegionRole::Slave {
            return merge_with_master(target, source);
        }
        let mut merger = Merger::new(target);
        merger.import_fields(source)?;
        merger.import_nodes(source)?;
        merger.import_elements(source)?;
        merger.resolve_embedded()
    })
}

/// Add to slave `target` the equivalents, in its master, of everything
/// slave `source` holds.
fn merge_with_master(target: &Region, source: &Region) -> Result<(), MeshError> {
    let master = target
        .master()
        .ok_or_else(|| MeshError::structural("slave region without a master"))?;
    for node in source.nodes() {
        let equivalent = master.get_node_from_identifier(node.identifier()).ok_or_else(|| {
            MeshError::structural(format!(
                "node {} is not in the target's master",
                node.identifier()
            ))
        })?;
        target.merge_node(&equivalent)?;
    }
    let mut elements = source.elements();
    elements.sort_by_key(Element::dimension);
    for element in elements {
        let equivalent = master
            .get_element_from_identifier(element.identifier())
            .ok_or_else(|| {
                MeshError::structural(format!(
                    "{} is not in the target's master",
                    element.identifier()
                ))
            })?;
        target.merge_element(&equivalent)?;
    }
    Ok(())
}

/// Which object a deferred embedded location belongs to.
enum Holder {
    Node(Node),
    Element(Element),
}

/// An embedded location whose host element had not been merged yet.
struct PendingLocation {
    holder: Holder,
    field: Field,
    /// Index within the field's value range.
    offset: usize,
    host: ElementId,
    xi: SmallVec<[f64; 3]>,
}

struct Merger<'a> {
    target: &'a Region,
    fields: HashMap<String, Field>,
    node_layouts: RehomeCache<NodeField>,
    element_layouts: RehomeCache<ElementField>,
    pending: Vec<PendingLocation>,
}

impl<'a> Merger<'a> {
    fn new(target: &'a Region) -> Self {
        Self {
            target,
            fields: HashMap::new(),
            node_layouts: RehomeCache::new(),
            element_layouts: RehomeCache::new(),
            pending: Vec::new(),
        }
    }

    fn import_fields(&mut self, source: &Region) -> Result<(), MeshError> {
        for field in source.fields() {
            self.import_field(&field)?;
        }
        Ok(())
    }

    fn import_field(&mut self, field: &Field) -> Result<Field, MeshError> {
        if let Some(done) = self.fields.get(field.name()) {
            return Ok(done.clone());
        }
        let mut definition = field.definition().clone();
        if let FieldKind::Indexed { indexer, .. } = &mut definition.kind {
            *indexer = self.import_field(&indexer.clone())?;
        }
        let copy = self.target.create_field(field.name(), definition)?;
        let merged = self.target.merge_field(&copy)?;
        self.fields.insert(field.name().to_string(), merged.clone());
        Ok(merged)
    }

    fn import_nodes(&mut self, source: &Region) -> Result<(), MeshError> {
        for node in source.nodes() {
            let fields = &self.fields;
            let cache = &mut self.node_layouts;
            let layout = self.target.with_store_mut(|store| {
                let time_sequences = &mut store.time_sequences;
                cache.get_or_rebuild(&node.layout(), &mut store.node_layouts, |layout| {
                    let rehomed = layout.rehome(|f| fields.get(f.name()).cloned())?;
                    Ok(rehomed.map_storage(|storage| {
                        storage.map_time_sequence(|sequence| {
                            time_sequences.get(TimeSequence::clone(sequence))
                        })
                    }))
                })
            })??;
            let mut values = node.values().to_vec();
            let unresolved = self.substitute_hosts(&layout, &mut values);
            let copy = Node::new(node.identifier(), self.target.node_namespace(), layout, values);
            let canonical = self.target.merge_node(&copy)?;
            self.defer(unresolved, || Holder::Node(canonical.clone()));
        }
        Ok(())
    }

    fn import_elements(&mut self, source: &Region) -> Result<(), MeshError> {
        let mut elements = source.elements();
        elements.sort_by_key(Element::dimension);
        for element in elements {
            let shape = element.shape();
            if shape.is_unspecified() {
                continue;
            }
            let fields = &self.fields;
            let cache = &mut self.element_layouts;
            let layout = self.target.with_store_mut(|store| {
                cache.get_or_rehome(&element.layout(), &mut store.element_layouts, |f| {
                    fields.get(f.name()).cloned()
                })
            })??;
            let mut values = element.values().to_vec();
            let unresolved = self.substitute_hosts(&layout, &mut values);
            let copy = self.target.create_element(element.identifier(), shape.kind())?;
            *copy.layout_mut() = layout;
            *copy.values_mut() = values;
            for (slot, node) in element.nodes().into_iter().enumerate() {
                let Some(node) = node else { continue };
                let equivalent = self
                    .target
                    .get_node_from_identifier(node.identifier())
                    .ok_or_else(|| {
                        MeshError::structural(format!(
                            "node {} of {} was not merged",
                            node.identifier(),
                            element.identifier()
                        ))
                    })?;
                copy.set_node(slot, Some(equivalent));
            }
            for (face_number, face) in element.faces().into_iter().enumerate() {
                let Some(face) = face else { continue };
                let equivalent = self
                    .target
                    .get_element_from_identifier(face.identifier())
                    .ok_or_else(|| {
                        MeshError::structural(format!(
                            "{} of {} was not merged",
                            face.identifier(),
                            element.identifier()
                        ))
                    })?;
                copy.set_face(face_number, Some(equivalent));
            }
            let canonical = self.target.merge_element(&copy)?;
            self.defer(unresolved, || Holder::Element(canonical.clone()));
        }
        Ok(())
    }

    /// Point embedded locations at the target's host elements. Locations
    /// whose host is not in the target yet are cleared and returned as
    /// (field, offset within field, host, xi).
    fn substitute_hosts<S: FieldStorage>(
        &self,
        layout: &FieldLayout<S>,
        values: &mut [FieldValue],
    ) -> Vec<(Field, usize, ElementId, SmallVec<[f64; 3]>)> {
        let hosts = self.target.ultimate_master();
        let mut unresolved = Vec::new();
        for storage in embedded_fields(layout) {
            let Some(slots) = values.get_mut(storage.value_range()) else {
                continue;
            };
            for (offset, slot) in slots.iter_mut().enumerate() {
                let FieldValue::ElementXi(Some(location)) = slot else {
                    continue;
                };
                let host = location.element.identifier();
                match hosts.get_element_from_identifier(host) {
                    Some(element) => location.element = element,
                    None => {
                        let xi = location.xi.clone();
                        unresolved.push((storage.field().clone(), offset, host, xi));
                        *slot = FieldValue::ElementXi(None);
                    }
                }
            }
        }
        unresolved
    }

    fn defer(
        &mut self,
        unresolved: Vec<(Field, usize, ElementId, SmallVec<[f64; 3]>)>,
        holder: impl Fn() -> Holder,
    ) {
        for (field, offset, host, xi) in unresolved {
            self.pending.push(PendingLocation {
                holder: holder(),
                field,
                offset,
                host,
                xi,
            });
        }
    }

    /// Fill in the locations deferred until their hosts were merged.
    fn resolve_embedded(self) -> Result<(), MeshError> {
        let hosts = self.target.ultimate_master();
        for pending in self.pending {
            let host = hosts.get_element_from_identifier(pending.host).ok_or_else(|| {
                MeshError::structural(format!("embedded host {} was not merged", pending.host))
            })?;
            let value = FieldValue::ElementXi(Some(ElementXi {
                element: host,
                xi: pending.xi,
            }));
            match pending.holder {
                Holder::Node(node) => {
                    let index = node
                        .layout()
                        .get(&pending.field)
                        .map(|s| s.value_offset() + pending.offset)
                        .ok_or_else(|| {
                            MeshError::structural("merged node lost an embedded field")
                        })?;
                    if let Some(slot) = node.values_mut().get_mut(index) {
                        *slot = value;
                    }
                    self.target
                        .note_node_change(&node, ChangeFlags::CONTENTS_CHANGED);
                }
                Holder::Element(element) => {
                    let index = element
                        .layout()
                        .get(&pending.field)
                        .map(|s| s.value_offset() + pending.offset)
                        .ok_or_else(|| {
                            MeshError::structural("merged element lost an embedded field")
                        })?;
                    if let Some(slot) = element.values_mut().get_mut(index) {
                        *slot = value;
                    }
                    self.target
                        .note_element_change(&element, ChangeFlags::CONTENTS_CHANGED);
                }
            }
        }
        Ok(())
    }
}
