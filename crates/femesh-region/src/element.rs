//! The [`Element`] handle and face/parent links.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use femesh_core::{ElementId, ElementShape, Field, NamespaceId, Tracked};
use femesh_layout::{ElementLayout, FieldStorage};

use crate::node::Node;
use crate::value::{default_values, FieldValue};

struct ParentLink {
    parent: Weak<ElementInner>,
    face_number: usize,
}

struct ElementInner {
    identifier: Cell<ElementId>,
    namespace: NamespaceId,
    shape: RefCell<Rc<ElementShape>>,
    nodes: RefCell<Vec<Option<Node>>>,
    faces: RefCell<Vec<Option<Element>>>,
    parents: RefCell<Vec<ParentLink>>,
    layout: RefCell<Rc<ElementLayout>>,
    values: RefCell<Vec<FieldValue>>,
}

/// Shared handle to an element, face or line.
///
/// An element owns its faces; a face refers back to its parents without
/// keeping them alive. Equality is identity.
#[derive(Clone)]
pub struct Element(Rc<ElementInner>);

impl Element {
    pub(crate) fn new(
        identifier: ElementId,
        namespace: NamespaceId,
        shape: Rc<ElementShape>,
        layout: Rc<ElementLayout>,
    ) -> Self {
        let nodes = vec![None; shape.number_of_nodes()];
        let faces = vec![None; shape.number_of_faces()];
        let values = default_values(&layout);
        Self(Rc::new(ElementInner {
            identifier: Cell::new(identifier),
            namespace,
            shape: RefCell::new(shape),
            nodes: RefCell::new(nodes),
            faces: RefCell::new(faces),
            parents: RefCell::new(Vec::new()),
            layout: RefCell::new(layout),
            values: RefCell::new(values),
        }))
    }

    /// Element identifier.
    pub fn identifier(&self) -> ElementId {
        self.0.identifier.get()
    }

    pub(crate) fn set_identifier(&self, identifier: ElementId) {
        self.0.identifier.set(identifier);
    }

    /// Namespace of the element set this element was created for.
    pub fn namespace(&self) -> NamespaceId {
        self.0.namespace
    }

    /// Shape.
    pub fn shape(&self) -> Rc<ElementShape> {
        Rc::clone(&self.0.shape.borrow())
    }

    /// Topological dimension.
    pub fn dimension(&self) -> usize {
        self.0.shape.borrow().dimension()
    }

    /// Replace an unspecified placeholder shape with a real one of the
    /// same dimension, resizing node and face slots.
    pub(crate) fn specify_shape(&self, shape: Rc<ElementShape>) {
        self.0.nodes.borrow_mut().resize(shape.number_of_nodes(), None);
        self.0.faces.borrow_mut().resize(shape.number_of_faces(), None);
        *self.0.shape.borrow_mut() = shape;
    }

    /// Node in local slot `index`.
    pub fn node(&self, index: usize) -> Option<Node> {
        self.0.nodes.borrow().get(index).cloned().flatten()
    }

    /// All local node slots.
    pub fn nodes(&self) -> Vec<Option<Node>> {
        self.0.nodes.borrow().clone()
    }

    pub(crate) fn number_of_node_slots(&self) -> usize {
        self.0.nodes.borrow().len()
    }

    pub(crate) fn set_node(&self, index: usize, node: Option<Node>) {
        if let Some(slot) = self.0.nodes.borrow_mut().get_mut(index) {
            *slot = node;
        }
    }

    /// True if `node` occupies any local slot.
    pub fn uses_node(&self, node: &Node) -> bool {
        self.0
            .nodes
            .borrow()
            .iter()
            .flatten()
            .any(|n| Node::ptr_eq(n, node))
    }

    /// Face in slot `face_number`.
    pub fn face(&self, face_number: usize) -> Option<Element> {
        self.0.faces.borrow().get(face_number).cloned().flatten()
    }

    /// All face slots.
    pub fn faces(&self) -> Vec<Option<Element>> {
        self.0.faces.borrow().clone()
    }

    pub(crate) fn number_of_face_slots(&self) -> usize {
        self.0.faces.borrow().len()
    }

    /// Put `face` in slot `face_number`, keeping parent links of both the
    /// old and the new face consistent.
    pub(crate) fn set_face(&self, face_number: usize, face: Option<Element>) {
        let old = {
            let mut faces = self.0.faces.borrow_mut();
            match faces.get_mut(face_number) {
                Some(slot) => std::mem::replace(slot, face.clone()),
                None => return,
            }
        };
        if let Some(old) = old {
            old.0.parents.borrow_mut().retain(|link| {
                !(link.face_number == face_number
                    && Weak::as_ptr(&link.parent) == Rc::as_ptr(&self.0))
            });
        }
        if let Some(face) = face {
            face.0.parents.borrow_mut().push(ParentLink {
                parent: Rc::downgrade(&self.0),
                face_number,
            });
        }
    }

    /// Live parents of this face or line.
    pub fn parents(&self) -> Vec<Element> {
        self.0
            .parents
            .borrow()
            .iter()
            .filter_map(|link| link.parent.upgrade().map(Element))
            .collect()
    }

    /// Live parents with the face slot this element occupies in each.
    pub fn parent_slots(&self) -> Vec<(Element, usize)> {
        self.0
            .parents
            .borrow()
            .iter()
            .filter_map(|link| link.parent.upgrade().map(|p| (Element(p), link.face_number)))
            .collect()
    }

    /// Current layout.
    pub fn layout(&self) -> Rc<ElementLayout> {
        Rc::clone(&self.0.layout.borrow())
    }

    pub(crate) fn layout_mut(&self) -> RefMut<'_, Rc<ElementLayout>> {
        self.0.layout.borrow_mut()
    }

    /// True if `field` is defined on this element itself.
    pub fn has_field(&self, field: &Field) -> bool {
        self.0.layout.borrow().has_field(field)
    }

    /// Element-stored values, laid out by [`Element::layout`].
    pub fn values(&self) -> Ref<'_, [FieldValue]> {
        Ref::map(self.0.values.borrow(), Vec::as_slice)
    }

    pub(crate) fn values_mut(&self) -> RefMut<'_, Vec<FieldValue>> {
        self.0.values.borrow_mut()
    }

    /// Constant value of `component` of `field`.
    pub fn constant_value(&self, field: &Field, component: usize) -> Option<FieldValue> {
        let index = self.0.layout.borrow().get(field)?.constant_index(component)?;
        self.0.values.borrow().get(index).cloned()
    }

    /// Fields defined on this element.
    pub fn fields(&self) -> Vec<Field> {
        self.0
            .layout
            .borrow()
            .fields()
            .iter()
            .map(|s| s.field().clone())
            .collect()
    }

    /// Identity comparison.
    pub fn ptr_eq(a: &Element, b: &Element) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Element::ptr_eq(self, other)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({})", self.identifier())
    }
}

impl Tracked for Element {
    fn tracking_key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use femesh_core::{ShapeKind, ShapeRegistry};
    use femesh_layout::LayoutTable;

    fn element(id: ElementId, kind: ShapeKind, ns: NamespaceId) -> Element {
        let mut shapes = ShapeRegistry::new();
        let mut layouts = LayoutTable::new();
        Element::new(id, ns, shapes.get(kind), layouts.empty_layout())
    }

    #[test]
    fn set_face_maintains_parent_links() {
        let ns = NamespaceId::next();
        let square = element(ElementId::element(1), ShapeKind::Square, ns);
        let line = element(ElementId::line(1), ShapeKind::Line, ns);
        square.set_face(2, Some(line.clone()));
        assert_eq!(line.parents(), vec![square.clone()]);
        assert_eq!(line.parent_slots()[0].1, 2);
        square.set_face(2, None);
        assert!(line.parents().is_empty());
    }

    #[test]
    fn dropped_parent_disappears_from_face() {
        let ns = NamespaceId::next();
        let line = element(ElementId::line(1), ShapeKind::Line, ns);
        {
            let square = element(ElementId::element(1), ShapeKind::Square, ns);
            square.set_face(0, Some(line.clone()));
            assert_eq!(line.parents().len(), 1);
        }
        assert!(line.parents().is_empty());
    }

    #[test]
    fn out_of_range_slots_are_ignored() {
        let ns = NamespaceId::next();
        let square = element(ElementId::element(1), ShapeKind::Square, ns);
        let line = element(ElementId::line(1), ShapeKind::Line, ns);
        square.set_face(9, Some(line.clone()));
        assert!(line.parents().is_empty());
        assert!(square.face(9).is_none());
    }

    #[test]
    fn placeholder_shape_can_be_specified() {
        let ns = NamespaceId::next();
        let mut shapes = ShapeRegistry::new();
        let unspecified = ShapeKind::Unspecified { dimension: 2 };
        let placeholder = element(ElementId::element(4), unspecified, ns);
        assert_eq!(placeholder.number_of_node_slots(), 0);
        placeholder.specify_shape(shapes.get(ShapeKind::Square));
        assert_eq!(placeholder.number_of_node_slots(), 4);
        assert_eq!(placeholder.number_of_face_slots(), 4);
        assert_eq!(placeholder.dimension(), 2);
    }
}
