//! The [`Node`] handle.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use femesh_core::{Field, NamespaceId, NodeId, Tracked};
use femesh_layout::{FieldStorage, NodalValueType, NodeLayout};

use crate::value::FieldValue;

struct NodeInner {
    identifier: Cell<NodeId>,
    namespace: NamespaceId,
    layout: RefCell<Rc<NodeLayout>>,
    values: RefCell<Vec<FieldValue>>,
}

/// Shared handle to a node.
///
/// Nodes are created for a region (see
/// [`Region::create_node`](crate::Region::create_node)), populated, and
/// then merged in. Equality is identity.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

impl Node {
    pub(crate) fn new(
        identifier: NodeId,
        namespace: NamespaceId,
        layout: Rc<NodeLayout>,
        values: Vec<FieldValue>,
    ) -> Self {
        Self(Rc::new(NodeInner {
            identifier: Cell::new(identifier),
            namespace,
            layout: RefCell::new(layout),
            values: RefCell::new(values),
        }))
    }

    /// Node identifier.
    pub fn identifier(&self) -> NodeId {
        self.0.identifier.get()
    }

    pub(crate) fn set_identifier(&self, identifier: NodeId) {
        self.0.identifier.set(identifier);
    }

    /// Namespace of the node set this node was created for.
    pub fn namespace(&self) -> NamespaceId {
        self.0.namespace
    }

    /// Current layout.
    pub fn layout(&self) -> Rc<NodeLayout> {
        Rc::clone(&self.0.layout.borrow())
    }

    pub(crate) fn layout_mut(&self) -> RefMut<'_, Rc<NodeLayout>> {
        self.0.layout.borrow_mut()
    }

    /// True if `field` is defined at this node.
    pub fn has_field(&self, field: &Field) -> bool {
        self.0.layout.borrow().has_field(field)
    }

    /// True if a field called `name` is defined at this node.
    pub fn has_field_named(&self, name: &str) -> bool {
        self.0.layout.borrow().get_by_name(name).is_some()
    }

    /// Raw value storage, laid out by [`Node::layout`].
    pub fn values(&self) -> Ref<'_, [FieldValue]> {
        Ref::map(self.0.values.borrow(), Vec::as_slice)
    }

    pub(crate) fn values_mut(&self) -> RefMut<'_, Vec<FieldValue>> {
        self.0.values.borrow_mut()
    }

    /// Storage index of one value of `field`.
    pub fn value_index(
        &self,
        field: &Field,
        component: usize,
        version: u32,
        value_type: NodalValueType,
    ) -> Option<usize> {
        self.0
            .layout
            .borrow()
            .get(field)?
            .value_index(component, version, value_type)
    }

    /// One value of `field`.
    pub fn value(
        &self,
        field: &Field,
        component: usize,
        version: u32,
        value_type: NodalValueType,
    ) -> Option<FieldValue> {
        let index = self.value_index(field, component, version, value_type)?;
        self.0.values.borrow().get(index).cloned()
    }

    /// Real value of `field` at `time`.
    ///
    /// A time-varying field is interpolated linearly between its stored
    /// times and clamped outside them; any other field ignores `time`.
    pub fn real_value_at_time(
        &self,
        field: &Field,
        component: usize,
        version: u32,
        value_type: NodalValueType,
        time: f64,
    ) -> Option<f64> {
        let layout = self.0.layout.borrow();
        let storage = layout.get(field)?;
        let location = match storage.time_sequence() {
            Some(sequence) => sequence.locate(time),
            None => return self.value(field, component, version, value_type)?.as_real(),
        };
        let values = self.0.values.borrow();
        let at = |time_index| {
            let index = storage.value_index_at_time(component, version, value_type, time_index)?;
            values.get(index)?.as_real()
        };
        let lower = at(location.lower)?;
        let upper = at(location.upper)?;
        Some(lower + location.xi * (upper - lower))
    }

    /// Version 0 value of every component of a real field.
    pub fn real_values(&self, field: &Field) -> Option<Vec<f64>> {
        (0..field.number_of_components())
            .map(|c| {
                self.value(field, c, 0, NodalValueType::Value)
                    .and_then(|v| v.as_real())
            })
            .collect()
    }

    /// Fields defined at this node.
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
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Node::ptr_eq(self, other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.identifier())
    }
}

impl Tracked for Node {
    fn tracking_key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}
