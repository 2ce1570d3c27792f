//! Automatic face and line creation while merging elements.
//!
//! Between [`Region::begin_define_faces`] and [`Region::end_define_faces`]
//! the root keeps an index of its faces and lines keyed by dimension and
//! node set, so neighbouring elements merged with
//! [`Region::merge_element_and_faces_and_nodes`] share one face object.

use std::collections::HashMap;

use smallvec::SmallVec;

use femesh_core::{ChangeFlags, ElementId, ElementKind, MeshError, NodeId};

use crate::element::Element;
use crate::region::Region;

/// Dimension plus sorted, de-duplicated node identifiers of a face.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct FaceKey {
    dimension: usize,
    nodes: SmallVec<[NodeId; 4]>,
}

impl FaceKey {
    fn new(dimension: usize, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let mut nodes: SmallVec<[NodeId; 4]> = nodes.into_iter().collect();
        nodes.sort_unstable();
        nodes.dedup();
        Self { dimension, nodes }
    }

    /// Key of an existing face, if all its nodes are set.
    fn of(face: &Element) -> Option<Self> {
        let ids: Option<Vec<NodeId>> = face
            .nodes()
            .iter()
            .map(|n| n.as_ref().map(|n| n.identifier()))
            .collect();
        let ids = ids.filter(|ids| !ids.is_empty())?;
        Some(Self::new(face.dimension(), ids))
    }

    /// Faces collapsed onto a lower-dimensional entity get no object.
    fn is_collapsed(&self) -> bool {
        match self.dimension {
            2 => self.nodes.len() <= 2,
            1 => self.nodes.len() == 1,
            _ => false,
        }
    }
}

/// Faces and lines of the root by [`FaceKey`], plus identifier counters
/// for new ones.
#[derive(Debug, Default)]
pub(crate) struct FaceIndex {
    faces: HashMap<FaceKey, Element>,
    next: [u32; 3],
}

impl FaceIndex {
    fn insert(&mut self, face: &Element) {
        if let Some(key) = FaceKey::of(face) {
            if !key.is_collapsed() {
                self.faces.entry(key).or_insert_with(|| face.clone());
            }
        }
    }
}

impl Region {
    /// Start automatic face creation.
    ///
    /// Indexes the existing faces and lines of the root. Fails if face
    /// definition is already active.
    pub fn begin_define_faces(&self) -> Result<(), MeshError> {
        let owner = self.field_owner();
        let existing: Vec<Element> = owner
            .state()
            .elements
            .values()
            .filter(|e| e.identifier().kind != ElementKind::Element)
            .cloned()
            .collect();
        owner.with_store_mut(|store| {
            if store.faces.is_some() {
                return Err(MeshError::invalid_argument("faces are already being defined"));
            }
            let mut index = FaceIndex {
                faces: HashMap::new(),
                next: [1; 3],
            };
            for face in &existing {
                index.insert(face);
            }
            tracing::debug!(faces = index.faces.len(), "face definition started");
            store.faces = Some(index);
            Ok(())
        })?
    }

    /// Stop automatic face creation and drop the index.
    pub fn end_define_faces(&self) -> Result<(), MeshError> {
        self.with_store_mut(|store| match store.faces.take() {
            Some(_) => Ok(()),
            None => Err(MeshError::invalid_argument("faces are not being defined")),
        })?
    }

    /// True between [`Region::begin_define_faces`] and
    /// [`Region::end_define_faces`].
    pub fn is_defining_faces(&self) -> bool {
        self.with_store(|store| store.faces.is_some()).unwrap_or(false)
    }

    /// Merge `element` with its nodes and, recursively, its faces.
    ///
    /// Nodes are merged first and slots are switched to the canonical
    /// nodes. Faces already set are merged the same way; while face
    /// definition is active, missing faces are found or created. Returns
    /// the canonical element.
    pub fn merge_element_and_faces_and_nodes(
        &self,
        element: &Element,
    ) -> Result<Element, MeshError> {
        self.check_element_namespace(element)?;
        self.bracket(|| {
            for (index, node) in element.nodes().into_iter().enumerate() {
                let Some(node) = node else { continue };
                let canonical = self.merge_node(&node)?;
                if !crate::node::Node::ptr_eq(&canonical, &node) {
                    element.set_node(index, Some(canonical));
                }
            }
            self.merge_element_and_faces(element)
        })
    }

    fn merge_element_and_faces(&self, element: &Element) -> Result<Element, MeshError> {
        let mut faces_changed = false;
        for face_number in 0..element.number_of_face_slots() {
            let face = match element.face(face_number) {
                Some(face) => self.merge_element_and_faces_and_nodes(&face)?,
                None => match self.find_or_create_face(element, face_number)? {
                    Some(face) => self.merge_element_and_faces(&face)?,
                    None => continue,
                },
            };
            if !element.face(face_number).is_some_and(|f| Element::ptr_eq(&f, &face)) {
                element.set_face(face_number, Some(face));
                faces_changed = true;
            }
        }
        let was_merged = self.contains_element(element);
        let canonical = self.merge_element(element)?;
        if was_merged && faces_changed {
            self.note_element_change(&canonical, ChangeFlags::CONTENTS_CHANGED);
        }
        Ok(canonical)
    }

    /// The face for slot `face_number` of `element` from the face index,
    /// creating one if the index has none. `None` when face definition is
    /// off, the element's nodes are incomplete, or the face collapses.
    fn find_or_create_face(
        &self,
        element: &Element,
        face_number: usize,
    ) -> Result<Option<Element>, MeshError> {
        if !self.is_defining_faces() {
            return Ok(None);
        }
        let shape = element.shape();
        let (Some(face_kind), Some(local_nodes)) =
            (shape.face_shape(face_number), shape.face_local_nodes(face_number))
        else {
            return Ok(None);
        };
        let nodes: Option<Vec<_>> = local_nodes.iter().map(|&slot| element.node(slot)).collect();
        let Some(nodes) = nodes else {
            return Ok(None);
        };
        let dimension = shape.dimension() - 1;
        let key = FaceKey::new(dimension, nodes.iter().map(|n| n.identifier()));
        if key.is_collapsed() {
            return Ok(None);
        }
        let owner = self.field_owner();
        let found = owner.with_store(|store| {
            store
                .faces
                .as_ref()
                .and_then(|index| index.faces.get(&key).cloned())
        })?;
        if let Some(face) = found {
            return Ok(Some(face));
        }
        let kind = ElementKind::for_face_dimension(dimension);
        let number = {
            let mut guard = owner.state_mut();
            let state = &mut *guard;
            let elements = &state.elements;
            let index = state
                .store
                .as_mut()
                .ok_or_else(|| MeshError::structural("region does not own a field store"))?
                .faces
                .as_mut()
                .ok_or_else(|| MeshError::structural("face index vanished"))?;
            let mut number = index.next[kind.index()];
            while elements.contains_key(&ElementId::new(kind, number)) {
                number = number
                    .checked_add(1)
                    .ok_or_else(|| MeshError::allocation(format!("no free {kind:?} number")))?;
            }
            index.next[kind.index()] = number.saturating_add(1);
            number
        };
        let face = owner.create_element(ElementId::new(kind, number), face_kind)?;
        for (slot, node) in nodes.into_iter().enumerate() {
            face.set_node(slot, Some(node));
        }
        owner.with_store_mut(|store| {
            if let Some(index) = store.faces.as_mut() {
                index.faces.insert(key, face.clone());
            }
        })?;
        Ok(Some(face))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_ignore_node_order_and_repeats() {
        let a = FaceKey::new(2, [NodeId(4), NodeId(1), NodeId(3), NodeId(2)]);
        let b = FaceKey::new(2, [NodeId(1), NodeId(2), NodeId(3), NodeId(4)]);
        assert_eq!(a, b);
        let c = FaceKey::new(1, [NodeId(1), NodeId(2)]);
        assert_ne!(a, c);
    }

    #[test]
    fn collapsed_faces_are_detected() {
        assert!(FaceKey::new(2, [NodeId(1), NodeId(1), NodeId(2), NodeId(2)]).is_collapsed());
        assert!(!FaceKey::new(2, [NodeId(1), NodeId(1), NodeId(2), NodeId(3)]).is_collapsed());
        assert!(FaceKey::new(1, [NodeId(5), NodeId(5)]).is_collapsed());
        assert!(!FaceKey::new(1, [NodeId(5), NodeId(6)]).is_collapsed());
    }
}
