//! Element shapes, their face decomposition, and the per-region shape
//! registry.
//!
//! Local node numbering follows the usual linear Lagrange convention:
//! for tensor-product shapes node `i` sits at xi bit pattern `i` (xi1 is
//! the lowest bit); for simplices node 0 is the origin and node `k` lies
//! on the xi`k` axis.

use std::rc::Rc;

/// Geometric shape of an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Placeholder with a dimension only. Used for elements that exist to
    /// host embedded locations but whose topology is defined elsewhere.
    Unspecified {
        /// Topological dimension, 1 to 3.
        dimension: u8,
    },
    /// 1D line segment.
    Line,
    /// 2D quadrilateral.
    Square,
    /// 2D triangle.
    Triangle,
    /// 3D hexahedron.
    Cube,
    /// 3D tetrahedron.
    Tetrahedron,
}

const SQUARE_FACES: [&[usize]; 4] = [&[0, 2], &[1, 3], &[0, 1], &[2, 3]];
const TRIANGLE_FACES: [&[usize]; 3] = [&[1, 2], &[0, 2], &[0, 1]];
const CUBE_FACES: [&[usize]; 6] = [
    &[0, 2, 4, 6],
    &[1, 3, 5, 7],
    &[0, 1, 4, 5],
    &[2, 3, 6, 7],
    &[0, 1, 2, 3],
    &[4, 5, 6, 7],
];
const TETRAHEDRON_FACES: [&[usize]; 4] = [&[1, 2, 3], &[0, 2, 3], &[0, 1, 3], &[0, 1, 2]];

/// An element shape as stored in a [`ShapeRegistry`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementShape {
    kind: ShapeKind,
}

impl ElementShape {
    /// Wrap a shape kind. Most callers should go through a registry.
    pub fn new(kind: ShapeKind) -> Self {
        Self { kind }
    }

    /// The shape kind.
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Topological dimension.
    pub fn dimension(&self) -> usize {
        match self.kind {
            ShapeKind::Unspecified { dimension } => dimension as usize,
            ShapeKind::Line => 1,
            ShapeKind::Square | ShapeKind::Triangle => 2,
            ShapeKind::Cube | ShapeKind::Tetrahedron => 3,
        }
    }

    /// True for an [`ShapeKind::Unspecified`] placeholder.
    pub fn is_unspecified(&self) -> bool {
        matches!(self.kind, ShapeKind::Unspecified { .. })
    }

    /// Number of local node slots an element of this shape carries.
    pub fn number_of_nodes(&self) -> usize {
        match self.kind {
            ShapeKind::Unspecified { .. } => 0,
            ShapeKind::Line => 2,
            ShapeKind::Square => 4,
            ShapeKind::Triangle => 3,
            ShapeKind::Cube => 8,
            ShapeKind::Tetrahedron => 4,
        }
    }

    /// Number of face slots. Lines have none: their boundaries are nodes.
    pub fn number_of_faces(&self) -> usize {
        self.face_table().len()
    }

    /// Shape of face `face_number`.
    pub fn face_shape(&self, face_number: usize) -> Option<ShapeKind> {
        if face_number >= self.number_of_faces() {
            return None;
        }
        Some(match self.kind {
            ShapeKind::Square | ShapeKind::Triangle => ShapeKind::Line,
            ShapeKind::Cube => ShapeKind::Square,
            ShapeKind::Tetrahedron => ShapeKind::Triangle,
            ShapeKind::Unspecified { .. } | ShapeKind::Line => return None,
        })
    }

    /// Local node indices of this shape that make up face `face_number`,
    /// in the face's own local node order.
    pub fn face_local_nodes(&self, face_number: usize) -> Option<&'static [usize]> {
        self.face_table().get(face_number).copied()
    }

    fn face_table(&self) -> &'static [&'static [usize]] {
        match self.kind {
            ShapeKind::Square => &SQUARE_FACES,
            ShapeKind::Triangle => &TRIANGLE_FACES,
            ShapeKind::Cube => &CUBE_FACES,
            ShapeKind::Tetrahedron => &TETRAHEDRON_FACES,
            ShapeKind::Unspecified { .. } | ShapeKind::Line => &[],
        }
    }
}

/// Interned element shapes owned by a root region.
///
/// Every element of a region points at one of these, so shape equality
/// between elements is a pointer comparison.
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: Vec<Rc<ElementShape>>,
}

impl ShapeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the registered shape for `kind`, registering it if needed.
    pub fn get(&mut self, kind: ShapeKind) -> Rc<ElementShape> {
        if let Some(shape) = self.shapes.iter().find(|s| s.kind == kind) {
            return Rc::clone(shape);
        }
        let shape = Rc::new(ElementShape::new(kind));
        self.shapes.push(Rc::clone(&shape));
        shape
    }

    /// Number of distinct shapes registered.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// True if no shape has been registered.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_nodes_are_within_element_nodes() {
        for kind in [
            ShapeKind::Square,
            ShapeKind::Triangle,
            ShapeKind::Cube,
            ShapeKind::Tetrahedron,
        ] {
            let shape = ElementShape::new(kind);
            for face in 0..shape.number_of_faces() {
                let face_shape = ElementShape::new(shape.face_shape(face).unwrap());
                let nodes = shape.face_local_nodes(face).unwrap();
                assert_eq!(nodes.len(), face_shape.number_of_nodes(), "{kind:?} face {face}");
                assert!(nodes.iter().all(|&n| n < shape.number_of_nodes()));
                assert_eq!(face_shape.dimension() + 1, shape.dimension());
            }
        }
    }

    #[test]
    fn lines_and_placeholders_have_no_faces() {
        assert_eq!(ElementShape::new(ShapeKind::Line).number_of_faces(), 0);
        let placeholder = ElementShape::new(ShapeKind::Unspecified { dimension: 3 });
        assert_eq!(placeholder.number_of_faces(), 0);
        assert_eq!(placeholder.dimension(), 3);
        assert!(placeholder.face_shape(0).is_none());
    }

    #[test]
    fn registry_interns_shapes() {
        let mut registry = ShapeRegistry::new();
        let a = registry.get(ShapeKind::Cube);
        let b = registry.get(ShapeKind::Cube);
        let c = registry.get(ShapeKind::Square);
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }
}
