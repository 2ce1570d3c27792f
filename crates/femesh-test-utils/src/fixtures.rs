//! Region fixtures.
//!
//! - [`coordinate_field`] / [`scalar_field`]: merged field definitions.
//! - [`Grid`]: a structured block of linear Lagrange lines, squares or
//!   cubes with node coordinates, built into any root or slave region.

use femesh_core::{
    BasisType, ElementId, Field, FieldDefinition, MeshError, NodeId, ShapeKind, ValueType,
};
use femesh_layout::{ElementField, NodeField};
use femesh_region::{Element, Node, Region};

/// Merge a three-component `coordinates` field into `region`.
pub fn coordinate_field(region: &Region) -> Result<Field, MeshError> {
    let field = region.create_field("coordinates", FieldDefinition::coordinates(3))?;
    region.merge_field(&field)
}

/// Merge a one-component real field called `name` into `region`.
pub fn scalar_field(region: &Region, name: &str) -> Result<Field, MeshError> {
    let field = region.create_field(name, FieldDefinition::new(ValueType::Real, 1))?;
    region.merge_field(&field)
}

/// Define `field` at `node` with a single real value and set it.
pub fn set_scalar(
    region: &Region,
    node: &Node,
    field: &Field,
    value: f64,
) -> Result<(), MeshError> {
    if !node.has_field(field) {
        region.define_field_at_node(node, NodeField::values_only(field.clone()))?;
    }
    region.set_node_real_values(node, field, &[value])
}

/// A structured block of 1D, 2D or 3D linear Lagrange elements.
///
/// Nodes are numbered x-fastest from `first_node`, elements likewise from
/// `first_element`. Node `(i, j, k)` sits at `origin + (i, j, k)`.
#[derive(Clone, Debug)]
pub struct Grid {
    pub counts: Vec<u32>,
    pub origin: [f64; 3],
    pub first_node: u32,
    pub first_element: u32,
}

impl Grid {
    /// `counts` elements along each xi direction; its length is the
    /// element dimension.
    pub fn new(counts: &[u32]) -> Self {
        Self {
            counts: counts.to_vec(),
            origin: [0.0; 3],
            first_node: 1,
            first_element: 1,
        }
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_first_node(mut self, first_node: u32) -> Self {
        self.first_node = first_node;
        self
    }

    pub fn with_first_element(mut self, first_element: u32) -> Self {
        self.first_element = first_element;
        self
    }

    pub fn dimension(&self) -> usize {
        self.counts.len()
    }

    fn nodes_along(&self, direction: usize) -> u32 {
        self.counts.get(direction).map_or(1, |&c| c + 1)
    }

    pub fn number_of_nodes(&self) -> usize {
        (0..3).map(|d| self.nodes_along(d) as usize).product()
    }

    pub fn number_of_elements(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).product()
    }

    /// Identifier of the node at grid position `at`.
    pub fn node_id(&self, at: [u32; 3]) -> NodeId {
        let nx = self.nodes_along(0);
        let ny = self.nodes_along(1);
        NodeId(self.first_node + at[0] + nx * (at[1] + ny * at[2]))
    }

    fn shape(&self) -> Result<ShapeKind, MeshError> {
        match self.dimension() {
            1 => Ok(ShapeKind::Line),
            2 => Ok(ShapeKind::Square),
            3 => Ok(ShapeKind::Cube),
            d => Err(MeshError::invalid_argument(format!("grid dimension {d}"))),
        }
    }

    fn node_counts(&self) -> [u32; 3] {
        [self.nodes_along(0), self.nodes_along(1), self.nodes_along(2)]
    }

    fn element_counts(&self) -> [u32; 3] {
        [0, 1, 2].map(|d| self.counts.get(d).copied().unwrap_or(1))
    }

    /// Merge the grid's nodes, with coordinates, into `region`.
    pub fn build_nodes(&self, region: &Region) -> Result<Vec<Node>, MeshError> {
        let coordinates = coordinate_field(region)?;
        let mut nodes = Vec::with_capacity(self.number_of_nodes());
        for at in positions(self.node_counts()) {
            let node = region.merge_node(&region.create_node(self.node_id(at))?)?;
            if !node.has_field(&coordinates) {
                region.define_field_at_node(&node, NodeField::values_only(coordinates.clone()))?;
            }
            let position: Vec<f64> = (0..3).map(|d| self.origin[d] + f64::from(at[d])).collect();
            region.set_node_real_values(&node, &coordinates, &position)?;
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Create the grid's elements without merging them. Nodes must have
    /// been built into `region` first.
    pub fn create_elements(&self, region: &Region) -> Result<Vec<Element>, MeshError> {
        let shape = self.shape()?;
        let coordinates = coordinate_field(region)?;
        let basis = region.basis(BasisType::linear_lagrange(self.dimension())?)?;
        let slots: Vec<usize> = (0..1 << self.dimension()).collect();
        let mut elements = Vec::with_capacity(self.number_of_elements());
        let element_counts = self.element_counts();
        for (offset, at) in positions(element_counts).enumerate() {
            let number = self.first_element + offset as u32;
            let element = region.create_element(ElementId::element(number), shape)?;
            for &slot in &slots {
                let corner = [0, 1, 2].map(|d| at[d] + ((slot >> d) & 1) as u32);
                let node = region
                    .get_node_from_identifier(self.node_id(corner))
                    .ok_or_else(|| MeshError::invalid_argument("grid nodes have not been built"))?;
                region.set_element_node(&element, slot, &node)?;
            }
            region.define_field_at_element(
                &element,
                ElementField::uniform(coordinates.clone(), basis.clone(), &slots)?,
            )?;
            elements.push(element);
        }
        Ok(elements)
    }

    /// Build nodes and merge elements without faces.
    pub fn build(&self, region: &Region) -> Result<Vec<Element>, MeshError> {
        region.begin_change();
        let built = self.build_nodes(region).and_then(|_| {
            self.create_elements(region)?
                .iter()
                .map(|element| region.merge_element(element))
                .collect()
        });
        region.end_change()?;
        built
    }

    /// Build nodes and merge elements, creating shared faces and lines.
    pub fn build_with_faces(&self, region: &Region) -> Result<Vec<Element>, MeshError> {
        region.begin_change();
        let built = self.build_nodes(region).and_then(|_| {
            region.begin_define_faces()?;
            let merged: Result<Vec<Element>, MeshError> = self
                .create_elements(region)?
                .iter()
                .map(|element| region.merge_element_and_faces_and_nodes(element))
                .collect();
            region.end_define_faces()?;
            merged
        });
        region.end_change()?;
        built
    }
}

fn positions(counts: [u32; 3]) -> impl Iterator<Item = [u32; 3]> {
    (0..counts[2]).flat_map(move |k| {
        (0..counts[1]).flat_map(move |j| (0..counts[0]).map(move |i| [i, j, k]))
    })
}
