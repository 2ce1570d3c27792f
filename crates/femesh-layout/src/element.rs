//! Element field storage descriptions.

use std::rc::Rc;

use smallvec::SmallVec;

use femesh_core::{BasisType, Field, MeshError};

use crate::layout::{FieldLayout, FieldStorage};

/// How one field component is represented over an element.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementFieldComponent {
    /// Interpolated from nodal values through a basis.
    Standard {
        /// Interpolation basis.
        basis: Rc<BasisType>,
        /// Local node slot supplying each basis node, in basis order.
        local_nodes: SmallVec<[usize; 8]>,
    },
    /// A single value stored on the element.
    Constant,
}

impl ElementFieldComponent {
    /// Interpolated component; `local_nodes` must supply every basis node.
    pub fn standard(basis: Rc<BasisType>, local_nodes: &[usize]) -> Result<Self, MeshError> {
        if local_nodes.len() != basis.number_of_nodes() {
            return Err(MeshError::invalid_argument(format!(
                "basis needs {} nodes, {} given",
                basis.number_of_nodes(),
                local_nodes.len()
            )));
        }
        Ok(Self::Standard {
            basis,
            local_nodes: local_nodes.iter().copied().collect(),
        })
    }

    fn number_of_values(&self) -> usize {
        match self {
            ElementFieldComponent::Standard { .. } => 0,
            ElementFieldComponent::Constant => 1,
        }
    }
}

/// How one field is stored on an element.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementField {
    field: Field,
    value_offset: usize,
    components: SmallVec<[ElementFieldComponent; 3]>,
}

impl ElementField {
    /// Describe `field` with one entry per component.
    pub fn new(field: Field, components: Vec<ElementFieldComponent>) -> Result<Self, MeshError> {
        if components.len() != field.number_of_components() {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' has {} components, {} described",
                field.name(),
                field.number_of_components(),
                components.len()
            )));
        }
        Ok(Self {
            field,
            value_offset: 0,
            components: components.into_iter().collect(),
        })
    }

    /// Every component interpolated with the same basis and local nodes.
    pub fn uniform(
        field: Field,
        basis: Rc<BasisType>,
        local_nodes: &[usize],
    ) -> Result<Self, MeshError> {
        let component = ElementFieldComponent::standard(basis, local_nodes)?;
        let components = vec![component; field.number_of_components()];
        Self::new(field, components)
    }

    /// Every component a constant stored on the element.
    pub fn constant(field: Field) -> Self {
        let components = (0..field.number_of_components())
            .map(|_| ElementFieldComponent::Constant)
            .collect();
        Self {
            field,
            value_offset: 0,
            components,
        }
    }

    /// Per-component representation.
    pub fn components(&self) -> &[ElementFieldComponent] {
        &self.components
    }

    /// Local node slots referenced by any component, ascending, no
    /// repeats.
    pub fn local_nodes(&self) -> Vec<usize> {
        let mut nodes: Vec<usize> = self
            .components
            .iter()
            .filter_map(|c| match c {
                ElementFieldComponent::Standard { local_nodes, .. } => {
                    Some(local_nodes.iter().copied())
                }
                ElementFieldComponent::Constant => None,
            })
            .flatten()
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Storage slot of constant `component`.
    pub fn constant_index(&self, component: usize) -> Option<usize> {
        if !matches!(self.components.get(component)?, ElementFieldComponent::Constant) {
            return None;
        }
        let before = self.components[..component]
            .iter()
            .map(ElementFieldComponent::number_of_values)
            .sum::<usize>();
        Some(self.value_offset + before)
    }
}

impl FieldStorage for ElementField {
    fn field(&self) -> &Field {
        &self.field
    }

    fn value_offset(&self) -> usize {
        self.value_offset
    }

    fn set_value_offset(&mut self, offset: usize) {
        self.value_offset = offset;
    }

    fn number_of_values(&self) -> usize {
        self.components.iter().map(ElementFieldComponent::number_of_values).sum()
    }

    fn same_structure(&self, other: &Self) -> bool {
        self.components == other.components
    }

    fn with_field(&self, field: Field) -> Self {
        Self {
            field,
            value_offset: self.value_offset,
            components: self.components.clone(),
        }
    }
}

/// The field layout shared by elements.
pub type ElementLayout = FieldLayout<ElementField>;
