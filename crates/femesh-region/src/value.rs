//! Values stored on nodes and elements.

use smallvec::SmallVec;

use femesh_core::{MeshError, ValueType};
use femesh_layout::{FieldLayout, FieldStorage, ValueCopy};

use crate::element::Element;

/// A location inside an element: the host element and its local xi
/// coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementXi {
    /// Host element.
    pub element: Element,
    /// Local coordinates, one per element dimension.
    pub xi: SmallVec<[f64; 3]>,
}

impl ElementXi {
    /// Location `xi` inside `element`.
    pub fn new(element: Element, xi: &[f64]) -> Self {
        Self {
            element,
            xi: xi.iter().copied().collect(),
        }
    }
}

/// One value slot of a node or element.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// Real value.
    Real(f64),
    /// Integer value.
    Integer(i32),
    /// Text value.
    String(String),
    /// Embedded location, or none if unset.
    ElementXi(Option<ElementXi>),
}

impl FieldValue {
    /// The zero value of `value_type`.
    pub fn default_for(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Real => FieldValue::Real(0.0),
            ValueType::Integer => FieldValue::Integer(0),
            ValueType::String => FieldValue::String(String::new()),
            ValueType::ElementXi => FieldValue::ElementXi(None),
        }
    }

    /// Type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldValue::Real(_) => ValueType::Real,
            FieldValue::Integer(_) => ValueType::Integer,
            FieldValue::String(_) => ValueType::String,
            FieldValue::ElementXi(_) => ValueType::ElementXi,
        }
    }

    /// The real value, if this is one.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            FieldValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// The embedded location, if this is a set element_xi value.
    pub fn as_element_xi(&self) -> Option<&ElementXi> {
        match self {
            FieldValue::ElementXi(location) => location.as_ref(),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Real(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<ElementXi> for FieldValue {
    fn from(v: ElementXi) -> Self {
        FieldValue::ElementXi(Some(v))
    }
}

/// Zero-initialized storage for `layout`.
pub(crate) fn default_values<S: FieldStorage>(layout: &FieldLayout<S>) -> Vec<FieldValue> {
    let mut values = vec![FieldValue::Real(0.0); layout.number_of_values()];
    for storage in layout.fields() {
        let value = FieldValue::default_for(storage.field().value_type());
        for slot in &mut values[storage.value_range()] {
            *slot = value.clone();
        }
    }
    values
}

/// Apply the copies of a merge plan from `source` into `target`.
///
/// Returns whether any target value changed.
pub(crate) fn copy_values(
    target: &mut [FieldValue],
    source: &[FieldValue],
    copies: &[ValueCopy],
) -> Result<bool, MeshError> {
    let mut changed = false;
    for copy in copies {
        let from = source.get(copy.from.clone()).ok_or_else(|| {
            MeshError::structural("source values shorter than their layout")
        })?;
        let to = target
            .get_mut(copy.to..copy.to + from.len())
            .ok_or_else(|| MeshError::structural("target values shorter than their layout"))?;
        for (slot, value) in to.iter_mut().zip(from) {
            if slot != value {
                *slot = value.clone();
                changed = true;
            }
        }
    }
    Ok(changed)
}
