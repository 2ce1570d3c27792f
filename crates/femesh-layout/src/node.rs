//! Node field storage descriptions.

use std::rc::Rc;

use smallvec::{smallvec, SmallVec};

use femesh_core::{Field, MeshError, TimeSequence};

use crate::layout::{FieldLayout, FieldStorage};

/// Kind of nodal value: the value itself or one of its derivatives with
/// respect to the arc-length parameters s1..s3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodalValueType {
    /// The value.
    Value,
    /// d/ds1.
    DDs1,
    /// d/ds2.
    DDs2,
    /// d2/ds1ds2.
    D2Ds1Ds2,
    /// d/ds3.
    DDs3,
    /// d2/ds1ds3.
    D2Ds1Ds3,
    /// d2/ds2ds3.
    D2Ds2Ds3,
    /// d3/ds1ds2ds3.
    D3Ds1Ds2Ds3,
}

/// Storage of one field component at a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeFieldComponent {
    /// Number of versions, each holding every value type.
    pub number_of_versions: u32,
    /// Value types stored per version; always starts with
    /// [`NodalValueType::Value`].
    pub value_types: SmallVec<[NodalValueType; 4]>,
}

impl NodeFieldComponent {
    /// A single value, no derivatives, one version.
    pub fn value_only() -> Self {
        Self {
            number_of_versions: 1,
            value_types: smallvec![NodalValueType::Value],
        }
    }

    /// A component with the value followed by `derivatives`.
    pub fn with_derivatives(
        number_of_versions: u32,
        derivatives: &[NodalValueType],
    ) -> Result<Self, MeshError> {
        if number_of_versions == 0 {
            return Err(MeshError::invalid_argument(
                "node field component needs at least one version",
            ));
        }
        if derivatives.contains(&NodalValueType::Value) {
            return Err(MeshError::invalid_argument(
                "derivative list must not repeat the value",
            ));
        }
        let mut value_types: SmallVec<[NodalValueType; 4]> = smallvec![NodalValueType::Value];
        value_types.extend_from_slice(derivatives);
        Ok(Self {
            number_of_versions,
            value_types,
        })
    }

    /// Number of derivatives stored per version.
    pub fn number_of_derivatives(&self) -> usize {
        self.value_types.len() - 1
    }

    /// Number of value slots this component occupies.
    pub fn number_of_values(&self) -> usize {
        self.number_of_versions as usize * self.value_types.len()
    }
}

/// How one field is stored on a node.
///
/// A time-varying field stores every value once per time of its
/// [`TimeSequence`], the times of one value being adjacent.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeField {
    field: Field,
    value_offset: usize,
    components: SmallVec<[NodeFieldComponent; 3]>,
    time_sequence: Option<Rc<TimeSequence>>,
}

impl NodeField {
    /// Describe `field` with one storage entry per component.
    pub fn new(field: Field, components: Vec<NodeFieldComponent>) -> Result<Self, MeshError> {
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
            time_sequence: None,
        })
    }

    /// Every component stores a single value.
    pub fn values_only(field: Field) -> Self {
        let components = (0..field.number_of_components())
            .map(|_| NodeFieldComponent::value_only())
            .collect();
        Self {
            field,
            value_offset: 0,
            components,
            time_sequence: None,
        }
    }

    /// Store one set of values per time of `sequence`.
    pub fn with_time_sequence(mut self, sequence: Rc<TimeSequence>) -> Self {
        self.time_sequence = Some(sequence);
        self
    }

    /// Per-component storage.
    pub fn components(&self) -> &[NodeFieldComponent] {
        &self.components
    }

    /// The times values are stored at, if the field varies in time.
    pub fn time_sequence(&self) -> Option<&Rc<TimeSequence>> {
        self.time_sequence.as_ref()
    }

    /// Number of stored times; 1 for a field constant in time.
    pub fn number_of_times(&self) -> usize {
        self.time_sequence.as_ref().map_or(1, |s| s.len())
    }

    /// Offset of the first value of `component`, version `version`,
    /// value type `value_type` in the node's storage.
    pub fn value_index(
        &self,
        component: usize,
        version: u32,
        value_type: NodalValueType,
    ) -> Option<usize> {
        self.value_index_at_time(component, version, value_type, 0)
    }

    /// As [`NodeField::value_index`], for the `time_index`th stored time.
    pub fn value_index_at_time(
        &self,
        component: usize,
        version: u32,
        value_type: NodalValueType,
        time_index: usize,
    ) -> Option<usize> {
        let times = self.number_of_times();
        if time_index >= times {
            return None;
        }
        let mut offset = self.value_offset;
        for (i, c) in self.components.iter().enumerate() {
            if i == component {
                if version >= c.number_of_versions {
                    return None;
                }
                let position = c.value_types.iter().position(|t| *t == value_type)?;
                let value = version as usize * c.value_types.len() + position;
                return Some(offset + value * times + time_index);
            }
            offset += c.number_of_values() * times;
        }
        None
    }

    /// Copy of this storage with its time sequence swapped by `map`.
    pub fn map_time_sequence(
        &self,
        map: impl FnOnce(&Rc<TimeSequence>) -> Rc<TimeSequence>,
    ) -> Self {
        let mut copy = self.clone();
        copy.time_sequence = self.time_sequence.as_ref().map(map);
        copy
    }
}

impl FieldStorage for NodeField {
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
        let per_time: usize = self
            .components
            .iter()
            .map(NodeFieldComponent::number_of_values)
            .sum();
        per_time * self.number_of_times()
    }

    fn same_structure(&self, other: &Self) -> bool {
        self.components == other.components && self.time_sequence == other.time_sequence
    }

    fn with_field(&self, field: Field) -> Self {
        Self {
            field,
            value_offset: self.value_offset,
            components: self.components.clone(),
            time_sequence: self.time_sequence.clone(),
        }
    }
}

/// The field layout shared by nodes.
pub type NodeLayout = FieldLayout<NodeField>;

#[cfg(test)]
mod tests {
    use super::*;
    use femesh_core::{FieldDefinition, NamespaceId, ValueType};

    fn field(ns: NamespaceId, name: &str, components: usize) -> Field {
        Field::new(name, ns, FieldDefinition::new(ValueType::Real, components)).unwrap()
    }

    #[test]
    fn hermite_component_counts_versions_and_derivatives() {
        let derivatives = [NodalValueType::DDs1, NodalValueType::DDs2];
        let c = NodeFieldComponent::with_derivatives(2, &derivatives).unwrap();
        assert_eq!(c.number_of_derivatives(), 2);
        assert_eq!(c.number_of_values(), 6);
        assert!(NodeFieldComponent::with_derivatives(0, &[]).is_err());
    }

    #[test]
    fn component_count_must_match_field() {
        let ns = NamespaceId::next();
        let f = field(ns, "coordinates", 3);
        assert!(NodeField::new(f.clone(), vec![NodeFieldComponent::value_only()]).is_err());
        let nf = NodeField::values_only(f);
        assert_eq!(nf.number_of_values(), 3);
    }

    #[test]
    fn value_index_walks_components() {
        let ns = NamespaceId::next();
        let f = field(ns, "coordinates", 2);
        let c0 = NodeFieldComponent::with_derivatives(1, &[NodalValueType::DDs1]).unwrap();
        let c1 = NodeFieldComponent::value_only();
        let mut layout = NodeLayout::empty();
        layout.push_field(NodeField::values_only(field(ns, "pressure", 1)));
        layout.push_field(NodeField::new(f.clone(), vec![c0, c1]).unwrap());
        let nf = layout.get(&f).unwrap();
        assert_eq!(nf.value_index(0, 0, NodalValueType::Value), Some(1));
        assert_eq!(nf.value_index(0, 0, NodalValueType::DDs1), Some(2));
        assert_eq!(nf.value_index(1, 0, NodalValueType::Value), Some(3));
        assert_eq!(nf.value_index(1, 0, NodalValueType::DDs1), None);
        assert_eq!(nf.value_index(2, 0, NodalValueType::Value), None);
    }

    #[test]
    fn time_varying_values_sit_side_by_side() {
        let ns = NamespaceId::next();
        let f = field(ns, "displacement", 2);
        let times = Rc::new(TimeSequence::new(vec![0.0, 0.5, 1.0]).unwrap());
        let mut layout = NodeLayout::empty();
        layout.push_field(NodeField::values_only(field(ns, "pressure", 1)));
        layout.push_field(NodeField::values_only(f.clone()).with_time_sequence(times));
        assert_eq!(layout.number_of_values(), 7);
        let nf = layout.get(&f).unwrap();
        assert_eq!(nf.number_of_times(), 3);
        assert_eq!(nf.value_index(0, 0, NodalValueType::Value), Some(1));
        assert_eq!(nf.value_index_at_time(0, 0, NodalValueType::Value, 2), Some(3));
        assert_eq!(nf.value_index_at_time(1, 0, NodalValueType::Value, 1), Some(5));
        assert_eq!(nf.value_index_at_time(1, 0, NodalValueType::Value, 3), None);
    }

    #[test]
    fn time_sequence_is_part_of_the_structure() {
        let ns = NamespaceId::next();
        let f = field(ns, "t", 1);
        let a = NodeField::values_only(f.clone())
            .with_time_sequence(Rc::new(TimeSequence::new(vec![0.0, 1.0]).unwrap()));
        let b = NodeField::values_only(f.clone())
            .with_time_sequence(Rc::new(TimeSequence::new(vec![0.0, 1.0]).unwrap()));
        let c = NodeField::values_only(f.clone())
            .with_time_sequence(Rc::new(TimeSequence::new(vec![0.0, 2.0]).unwrap()));
        assert!(a.same_structure(&b));
        assert!(!a.same_structure(&c));
        assert!(!a.same_structure(&NodeField::values_only(f)));
    }

    #[test]
    fn remove_field_closes_gap() {
        let ns = NamespaceId::next();
        let a = field(ns, "a", 2);
        let b = field(ns, "b", 1);
        let c = field(ns, "c", 3);
        let mut layout = NodeLayout::packed(vec![
            NodeField::values_only(a.clone()),
            NodeField::values_only(b.clone()),
            NodeField::values_only(c.clone()),
        ])
        .unwrap();
        assert_eq!(layout.number_of_values(), 6);
        assert_eq!(layout.remove_field(&b), Some(2..3));
        assert_eq!(layout.number_of_values(), 5);
        assert_eq!(layout.get(&c).unwrap().value_offset(), 2);
        assert_eq!(layout.get(&a).unwrap().value_offset(), 0);
        assert_eq!(layout.remove_field(&b), None);
    }

    #[test]
    fn plan_merge_appends_new_fields_and_copies_shared() {
        let ns = NamespaceId::next();
        let temperature = field(ns, "temperature", 1);
        let pressure = field(ns, "pressure", 1);
        let existing = NodeLayout::packed(vec![NodeField::values_only(pressure.clone())]).unwrap();
        let incoming = NodeLayout::packed(vec![
            NodeField::values_only(temperature.clone()),
            NodeField::values_only(pressure.clone()),
        ])
        .unwrap();
        let plan = existing.plan_merge(&incoming).unwrap();
        let merged = plan.layout.unwrap();
        assert_eq!(merged.number_of_values(), 2);
        assert_eq!(merged.get(&temperature).unwrap().value_offset(), 1);
        assert_eq!(plan.copies.len(), 2);
        assert_eq!(plan.copies[0].from, 0..1);
        assert_eq!(plan.copies[0].to, 1);
        assert_eq!(plan.copies[1].from, 1..2);
        assert_eq!(plan.copies[1].to, 0);
    }

    #[test]
    fn plan_merge_of_subset_keeps_layout() {
        let ns = NamespaceId::next();
        let pressure = field(ns, "pressure", 1);
        let layout = NodeLayout::packed(vec![NodeField::values_only(pressure)]).unwrap();
        let plan = layout.plan_merge(&layout).unwrap();
        assert!(plan.layout.is_none());
    }

    #[test]
    fn structure_mismatch_is_incompatible() {
        let ns = NamespaceId::next();
        let f = field(ns, "coordinates", 1);
        let plain = NodeLayout::packed(vec![NodeField::values_only(f.clone())]).unwrap();
        let hermite = NodeLayout::packed(vec![NodeField::new(
            f,
            vec![NodeFieldComponent::with_derivatives(1, &[NodalValueType::DDs1]).unwrap()],
        )
        .unwrap()])
        .unwrap();
        assert!(matches!(
            plain.plan_merge(&hermite),
            Err(MeshError::IncompatibleDefinition { .. })
        ));
        assert!(plain.check_compatible(&hermite).is_err());
    }

    #[test]
    fn explicit_layout_rejects_out_of_range_values() {
        let ns = NamespaceId::next();
        let f = field(ns, "coordinates", 3);
        assert!(NodeLayout::new(vec![NodeField::values_only(f.clone())], 2).is_err());
        assert!(NodeLayout::new(vec![NodeField::values_only(f)], 4).is_ok());
    }
}
