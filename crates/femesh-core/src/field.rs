//! Field definitions and the reference-counted [`Field`] handle.
//!
//! A field is a named, typed, multi-component quantity defined over some
//! subset of a region's nodes and elements. The definition is a plain
//! value ([`FieldDefinition`]); the handle is shared by every layout that
//! stores the field and by the owning region's field table.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::change::Tracked;
use crate::error::MeshError;
use crate::id::NamespaceId;

/// Scalar type of every component of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Double-precision real.
    Real,
    /// Signed integer.
    Integer,
    /// Text.
    String,
    /// A location in a mesh: host element plus local xi coordinates.
    ElementXi,
}

/// Role of a field in the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CmFieldType {
    /// Material or anatomical parameter, e.g. fibre angles.
    Anatomical,
    /// Geometric coordinates.
    Coordinate,
    /// Anything else.
    #[default]
    General,
}

/// Coordinate system a field's components are expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum CoordinateSystem {
    /// x, y, z.
    #[default]
    RectangularCartesian,
    /// r, theta, z.
    CylindricalPolar,
    /// r, theta, phi.
    SphericalPolar,
    /// lambda, mu, theta with focal length.
    ProlateSpheroidal {
        /// Focal length.
        focus: f64,
    },
    /// lambda, mu, theta with focal length.
    OblateSpheroidal {
        /// Focal length.
        focus: f64,
    },
    /// Fibre, imbrication and sheet angles.
    Fibre,
    /// Components are not spatial.
    NotApplicable,
}

/// How a field's values are stored.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// Values stored per node or per element according to the layout.
    General,
    /// One set of values for the whole field, independent of location.
    Constant,
    /// One set of values per value of an integer indexer field.
    Indexed {
        /// Integer field selecting which value set applies.
        indexer: Field,
        /// Number of value sets.
        number_of_indexed_values: u32,
    },
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::General => "general",
            FieldKind::Constant => "constant",
            FieldKind::Indexed { .. } => "indexed",
        }
    }
}

/// Value-level description of a field, independent of its name.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDefinition {
    /// Storage kind.
    pub kind: FieldKind,
    /// Role in the model.
    pub cm_type: CmFieldType,
    /// Scalar type of every component.
    pub value_type: ValueType,
    /// Number of components, at least 1.
    pub number_of_components: usize,
    /// Component names; empty means the defaults `"1"`, `"2"`, ...
    pub component_names: Vec<String>,
    /// Coordinate system of the components.
    pub coordinate_system: CoordinateSystem,
}

impl FieldDefinition {
    /// A general field with default names and rectangular cartesian
    /// coordinates.
    pub fn new(value_type: ValueType, number_of_components: usize) -> Self {
        Self {
            kind: FieldKind::General,
            cm_type: CmFieldType::General,
            value_type,
            number_of_components,
            component_names: Vec::new(),
            coordinate_system: CoordinateSystem::RectangularCartesian,
        }
    }

    /// A real coordinate field with components named `x`, `y`, `z`.
    pub fn coordinates(number_of_components: usize) -> Self {
        let names = ["x", "y", "z"];
        Self {
            cm_type: CmFieldType::Coordinate,
            component_names: names
                .iter()
                .take(number_of_components)
                .map(|s| s.to_string())
                .collect(),
            ..Self::new(ValueType::Real, number_of_components)
        }
    }

    /// Replace the storage kind.
    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Replace the model role.
    pub fn with_cm_type(mut self, cm_type: CmFieldType) -> Self {
        self.cm_type = cm_type;
        self
    }

    /// Replace the coordinate system.
    pub fn with_coordinate_system(mut self, coordinate_system: CoordinateSystem) -> Self {
        self.coordinate_system = coordinate_system;
        self
    }

    /// Replace the component names.
    pub fn with_component_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.component_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Name of component `index`, falling back to its 1-based number.
    pub fn component_name(&self, index: usize) -> String {
        self.component_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| (index + 1).to_string())
    }

    fn validate(&self, namespace: NamespaceId) -> Result<(), MeshError> {
        if self.number_of_components == 0 {
            return Err(MeshError::invalid_argument(
                "field must have at least one component",
            ));
        }
        if !self.component_names.is_empty()
            && self.component_names.len() != self.number_of_components
        {
            return Err(MeshError::invalid_argument(format!(
                "{} component names given for {} components",
                self.component_names.len(),
                self.number_of_components
            )));
        }
        if let FieldKind::Indexed {
            indexer,
            number_of_indexed_values,
        } = &self.kind
        {
            if indexer.namespace() != namespace {
                return Err(MeshError::invalid_argument(format!(
                    "indexer field '{}' belongs to another region",
                    indexer.name()
                )));
            }
            if indexer.value_type() != ValueType::Integer || indexer.number_of_components() != 1 {
                return Err(MeshError::invalid_argument(format!(
                    "indexer field '{}' must be a single integer component",
                    indexer.name()
                )));
            }
            if *number_of_indexed_values == 0 {
                return Err(MeshError::invalid_argument(
                    "indexed field needs at least one indexed value",
                ));
            }
        }
        Ok(())
    }
}

struct FieldInner {
    name: String,
    namespace: NamespaceId,
    definition: RefCell<FieldDefinition>,
}

/// Shared handle to a field.
///
/// Equality is identity: two handles are equal when they refer to the
/// same field object. Use [`Field::matches_exactly`] and friends to
/// compare definitions.
#[derive(Clone)]
pub struct Field(Rc<FieldInner>);

impl Field {
    /// Create a field for the field table identified by `namespace`.
    ///
    /// The field is not part of any region until merged into one.
    pub fn new(
        name: impl Into<String>,
        namespace: NamespaceId,
        definition: FieldDefinition,
    ) -> Result<Self, MeshError> {
        let name = name.into();
        if name.is_empty() {
            return Err(MeshError::invalid_argument("field name is empty"));
        }
        definition.validate(namespace)?;
        Ok(Self(Rc::new(FieldInner {
            name,
            namespace,
            definition: RefCell::new(definition),
        })))
    }

    /// Field name, unique within its region.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Namespace of the field table this field was created for.
    pub fn namespace(&self) -> NamespaceId {
        self.0.namespace
    }

    /// Borrow the current definition.
    pub fn definition(&self) -> Ref<'_, FieldDefinition> {
        self.0.definition.borrow()
    }

    /// Scalar value type.
    pub fn value_type(&self) -> ValueType {
        self.0.definition.borrow().value_type
    }

    /// Number of components.
    pub fn number_of_components(&self) -> usize {
        self.0.definition.borrow().number_of_components
    }

    /// Model role.
    pub fn cm_type(&self) -> CmFieldType {
        self.0.definition.borrow().cm_type
    }

    /// Coordinate system.
    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.0.definition.borrow().coordinate_system
    }

    /// Indexer field, if this field is indexed.
    pub fn indexer(&self) -> Option<Field> {
        match &self.0.definition.borrow().kind {
            FieldKind::Indexed { indexer, .. } => Some(indexer.clone()),
            _ => None,
        }
    }

    /// True for a real-valued coordinate field.
    pub fn is_coordinate(&self) -> bool {
        let def = self.0.definition.borrow();
        def.cm_type == CmFieldType::Coordinate && def.value_type == ValueType::Real
    }

    /// Number of live handles to this field, including the one owned by
    /// a region's field table.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Identity comparison.
    pub fn ptr_eq(a: &Field, b: &Field) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Same name and identical definition, indexers compared by identity.
    pub fn matches_exactly(&self, other: &Field) -> bool {
        self.name() == other.name() && *self.definition() == *other.definition()
    }

    /// Same kind, value type, component count and coordinate system.
    ///
    /// Indexers are compared by name and index count, so fields from two
    /// different regions can be compared before either is merged. This is
    /// the test same-named fields must pass for two regions to merge.
    pub fn matches_basic_definition(&self, other: &Field) -> Result<(), MeshError> {
        let a = self.definition();
        let b = other.definition();
        let kinds_match = match (&a.kind, &b.kind) {
            (FieldKind::General, FieldKind::General) => true,
            (FieldKind::Constant, FieldKind::Constant) => true,
            (
                FieldKind::Indexed {
                    indexer: ia,
                    number_of_indexed_values: na,
                },
                FieldKind::Indexed {
                    indexer: ib,
                    number_of_indexed_values: nb,
                },
            ) => ia.name() == ib.name() && na == nb,
            _ => false,
        };
        if !kinds_match {
            return Err(MeshError::incompatible(format!(
                "field '{}' is {} in one region and {} in the other",
                self.name(),
                a.kind.describe(),
                b.kind.describe()
            )));
        }
        if a.value_type != b.value_type || a.number_of_components != b.number_of_components {
            return Err(MeshError::incompatible(format!(
                "field '{}' has different value type or number of components",
                self.name()
            )));
        }
        if a.coordinate_system != b.coordinate_system {
            return Err(MeshError::incompatible(format!(
                "field '{}' has a different coordinate system",
                self.name()
            )));
        }
        Ok(())
    }

    /// Same kind discriminant, value type and component count.
    ///
    /// A field that matches fundamentally can have its remaining
    /// attributes (names, CM type, coordinate system) replaced in place
    /// without invalidating any stored values.
    pub fn matches_fundamentals(&self, other: &Field) -> bool {
        let a = self.definition();
        let b = other.definition();
        std::mem::discriminant(&a.kind) == std::mem::discriminant(&b.kind)
            && a.value_type == b.value_type
            && a.number_of_components == b.number_of_components
    }

    /// Overwrite this field's definition.
    ///
    /// Only the owning region calls this, while merging a same-named
    /// field whose change it has already validated and recorded.
    pub fn replace_definition(&self, definition: FieldDefinition) {
        *self.0.definition.borrow_mut() = definition;
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        Field::ptr_eq(self, other)
    }
}

impl Eq for Field {}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.0.name)
            .field("namespace", &self.0.namespace)
            .finish()
    }
}

impl Tracked for Field {
    fn tracking_key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}
