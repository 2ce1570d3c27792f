//! Strongly-typed identifiers for nodes, elements and region namespaces.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Integer identifier of a node, unique within its owning region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Topological kind of an element identifier.
///
/// Top-level elements, faces and lines are numbered independently, so
/// element 3 and face 3 are distinct objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// A top-level element of any dimension.
    Element,
    /// A two-dimensional face of a higher-dimensional element.
    Face,
    /// A one-dimensional line of a higher-dimensional element.
    Line,
}

impl ElementKind {
    /// All kinds, in identifier order.
    pub const ALL: [ElementKind; 3] = [ElementKind::Element, ElementKind::Face, ElementKind::Line];

    /// Kind used for a face of the given dimension.
    ///
    /// Two-dimensional faces are [`ElementKind::Face`]; everything lower
    /// is a [`ElementKind::Line`].
    pub fn for_face_dimension(dimension: usize) -> Self {
        if dimension == 2 {
            ElementKind::Face
        } else {
            ElementKind::Line
        }
    }

    /// Position of this kind in [`ElementKind::ALL`].
    pub fn index(self) -> usize {
        match self {
            ElementKind::Element => 0,
            ElementKind::Face => 1,
            ElementKind::Line => 2,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Element => write!(f, "element"),
            ElementKind::Face => write!(f, "face"),
            ElementKind::Line => write!(f, "line"),
        }
    }
}

/// Identifier of an element: topological kind plus number.
///
/// Ordering is by kind first, then number, which gives the
/// identifier-ordered iteration exporters rely on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    /// Topological kind.
    pub kind: ElementKind,
    /// Number within the kind.
    pub number: u32,
}

impl ElementId {
    /// Construct an identifier.
    pub const fn new(kind: ElementKind, number: u32) -> Self {
        Self { kind, number }
    }

    /// Shorthand for a top-level element identifier.
    pub const fn element(number: u32) -> Self {
        Self::new(ElementKind::Element, number)
    }

    /// Shorthand for a face identifier.
    pub const fn face(number: u32) -> Self {
        Self::new(ElementKind::Face, number)
    }

    /// Shorthand for a line identifier.
    pub const fn line(number: u32) -> Self {
        Self::new(ElementKind::Line, number)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.number)
    }
}

/// Counter for unique [`NamespaceId`] allocation.
static NAMESPACE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of an object namespace (a field table, a node set, or an
/// element set) owned by some region.
///
/// Fields, nodes and elements remember the namespace they were created
/// for. Comparing namespace ids replaces a back-pointer to the owning
/// region: it answers "was this created for that region?" without
/// keeping the region alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(u64);

impl NamespaceId {
    /// Allocate a fresh, process-unique namespace id.
    pub fn next() -> Self {
        Self(NAMESPACE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ns{}", self.0)
    }
}
