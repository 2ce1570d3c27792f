//! femesh: data management for finite-element regions.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the femesh sub-crates. For most users, adding `femesh` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use femesh::prelude::*;
//!
//! let region = Region::new(RegionConfig::default())?;
//! let temperature = region.create_field("temperature", FieldDefinition::new(ValueType::Real, 1))?;
//! let temperature = region.merge_field(&temperature)?;
//!
//! let node = region.merge_node(&region.create_node(NodeId(1))?)?;
//! region.define_field_at_node(&node, NodeField::values_only(temperature.clone()))?;
//! region.set_node_real_values(&node, &temperature, &[20.5])?;
//!
//! assert_eq!(node.real_values(&temperature), Some(vec![20.5]));
//! assert!(region.is_field_in_use(&temperature));
//! # Ok::<(), MeshError>(())
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `femesh-core` | Identifiers, errors, field definitions, shapes, bases, change logs |
//! | [`layout`] | `femesh-layout` | Interned node and element field layouts |
//! | [`region`] | `femesh-region` | Regions, views, notification, merging and region trees |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core vocabulary (`femesh-core`).
///
/// Node and element identifiers, [`types::MeshError`], field definitions,
/// element shapes, basis types and the generic [`types::ChangeLog`].
pub use femesh_core as types;

/// Field layouts (`femesh-layout`).
///
/// Describes which fields a node or element stores and where their
/// values live. Layouts are interned per region in a
/// [`layout::LayoutTable`].
pub use femesh_layout as layout;

/// Regions (`femesh-region`).
///
/// [`region::Region`] with its slave and point-set views, change
/// notification through [`region::ChangeSink`], region merging and
/// [`region::RegionTree`] hierarchies.
pub use femesh_region as region;

/// Common imports for typical femesh usage.
///
/// ```rust
/// use femesh::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use femesh_core::{
        BasisFunction, BasisType, ChangeFlags, CoordinateSystem, ElementId, ElementKind, Field,
        FieldDefinition, MeshError, NodeId, ShapeKind, TimeSequence, ValueType,
    };

    // Layouts
    pub use femesh_layout::{ElementField, NodalValueType, NodeField, NodeFieldComponent};

    // Regions
    pub use femesh_region::{
        can_be_merged, merge, merge_trees, ChangeSink, ChangeSummary, ChannelSink, Element,
        ElementXi, FieldValue, Node, Region, RegionChanges, RegionConfig, RegionRole, RegionTree,
    };
}
