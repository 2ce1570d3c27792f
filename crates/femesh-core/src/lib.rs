//! Core types for the femesh finite-element region engine.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! vocabulary shared by the rest of the workspace: node and element
//! identifiers, the [`MeshError`] taxonomy, field definitions, element
//! shapes, basis types, time sequences, and the generic [`ChangeLog`]
//! that records what happened to fields, nodes and elements inside a
//! change window.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod basis;
pub mod change;
pub mod error;
pub mod field;
pub mod id;
pub mod shape;
pub mod time;

pub use basis::{BasisFunction, BasisRegistry, BasisType};
pub use change::{ChangeFlags, ChangeLog, Tracked};
pub use error::MeshError;
pub use field::{
    CmFieldType, CoordinateSystem, Field, FieldDefinition, FieldKind, ValueType,
};
pub use id::{ElementId, ElementKind, NamespaceId, NodeId};
pub use shape::{ElementShape, ShapeKind, ShapeRegistry};
pub use time::{TimeLocation, TimeSequence, TimeSequenceRegistry};
