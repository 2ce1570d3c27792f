//! Interned field layouts for femesh nodes and elements.
//!
//! A layout is the list of fields a node or element stores together with
//! the position of each field's values in the owner's value storage.
//! Thousands of nodes typically share a handful of layouts, so layouts
//! are interned in a [`LayoutTable`] and handed out as `Rc`s.
//!
//! Layouts are copy-on-write. [`LayoutTable::modify`] mutates a layout in
//! place only when the caller holds the sole reference; otherwise it
//! clones, mutates and re-interns, leaving every other user untouched.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod element;
pub mod layout;
pub mod node;
pub mod rehome;
pub mod table;

pub use element::{ElementField, ElementFieldComponent, ElementLayout};
pub use layout::{FieldLayout, FieldStorage, MergePlan, ValueCopy};
pub use node::{NodalValueType, NodeField, NodeFieldComponent, NodeLayout};
pub use rehome::RehomeCache;
pub use table::{LayoutTable, MINIMUM_RETAINED_COUNT};
