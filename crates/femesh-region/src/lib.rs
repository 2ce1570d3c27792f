//! Finite-element regions for femesh.
//!
//! A [`Region`] holds fields, nodes and elements, tracks what changes
//! inside nested change windows, and notifies registered
//! [`ChangeSink`]s once per outermost window. Regions can be views of a
//! master (slaves and point sets), and whole regions or region trees can
//! be merged into one another.
//!
//! All handles are single-threaded (`Rc`-based). Use a [`ChannelSink`]
//! to hand change summaries to another thread.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod element;
mod faces;
pub mod identifier;
pub mod merge;
pub mod node;
pub mod notify;
mod propagate;
pub mod region;
pub mod tree;
pub mod value;

pub use config::{ConfigError, RegionConfig};
pub use element::Element;
pub use identifier::IdentifierCache;
pub use merge::{can_be_merged, check_mergeable, merge};
pub use node::Node;
pub use notify::{CallbackId, ChangeSink, ChangeSummary, ChannelSink, RegionChanges};
pub use region::{Region, RegionRole};
pub use tree::{check_trees_mergeable, merge_trees, RegionTree};
pub use value::{ElementXi, FieldValue};
