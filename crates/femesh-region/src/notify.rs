//! Change notification: the [`ChangeSink`] seam, the per-window
//! [`RegionChanges`] payload, and a channel-backed sink.

use std::fmt;

use crossbeam_channel::Sender;

use femesh_core::{ChangeFlags, ChangeLog, ElementId, Field, NodeId};

use crate::config::RegionConfig;
use crate::element::Element;
use crate::node::Node;
use crate::region::Region;

/// Receives one notification per closed change window.
///
/// Sinks run synchronously on the mutating thread after the region has
/// released every internal borrow, so they may query the region and even
/// start new change windows of their own.
pub trait ChangeSink {
    /// Called with the changes accumulated since the last notification.
    fn region_changed(&self, region: &Region, changes: &RegionChanges);
}

impl<F> ChangeSink for F
where
    F: Fn(&Region, &RegionChanges),
{
    fn region_changed(&self, region: &Region, changes: &RegionChanges) {
        self(region, changes)
    }
}

/// Handle returned by [`Region::add_callback`], used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub(crate) u64);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback {}", self.0)
    }
}

/// The drained change logs of one window.
#[derive(Clone, Debug, Default)]
pub struct RegionChanges {
    pub(crate) fields: ChangeLog<Field>,
    pub(crate) nodes: ChangeLog<Node>,
    pub(crate) elements: ChangeLog<Element>,
}

impl RegionChanges {
    pub(crate) fn new(config: &RegionConfig) -> Self {
        Self {
            fields: ChangeLog::new(config.max_field_changes),
            nodes: ChangeLog::new(config.max_node_changes),
            elements: ChangeLog::new(config.max_element_changes),
        }
    }

    /// Field changes.
    pub fn fields(&self) -> &ChangeLog<Field> {
        &self.fields
    }

    /// Node changes.
    pub fn nodes(&self) -> &ChangeLog<Node> {
        &self.nodes
    }

    /// Element, face and line changes.
    pub fn elements(&self) -> &ChangeLog<Element> {
        &self.elements
    }

    /// True when no log has content.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.nodes.is_empty() && self.elements.is_empty()
    }

    pub(crate) fn drain(&mut self) -> RegionChanges {
        RegionChanges {
            fields: self.fields.drain(),
            nodes: self.nodes.drain(),
            elements: self.elements.drain(),
        }
    }

    /// Owned, handle-free copy of these changes.
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            field_changes: self.fields.summary(),
            node_changes: self.nodes.summary(),
            element_changes: self.elements.summary(),
            fields: self
                .fields
                .iter()
                .map(|(f, c)| (f.name().to_string(), c))
                .collect(),
            nodes: self.nodes.iter().map(|(n, c)| (n.identifier(), c)).collect(),
            elements: self
                .elements
                .iter()
                .map(|(e, c)| (e.identifier(), c))
                .collect(),
            all_nodes_changed: self.nodes.is_all_changed(),
            all_elements_changed: self.elements.is_all_changed(),
        }
    }
}

/// Plain-data description of a change window.
///
/// Unlike [`RegionChanges`] it holds names and identifiers instead of
/// handles, so it can be queued, logged or sent to another thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// OR of all field changes.
    pub field_changes: ChangeFlags,
    /// OR of all node changes.
    pub node_changes: ChangeFlags,
    /// OR of all element changes.
    pub element_changes: ChangeFlags,
    /// Changed fields by name.
    pub fields: Vec<(String, ChangeFlags)>,
    /// Changed nodes by identifier (identifiers as of notification).
    pub nodes: Vec<(NodeId, ChangeFlags)>,
    /// Changed elements by identifier.
    pub elements: Vec<(ElementId, ChangeFlags)>,
    /// The node log stopped enumerating; treat every node as changed.
    pub all_nodes_changed: bool,
    /// The element log stopped enumerating; treat every element as changed.
    pub all_elements_changed: bool,
}

/// Forwards a [`ChangeSummary`] of every notification over a channel.
///
/// Intended for caches of derived values (e.g. evaluated fields) that
/// invalidate lazily on their own schedule.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: Sender<ChangeSummary>,
}

impl ChannelSink {
    /// Sink sending to `sender`.
    pub fn new(sender: Sender<ChangeSummary>) -> Self {
        Self { sender }
    }
}

impl ChangeSink for ChannelSink {
    fn region_changed(&self, _region: &Region, changes: &RegionChanges) {
        if self.sender.send(changes.summary()).is_err() {
            tracing::debug!("change summary receiver disconnected; dropping notification");
        }
    }
}
