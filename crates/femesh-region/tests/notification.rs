//! Integration test: change windows and notification delivery.
//!
//! Every mutation is bracketed; nested windows deliver one summary when
//! the outermost closes, empty windows deliver nothing, and logs past
//! their limit collapse to "everything changed".

use std::rc::Rc;

use femesh_core::{ChangeFlags, FieldDefinition, NodeId, ValueType};
use femesh_layout::NodeField;
use femesh_region::{ChannelSink, Region, RegionConfig};
use femesh_test_utils::fixtures::{scalar_field, set_scalar};
use femesh_test_utils::RecordingSink;

fn root() -> Region {
    Region::new(RegionConfig::default()).unwrap()
}

#[test]
fn empty_window_delivers_nothing() {
    let region = root();
    let sink = RecordingSink::new();
    sink.attach(&region);

    region.begin_change();
    region.begin_change();
    region.end_change().unwrap();
    region.end_change().unwrap();
    assert_eq!(sink.count(), 0);
}

#[test]
fn batched_window_reports_every_change_once() {
    let region = root();
    let temperature = scalar_field(&region, "temperature").unwrap();
    let sink = RecordingSink::new();
    sink.attach(&region);

    region.begin_change();
    for id in 1..=3 {
        let node = region.merge_node(&region.create_node(NodeId(id)).unwrap()).unwrap();
        set_scalar(&region, &node, &temperature, f64::from(id)).unwrap();
    }
    assert_eq!(sink.count(), 0);
    region.end_change().unwrap();

    assert_eq!(sink.count(), 1);
    let summary = sink.last().unwrap();
    // added then edited in the same window is reported as added
    assert_eq!(summary.node_changes, ChangeFlags::ADDED);
    assert_eq!(
        summary.nodes,
        vec![
            (NodeId(1), ChangeFlags::ADDED),
            (NodeId(2), ChangeFlags::ADDED),
            (NodeId(3), ChangeFlags::ADDED),
        ]
    );
    assert_eq!(
        summary.fields,
        vec![("temperature".to_string(), ChangeFlags::RELATED_OBJECT_CHANGED)]
    );
}

#[test]
fn added_then_removed_is_reported_removed() {
    let region = root();
    let sink = RecordingSink::new();
    sink.attach(&region);

    region.begin_change();
    let node = region.merge_node(&region.create_node(NodeId(7)).unwrap()).unwrap();
    region.remove_node(&node).unwrap();
    region.end_change().unwrap();

    let summary = sink.last().unwrap();
    assert_eq!(summary.nodes, vec![(NodeId(7), ChangeFlags::REMOVED)]);
}

#[test]
fn change_limit_collapses_node_log() {
    let config = RegionConfig {
        max_node_changes: Some(2),
        ..RegionConfig::default()
    };
    let region = Region::new(config).unwrap();
    let sink = RecordingSink::new();
    sink.attach(&region);

    region.begin_change();
    for id in 1..=3 {
        region.merge_node(&region.create_node(NodeId(id)).unwrap()).unwrap();
    }
    region.end_change().unwrap();

    let summary = sink.last().unwrap();
    assert!(summary.all_nodes_changed);
    assert!(summary.nodes.is_empty());
    assert_eq!(summary.node_changes, ChangeFlags::ADDED);

    // the next window enumerates again
    region.merge_node(&region.create_node(NodeId(4)).unwrap()).unwrap();
    let summary = sink.last().unwrap();
    assert!(!summary.all_nodes_changed);
    assert_eq!(summary.nodes, vec![(NodeId(4), ChangeFlags::ADDED)]);
}

#[test]
fn removed_callback_hears_nothing() {
    let region = root();
    let sink = RecordingSink::new();
    let id = sink.attach(&region);
    region.merge_node(&region.create_node(NodeId(1)).unwrap()).unwrap();
    region.remove_callback(id).unwrap();
    region.merge_node(&region.create_node(NodeId(2)).unwrap()).unwrap();
    assert_eq!(sink.count(), 1);
    assert_eq!(region.number_of_callbacks(), 0);
}

#[test]
fn sink_may_modify_the_region() {
    let region = root();
    region.add_callback_fn(|region, _| {
        if region.get_node_from_identifier(NodeId(99)).is_none() {
            let node = region.create_node(NodeId(99)).unwrap();
            region.merge_node(&node).unwrap();
        }
    });
    let sink = RecordingSink::new();
    sink.attach(&region);

    region.merge_node(&region.create_node(NodeId(1)).unwrap()).unwrap();

    assert_eq!(region.number_of_nodes(), 2);
    let received: Vec<_> = sink.summaries().into_iter().map(|s| s.nodes).collect();
    assert!(received.contains(&vec![(NodeId(1), ChangeFlags::ADDED)]));
    assert!(received.contains(&vec![(NodeId(99), ChangeFlags::ADDED)]));
}

#[test]
fn channel_sink_crosses_threads() {
    let region = root();
    let (tx, rx) = crossbeam_channel::unbounded();
    region.add_callback(Rc::new(ChannelSink::new(tx)));

    let pressure = region
        .merge_field(
            &region
                .create_field("pressure", FieldDefinition::new(ValueType::Real, 1))
                .unwrap(),
        )
        .unwrap();
    let node = region.merge_node(&region.create_node(NodeId(3)).unwrap()).unwrap();
    region
        .define_field_at_node(&node, NodeField::values_only(pressure))
        .unwrap();

    let received = std::thread::spawn(move || rx.try_iter().collect::<Vec<_>>())
        .join()
        .unwrap();
    assert_eq!(received.len(), 3);
    assert_eq!(received[0].fields, vec![("pressure".to_string(), ChangeFlags::ADDED)]);
    assert_eq!(received[1].nodes, vec![(NodeId(3), ChangeFlags::ADDED)]);
    assert_eq!(received[2].nodes, vec![(NodeId(3), ChangeFlags::CONTENTS_CHANGED)]);
}

#[test]
fn untracked_region_still_gives_fresh_identifiers() {
    let region = root();
    let first = region.next_free_node_identifier(1).unwrap();
    region.merge_node(&region.create_node(NodeId(first)).unwrap()).unwrap();
    let second = region.next_free_node_identifier(1).unwrap();
    region.merge_node(&region.create_node(NodeId(second)).unwrap()).unwrap();
    let node = region.get_node_from_identifier(NodeId(first)).unwrap();
    region.remove_node(&node).unwrap();
    assert!(second > first);
    assert_eq!(region.next_free_node_identifier(1), Ok(first));
}
