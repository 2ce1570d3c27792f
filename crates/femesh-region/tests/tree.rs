//! Integration test: merging region hierarchies.

use femesh_core::{ElementId, NodeId};
use femesh_region::{
    check_trees_mergeable, merge_trees, Region, RegionConfig, RegionRole, RegionTree,
};
use femesh_test_utils::fixtures::{scalar_field, set_scalar, Grid};

fn mesh_tree(name: &str, counts: &[u32]) -> RegionTree {
    let region = Region::new(RegionConfig::default()).unwrap();
    Grid::new(counts).build(&region).unwrap();
    RegionTree::with_region(name, region)
}

#[test]
fn whole_hierarchy_merges_into_empty_tree() {
    let mut source = RegionTree::new("body");
    let mut heart = mesh_tree("heart", &[2, 1]);
    let mesh = heart.region().unwrap().clone();
    let wall = Region::new_slave(&mesh);
    wall.merge_element(&mesh.get_element_from_identifier(ElementId::element(2)).unwrap())
        .unwrap();
    heart.add_child(RegionTree::with_region("wall", wall)).unwrap();
    let markers = Region::new_point_set(&mesh);
    let weight = scalar_field(&markers, "weight").unwrap();
    let marker = markers.merge_node(&markers.create_node(NodeId(1)).unwrap()).unwrap();
    set_scalar(&markers, &marker, &weight, 0.5).unwrap();
    heart.add_child(RegionTree::with_region("markers", markers)).unwrap();
    source.add_child(heart).unwrap();

    let mut target = RegionTree::new("body");
    check_trees_mergeable(&target, &source).unwrap();
    merge_trees(&mut target, &source).unwrap();

    let heart = target.find_path("heart").unwrap().region().unwrap().clone();
    assert_eq!(heart.role(), RegionRole::Root);
    assert_eq!(heart.number_of_elements(), 2);

    let wall = target.find_path("heart/wall").unwrap().region().unwrap();
    assert_eq!(wall.role(), RegionRole::Slave);
    assert!(Region::ptr_eq(wall.master().unwrap(), &heart));
    assert_eq!(wall.number_of_elements(), 1);

    let markers = target.find_path("heart/markers").unwrap().region().unwrap();
    assert_eq!(markers.role(), RegionRole::PointSet);
    assert_eq!(markers.number_of_nodes(), 1);
    assert!(heart.get_field_from_name("weight").is_some());
}

#[test]
fn mismatched_regions_fail_before_anything_changes() {
    let mut target = RegionTree::new("body");
    target.add_child(mesh_tree("heart", &[1, 1])).unwrap();
    target.add_child(mesh_tree("lung", &[1, 1])).unwrap();

    let mut source = RegionTree::new("body");
    source.add_child(mesh_tree("lung", &[1, 1])).unwrap();
    // line element 1 clashes with the target heart's square element 1
    source.add_child(mesh_tree("heart", &[1])).unwrap();

    assert!(check_trees_mergeable(&target, &source).is_err());
    assert!(merge_trees(&mut target, &source).is_err());
    let lung = target.find_path("lung").unwrap().region().unwrap();
    assert_eq!(lung.number_of_nodes(), 4);
}
