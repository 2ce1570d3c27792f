//! A named hierarchy of regions, and merging of whole hierarchies.

use indexmap::IndexMap;

use femesh_core::MeshError;

use crate::merge::{check_mergeable, merge};
use crate::region::{Region, RegionRole};

/// A node in a named region hierarchy.
///
/// Each tree node may carry a region. A child's region is often a slave
/// or point set of its parent's region, which is how groups and data
/// point sets are arranged under a mesh.
#[derive(Debug)]
pub struct RegionTree {
    name: String,
    region: Option<Region>,
    children: IndexMap<String, RegionTree>,
}

impl RegionTree {
    /// An empty tree node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: None,
            children: IndexMap::new(),
        }
    }

    /// A tree node carrying `region`.
    pub fn with_region(name: impl Into<String>, region: Region) -> Self {
        Self {
            region: Some(region),
            ..Self::new(name)
        }
    }

    /// Name of this tree node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attached region.
    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    /// Attach `region`. Fails if a region is already attached.
    pub fn attach_region(&mut self, region: Region) -> Result<(), MeshError> {
        if self.region.is_some() {
            return Err(MeshError::collision(format!(
                "region already attached to '{}'",
                self.name
            )));
        }
        self.region = Some(region);
        Ok(())
    }

    /// Detach and return the attached region.
    pub fn detach_region(&mut self) -> Option<Region> {
        self.region.take()
    }

    /// Add `child`. Fails if a child of that name exists.
    pub fn add_child(&mut self, child: RegionTree) -> Result<&mut RegionTree, MeshError> {
        if self.children.contains_key(&child.name) {
            return Err(MeshError::collision(format!(
                "child '{}' of '{}'",
                child.name, self.name
            )));
        }
        let name = child.name.clone();
        Ok(self.children.entry(name).or_insert(child))
    }

    /// Remove and return the child called `name`.
    pub fn remove_child(&mut self, name: &str) -> Option<RegionTree> {
        self.children.shift_remove(name)
    }

    /// Child called `name`.
    pub fn child(&self, name: &str) -> Option<&RegionTree> {
        self.children.get(name)
    }

    /// Child called `name`, mutably.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut RegionTree> {
        self.children.get_mut(name)
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = &RegionTree> {
        self.children.values()
    }

    /// Descendant at a `/`-separated path relative to this node. Empty
    /// segments are ignored, so `""` and `"/"` name this node.
    pub fn find_path(&self, path: &str) -> Option<&RegionTree> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |tree, segment| tree.child(segment))
    }
}

/// Check that [`merge_trees`] of `source` into `target` would succeed.
///
/// Regions at the same path must be mergeable. A source view whose
/// target counterpart does not exist yet can only be recreated when its
/// master is the parent's region and the target parent has a region.
pub fn check_trees_mergeable(target: &RegionTree, source: &RegionTree) -> Result<(), MeshError> {
    check_subtree(Some(target), false, source)
}

fn check_subtree(
    target: Option<&RegionTree>,
    parent_has_region: bool,
    source: &RegionTree,
) -> Result<(), MeshError> {
    let target_region = target.and_then(RegionTree::region);
    match (target_region, source.region()) {
        (Some(t), Some(s)) => check_mergeable(t, s)?,
        (None, Some(s)) if s.role() != RegionRole::Root && !parent_has_region => {
            return Err(MeshError::incompatible(format!(
                "'{}' is a view but the target has no region to attach it to",
                source.name
            )));
        }
        _ => {}
    }
    let has_region = target_region.is_some() || source.region().is_some();
    for child in source.children() {
        if let Some(s) = child.region() {
            let attached_to_parent = match (s.master(), source.region()) {
                (Some(master), Some(parent)) => Region::ptr_eq(master, parent),
                _ => s.role() == RegionRole::Root,
            };
            if !attached_to_parent {
                return Err(MeshError::incompatible(format!(
                    "region '{}' is a view of something other than its parent",
                    child.name
                )));
            }
        }
        let target_child = target.and_then(|t| t.child(&child.name));
        check_subtree(target_child, has_region, child)?;
    }
    Ok(())
}

/// Merge the `source` hierarchy into `target`.
///
/// Regions at the same path are merged; missing tree nodes are created.
/// A missing region is created as the same kind of view of the target
/// parent's region as the source region is of its parent, or as a new
/// root otherwise.
pub fn merge_trees(target: &mut RegionTree, source: &RegionTree) -> Result<(), MeshError> {
    check_trees_mergeable(target, source)?;
    merge_subtree(target, None, source)
}

fn merge_subtree(
    target: &mut RegionTree,
    target_parent_region: Option<&Region>,
    source: &RegionTree,
) -> Result<(), MeshError> {
    if let Some(s) = source.region() {
        if target.region.is_none() {
            let created = match (s.role(), target_parent_region) {
                (RegionRole::Slave, Some(parent)) => Region::new_slave(parent),
                (RegionRole::PointSet, Some(parent)) => Region::new_point_set(parent),
                _ => Region::new(s.config().clone())?,
            };
            target.region = Some(created);
        }
        if let Some(t) = target.region() {
            merge(t, s)?;
        }
    }
    let parent_region = target.region.clone();
    for child in source.children() {
        if !target.children.contains_key(&child.name) {
            target
                .children
                .insert(child.name.clone(), RegionTree::new(child.name.clone()));
        }
        let target_child = target
            .children
            .get_mut(&child.name)
            .ok_or_else(|| MeshError::structural("tree child vanished during merge"))?;
        merge_subtree(target_child, parent_region.as_ref(), child)?;
    }
    Ok(())
}
