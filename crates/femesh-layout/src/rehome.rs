//! Memoized rebuilding of layouts against another region's field table.

use std::rc::Rc;

use femesh_core::{Field, MeshError};

use crate::layout::{FieldLayout, FieldStorage};
use crate::table::LayoutTable;

/// Pairs of (source layout, equivalent target layout) built during one
/// merge.
///
/// Source regions share layouts heavily, so each distinct source layout
/// is rebuilt and interned once. The cache holds strong references to
/// both sides; drop it when the merge completes.
#[derive(Debug)]
pub struct RehomeCache<S: FieldStorage> {
    pairs: Vec<(Rc<FieldLayout<S>>, Rc<FieldLayout<S>>)>,
}

impl<S: FieldStorage> Default for RehomeCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FieldStorage> RehomeCache<S> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// The target-table equivalent of `source`.
    ///
    /// `lookup` maps a source field to the target field of the same
    /// name.
    pub fn get_or_rehome(
        &mut self,
        source: &Rc<FieldLayout<S>>,
        table: &mut LayoutTable<S>,
        lookup: impl FnMut(&Field) -> Option<Field>,
    ) -> Result<Rc<FieldLayout<S>>, MeshError> {
        self.get_or_rebuild(source, table, |layout| layout.rehome(lookup))
    }

    /// As [`RehomeCache::get_or_rehome`], with the target layout built by
    /// `rebuild` when `source` is first seen.
    pub fn get_or_rebuild(
        &mut self,
        source: &Rc<FieldLayout<S>>,
        table: &mut LayoutTable<S>,
        rebuild: impl FnOnce(&FieldLayout<S>) -> Result<FieldLayout<S>, MeshError>,
    ) -> Result<Rc<FieldLayout<S>>, MeshError> {
        if let Some((_, target)) = self.pairs.iter().find(|(s, _)| Rc::ptr_eq(s, source)) {
            return Ok(Rc::clone(target));
        }
        let rebuilt = rebuild(source)?;
        let target = table.intern(rebuilt);
        self.pairs.push((Rc::clone(source), Rc::clone(&target)));
        Ok(target)
    }

    /// Number of distinct source layouts seen.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when nothing has been rehomed yet.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
