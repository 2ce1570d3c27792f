//! Interning table for layouts.
//!
//! The table holds weak references only: a layout lives exactly as long
//! as some node or element (or a caller) holds it, and the table simply
//! forgets dead entries. Lookups compare layouts by deep equality.

use std::ops::Range;
use std::rc::{Rc, Weak};

use femesh_core::{Field, MeshError};

use crate::layout::{FieldLayout, FieldStorage};

/// Number of strong references a layout has when only the caller
/// modifying it holds it. Above this, the layout is shared and must be
/// copied before modification.
pub const MINIMUM_RETAINED_COUNT: usize = 1;

/// Deduplicating store of layouts owned by a root region.
#[derive(Debug)]
pub struct LayoutTable<S: FieldStorage> {
    entries: Vec<Weak<FieldLayout<S>>>,
}

impl<S: FieldStorage> Default for LayoutTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FieldStorage> LayoutTable<S> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of live layouts.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// True when no layout is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget layouts nobody holds any more.
    pub fn prune(&mut self) {
        self.entries.retain(|w| w.strong_count() > 0);
    }

    /// True if some live layout satisfies `pred`.
    pub fn any(&self, mut pred: impl FnMut(&FieldLayout<S>) -> bool) -> bool {
        self.live().any(|layout| pred(&layout))
    }

    /// The shared layout storing no fields.
    pub fn empty_layout(&mut self) -> Rc<FieldLayout<S>> {
        self.intern(FieldLayout::empty())
    }

    /// Find the layout with exactly `fields`, creating it if needed.
    ///
    /// A live layout with the same fields but a different value count is
    /// an error: value storage of existing owners would be misread.
    pub fn get_or_create(
        &mut self,
        fields: Vec<S>,
        number_of_values: usize,
    ) -> Result<Rc<FieldLayout<S>>, MeshError> {
        if let Some(existing) = self.live().find(|layout| layout.same_fields(&fields)) {
            if existing.number_of_values() != number_of_values {
                return Err(MeshError::incompatible(format!(
                    "layout already exists with {} values, {} requested",
                    existing.number_of_values(),
                    number_of_values
                )));
            }
            return Ok(existing);
        }
        let layout = FieldLayout::new(fields, number_of_values)?;
        Ok(self.insert(layout))
    }

    /// Return the live layout equal to `layout`, interning it if new.
    pub fn intern(&mut self, layout: FieldLayout<S>) -> Rc<FieldLayout<S>> {
        if let Some(existing) = self.live().find(|l| **l == layout) {
            return existing;
        }
        self.insert(layout)
    }

    /// Apply `edit` to the caller's layout without disturbing anyone else
    /// holding it.
    ///
    /// When `layout` is held only by the caller it is edited in place;
    /// otherwise the caller's handle is switched to an edited copy. In both
    /// cases the result is re-interned, so the caller may end up sharing a
    /// layout that already existed.
    pub fn modify<R>(
        &mut self,
        layout: &mut Rc<FieldLayout<S>>,
        edit: impl FnOnce(&mut FieldLayout<S>) -> R,
    ) -> R {
        let result = if Rc::strong_count(layout) == MINIMUM_RETAINED_COUNT {
            edit(Rc::make_mut(layout))
        } else {
            let mut copy = FieldLayout::clone(layout);
            let result = edit(&mut copy);
            *layout = Rc::new(copy);
            result
        };
        let edited = Rc::clone(layout);
        *layout = self.reintern(edited);
        result
    }

    /// Add `storage` to the caller's layout.
    ///
    /// Returns the value range the new field occupies.
    pub fn add_field(&mut self, layout: &mut Rc<FieldLayout<S>>, storage: S) -> Range<usize> {
        self.modify(layout, |l| l.push_field(storage))
    }

    /// Remove `field` from the caller's layout.
    ///
    /// Returns the value range the field used to occupy, or `None` if the
    /// layout does not store it (in which case the handle is unchanged).
    pub fn remove_field(
        &mut self,
        layout: &mut Rc<FieldLayout<S>>,
        field: &Field,
    ) -> Option<Range<usize>> {
        if !layout.has_field(field) {
            return None;
        }
        self.modify(layout, |l| l.remove_field(field))
    }

    fn live(&self) -> impl Iterator<Item = Rc<FieldLayout<S>>> + '_ {
        self.entries.iter().filter_map(Weak::upgrade)
    }

    fn insert(&mut self, layout: FieldLayout<S>) -> Rc<FieldLayout<S>> {
        self.prune();
        let layout = Rc::new(layout);
        self.entries.push(Rc::downgrade(&layout));
        layout
    }

    fn reintern(&mut self, layout: Rc<FieldLayout<S>>) -> Rc<FieldLayout<S>> {
        if let Some(existing) = self
            .live()
            .find(|l| !Rc::ptr_eq(l, &layout) && **l == *layout)
        {
            return existing;
        }
        if !self.live().any(|l| Rc::ptr_eq(&l, &layout)) {
            self.prune();
            self.entries.push(Rc::downgrade(&layout));
        }
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeField, NodeLayout};
    use femesh_core::{FieldDefinition, NamespaceId, ValueType};
    use proptest::prelude::*;

    fn fields(n: usize) -> Vec<Field> {
        let ns = NamespaceId::next();
        (0..n)
            .map(|i| {
                Field::new(format!("f{i}"), ns, FieldDefinition::new(ValueType::Real, 1)).unwrap()
            })
            .collect()
    }

    fn single(field: &Field) -> NodeLayout {
        NodeLayout::packed(vec![NodeField::values_only(field.clone())]).unwrap()
    }

    #[test]
    fn equal_layouts_are_shared() {
        let f = fields(1);
        let mut table: LayoutTable<NodeField> = LayoutTable::new();
        let a = table.intern(single(&f[0]));
        let b = table.intern(single(&f[0]));
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn value_count_mismatch_is_an_error() {
        let f = fields(1);
        let mut table: LayoutTable<NodeField> = LayoutTable::new();
        let held = table.get_or_create(vec![NodeField::values_only(f[0].clone())], 1).unwrap();
        let again = table.get_or_create(vec![NodeField::values_only(f[0].clone())], 1).unwrap();
        assert!(Rc::ptr_eq(&held, &again));
        assert!(matches!(
            table.get_or_create(vec![NodeField::values_only(f[0].clone())], 2),
            Err(MeshError::IncompatibleDefinition { .. })
        ));
    }

    #[test]
    fn shared_layout_is_never_mutated() {
        let f = fields(2);
        let mut table: LayoutTable<NodeField> = LayoutTable::new();
        let mut a = table.intern(single(&f[0]));
        let b = Rc::clone(&a);
        table.add_field(&mut a, NodeField::values_only(f[1].clone()));
        assert_eq!(b.len(), 1);
        assert_eq!(a.len(), 2);
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn exclusive_layout_is_edited_and_reinterned() {
        let f = fields(2);
        let mut table: LayoutTable<NodeField> = LayoutTable::new();
        let target = table.intern(
            NodeLayout::packed(vec![
                NodeField::values_only(f[0].clone()),
                NodeField::values_only(f[1].clone()),
            ])
            .unwrap(),
        );
        let mut sole = table.intern(single(&f[0]));
        assert_eq!(Rc::strong_count(&sole), MINIMUM_RETAINED_COUNT);
        table.add_field(&mut sole, NodeField::values_only(f[1].clone()));
        assert!(Rc::ptr_eq(&sole, &target));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn dropped_layouts_leave_the_table() {
        let f = fields(1);
        let mut table: LayoutTable<NodeField> = LayoutTable::new();
        let layout = table.intern(single(&f[0]));
        assert_eq!(table.len(), 1);
        drop(layout);
        assert_eq!(table.len(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn removing_absent_field_keeps_handle() {
        let f = fields(2);
        let mut table: LayoutTable<NodeField> = LayoutTable::new();
        let mut a = table.intern(single(&f[0]));
        let before = Rc::clone(&a);
        assert_eq!(table.remove_field(&mut a, &f[1]), None);
        assert!(Rc::ptr_eq(&a, &before));
    }

    proptest! {
        #[test]
        fn edits_preserve_other_holders(
            ops in prop::collection::vec((0usize..4, any::<bool>(), 0usize..3), 1..40)
        ) {
            let f = fields(4);
            let mut table: LayoutTable<NodeField> = LayoutTable::new();
            let empty = table.empty_layout();
            let mut holders: Vec<Rc<NodeLayout>> = vec![Rc::clone(&empty); 3];
            for (field, add, holder) in ops {
                let snapshot: Vec<NodeLayout> =
                    holders.iter().map(|h| NodeLayout::clone(h)).collect();
                let layout = &mut holders[holder];
                if add {
                    if !layout.has_field(&f[field]) {
                        table.add_field(layout, NodeField::values_only(f[field].clone()));
                    }
                } else {
                    table.remove_field(layout, &f[field]);
                }
                for (i, h) in holders.iter().enumerate() {
                    if i != holder {
                        prop_assert_eq!(&**h, &snapshot[i]);
                    }
                }
                // equal layouts are always the same object
                for a in &holders {
                    for b in &holders {
                        prop_assert_eq!(**a == **b, Rc::ptr_eq(a, b));
                    }
                }
            }
        }
    }
}
