//! The generic [`FieldLayout`] shared by node and element layouts.

use std::fmt;
use std::ops::Range;

use femesh_core::{Field, MeshError};

/// How one field is stored on a node or element.
///
/// Implementors describe the per-component structure; the layout owns
/// the placement (`value_offset`) of each field inside the owner's value
/// storage.
pub trait FieldStorage: Clone + PartialEq + fmt::Debug {
    /// The field being stored.
    fn field(&self) -> &Field;

    /// Index of the first value of this field in the owner's storage.
    fn value_offset(&self) -> usize;

    /// Move this field's values to start at `offset`.
    fn set_value_offset(&mut self, offset: usize);

    /// Number of value slots this field occupies.
    fn number_of_values(&self) -> usize;

    /// Same component structure, ignoring field identity and offset.
    fn same_structure(&self, other: &Self) -> bool;

    /// Copy of this storage description for a different field handle.
    fn with_field(&self, field: Field) -> Self;

    /// Range of this field's values in the owner's storage.
    fn value_range(&self) -> Range<usize> {
        self.value_offset()..self.value_offset() + self.number_of_values()
    }
}

/// Ordered list of stored fields plus the total number of value slots.
///
/// Two layouts are equal when they store the same field objects with
/// the same structure at the same offsets, and have the same value
/// count.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldLayout<S: FieldStorage> {
    fields: Vec<S>,
    number_of_values: usize,
}

/// One block copy of values between two storages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueCopy {
    /// Source slots.
    pub from: Range<usize>,
    /// First destination slot.
    pub to: usize,
}

/// Result of planning a merge of one layout into another.
#[derive(Clone, Debug)]
pub struct MergePlan<S: FieldStorage> {
    /// The layout the destination must switch to, or `None` when the
    /// destination already stores every incoming field.
    pub layout: Option<FieldLayout<S>>,
    /// Value copies from the incoming storage into the destination.
    pub copies: Vec<ValueCopy>,
}

impl<S: FieldStorage> Default for FieldLayout<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: FieldStorage> FieldLayout<S> {
    /// A layout storing no fields.
    pub fn empty() -> Self {
        Self {
            fields: Vec::new(),
            number_of_values: 0,
        }
    }

    /// Build a layout from explicitly placed fields.
    ///
    /// Every field's values must lie within `number_of_values` and each
    /// field may appear once.
    pub fn new(fields: Vec<S>, number_of_values: usize) -> Result<Self, MeshError> {
        for (i, storage) in fields.iter().enumerate() {
            if storage.value_range().end > number_of_values {
                return Err(MeshError::invalid_argument(format!(
                    "values of field '{}' end at {} beyond value count {}",
                    storage.field().name(),
                    storage.value_range().end,
                    number_of_values
                )));
            }
            if fields[..i].iter().any(|s| s.field() == storage.field()) {
                return Err(MeshError::invalid_argument(format!(
                    "field '{}' listed twice in layout",
                    storage.field().name()
                )));
            }
        }
        Ok(Self {
            fields,
            number_of_values,
        })
    }

    /// Build a layout placing `fields` one after another.
    pub fn packed(fields: Vec<S>) -> Result<Self, MeshError> {
        let mut layout = Self::empty();
        for storage in fields {
            if layout.has_field(storage.field()) {
                return Err(MeshError::invalid_argument(format!(
                    "field '{}' listed twice in layout",
                    storage.field().name()
                )));
            }
            layout.push_field(storage);
        }
        Ok(layout)
    }

    /// Stored fields in definition order.
    pub fn fields(&self) -> &[S] {
        &self.fields
    }

    /// Copy of this layout with every storage replaced by `map`.
    ///
    /// `map` must keep each storage's offset and value count.
    pub fn map_storage(&self, map: impl FnMut(&S) -> S) -> Self {
        Self {
            fields: self.fields.iter().map(map).collect(),
            number_of_values: self.number_of_values,
        }
    }

    /// Total number of value slots.
    pub fn number_of_values(&self) -> usize {
        self.number_of_values
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field is stored.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Storage of `field`, matched by identity.
    pub fn get(&self, field: &Field) -> Option<&S> {
        self.fields.iter().find(|s| s.field() == field)
    }

    /// Storage of the field called `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&S> {
        self.fields.iter().find(|s| s.field().name() == name)
    }

    /// True when `field` is stored.
    pub fn has_field(&self, field: &Field) -> bool {
        self.get(field).is_some()
    }

    /// True when the field lists are identical, ignoring the value count.
    pub fn same_fields(&self, fields: &[S]) -> bool {
        self.fields.as_slice() == fields
    }

    /// Append `storage` after the existing values.
    ///
    /// Returns the range its values occupy.
    pub fn push_field(&mut self, mut storage: S) -> Range<usize> {
        storage.set_value_offset(self.number_of_values);
        self.number_of_values += storage.number_of_values();
        let range = storage.value_range();
        self.fields.push(storage);
        range
    }

    /// Remove `field`, closing the gap in the value storage.
    ///
    /// Returns the range its values used to occupy, or `None` if the
    /// field was not stored.
    pub fn remove_field(&mut self, field: &Field) -> Option<Range<usize>> {
        let index = self.fields.iter().position(|s| s.field() == field)?;
        let removed = self.fields.remove(index);
        let range = removed.value_range();
        let width = range.len();
        for storage in &mut self.fields {
            if storage.value_offset() >= range.end {
                let offset = storage.value_offset() - width;
                storage.set_value_offset(offset);
            }
        }
        self.number_of_values -= width;
        Some(range)
    }

    /// Rebuild this layout against another field table.
    ///
    /// `lookup` maps each stored field to its equivalent in the target
    /// table; a field with no equivalent is an error.
    pub fn rehome(
        &self,
        mut lookup: impl FnMut(&Field) -> Option<Field>,
    ) -> Result<Self, MeshError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for storage in &self.fields {
            let field = lookup(storage.field()).ok_or_else(|| {
                MeshError::invalid_argument(format!(
                    "no field '{}' in target region",
                    storage.field().name()
                ))
            })?;
            fields.push(storage.with_field(field));
        }
        Ok(Self {
            fields,
            number_of_values: self.number_of_values,
        })
    }

    /// Check that every field stored by both layouts, matched by name,
    /// has the same structure.
    pub fn check_compatible(&self, other: &Self) -> Result<(), MeshError> {
        for storage in &self.fields {
            if let Some(theirs) = other.get_by_name(storage.field().name()) {
                if !storage.same_structure(theirs) {
                    return Err(MeshError::incompatible(format!(
                        "field '{}' is stored differently",
                        storage.field().name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Plan merging the values of a storage laid out by `incoming` into a
    /// storage laid out by `self`.
    ///
    /// Fields are matched by identity, so `incoming` must already use the
    /// destination's field handles. Fields missing from `self` are
    /// appended; shared fields must have the same structure.
    pub fn plan_merge(&self, incoming: &Self) -> Result<MergePlan<S>, MeshError> {
        let mut extended: Option<Self> = None;
        let mut copies = Vec::with_capacity(incoming.fields.len());
        for theirs in &incoming.fields {
            match self.get(theirs.field()) {
                Some(ours) => {
                    if !ours.same_structure(theirs) {
                        return Err(MeshError::incompatible(format!(
                            "field '{}' is stored differently",
                            theirs.field().name()
                        )));
                    }
                    copies.push(ValueCopy {
                        from: theirs.value_range(),
                        to: ours.value_offset(),
                    });
                }
                None => {
                    let layout = extended.get_or_insert_with(|| self.clone());
                    let range = layout.push_field(theirs.clone());
                    copies.push(ValueCopy {
                        from: theirs.value_range(),
                        to: range.start,
                    });
                }
            }
        }
        Ok(MergePlan {
            layout: extended,
            copies,
        })
    }
}
