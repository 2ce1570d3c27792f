//! The field table: creation, merge, lookup and removal.

use femesh_core::{ChangeFlags, Field, FieldDefinition, FieldKind, MeshError};

use femesh_layout::FieldStorage;

use super::{Region, RegionRole};

/// Handles to a field held by the table itself.
const TABLE_HANDLES: usize = 1;

impl Region {
    /// Create a field for this region's field namespace. It must be merged
    /// before it can be stored on nodes or elements.
    pub fn create_field(
        &self,
        name: &str,
        definition: FieldDefinition,
    ) -> Result<Field, MeshError> {
        Field::new(name, self.field_namespace(), definition)
    }

    /// Merge `field` into the field owner's table and return the
    /// canonical field.
    ///
    /// Indexer fields are merged first. A field with the same name is
    /// reused if it matches exactly; otherwise its definition is replaced
    /// when nothing but the table uses it, or when only presentation
    /// attributes differ. Anything else is
    /// [`MeshError::IncompatibleDefinition`].
    pub fn merge_field(&self, field: &Field) -> Result<Field, MeshError> {
        if field.namespace() != self.field_namespace() {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' was created for another region",
                field.name()
            )));
        }
        self.bracket(|| self.field_owner().merge_owned_field(field))
    }

    fn merge_owned_field(&self, field: &Field) -> Result<Field, MeshError> {
        let field = match field.indexer() {
            Some(indexer) => {
                let canonical = self.merge_owned_field(&indexer)?;
                if Field::ptr_eq(&canonical, &indexer) {
                    field.clone()
                } else {
                    let mut definition = field.definition().clone();
                    if let FieldKind::Indexed { indexer, .. } = &mut definition.kind {
                        *indexer = canonical;
                    }
                    Field::new(field.name(), field.namespace(), definition)?
                }
            }
            None => field.clone(),
        };
        let existing = self.get_field_from_name(field.name());
        match existing {
            Some(existing) if Field::ptr_eq(&existing, &field) => Ok(existing),
            Some(existing) if existing.matches_exactly(&field) => Ok(existing),
            Some(existing) => {
                let unused = existing.handle_count() == TABLE_HANDLES + 1;
                if !unused && !existing.matches_fundamentals(&field) {
                    return Err(MeshError::incompatible(format!(
                        "field '{}' is in use with a different definition",
                        field.name()
                    )));
                }
                let definition = field.definition().clone();
                existing.replace_definition(definition);
                self.state_mut()
                    .record_field(&existing, ChangeFlags::CONTENTS_CHANGED);
                Ok(existing)
            }
            None => {
                let mut state = self.state_mut();
                state
                    .store_mut()?
                    .fields
                    .insert(field.name().to_string(), field.clone());
                state.record_field(&field, ChangeFlags::ADDED);
                tracing::debug!(region = %self.namespace(), field = field.name(), "field added");
                Ok(field)
            }
        }
    }

    /// Field called `name`.
    pub fn get_field_from_name(&self, name: &str) -> Option<Field> {
        let state = self.field_owner().state();
        state.store().ok()?.fields.get(name).cloned()
    }

    /// The field called `name` if it has exactly `definition`; otherwise
    /// a new field with that definition, merged in.
    ///
    /// A field with that name and a different definition is
    /// [`MeshError::IncompatibleDefinition`].
    pub fn get_field_with_properties(
        &self,
        name: &str,
        definition: FieldDefinition,
    ) -> Result<Field, MeshError> {
        if let Some(existing) = self.get_field_from_name(name) {
            if *existing.definition() == definition {
                return Ok(existing);
            }
            return Err(MeshError::incompatible(format!(
                "field '{name}' exists with different properties"
            )));
        }
        let field = self.create_field(name, definition)?;
        self.merge_field(&field)
    }

    /// Snapshot of the fields in insertion order.
    pub fn fields(&self) -> Vec<Field> {
        let state = self.field_owner().state();
        match state.store() {
            Ok(store) => store.fields.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Call `f` for each field, stopping at the first error.
    pub fn for_each_field<E>(
        &self,
        mut f: impl FnMut(&Field) -> Result<(), E>,
    ) -> Result<(), E> {
        for field in self.fields() {
            f(&field)?;
        }
        Ok(())
    }

    /// Number of fields.
    pub fn number_of_fields(&self) -> usize {
        self.with_store(|store| store.fields.len()).unwrap_or(0)
    }

    /// True if this exact field is in the table.
    pub fn contains_field(&self, field: &Field) -> bool {
        self.get_field_from_name(field.name())
            .is_some_and(|f| Field::ptr_eq(&f, field))
    }

    /// The first coordinate field in table order.
    pub fn default_coordinate_field(&self) -> Option<Field> {
        self.fields().into_iter().find(Field::is_coordinate)
    }

    /// True if `field` indexes another field, or a live layout stores it
    /// while the region holds objects of that kind.
    ///
    /// Layouts are shared by merged and unmerged objects alike, so a
    /// field defined on a node that has not been merged yet counts as in
    /// use as soon as the region holds any node. Removed objects may still
    /// sit in a pending change log; they do not keep a field in use once
    /// the region is empty.
    pub fn is_field_in_use(&self, field: &Field) -> bool {
        if !self.contains_field(field) {
            return false;
        }
        let owner = self.field_owner();
        let indexes_another = owner.fields().iter().any(|other| {
            other
                .indexer()
                .is_some_and(|indexer| Field::ptr_eq(&indexer, field))
        });
        if indexes_another {
            return true;
        }
        let (in_node_layout, in_element_layout) = owner
            .with_store(|store| {
                (
                    store.node_layouts.any(|l| l.has_field(field)),
                    store.element_layouts.any(|l| l.has_field(field)),
                )
            })
            .unwrap_or((false, false));
        let (has_nodes, has_elements) = {
            let state = owner.state();
            (!state.nodes.is_empty(), !state.elements.is_empty())
        };
        (in_node_layout && (has_nodes || owner.point_sets_have_nodes()))
            || (in_element_layout && has_elements)
    }

    fn point_sets_have_nodes(&self) -> bool {
        self.dependents().iter().any(|dependent| {
            (dependent.role() == RegionRole::PointSet && dependent.number_of_nodes() > 0)
                || dependent.point_sets_have_nodes()
        })
    }

    /// Remove `field` from the table.
    ///
    /// Fails with [`MeshError::InUse`] while [`Region::is_field_in_use`]
    /// holds.
    pub fn remove_field(&self, field: &Field) -> Result<(), MeshError> {
        if !self.contains_field(field) {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' is not in this region",
                field.name()
            )));
        }
        if self.is_field_in_use(field) {
            return Err(MeshError::in_use(format!("field '{}'", field.name())));
        }
        self.bracket(|| {
            let owner = self.field_owner();
            let mut state = owner.state_mut();
            state.store_mut()?.fields.shift_remove(field.name());
            state.record_field(field, ChangeFlags::REMOVED);
            Ok(())
        })
    }

    /// Error unless `field` is the canonical field of that name.
    pub(crate) fn check_own_field(&self, field: &Field) -> Result<(), MeshError> {
        if !self.contains_field(field) {
            return Err(MeshError::invalid_argument(format!(
                "field '{}' has not been merged into this region",
                field.name()
            )));
        }
        Ok(())
    }

    /// Error unless every field stored by `storages` is in the table.
    pub(crate) fn check_own_fields<'a, S: FieldStorage + 'a>(
        &self,
        storages: impl IntoIterator<Item = &'a S>,
    ) -> Result<(), MeshError> {
        storages
            .into_iter()
            .try_for_each(|storage| self.check_own_field(storage.field()))
    }
}
