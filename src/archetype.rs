// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Archetype storage with row allocation and removal

use std::any::Any;

use rustc_hash::FxHashMap;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::component::{AsEntity, ComponentColumn, ComponentData, TypedColumn};
use crate::entity::Entity;

new_key_type! {
    /// Archetype handle. Generational, so a handle to a removed archetype
    /// never resolves to one created later.
    pub struct ArchetypeId;
}

/// Canonical (sorted, deduplicated) key set of an archetype
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature(SmallVec<[Entity; 8]>);

impl Signature {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    pub fn from_keys(keys: impl IntoIterator<Item = Entity>) -> Self {
        let mut keys: SmallVec<[Entity; 8]> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();
        Self(keys)
    }

    pub fn contains(&self, key: impl AsEntity) -> bool {
        self.0.binary_search(&key.entity()).is_ok()
    }

    /// Copy of this set plus `key`
    pub fn with(&self, key: Entity) -> Self {
        let mut keys = self.0.clone();
        if let Err(pos) = keys.binary_search(&key) {
            keys.insert(pos, key);
        }
        Self(keys)
    }

    /// Copy of this set minus `key`
    pub fn without(&self, key: Entity) -> Self {
        let mut keys = self.0.clone();
        if let Ok(pos) = keys.binary_search(&key) {
            keys.remove(pos);
        }
        Self(keys)
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cached single-key transitions to neighbouring archetypes.
///
/// Edges are kept symmetric: `X.add[k] == Y` exactly when `Y.remove[k] == X`,
/// which lets an archetype unlink itself from both directions on removal.
#[derive(Debug, Default)]
pub struct ArchetypeEdges {
    pub(crate) add: FxHashMap<Entity, ArchetypeId>,
    pub(crate) remove: FxHashMap<Entity, ArchetypeId>,
}

impl ArchetypeEdges {
    pub fn get_add(&self, key: Entity) -> Option<ArchetypeId> {
        self.add.get(&key).copied()
    }

    pub fn get_remove(&self, key: Entity) -> Option<ArchetypeId> {
        self.remove.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.add.len() + self.remove.len()
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Archetype: Structure of Arrays storage
pub struct Archetype {
    signature: Signature,
    entities: Vec<Entity>,
    columns: Vec<Box<dyn ComponentColumn>>,
    column_indices: FxHashMap<Entity, usize>,
    edges: ArchetypeEdges,
}

impl Archetype {
    /// Create new archetype with one column per data-bearing key
    pub fn new(
        signature: Signature,
        columns: impl IntoIterator<Item = (Entity, Box<dyn ComponentColumn>)>,
    ) -> Self {
        let mut archetype = Self {
            signature,
            entities: Vec::new(),
            columns: Vec::new(),
            column_indices: FxHashMap::default(),
            edges: ArchetypeEdges::default(),
        };
        for (key, column) in columns {
            debug_assert!(archetype.signature.contains(key));
            archetype.column_indices.insert(key, archetype.columns.len());
            archetype.columns.push(column);
        }
        archetype
    }

    /// Get signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Get all entities
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if archetype is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn edges(&self) -> &ArchetypeEdges {
        &self.edges
    }

    pub(crate) fn edges_mut(&mut self) -> &mut ArchetypeEdges {
        &mut self.edges
    }

    pub fn has_column(&self, key: Entity) -> bool {
        self.column_indices.contains_key(&key)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Typed view of a column
    pub fn column<T: ComponentData>(&self, key: Entity) -> Option<&[Option<T>]> {
        let idx = *self.column_indices.get(&key)?;
        self.columns[idx]
            .as_any()
            .downcast_ref::<TypedColumn<T>>()
            .map(TypedColumn::<T>::as_slice)
    }

    pub(crate) fn column_mut<T: ComponentData>(&mut self, key: Entity) -> Option<&mut [Option<T>]> {
        let idx = *self.column_indices.get(&key)?;
        self.columns[idx]
            .as_any_mut()
            .downcast_mut::<TypedColumn<T>>()
            .map(TypedColumn::<T>::as_mut_slice)
    }

    pub(crate) fn column_dyn_mut(&mut self, key: Entity) -> Option<&mut dyn ComponentColumn> {
        let idx = *self.column_indices.get(&key)?;
        Some(self.columns[idx].as_mut())
    }

    /// Type-erased value; `None` for flags and absent values
    pub fn value(&self, key: Entity, row: usize) -> Option<&dyn Any> {
        let idx = *self.column_indices.get(&key)?;
        self.columns[idx].value(row)
    }

    pub(crate) fn clone_value(&self, key: Entity, row: usize) -> Option<Box<dyn Any>> {
        let idx = *self.column_indices.get(&key)?;
        self.columns[idx].clone_value(row)
    }

    pub(crate) fn take_value(&mut self, key: Entity, row: usize) -> Option<Box<dyn Any>> {
        let idx = *self.column_indices.get(&key)?;
        self.columns[idx].take(row)
    }

    /// Allocate row for entity
    pub(crate) fn allocate_row(&mut self, entity: Entity) -> usize {
        let row = self.entities.len();
        self.entities.push(entity);
        for column in &mut self.columns {
            column.push_empty();
        }
        row
    }

    /// Remove row and return entity that was swapped in
    pub(crate) fn remove_row(&mut self, row: usize) -> Option<Entity> {
        if row >= self.entities.len() {
            return None;
        }
        self.entities.swap_remove(row);
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        self.entities.get(row).copied()
    }

    /// Move `row` into `dst`, carrying every column both archetypes share.
    ///
    /// Columns only present here are dropped, columns only present in `dst`
    /// start as `None`. Returns the new row and the entity swapped into the
    /// vacated row, if any.
    pub(crate) fn move_row_to(&mut self, row: usize, dst: &mut Archetype) -> (usize, Option<Entity>) {
        let entity = self.entities[row];
        let new_row = dst.entities.len();
        dst.entities.push(entity);

        for (key, &dst_idx) in &dst.column_indices {
            let dst_column = dst.columns[dst_idx].as_mut();
            match self.column_indices.get(key) {
                Some(&src_idx) => self.columns[src_idx].move_row(row, dst_column),
                None => dst_column.push_empty(),
            }
        }
        for (key, &src_idx) in &self.column_indices {
            if !dst.column_indices.contains_key(key) {
                self.columns[src_idx].swap_remove(row);
            }
        }

        self.entities.swap_remove(row);
        (new_row, self.entities.get(row).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ColumnInfo;

    fn key(id: u64) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn test_signature_is_canonical() {
        let a = Signature::from_keys([key(3), key(1), key(2), key(1)]);
        let b = Signature::from_keys([key(1), key(2), key(3)]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.with(key(2)), a);
        assert_eq!(a.without(key(2)).as_slice(), &[key(1), key(3)]);
    }

    #[test]
    fn test_archetype_creation() {
        let sig = Signature::from_keys([key(1), key(2)]);
        let arch = Archetype::new(sig.clone(), [(key(1), ColumnInfo::of::<i32>().new_column())]);
        assert_eq!(arch.signature(), &sig);
        assert_eq!(arch.len(), 0);
        assert!(arch.has_column(key(1)));
        assert!(!arch.has_column(key(2)));
    }

    #[test]
    fn test_move_row_reports_swapped_entity() {
        let health = key(10);
        let tag = key(11);
        let mut src = Archetype::new(
            Signature::from_keys([health]),
            [(health, ColumnInfo::of::<i32>().new_column())],
        );
        let mut dst = Archetype::new(
            Signature::from_keys([health, tag]),
            [(health, ColumnInfo::of::<i32>().new_column())],
        );

        let (a, b) = (key(100), key(101));
        for (entity, hp) in [(a, 5), (b, 9)] {
            let row = src.allocate_row(entity);
            src.column_mut::<i32>(health).unwrap()[row] = Some(hp);
        }

        let (new_row, swapped) = src.move_row_to(0, &mut dst);
        assert_eq!(new_row, 0);
        assert_eq!(swapped, Some(b));
        assert_eq!(src.entities(), &[b]);
        assert_eq!(src.column::<i32>(health).unwrap(), &[Some(9)]);
        assert_eq!(dst.column::<i32>(health).unwrap(), &[Some(5)]);
    }

    #[test]
    fn test_remove_last_row_swaps_nothing() {
        let mut arch = Archetype::new(Signature::new(), Vec::new());
        let row = arch.allocate_row(key(1));
        assert_eq!(arch.remove_row(row), None);
        assert!(arch.is_empty());
    }
}
