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

//! Archetype table
//!
//! Owns every archetype of a world, the signature → archetype index, the
//! key → archetypes side table used by queries and cascades, and the column
//! type registered for each data-bearing key.

use std::any::{type_name, Any, TypeId};

use ahash::AHashMap;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use tracing::trace;

use crate::archetype::{Archetype, ArchetypeId, Signature};
use crate::component::{ColumnInfo, ComponentData};
use crate::entity::Entity;
use crate::error::{EcsError, Result};

pub struct ArchetypeTable {
    archetypes: SlotMap<ArchetypeId, Archetype>,
    index: AHashMap<Signature, ArchetypeId>,
    by_key: AHashMap<Entity, FxHashSet<ArchetypeId>>,
    columns: AHashMap<Entity, ColumnInfo>,
    /// Handle type → column info, for recognising erased `Component<T>` values
    handles: AHashMap<TypeId, ColumnInfo>,
    root: ArchetypeId,
}

impl ArchetypeTable {
    pub fn new() -> Self {
        let mut archetypes = SlotMap::with_capacity_and_key(64);
        let root = archetypes.insert(Archetype::new(Signature::new(), Vec::new()));
        let mut index = AHashMap::with_capacity(64);
        index.insert(Signature::new(), root);
        Self {
            archetypes,
            index,
            by_key: AHashMap::new(),
            columns: AHashMap::new(),
            handles: AHashMap::new(),
            root,
        }
    }

    /// The permanent empty-signature archetype
    pub fn root(&self) -> ArchetypeId {
        self.root
    }

    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id)
    }

    pub fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id)
    }

    /// Two distinct archetypes at once
    pub(crate) fn pair_mut(&mut self, a: ArchetypeId, b: ArchetypeId) -> Option<[&mut Archetype; 2]> {
        self.archetypes.get_disjoint_mut([a, b])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeId, &Archetype)> {
        self.archetypes.iter()
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    pub fn find(&self, signature: &Signature) -> Option<ArchetypeId> {
        self.index.get(signature).copied()
    }

    /// Archetypes whose signature contains `key`
    pub fn archetypes_with(&self, key: Entity) -> Vec<ArchetypeId> {
        self.by_key
            .get(&key)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of archetypes whose signature contains `key`
    pub fn archetype_count_with(&self, key: Entity) -> usize {
        self.by_key.get(&key).map_or(0, FxHashSet::len)
    }

    /// Every entity currently holding `key`
    pub fn holders_of(&self, key: Entity) -> Vec<Entity> {
        let Some(ids) = self.by_key.get(&key) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|&id| self.archetypes.get(id))
            .flat_map(|archetype| archetype.entities().iter().copied())
            .collect()
    }

    // ========== Column registry ==========

    pub fn column_info(&self, key: Entity) -> Option<&ColumnInfo> {
        self.columns.get(&key)
    }

    pub fn is_data_key(&self, key: Entity) -> bool {
        self.columns.contains_key(&key)
    }

    /// Fix the value type stored under `key`.
    ///
    /// A key already in use without data cannot start carrying data, and a
    /// data key keeps its first type.
    pub fn register_column<T: ComponentData>(&mut self, key: Entity) -> Result<()> {
        self.register_column_info(key, ColumnInfo::of::<T>())
    }

    pub(crate) fn register_column_info(&mut self, key: Entity, info: ColumnInfo) -> Result<()> {
        match self.columns.get(&key) {
            Some(existing) if existing.type_id == info.type_id => Ok(()),
            Some(existing) => Err(EcsError::TypeMismatch {
                key,
                expected: existing.type_name,
                found: info.type_name,
            }),
            None if self.archetype_count_with(key) > 0 => Err(EcsError::NotAComponent(key)),
            None => {
                self.handles.entry(info.handle_type_id).or_insert(info);
                self.columns.insert(key, info);
                Ok(())
            }
        }
    }

    /// Entity named by an erased `Component<T>`, for any `T` stored here
    pub(crate) fn handle_entity(&self, value: &dyn Any) -> Option<Entity> {
        self.handles.get(&value.type_id())?.handle_entity(value)
    }

    pub(crate) fn check_column_type<T: ComponentData>(&self, key: Entity) -> Result<()> {
        match self.columns.get(&key) {
            Some(existing) if existing.type_id != TypeId::of::<T>() => Err(EcsError::TypeMismatch {
                key,
                expected: existing.type_name,
                found: type_name::<T>(),
            }),
            _ => Ok(()),
        }
    }

    // ========== Archetype graph ==========

    /// Return the unique archetype for `signature`, creating it if absent.
    ///
    /// A new archetype is linked to every existing archetype one key smaller.
    pub fn ensure(&mut self, signature: Signature) -> ArchetypeId {
        if let Some(&id) = self.index.get(&signature) {
            return id;
        }

        let columns: Vec<_> = signature
            .iter()
            .filter_map(|key| self.columns.get(&key).map(|info| (key, info.new_column())))
            .collect();
        let id = self
            .archetypes
            .insert(Archetype::new(signature.clone(), columns));

        for key in signature.iter() {
            self.by_key.entry(key).or_default().insert(id);
            if let Some(&subset) = self.index.get(&signature.without(key)) {
                self.link(subset, key, id);
            }
        }
        trace!(keys = signature.len(), total = self.archetypes.len(), "archetype created");
        self.index.insert(signature, id);
        id
    }

    /// Archetype reached by adding `key` to `from`
    pub fn transition_add(&mut self, from: ArchetypeId, key: Entity) -> Result<ArchetypeId> {
        let source = self.archetypes.get(from).ok_or(EcsError::ArchetypeNotFound)?;
        if let Some(to) = source.edges().get_add(key) {
            return Ok(to);
        }
        let signature = source.signature().with(key);
        let to = self.ensure(signature);
        self.link(from, key, to);
        Ok(to)
    }

    /// Archetype reached by removing `key` from `from`
    pub fn transition_remove(&mut self, from: ArchetypeId, key: Entity) -> Result<ArchetypeId> {
        let source = self.archetypes.get(from).ok_or(EcsError::ArchetypeNotFound)?;
        if let Some(to) = source.edges().get_remove(key) {
            return Ok(to);
        }
        let signature = source.signature().without(key);
        let to = self.ensure(signature);
        self.link(to, key, from);
        Ok(to)
    }

    fn link(&mut self, from: ArchetypeId, key: Entity, to: ArchetypeId) {
        if from == to {
            return;
        }
        if let Some(source) = self.archetypes.get_mut(from) {
            source.edges_mut().add.insert(key, to);
        }
        if let Some(target) = self.archetypes.get_mut(to) {
            target.edges_mut().remove.insert(key, from);
        }
    }

    /// Drop an archetype together with its index entries and edges.
    ///
    /// The root archetype is permanent. Members, if any, are dropped with it;
    /// callers only remove empty archetypes.
    pub fn remove(&mut self, id: ArchetypeId) -> Option<Archetype> {
        if id == self.root {
            return None;
        }
        let archetype = self.archetypes.remove(id)?;
        debug_assert!(archetype.is_empty(), "BUG: removing a populated archetype");

        self.index.remove(archetype.signature());
        for key in archetype.signature().iter() {
            if let Some(ids) = self.by_key.get_mut(&key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.by_key.remove(&key);
                }
            }
        }
        for (key, target) in &archetype.edges().add {
            if let Some(target) = self.archetypes.get_mut(*target) {
                target.edges_mut().remove.remove(key);
            }
        }
        for (key, source) in &archetype.edges().remove {
            if let Some(source) = self.archetypes.get_mut(*source) {
                source.edges_mut().add.remove(key);
            }
        }
        trace!(keys = archetype.signature().len(), "archetype removed");
        Some(archetype)
    }

    /// Remove every empty archetype except the root. Returns how many went.
    pub fn cleanup(&mut self) -> usize {
        let empty: Vec<_> = self
            .archetypes
            .iter()
            .filter(|(id, archetype)| *id != self.root && archetype.is_empty())
            .map(|(id, _)| id)
            .collect();
        empty.into_iter().filter(|&id| self.remove(id).is_some()).count()
    }

    /// Forget `key` entirely: archetypes containing it and its column type.
    pub fn purge_key(&mut self, key: Entity) -> usize {
        let removed = self
            .archetypes_with(key)
            .into_iter()
            .filter(|&id| self.remove(id).is_some())
            .count();
        self.by_key.remove(&key);
        self.columns.remove(&key);
        removed
    }
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u64) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn test_ensure_is_unique() {
        let mut table = ArchetypeTable::new();
        let a = table.ensure(Signature::from_keys([key(1), key(2)]));
        let b = table.ensure(Signature::from_keys([key(2), key(1)]));
        assert_eq!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.find(&Signature::new()), Some(table.root()));
    }

    #[test]
    fn test_transitions_are_cached_both_ways() -> Result<()> {
        let mut table = ArchetypeTable::new();
        let root = table.root();
        let with_a = table.transition_add(root, key(1))?;

        assert_eq!(table.get(root).unwrap().edges().get_add(key(1)), Some(with_a));
        assert_eq!(table.get(with_a).unwrap().edges().get_remove(key(1)), Some(root));
        assert_eq!(table.transition_remove(with_a, key(1))?, root);
        Ok(())
    }

    #[test]
    fn test_new_archetype_links_existing_subsets() {
        let mut table = ArchetypeTable::new();
        let a = table.ensure(Signature::from_keys([key(1)]));
        let b = table.ensure(Signature::from_keys([key(2)]));
        let ab = table.ensure(Signature::from_keys([key(1), key(2)]));

        assert_eq!(table.get(a).unwrap().edges().get_add(key(2)), Some(ab));
        assert_eq!(table.get(b).unwrap().edges().get_add(key(1)), Some(ab));
        assert_eq!(table.get(ab).unwrap().edges().len(), 2);
    }

    #[test]
    fn test_remove_unlinks_edges() -> Result<()> {
        let mut table = ArchetypeTable::new();
        let root = table.root();
        let with_a = table.transition_add(root, key(1))?;
        let with_ab = table.transition_add(with_a, key(2))?;

        table.remove(with_a);
        assert!(table.get(with_a).is_none());
        assert!(table.get(root).unwrap().edges().is_empty());
        assert_eq!(table.get(with_ab).unwrap().edges().get_remove(key(2)), None);
        assert_eq!(table.archetype_count_with(key(1)), 1);
        Ok(())
    }

    #[test]
    fn test_cleanup_keeps_root() {
        let mut table = ArchetypeTable::new();
        table.ensure(Signature::from_keys([key(1)]));
        table.ensure(Signature::from_keys([key(2)]));
        assert_eq!(table.cleanup(), 2);
        assert_eq!(table.len(), 1);
        assert!(table.get(table.root()).is_some());
    }

    #[test]
    fn test_column_registration_rules() {
        let mut table = ArchetypeTable::new();
        assert!(table.register_column::<i32>(key(1)).is_ok());
        assert!(table.register_column::<i32>(key(1)).is_ok());
        assert!(matches!(
            table.register_column::<f32>(key(1)),
            Err(EcsError::TypeMismatch { .. })
        ));

        table.ensure(Signature::from_keys([key(2)]));
        assert_eq!(table.register_column::<i32>(key(2)), Err(EcsError::NotAComponent(key(2))));
    }

    #[test]
    fn test_purge_key_drops_archetypes() {
        let mut table = ArchetypeTable::new();
        table.register_column::<u8>(key(1)).unwrap();
        table.ensure(Signature::from_keys([key(1)]));
        table.ensure(Signature::from_keys([key(1), key(2)]));
        assert_eq!(table.purge_key(key(1)), 2);
        assert!(!table.is_data_key(key(1)));
        assert!(table.holders_of(key(1)).is_empty());
    }
}
