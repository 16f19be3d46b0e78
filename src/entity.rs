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

//! Entity identifiers, registry records and location metadata.

use std::fmt;

use ahash::AHashMap;

use crate::archetype::ArchetypeId;

/// Unique entity identifier.
///
/// Ids are handed out monotonically by the [`EntityRegistry`] and are never
/// reused, so a stale id can always be told apart from a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u64);

impl Entity {
    /// Raw numeric id
    pub fn id(self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(id: u64) -> Self {
        Entity(id)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an entity was created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Entity,
    Component,
    Flag,
}

/// Who may add, set or remove a key on other entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Public,
    /// External `set` is rejected; `add`/`remove` are allowed
    Readonly,
    /// External `add`/`set`/`remove` are rejected
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Deleting,
}

/// Entity location in archetype (archetype_id, row)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_id: ArchetypeId,
    pub archetype_row: usize,
}

/// Per-entity bookkeeping
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub name: Option<String>,
    pub kind: EntityKind,
    pub access: Access,
    pub state: LifeState,
    pub location: EntityLocation,
}

/// Issues ids and tracks every live entity.
#[derive(Debug)]
pub struct EntityRegistry {
    next_id: u64,
    records: AHashMap<Entity, EntityRecord>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            records: AHashMap::with_capacity(256),
        }
    }

    /// Reserve a fresh id. The entity is not live until [`insert`](Self::insert).
    pub fn allocate(&mut self) -> Entity {
        let entity = Entity(self.next_id);
        self.next_id += 1;
        entity
    }

    pub fn insert(&mut self, entity: Entity, record: EntityRecord) {
        debug_assert!(entity.0 < self.next_id, "entity {entity} was not allocated");
        self.records.insert(entity, record);
    }

    pub fn remove(&mut self, entity: Entity) -> Option<EntityRecord> {
        self.records.remove(&entity)
    }

    pub fn get(&self, entity: Entity) -> Option<&EntityRecord> {
        self.records.get(&entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.records.get_mut(&entity)
    }

    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        self.records.get(&entity).map(|record| record.location)
    }

    pub fn set_location(&mut self, entity: Entity, location: EntityLocation) {
        if let Some(record) = self.records.get_mut(&entity) {
            record.location = location;
        }
    }

    /// Alive or currently being deleted
    pub fn is_live(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity)
    }

    pub fn is_deleting(&self, entity: Entity) -> bool {
        self.records
            .get(&entity)
            .is_some_and(|record| record.state == LifeState::Deleting)
    }

    /// Issued at some point but no longer live
    pub fn is_deleted(&self, entity: Entity) -> bool {
        entity.0 != 0 && entity.0 < self.next_id && !self.records.contains_key(&entity)
    }

    /// Look up a live entity by raw id
    pub fn from_id(&self, id: u64) -> Option<Entity> {
        let entity = Entity(id);
        self.records.contains_key(&entity).then_some(entity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
