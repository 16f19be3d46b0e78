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

//! World: central entity and archetype storage

use std::any::Any;

#[cfg(feature = "profiling")]
use tracing::info_span;
use tracing::{debug, warn};

use crate::archetype::{Archetype, Signature};
use crate::builder::{BuildOp, EntityBuilder};
use crate::component::{
    AsEntity, Component, ComponentData, ComponentDescriptor, Flag, FlagDescriptor,
};
use crate::config::Config;
use crate::entity::{
    Access, Entity, EntityKind, EntityLocation, EntityRecord, EntityRegistry, LifeState,
};
use crate::error::{EcsError, Result};
use crate::hooks::{HookArgs, HookFn, HookKind, HookRegistry};
use crate::query::{Query, QueryData};
use crate::table::ArchetypeTable;

/// What an external call wants to do with a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    Set,
    Remove,
}

/// Everything `spawn` needs besides the queued keys
struct NewEntity {
    entity: Entity,
    name: Option<String>,
    kind: EntityKind,
    access: Access,
    builtin: Flag,
    hooks: Vec<(HookKind, HookFn)>,
}

fn first_error(errors: Vec<EcsError>) -> Result<()> {
    errors.into_iter().next().map_or(Ok(()), Err)
}

/// Central ECS world
///
/// Owns the entity registry, every archetype and the hook registry.
/// Components and flags are entities too, so the same id space covers
/// holders and keys.
pub struct World {
    config: Config,

    /// Ids, names, access and locations
    entities: EntityRegistry,

    /// All archetypes, the signature index and column types
    archetypes: ArchetypeTable,

    hooks: HookRegistry,

    /// Non-zero while a hook or an `unrestricted` block runs
    privilege_depth: u32,

    component_flag: Flag,
    entity_flag: Flag,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let mut entities = EntityRegistry::new();
        let mut archetypes = ArchetypeTable::new();

        // The built-in flags are flags themselves, so both live in {ComponentFlag}
        let component_flag = entities.allocate();
        let entity_flag = entities.allocate();
        let home = archetypes.ensure(Signature::from_keys([component_flag]));
        for (flag, name) in [(component_flag, "ComponentFlag"), (entity_flag, "EntityFlag")] {
            if let Some(archetype) = archetypes.get_mut(home) {
                let row = archetype.allocate_row(flag);
                entities.insert(
                    flag,
                    EntityRecord {
                        name: Some(name.to_string()),
                        kind: EntityKind::Flag,
                        access: Access::Protected,
                        state: LifeState::Alive,
                        location: EntityLocation {
                            archetype_id: home,
                            archetype_row: row,
                        },
                    },
                );
            }
        }

        Self {
            config,
            entities,
            archetypes,
            hooks: HookRegistry::new(),
            privilege_depth: 0,
            component_flag: Flag::from_entity(component_flag),
            entity_flag: Flag::from_entity(entity_flag),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Attached to every component and flag
    pub fn component_flag(&self) -> Flag {
        self.component_flag
    }

    /// Attached to every plain entity
    pub fn entity_flag(&self) -> Flag {
        self.entity_flag
    }

    pub(crate) fn table(&self) -> &ArchetypeTable {
        &self.archetypes
    }

    pub(crate) fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    // ========== Construction ==========

    /// Create a plain entity
    pub fn entity<'a>(&mut self, name: impl Into<Option<&'a str>>) -> Result<Entity> {
        self.create_entity(name, |_| Ok(()))
    }

    /// Create an entity with all of its keys in one step.
    ///
    /// The entity goes straight into its final archetype with every value
    /// stored. Only then do hooks run, per key in the order they were queued,
    /// so an `on_add` for one key already sees every other key.
    ///
    /// ```
    /// # use cascade_ecs::prelude::*;
    /// # fn main() -> Result<()> {
    /// let mut world = World::new();
    /// let tag = world.flag("Tag")?;
    /// let count = world.component::<i32>("Count")?;
    /// let e = world.create_entity("e", |b| {
    ///     b.add(tag).set(count, 5);
    ///     Ok(())
    /// })?;
    /// assert_eq!(world.get(e, count), Some(&5));
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_entity<'a, F>(&mut self, name: impl Into<Option<&'a str>>, init: F) -> Result<Entity>
    where
        F: FnOnce(&mut EntityBuilder) -> Result<()>,
    {
        let mut builder = EntityBuilder::new(self.entities.allocate());
        init(&mut builder)?;
        let new = NewEntity {
            entity: builder.entity(),
            name: name.into().map(str::to_owned),
            kind: EntityKind::Entity,
            access: Access::Public,
            builtin: self.entity_flag,
            hooks: Vec::new(),
        };
        self.spawn(new, builder.into_ops())
    }

    /// Create a data-bearing key storing `T`
    pub fn component<'a, T: ComponentData>(
        &mut self,
        name: impl Into<Option<&'a str>>,
    ) -> Result<Component<T>> {
        let mut descriptor = ComponentDescriptor::new();
        if let Some(name) = name.into() {
            descriptor = descriptor.named(name);
        }
        self.component_with(descriptor)
    }

    /// Create a component with access rules and inline hooks
    pub fn component_with<T: ComponentData>(
        &mut self,
        descriptor: ComponentDescriptor<T>,
    ) -> Result<Component<T>> {
        let key = self.entities.allocate();
        self.archetypes.register_column::<T>(key)?;
        let new = NewEntity {
            entity: key,
            name: descriptor.name,
            kind: EntityKind::Component,
            access: descriptor.access,
            builtin: self.component_flag,
            hooks: descriptor.hooks,
        };
        self.spawn(new, Vec::new())?;
        Ok(Component::from_entity(key))
    }

    /// Create a presence-only key
    pub fn flag<'a>(&mut self, name: impl Into<Option<&'a str>>) -> Result<Flag> {
        let mut descriptor = FlagDescriptor::new();
        if let Some(name) = name.into() {
            descriptor = descriptor.named(name);
        }
        self.flag_with(descriptor)
    }

    pub fn flag_with(&mut self, descriptor: FlagDescriptor) -> Result<Flag> {
        let new = NewEntity {
            entity: self.entities.allocate(),
            name: descriptor.name,
            kind: EntityKind::Flag,
            access: descriptor.access,
            builtin: self.component_flag,
            hooks: descriptor.hooks,
        };
        let key = self.spawn(new, Vec::new())?;
        Ok(Flag::from_entity(key))
    }

    fn spawn(&mut self, new: NewEntity, ops: Vec<BuildOp>) -> Result<Entity> {
        let entity = new.entity;

        // Validate everything before the world changes
        for op in &ops {
            let key = op.key();
            if key != entity {
                self.ensure_alive(key)?;
                self.check_access(key, Action::Add)?;
            }
            if let BuildOp::Set { column, .. } = op {
                self.check_data_key(key)?;
                self.archetypes.register_column_info(key, *column)?;
            }
        }

        let builtin = new.builtin.entity();
        let mut queue: Vec<(Entity, Option<Box<dyn Any>>)> = Vec::with_capacity(ops.len() + 1);
        queue.push((builtin, None));
        for op in ops {
            match op {
                BuildOp::Add(key) if key == builtin => {}
                BuildOp::Add(key) => queue.push((key, None)),
                BuildOp::Set { key, value, .. } => queue.push((key, Some(value))),
            }
        }

        let archetype_id = self
            .archetypes
            .ensure(Signature::from_keys(queue.iter().map(|(key, _)| *key)));
        let archetype = self
            .archetypes
            .get_mut(archetype_id)
            .ok_or(EcsError::ArchetypeNotFound)?;
        let row = archetype.allocate_row(entity);
        let mut keys = Vec::with_capacity(queue.len());
        for (key, value) in queue {
            if let Some(value) = value {
                let written = archetype
                    .column_dyn_mut(key)
                    .is_some_and(|column| column.write(row, value));
                debug_assert!(written, "BUG: column of {key} rejected its value");
            }
            keys.push(key);
        }

        let name = new.name.or_else(|| {
            self.config
                .entity_name_default
                .then(|| entity.id().to_string())
        });
        self.entities.insert(
            entity,
            EntityRecord {
                name,
                kind: new.kind,
                access: new.access,
                state: LifeState::Alive,
                location: EntityLocation {
                    archetype_id,
                    archetype_row: row,
                },
            },
        );
        for (kind, handler) in new.hooks {
            self.hooks.register(entity, kind, handler);
        }

        let mut errors = Vec::new();
        for key in keys {
            if !self.entities.is_live(entity) {
                break;
            }
            if !self.has(entity, key) {
                continue;
            }
            let value = self.current_value(entity, key);
            self.dispatch(HookKind::Add, key, entity, value.as_deref(), None, &mut errors);
            if value.is_some() {
                self.dispatch(HookKind::Change, key, entity, value.as_deref(), None, &mut errors);
            }
        }
        match first_error(errors) {
            Ok(()) => Ok(entity),
            Err(err) => Err(EcsError::CreatedWithErrors {
                entity,
                source: Box::new(err),
            }),
        }
    }

    // ========== Mutation ==========

    /// Attach `key` to `entity`. Data components start without a value.
    pub fn add(&mut self, entity: Entity, key: impl AsEntity) -> Result<()> {
        let key = key.entity();
        self.ensure_alive(entity)?;
        self.ensure_alive(key)?;
        self.check_access(key, Action::Add)?;
        if self.has(entity, key) {
            return Ok(());
        }

        self.relocate(entity, key, true)?;
        let mut errors = Vec::new();
        self.dispatch(HookKind::Add, key, entity, None, None, &mut errors);
        first_error(errors)
    }

    /// Store `value`, adding the component first if needed.
    ///
    /// Writing a value equal to the current one changes nothing and fires
    /// no hook.
    pub fn set<T: ComponentData>(&mut self, entity: Entity, component: Component<T>, value: T) -> Result<()> {
        let key = component.entity();
        self.ensure_alive(entity)?;
        self.ensure_alive(key)?;
        self.check_access(key, Action::Set)?;
        self.check_data_key(key)?;
        self.archetypes.register_column::<T>(key)?;

        let mut errors = Vec::new();
        self.set_internal(entity, key, value, &mut errors)?;
        first_error(errors)
    }

    fn set_internal<T: ComponentData>(
        &mut self,
        entity: Entity,
        key: Entity,
        value: T,
        errors: &mut Vec<EcsError>,
    ) -> Result<()> {
        let location = self
            .entities
            .location(entity)
            .ok_or(EcsError::NotAlive(entity))?;
        let archetype = self
            .archetypes
            .get_mut(location.archetype_id)
            .ok_or(EcsError::ArchetypeNotFound)?;

        if archetype.signature().contains(key) {
            let slot = archetype
                .column_mut::<T>(key)
                .and_then(|column| column.get_mut(location.archetype_row))
                .ok_or(EcsError::NotAComponent(key))?;
            if slot.as_ref() == Some(&value) {
                return Ok(());
            }
            let prev = slot.replace(value.clone());
            self.dispatch(
                HookKind::Change,
                key,
                entity,
                Some(&value as &dyn Any),
                prev.as_ref().map(|prev| prev as &dyn Any),
                errors,
            );
            return Ok(());
        }

        let location = self.relocate(entity, key, true)?;
        if let Some(slot) = self
            .archetypes
            .get_mut(location.archetype_id)
            .and_then(|archetype| archetype.column_mut::<T>(key))
            .and_then(|column| column.get_mut(location.archetype_row))
        {
            *slot = Some(value.clone());
        }
        self.dispatch(HookKind::Add, key, entity, Some(&value as &dyn Any), None, errors);
        self.dispatch(HookKind::Change, key, entity, Some(&value as &dyn Any), None, errors);
        Ok(())
    }

    /// Detach `key` from `entity`. Removing an absent key is a no-op.
    pub fn remove(&mut self, entity: Entity, key: impl AsEntity) -> Result<()> {
        let key = key.entity();
        if !self.entities.is_live(entity) {
            return Err(EcsError::NotAlive(entity));
        }
        if !self.entities.is_live(key) {
            return Err(EcsError::NotAlive(key));
        }
        self.check_access(key, Action::Remove)?;
        if !self.has(entity, key) {
            return Ok(());
        }

        let mut errors = Vec::new();
        self.remove_internal(entity, key, false, &mut errors)?;
        first_error(errors)
    }

    fn remove_internal(
        &mut self,
        entity: Entity,
        key: Entity,
        deleting: bool,
        errors: &mut Vec<EcsError>,
    ) -> Result<()> {
        let location = self
            .entities
            .location(entity)
            .ok_or(EcsError::NotAlive(entity))?;
        let archetype = self
            .archetypes
            .get_mut(location.archetype_id)
            .ok_or(EcsError::ArchetypeNotFound)?;
        if !archetype.signature().contains(key) {
            return Ok(());
        }

        let prev = archetype.take_value(key, location.archetype_row);
        self.relocate(entity, key, false)?;

        let prev = prev.as_deref();
        self.dispatch(HookKind::Remove, key, entity, None, prev, errors);
        if deleting {
            self.dispatch(HookKind::Delete, key, entity, None, prev, errors);
        }
        if prev.is_some() {
            self.dispatch(HookKind::Change, key, entity, None, prev, errors);
        }
        Ok(())
    }

    /// Move `entity` across the `key` edge of its archetype
    fn relocate(&mut self, entity: Entity, key: Entity, adding: bool) -> Result<EntityLocation> {
        let from = self
            .entities
            .location(entity)
            .ok_or(EcsError::NotAlive(entity))?;
        let to = if adding {
            self.archetypes.transition_add(from.archetype_id, key)?
        } else {
            self.archetypes.transition_remove(from.archetype_id, key)?
        };

        let [src, dst] = self
            .archetypes
            .pair_mut(from.archetype_id, to)
            .ok_or(EcsError::ArchetypeNotFound)?;
        let (row, swapped) = src.move_row_to(from.archetype_row, dst);
        let source_empty = src.is_empty();

        let location = EntityLocation {
            archetype_id: to,
            archetype_row: row,
        };
        self.entities.set_location(entity, location);
        if let Some(swapped) = swapped {
            self.entities.set_location(swapped, from);
        }
        if source_empty && self.config.auto_delete_empty_archetypes {
            self.archetypes.remove(from.archetype_id);
        }
        Ok(location)
    }

    /// Delete `entity` and strip it from every entity using it as a key.
    ///
    /// Own keys fire `OnRemove`, `OnDelete` and `OnChange`; holders of the
    /// entity fire `OnRemove` and `OnChange` only. Hook failures do not stop
    /// the cascade and are reported once it is done.
    pub fn delete(&mut self, entity: impl AsEntity) -> Result<()> {
        let entity = entity.entity();
        if entity == self.component_flag.entity() || entity == self.entity_flag.entity() {
            return Err(EcsError::BuiltinFlag(entity));
        }
        let record = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::NotAlive(entity))?;
        if record.state == LifeState::Deleting {
            return Ok(());
        }
        record.state = LifeState::Deleting;

        #[cfg(feature = "profiling")]
        let span = info_span!("world.delete", entity = entity.id());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let mut errors = Vec::new();
        let own: Vec<Entity> = self
            .components_of(entity)
            .map(|signature| signature.iter().collect())
            .unwrap_or_default();
        for key in own {
            if let Err(err) = self.remove_internal(entity, key, true, &mut errors) {
                errors.push(err);
            }
        }

        let holders = self.archetypes.holders_of(entity);
        let holder_count = holders.len();
        for holder in holders {
            if holder == entity || !self.entities.is_live(holder) {
                continue;
            }
            if let Err(err) = self.remove_internal(holder, entity, false, &mut errors) {
                errors.push(err);
            }
        }

        if let Some(location) = self.entities.location(entity) {
            let mut emptied = false;
            if let Some(archetype) = self.archetypes.get_mut(location.archetype_id) {
                if let Some(swapped) = archetype.remove_row(location.archetype_row) {
                    self.entities.set_location(swapped, location);
                }
                emptied = archetype.is_empty();
            }
            if emptied && self.config.auto_delete_empty_archetypes {
                self.archetypes.remove(location.archetype_id);
            }
        }

        let purged = self.archetypes.purge_key(entity);
        self.hooks.clear_key(entity);
        self.entities.remove(entity);

        debug!(
            entity = %entity,
            holders = holder_count,
            purged,
            failures = errors.len(),
            "entity deleted"
        );
        EcsError::collect(entity, errors)
    }

    /// Remove `key` from every holder at once.
    ///
    /// Holders move archetype by archetype; `OnRemove` and `OnChange` fire
    /// afterwards. The key entity itself stays alive.
    pub fn clear_component(&mut self, key: impl AsEntity) -> Result<()> {
        let key = key.entity();
        if !self.entities.is_live(key) {
            return Err(EcsError::NotAlive(key));
        }
        self.check_access(key, Action::Remove)?;

        #[cfg(feature = "profiling")]
        let span = info_span!("world.clear_component", key = key.id());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let mut removed: Vec<(Entity, Option<Box<dyn Any>>)> = Vec::new();
        for from in self.archetypes.archetypes_with(key) {
            let to = self.archetypes.transition_remove(from, key)?;
            let Some([src, dst]) = self.archetypes.pair_mut(from, to) else {
                continue;
            };
            // Always move the last row so nothing gets swapped
            while let Some(&entity) = src.entities().last() {
                let row = src.len() - 1;
                let prev = src.take_value(key, row);
                let (new_row, _) = src.move_row_to(row, dst);
                self.entities.set_location(
                    entity,
                    EntityLocation {
                        archetype_id: to,
                        archetype_row: new_row,
                    },
                );
                removed.push((entity, prev));
            }
            if self.config.auto_delete_empty_archetypes {
                self.archetypes.remove(from);
            }
        }
        debug!(key = %key, holders = removed.len(), "component cleared");

        let mut errors = Vec::new();
        for (entity, prev) in removed {
            if !self.entities.is_live(entity) {
                continue;
            }
            let prev = prev.as_deref();
            self.dispatch(HookKind::Remove, key, entity, None, prev, &mut errors);
            if prev.is_some() {
                self.dispatch(HookKind::Change, key, entity, None, prev, &mut errors);
            }
        }
        first_error(errors)
    }

    /// Run `f` with access checks lifted, as hooks do.
    ///
    /// This is how the owner of a protected or readonly key writes it.
    pub fn unrestricted<R>(&mut self, f: impl FnOnce(&mut World) -> R) -> R {
        self.privilege_depth += 1;
        let result = f(self);
        self.privilege_depth -= 1;
        result
    }

    // ========== Hook dispatch ==========

    /// Run every `(key, kind)` handler; failures go to `errors`.
    fn dispatch(
        &mut self,
        kind: HookKind,
        key: Entity,
        entity: Entity,
        value: Option<&dyn Any>,
        prev: Option<&dyn Any>,
        errors: &mut Vec<EcsError>,
    ) {
        let handlers = self.hooks.handlers(key, kind);
        if handlers.is_empty() {
            return;
        }
        self.privilege_depth += 1;
        for handler in handlers {
            if let Err(err) = handler(&mut *self, entity, HookArgs { value, prev }) {
                warn!(key = %key, entity = %entity, ?kind, error = %err, "hook failed");
                errors.push(err);
            }
        }
        self.privilege_depth -= 1;
    }

    // ========== Checks ==========

    fn ensure_alive(&self, entity: Entity) -> Result<()> {
        match self.entities.get(entity) {
            None => Err(EcsError::NotAlive(entity)),
            Some(record) if record.state == LifeState::Deleting => Err(EcsError::Deleting(entity)),
            Some(_) => Ok(()),
        }
    }

    fn check_access(&self, key: Entity, action: Action) -> Result<()> {
        if self.privilege_depth > 0 {
            return Ok(());
        }
        match (self.access(key), action) {
            (Some(Access::Protected), _) => Err(EcsError::Protected(key)),
            (Some(Access::Readonly), Action::Set) => Err(EcsError::Readonly(key)),
            _ => Ok(()),
        }
    }

    fn check_data_key(&self, key: Entity) -> Result<()> {
        match self.kind(key) {
            Some(EntityKind::Flag) => Err(EcsError::NotAComponent(key)),
            _ => Ok(()),
        }
    }

    // ========== Inspection ==========

    /// Stored value, `None` when absent or never set
    pub fn get<T: ComponentData>(&self, entity: Entity, component: Component<T>) -> Option<&T> {
        let location = self.entities.location(entity)?;
        self.archetypes
            .get(location.archetype_id)?
            .column::<T>(component.entity())?
            .get(location.archetype_row)?
            .as_ref()
    }

    /// Type-erased value; always `None` for flags
    pub fn get_dyn(&self, entity: Entity, key: impl AsEntity) -> Option<&dyn Any> {
        let location = self.entities.location(entity)?;
        self.archetypes
            .get(location.archetype_id)?
            .value(key.entity(), location.archetype_row)
    }

    fn current_value(&self, entity: Entity, key: Entity) -> Option<Box<dyn Any>> {
        let location = self.entities.location(entity)?;
        self.archetypes
            .get(location.archetype_id)?
            .clone_value(key, location.archetype_row)
    }

    pub fn has(&self, entity: Entity, key: impl AsEntity) -> bool {
        self.components_of(entity)
            .is_ok_and(|signature| signature.contains(key))
    }

    /// Alive, or in the middle of its deletion
    pub fn is_live(&self, entity: Entity) -> bool {
        self.entities.is_live(entity)
    }

    pub fn is_deleting(&self, entity: Entity) -> bool {
        self.entities.is_deleting(entity)
    }

    pub fn is_deleted(&self, entity: Entity) -> bool {
        self.entities.is_deleted(entity)
    }

    /// The entity's current key set
    pub fn components_of(&self, entity: Entity) -> Result<&Signature> {
        let location = self
            .entities
            .location(entity)
            .ok_or(EcsError::NotAlive(entity))?;
        self.archetypes
            .get(location.archetype_id)
            .map(Archetype::signature)
            .ok_or(EcsError::ArchetypeNotFound)
    }

    /// Live entity with this raw id
    pub fn id_to_entity(&self, id: u64) -> Option<Entity> {
        self.entities.from_id(id)
    }

    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.entities.get(entity)?.name.as_deref()
    }

    pub fn access(&self, entity: Entity) -> Option<Access> {
        self.entities.get(entity).map(|record| record.access)
    }

    pub fn kind(&self, entity: Entity) -> Option<EntityKind> {
        self.entities.get(entity).map(|record| record.kind)
    }

    /// Archetype and row currently holding `entity`
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        self.entities.location(entity)
    }

    /// Live entities, components and flags included
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter().map(|(_, archetype)| archetype)
    }

    /// Start a query over `data`
    pub fn query<Q: QueryData>(&self, data: Q) -> Query<Q> {
        Query::new(data)
    }

    /// Drop every empty archetype except the root. Returns how many went.
    pub fn cleanup(&mut self) -> usize {
        let removed = self.archetypes.cleanup();
        debug!(removed, remaining = self.archetypes.len(), "archetype cleanup");
        removed
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// True when `value` is a key handle naming a live entity.
///
/// Accepts [`Entity`], [`Flag`], `Option<Entity>` and any `Component<T>`
/// whose `T` this world stores. Everything else is `false`.
pub fn is_live_entity(world: &World, value: &dyn Any) -> bool {
    let entity = if let Some(entity) = value.downcast_ref::<Entity>() {
        Some(*entity)
    } else if let Some(flag) = value.downcast_ref::<Flag>() {
        Some(flag.entity())
    } else if let Some(entity) = value.downcast_ref::<Option<Entity>>() {
        *entity
    } else {
        world.archetypes.handle_entity(value)
    };
    entity.is_some_and(|entity| world.is_live(entity))
}
